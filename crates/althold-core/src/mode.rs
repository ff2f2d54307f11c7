// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Altitude source a hold mode is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HoldSource {
    Baro = 0,
    Ranger = 1,
}

impl HoldSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Baro => "Baro hold",
            Self::Ranger => "Ranger hold",
        }
    }
}

pub const NUM_SOURCES: usize = 2;

/// Result of feeding one switch sample to a [`ModeLatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTransition {
    /// Switch off, mode off.
    Inactive,
    /// Rising edge: the caller must re-baseline controller state.
    Activated,
    /// Switch still on, state persists.
    Held,
}

// ---------------------------------------------------------------------------
// Latch
// ---------------------------------------------------------------------------

/// Edge detector for one hold-mode switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeLatch {
    active: bool,
}

impl ModeLatch {
    pub fn update(&mut self, switch_active: bool) -> ModeTransition {
        if !switch_active {
            self.active = false;
            return ModeTransition::Inactive;
        }
        if self.active {
            return ModeTransition::Held;
        }
        self.active = true;
        ModeTransition::Activated
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Both hold modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    latches: [ModeLatch; NUM_SOURCES],
}

impl ModeFlags {
    pub fn update(&mut self, source: HoldSource, switch_active: bool) -> ModeTransition {
        let transition = self.latches[source as usize].update(switch_active);
        if transition == ModeTransition::Activated {
            tracing::debug!(mode = source.label(), "altitude hold engaged");
        }
        transition
    }

    pub fn is_active(&self, source: HoldSource) -> bool {
        self.latches[source as usize].is_active()
    }

    /// True while either hold mode is engaged.
    pub fn any_active(&self) -> bool {
        self.latches.iter().any(ModeLatch::is_active)
    }
}
