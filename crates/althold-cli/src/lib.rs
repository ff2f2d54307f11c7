//! Althold CLI - Command line interface for altitude-hold simulation.

use althold_core::{AltHoldConfig, Airframe, HoldSource};
use althold_sim::params::{self, ParamSpec};
use althold_sim::{
    gain_sweep, run_scenario, HoldResult, HoldStats, Scenario, SensorConfig, StickExcursion,
    TiltExcursion, VehicleParams,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Public function that can be called from the main binary
pub fn run_cli_main(args: &[&str]) -> Result<()> {
    let args = Args::parse_from(args);
    main_inner(args)
}

#[derive(Parser, Debug)]
#[command(name = "althold-cli")]
#[command(about = "Closed-loop altitude-hold simulator")]
#[command(version)]
pub struct Args {
    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Output file format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Controller configuration (JSON). Missing sections keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    // ── Scenario ──────────────────────────────────────────────
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// Time the hold switch is flipped on (s)
    #[arg(long, default_value_t = 5.0)]
    hold_at: f64,

    #[arg(long, value_enum, default_value = "baro")]
    source: SourceArg,

    /// Overrides the airframe from the config file
    #[arg(long, value_enum)]
    airframe: Option<AirframeArg>,

    /// Stick away from the hold baseline: START,END,OFFSET_US
    #[arg(long, value_parser = parse_stick_excursion)]
    stick_excursion: Option<StickExcursion>,

    /// Hard bank: START,END,ROLL_DEG
    #[arg(long, value_parser = parse_tilt_excursion)]
    tilt_excursion: Option<TiltExcursion>,

    /// Stick outside the deadband commands a climb rate instead of throttle
    #[arg(long)]
    slow_change: bool,

    // ── Vehicle ───────────────────────────────────────────────
    #[arg(long, default_value_t = 1.0)]
    mass: f64,

    #[arg(long, default_value_t = 19.6133)]
    max_thrust: f64,

    #[arg(long, default_value_t = 0.3)]
    drag_coeff: f64,

    #[arg(long, default_value_t = 9.80665)]
    gravity: f64,

    // ── Sensor options ────────────────────────────────────────
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 1.0)]
    noise_scale: f64,

    /// Fit the downward ranger
    #[arg(long)]
    ranger: bool,

    #[arg(long)]
    no_accel: bool,

    // ── Sweep options ──────────────────────────────────────────
    /// Sweep the velocity P gain over FIRST,LAST instead of a single run
    #[arg(long, value_parser = parse_gain_range)]
    sweep_vel_p: Option<(u8, u8)>,

    #[arg(long, default_value_t = 5)]
    sweep_steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Baro,
    Ranger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AirframeArg {
    Multirotor,
    FixedWing,
}

impl From<SourceArg> for HoldSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Baro => HoldSource::Baro,
            SourceArg::Ranger => HoldSource::Ranger,
        }
    }
}

impl From<AirframeArg> for Airframe {
    fn from(value: AirframeArg) -> Self {
        match value {
            AirframeArg::Multirotor => Airframe::Multirotor,
            AirframeArg::FixedWing => Airframe::FixedWing,
        }
    }
}

fn main_inner(args: Args) -> Result<()> {
    println!("Althold Simulator");
    println!("=================\n");

    let scenario = build_scenario(&args)?;
    match args.sweep_vel_p {
        Some((first, last)) => run_sweep(&args, &scenario, first, last),
        None => run_single(&args, &scenario),
    }
}

// ---------------------------------------------------------------------------
// Single Run
// ---------------------------------------------------------------------------
fn run_single(args: &Args, scenario: &Scenario) -> Result<()> {
    println!(
        "Running {} scenario ({} hold at {:.1} s)...",
        scenario.config.airframe.label(),
        scenario.hold_source.label(),
        scenario.hold_at_s
    );

    let result = run_scenario(scenario).context("simulation failed")?;
    print_hold_stats(&result);
    write_output(args, scenario, &result)
}

// ---------------------------------------------------------------------------
// Sweep Run
// ---------------------------------------------------------------------------
fn run_sweep(args: &Args, base: &Scenario, first: u8, last: u8) -> Result<()> {
    anyhow::ensure!(args.sweep_steps > 0, "--sweep-steps must be at least 1");
    let gains = gain_sweep(first, last, args.sweep_steps);
    println!("Sweeping velocity P over {:?}", gains);

    let mut rows: Vec<(u8, Option<HoldStats>)> = Vec::with_capacity(gains.len());
    for (i, &gain) in gains.iter().enumerate() {
        let mut scenario = base.clone();
        scenario.config.gains.vel.p = gain;
        let result = run_scenario(&scenario)
            .with_context(|| format!("simulation failed for vel P {gain}"))?;

        match result.stats {
            Some(s) => println!(
                "Run {}/{} | Vel P: {:3} -> max error {:.1} cm, RMS {:.1} cm",
                i + 1,
                gains.len(),
                gain,
                s.max_abs_error_cm,
                s.rms_error_cm
            ),
            None => println!(
                "Run {}/{} | Vel P: {:3} -> hold never settled",
                i + 1,
                gains.len(),
                gain
            ),
        }
        rows.push((gain, result.stats));
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let path = match args.format {
        OutputFormat::Csv => {
            let path = args.output_dir.join("sweep_summary.csv");
            let mut wtr = csv::Writer::from_path(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            wtr.write_record(["vel_p", "samples", "max_abs_error_cm", "rms_error_cm"])?;
            for (gain, stats) in &rows {
                let (samples, max, rms) = match stats {
                    Some(s) => (
                        s.samples.to_string(),
                        format!("{:.2}", s.max_abs_error_cm),
                        format!("{:.2}", s.rms_error_cm),
                    ),
                    None => ("0".to_string(), String::new(), String::new()),
                };
                wtr.write_record([gain.to_string(), samples, max, rms])?;
            }
            wtr.flush()?;
            path
        }
        OutputFormat::Json => {
            let path = args.output_dir.join("sweep_summary.json");
            let runs: Vec<_> = rows
                .iter()
                .map(|(gain, stats)| serde_json::json!({ "vel_p": gain, "stats": stats }))
                .collect();
            let doc = serde_json::json!({ "scenario": base.to_json(), "runs": runs });
            write_json(&path, &doc)?;
            path
        }
    };

    tracing::info!(runs = rows.len(), path = %path.display(), "sweep complete");
    println!("\nSweep complete. Summary at {:?}", path);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check(spec: &ParamSpec, value: f64) -> Result<()> {
    anyhow::ensure!(
        spec.contains(value),
        "{} must be within [{}, {}], got {}",
        spec.label,
        spec.min,
        spec.max,
        value
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AltHoldConfig> {
    let Some(path) = path else {
        return Ok(AltHoldConfig::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn build_scenario(args: &Args) -> Result<Scenario> {
    check(&params::scenario::DURATION, args.duration)?;
    check(&params::scenario::HOLD_AT, args.hold_at)?;
    check(&params::vehicle::MASS, args.mass)?;
    check(&params::vehicle::MAX_THRUST, args.max_thrust)?;
    check(&params::vehicle::DRAG_COEFF, args.drag_coeff)?;
    check(&params::environment::GRAVITY, args.gravity)?;
    check(&params::sensor_noise::NOISE_SCALE, args.noise_scale)?;
    if let Some(e) = args.stick_excursion {
        check(&params::scenario::STICK_OFFSET, e.offset as f64)?;
    }
    if let Some(e) = args.tilt_excursion {
        check(&params::scenario::TILT, e.roll_deg)?;
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(airframe) = args.airframe {
        config.airframe = airframe.into();
    }
    if args.slow_change {
        config.rc.alt_hold_fast_change = false;
    }
    config.validate().context("invalid controller configuration")?;

    let defaults = match config.airframe {
        Airframe::Multirotor => Scenario::default(),
        Airframe::FixedWing => Scenario::fixed_wing(),
    };

    Ok(Scenario {
        duration_s: args.duration,
        hold_at_s: args.hold_at,
        hold_source: args.source.into(),
        stick_excursion: args.stick_excursion,
        tilt_excursion: args.tilt_excursion,
        config,
        vehicle: VehicleParams {
            mass: args.mass,
            max_thrust: args.max_thrust,
            drag_coeff: args.drag_coeff,
            gravity: args.gravity,
            ..Default::default()
        },
        sensors: SensorConfig {
            noise_scale: args.noise_scale,
            has_ranger: args.ranger,
            has_accel: !args.no_accel,
            seed: args.seed,
            ..Default::default()
        },
        ..defaults
    })
}

fn parse_triple(s: &str) -> Result<(f64, f64, f64), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(format!("expected three comma-separated values, got `{s}`"));
    };
    let num = |v: &str| v.parse::<f64>().map_err(|e| format!("`{v}`: {e}"));
    Ok((num(*a)?, num(*b)?, num(*c)?))
}

fn parse_stick_excursion(s: &str) -> Result<StickExcursion, String> {
    let (start_s, end_s, offset) = parse_triple(s)?;
    if offset.fract() != 0.0 || offset.abs() > i16::MAX as f64 {
        return Err(format!("stick offset must be whole microseconds, got {offset}"));
    }
    Ok(StickExcursion {
        start_s,
        end_s,
        offset: offset as i16,
    })
}

fn parse_tilt_excursion(s: &str) -> Result<TiltExcursion, String> {
    let (start_s, end_s, roll_deg) = parse_triple(s)?;
    Ok(TiltExcursion {
        start_s,
        end_s,
        roll_deg,
    })
}

fn parse_gain_range(s: &str) -> Result<(u8, u8), String> {
    let (first, last) = s
        .split_once(',')
        .ok_or_else(|| format!("expected FIRST,LAST, got `{s}`"))?;
    let gain = |v: &str| v.trim().parse::<u8>().map_err(|e| format!("`{v}`: {e}"));
    Ok((gain(first)?, gain(last)?))
}

fn print_hold_stats(result: &HoldResult) {
    let max_alt = result
        .true_alt_cm
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    println!("\nHold Stats:");
    println!("  Samples:     {}", result.len());
    println!("  Max Alt:     {:.1} m", max_alt / 100.0);
    match result.engaged_at_s {
        Some(t) => println!("  Engaged:     {:.3} s", t),
        None => println!("  Engaged:     never"),
    }
    if let Some(s) = result.stats {
        println!("  Max Error:   {:.1} cm", s.max_abs_error_cm);
        println!("  RMS Error:   {:.1} cm", s.rms_error_cm);
        tracing::info!(
            max_abs_error_cm = s.max_abs_error_cm,
            rms_error_cm = s.rms_error_cm,
            "hold summary"
        );
    }
    println!("-----------------------------");
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))
}

fn write_output(args: &Args, scenario: &Scenario, r: &HoldResult) -> Result<()> {
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let path = match args.format {
        OutputFormat::Json => {
            let path = args.output_dir.join("hold.json");
            let doc = serde_json::json!({ "scenario": scenario.to_json(), "result": r });
            write_json(&path, &doc)?;
            path
        }
        OutputFormat::Csv => {
            let path = args.output_dir.join("hold.csv");
            let mut wtr = csv::Writer::from_path(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            wtr.write_record([
                "time",
                // Truth
                "true_alt_cm",
                "true_vel_cm_s",
                // Estimator
                "est_alt_cm",
                "est_vario_cm_s",
                // Controller
                "setpoint_cm",
                "correction",
                "integrator",
                "throttle",
                "pitch",
                // Modes
                "baro_hold",
                "ranger_hold",
                "stick_override",
            ])?;
            for i in 0..r.len() {
                wtr.write_record([
                    format!("{:.3}", r.time[i]),
                    format!("{:.1}", r.true_alt_cm[i]),
                    format!("{:.1}", r.true_vel_cm_s[i]),
                    r.est_alt_cm[i].to_string(),
                    r.est_vario_cm_s[i].to_string(),
                    r.setpoint_cm[i].to_string(),
                    r.correction[i].to_string(),
                    r.integrator[i].to_string(),
                    r.throttle[i].to_string(),
                    r.pitch[i].to_string(),
                    u8::from(r.baro_hold[i]).to_string(),
                    u8::from(r.ranger_hold[i]).to_string(),
                    u8::from(r.stick_override[i]).to_string(),
                ])?;
            }
            wtr.flush()?;
            path
        }
    };

    println!("Data written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("althold-cli-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_parsers() {
        let e = parse_stick_excursion("15, 17,150").unwrap();
        assert_eq!(
            e,
            StickExcursion {
                start_s: 15.0,
                end_s: 17.0,
                offset: 150
            }
        );
        assert!(parse_stick_excursion("1,2,3.5").is_err());
        assert!(parse_stick_excursion("1,2").is_err());
        assert_eq!(parse_tilt_excursion("1,2,85").unwrap().roll_deg, 85.0);
        assert_eq!(parse_gain_range("20,120").unwrap(), (20, 120));
        assert!(parse_gain_range("20,300").is_err());
    }

    #[test]
    fn test_build_scenario_from_flags() {
        let args = Args::try_parse_from([
            "althold-cli",
            "--airframe",
            "fixed-wing",
            "--slow-change",
            "--source",
            "ranger",
            "--ranger",
            "--seed",
            "9",
        ])
        .unwrap();
        let s = build_scenario(&args).unwrap();
        assert_eq!(s.config.airframe, Airframe::FixedWing);
        assert!(!s.config.rc.alt_hold_fast_change);
        assert_eq!(s.hold_source, HoldSource::Ranger);
        assert!(s.sensors.has_ranger);
        assert_eq!(s.sensors.seed, 9);
        // Fixed-wing script defaults
        assert_eq!(s.climb_offset, Scenario::fixed_wing().climb_offset);
    }

    #[test]
    fn test_rejects_out_of_range_flags() {
        let args = Args::try_parse_from(["althold-cli", "--duration=-3"]).unwrap();
        let err = build_scenario(&args).unwrap_err();
        assert!(err.to_string().contains("Duration"));
    }

    #[test]
    fn test_config_file() {
        let dir = scratch_dir("config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "acc_1g": 256, "rc": { "alt_hold_deadband": 25, "alt_hold_fast_change": false } }"#)
            .unwrap();
        let cfg = load_config(Some(path.as_path())).unwrap();
        assert_eq!(cfg.acc_1g, 256);
        assert_eq!(cfg.rc.alt_hold_deadband, 25);
        assert_eq!(cfg.gains, AltHoldConfig::default().gains);

        std::fs::write(&path, r#"{ "acc_1g": 0 }"#).unwrap();
        let args = Args::try_parse_from(["althold-cli", "--config", path.to_str().unwrap()]).unwrap();
        assert!(build_scenario(&args).is_err());

        assert!(load_config(Some(dir.join("missing.json").as_path())).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_single_run_writes_csv() {
        let dir = scratch_dir("single");
        let out = dir.to_str().unwrap();
        run_cli_main(&["althold-cli", "-o", out, "--duration", "8", "--hold-at", "3"]).unwrap();

        let mut rdr = csv::Reader::from_path(dir.join("hold.csv")).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "time");
        assert_eq!(headers.len(), 13);
        assert!(rdr.records().count() > 200);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sweep_writes_json_summary() {
        let dir = scratch_dir("sweep");
        let out = dir.to_str().unwrap();
        run_cli_main(&[
            "althold-cli",
            "-o",
            out,
            "-f",
            "json",
            "--duration",
            "20",
            "--sweep-vel-p",
            "40,80",
            "--sweep-steps",
            "3",
        ])
        .unwrap();

        let text = std::fs::read_to_string(dir.join("sweep_summary.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        let runs = doc["runs"].as_array().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1]["vel_p"], 60);
        assert!(runs[0]["stats"]["rms_error_cm"].is_number());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
