use althold_core::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid controller configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid noise level for {sensor}: {source}")]
    Noise {
        sensor: &'static str,
        #[source]
        source: rand_distr::NormalError,
    },
    #[error("invalid scenario: {0}")]
    Scenario(String),
}
