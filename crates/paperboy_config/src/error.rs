/// Failures parsing the environment-sourced configuration table.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required configuration key {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
