use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub node: NodeConfig,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a pending token request stays alive before the sweeper
    /// expires it (seconds)
    pub request_timeout_seconds: u64,
    /// Sweep period for the pending-request registry (seconds)
    pub sweep_interval_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 180,
            sweep_interval_seconds: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8090".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(180);

        let sweep_interval_seconds = std::env::var("SWEEP_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let config = Config {
            auth: AuthConfig {
                request_timeout_seconds,
                sweep_interval_seconds,
            },
            node: NodeConfig {
                bind_address,
                data_dir,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.bind_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "BIND_ADDRESS cannot be empty".to_string(),
            ));
        }

        if self.auth.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.auth.sweep_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SWEEP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
