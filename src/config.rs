//! Layered configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML / JSON / YAML file (format from the extension)
//! 3. `MRE_`-prefixed environment variables, `__` between sections
//!
//! | Key                          | Env                                | Default  |
//! |------------------------------|------------------------------------|----------|
//! | `client.client_version`      | `MRE_CLIENT__CLIENT_VERSION`       | crate version |
//! | `client.min_sdk_version`     | `MRE_CLIENT__MIN_SDK_VERSION`      | `0.13.0` |
//! | `client.protocol_version`    | `MRE_CLIENT__PROTOCOL_VERSION`     | `1`      |
//! | `app.global_app_id`          | `MRE_APP__GLOBAL_APP_ID`           | unset    |
//! | `tick.rate_hz`               | `MRE_TICK__RATE_HZ`                | `60`     |
//! | `prediction.*`               | `MRE_PREDICTION__<FIELD>`          | see [`PredictionConfig`] |

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::physics::PredictionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client_version: String,
    pub min_sdk_version: String,
    /// Legacy protocol version header.
    pub protocol_version: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_version: env!("CARGO_PKG_VERSION").into(),
            min_sdk_version: "0.13.0".into(),
            protocol_version: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stable app id used to salt user ids when the user allows tracking.
    pub global_app_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub rate_hz: f32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { rate_hz: 60.0 }
    }
}

impl TickConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.rate_hz)
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.rate_hz
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MreConfig {
    pub client: ClientConfig,
    pub app: AppConfig,
    pub tick: TickConfig,
    pub prediction: PredictionConfig,
}

impl MreConfig {
    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&MreConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MRE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: MreConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick.rate_hz.is_finite() && self.tick.rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tick.rate_hz must be positive, got {}",
                self.tick.rate_hz
            )));
        }
        let p = &self.prediction;
        if p.interpolation_window <= 0.0 {
            return Err(ConfigError::Invalid(
                "prediction.interpolation_window must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&p.stop_ratio) {
            return Err(ConfigError::Invalid(
                "prediction.stop_ratio must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let cfg = MreConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.client.protocol_version, 1);
        assert_eq!(cfg.tick.interval(), Duration::from_secs_f32(1.0 / 60.0));
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("mre-config-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(
            file,
            "[app]\nglobal_app_id = \"stable-app\"\n\n[prediction]\ngrace_window = 0.5\n"
        )
        .expect("write");
        drop(file);

        let cfg = MreConfig::load(Some(&path)).expect("load");
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.app.global_app_id.as_deref(), Some("stable-app"));
        assert_eq!(cfg.prediction.grace_window, 0.5);
        assert_eq!(
            cfg.prediction.interpolation_window,
            PredictionConfig::default().interpolation_window
        );
        assert_eq!(cfg.client, ClientConfig::default());
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let mut cfg = MreConfig::default();
        cfg.tick.rate_hz = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
