use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Api {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Api {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Storage {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    pub refresh_cooldown_secs: u64,
}

impl Status {
    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_secs(self.refresh_cooldown_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Verification {
    pub resend_cooldown_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    pub config: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: Api,
    #[serde(default)]
    pub storage: Storage,
    pub status: Status,
    pub verification: Verification,
    pub logging: Logging,
}

impl Settings {
    /// Defaults, then the TOML file at `path` if it exists, then
    /// `BERITABANK__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.timeout_secs", 30)?
            .set_default("status.refresh_cooldown_secs", 3)?
            .set_default("verification.resend_cooldown_minutes", 5)?
            .set_default("logging.config", "log4rs.yaml")?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("BERITABANK").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=5).contains(&self.status.refresh_cooldown_secs) {
            return Err(ConfigError::Message(format!(
                "status.refresh_cooldown_secs must be between 2 and 5, got {}",
                self.status.refresh_cooldown_secs
            )));
        }
        if self.verification.resend_cooldown_minutes == 0 {
            return Err(ConfigError::Message(
                "verification.resend_cooldown_minutes must be positive".to_string(),
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(ConfigError::Message(format!(
                "api.base_url must be an http(s) URL, got {}",
                self.api.base_url
            )));
        }
        Ok(())
    }
}
