// Configuration loading - replay.toml plus REPLAY__ environment overrides
use crate::application::session::SessionSettings;
use crate::domain::identity::SessionIdentity;
use crate::domain::playback::PlaybackRate;
use crate::domain::resolution::Resolution;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/replay";

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    pub api: ApiSettings,
    pub session: SessionConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub username: String,
    pub subject_id: u32,
    #[serde(default = "default_use_real_data")]
    pub use_real_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub rate: PlaybackRate,
    #[serde(default = "default_plot_resolution")]
    pub plot_resolution: Resolution,
    #[serde(default = "default_stats_resolution")]
    pub short_stats_resolution: Resolution,
    #[serde(default = "default_stats_resolution")]
    pub long_stats_resolution: Resolution,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_use_real_data() -> bool {
    true
}

fn default_plot_resolution() -> Resolution {
    Resolution::OneHour
}

fn default_stats_resolution() -> Resolution {
    Resolution::OneDay
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rate: PlaybackRate::default(),
            plot_resolution: default_plot_resolution(),
            short_stats_resolution: default_stats_resolution(),
            long_stats_resolution: default_stats_resolution(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ReplayConfig {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity::new(
            self.session.username.clone(),
            self.session.subject_id,
            self.session.use_real_data,
        )
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            rate: self.playback.rate,
            plot_resolution: self.playback.plot_resolution,
            short_stats_resolution: self.playback.short_stats_resolution,
            long_stats_resolution: self.playback.long_stats_resolution,
        }
    }
}

/// Load `config/replay.toml` (or the file named by `REPLAY_CONFIG`), then apply
/// `REPLAY__SECTION__KEY` environment overrides
pub fn load_replay_config() -> anyhow::Result<ReplayConfig> {
    let path = std::env::var("REPLAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_layered(&path, replay_environment())
}

fn replay_environment() -> config::Environment {
    config::Environment::with_prefix("REPLAY")
        .separator("__")
        .try_parsing(true)
}

fn load_layered(path: &str, environment: config::Environment) -> anyhow::Result<ReplayConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(environment)
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};
    use std::collections::HashMap;

    fn parse(toml: &str) -> ReplayConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_environment_overrides_file() {
        let path = std::env::temp_dir().join(format!("glucose-replay-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
            [api]
            base_url = "http://localhost:8000"

            [session]
            username = "alice"
            subject_id = 3

            [playback]
            rate = "slow"
            "#,
        )
        .unwrap();

        let env: HashMap<String, String> = [
            ("REPLAY__SESSION__USERNAME", "carol"),
            ("REPLAY__PLAYBACK__RATE", "fast"),
            ("REPLAY__API__TIMEOUT_MS", "2500"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = load_layered(path.to_str().unwrap(), replay_environment().source(Some(env)));
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.session.username, "carol");
        assert_eq!(config.session.subject_id, 3);
        assert_eq!(config.playback.rate, PlaybackRate::Fast);
        assert_eq!(config.api.timeout(), Duration::from_millis(2500));
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("glucose-replay-missing.toml");
        assert!(load_layered(missing.to_str().unwrap(), replay_environment().source(Some(HashMap::new()))).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
            [api]
            base_url = "http://localhost:8000"

            [session]
            username = "alice"
            subject_id = 3
            "#,
        );

        assert_eq!(config.api.timeout(), Duration::from_millis(5000));
        assert_eq!(config.identity(), SessionIdentity::new("alice", 3, true));
        assert_eq!(config.session_settings(), SessionSettings::default());
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_playback_section() {
        let config = parse(
            r#"
            [api]
            base_url = "http://replay.local"
            timeout_ms = 1500

            [session]
            username = "bob"
            subject_id = 42
            use_real_data = false

            [playback]
            rate = "fast"
            plot_resolution = "30min"
            long_stats_resolution = "30d"
            "#,
        );

        let settings = config.session_settings();
        assert_eq!(settings.rate, PlaybackRate::Fast);
        assert_eq!(settings.plot_resolution, Resolution::ThirtyMinutes);
        assert_eq!(settings.short_stats_resolution, Resolution::OneDay);
        assert_eq!(settings.long_stats_resolution, Resolution::ThirtyDays);
        assert!(!config.identity().use_real_data);
    }
}
