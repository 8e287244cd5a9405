use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigIntervals {
    pub settle_delay_ms: u64,
    pub file_watch_poll_ms: u64,
    pub connect_timeout_ms: u64,
    pub rpc_call_timeout_ms: u64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            settle_delay_ms: 500,
            file_watch_poll_ms: 250,
            connect_timeout_ms: 5_000,
            rpc_call_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetsConfig {
    pub small_image_key: String,
    pub small_image_text: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            small_image_key: "small_image_key".to_string(),
            small_image_text: "Small Image Text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonsConfig {
    pub video_label: String,
    pub channel_label: String,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            video_label: "Play on source".to_string(),
            channel_label: "View channel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub discord_app_id: String,
    /// Text file rewritten by the player plugin on every track change.
    pub now_playing_file: PathBuf,
    pub log_level: String,
    pub intervals: ConfigIntervals,
    pub assets: AssetsConfig,
    pub buttons: ButtonsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            discord_app_id: "507982587416018945".to_string(),
            now_playing_file: PathBuf::from("nowmusic.txt"),
            log_level: "info".to_string(),
            intervals: ConfigIntervals::default(),
            assets: AssetsConfig::default(),
            buttons: ButtonsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use std::path::PathBuf;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
now_playing_file = "/srv/music/nowmusic.txt"

[intervals]
settle_delay_ms = 750
"#,
        )
        .unwrap();

        assert_eq!(cfg.now_playing_file, PathBuf::from("/srv/music/nowmusic.txt"));
        assert_eq!(cfg.intervals.settle_delay_ms, 750);
        assert_eq!(cfg.intervals.file_watch_poll_ms, 250);
        assert_eq!(cfg.intervals.rpc_call_timeout_ms, 5_000);
        assert_eq!(cfg.schema_version, 1);
        assert_eq!(cfg.buttons.video_label, "Play on source");
    }

    #[test]
    fn default_config_survives_toml() {
        let cfg = AppConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }
}
