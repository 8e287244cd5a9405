use nowfile_presence_core::{AppConfig, NowPlayingRecord, PlaybackWindow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityState {
    pub details: String,
    pub state_text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: String,
    pub small_image_text: String,
    /// Empty means "no buttons"; sinks omit the field entirely.
    pub links: Vec<ActivityLink>,
}

#[derive(Debug, Clone)]
pub struct ActivityBuilder {
    pub video_label: String,
    pub channel_label: String,
    pub small_image_key: String,
    pub small_image_text: String,
}

impl ActivityBuilder {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            video_label: cfg.buttons.video_label.clone(),
            channel_label: cfg.buttons.channel_label.clone(),
            small_image_key: cfg.assets.small_image_key.clone(),
            small_image_text: cfg.assets.small_image_text.clone(),
        }
    }

    pub fn build(&self, record: &NowPlayingRecord, window: PlaybackWindow) -> ActivityState {
        let state_text = match &record.album {
            Some(album) => format!("{} on {}", record.artist, album),
            None => record.artist.clone(),
        };

        let links = [
            (&record.video_link, &self.video_label),
            (&record.channel_link, &self.channel_label),
        ]
        .into_iter()
        .filter_map(|(url, label)| {
            url.as_ref().map(|url| ActivityLink {
                label: label.clone(),
                url: url.clone(),
            })
        })
        .collect();

        ActivityState {
            details: record.title.clone(),
            state_text,
            start_ms: window.start_ms,
            end_ms: window.end_ms,
            large_image_key: record.cover_image_key.clone(),
            large_image_text: format!("{} count loop", record.play_count),
            small_image_key: self.small_image_key.clone(),
            small_image_text: self.small_image_text.clone(),
            links,
        }
    }
}

impl Default for ActivityBuilder {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}
