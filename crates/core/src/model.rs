use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlayingRecord {
    pub title: String,
    pub artist: String,
    pub duration_secs: u64,
    pub video_link: Option<String>,
    pub channel_link: Option<String>,
    pub cover_image_key: String,
    pub album: Option<String>,
    /// Display text only, never coerced to a number.
    pub play_count: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadOutcome {
    Empty,
    Record(NowPlayingRecord),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}
