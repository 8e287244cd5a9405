pub mod config;
pub mod model;
pub mod payload;
pub mod timing;

pub use config::{AppConfig, AssetsConfig, ButtonsConfig, ConfigIntervals};
pub use model::{NowPlayingRecord, PayloadOutcome, PlaybackWindow};
pub use payload::{parse, ParseError};
pub use timing::compute;
