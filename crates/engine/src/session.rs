use crate::activity::{ActivityBuilder, ActivityState};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use nowfile_presence_core::{payload, timing, PayloadOutcome};
use nowfile_presence_source::read_payload;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

#[async_trait]
pub trait PresenceSink: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn set_activity(&mut self, activity: &ActivityState) -> Result<()>;
    async fn clear_activity(&mut self) -> Result<()>;
    async fn disconnect(&mut self);
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("presence sink unreachable: {0:#}")]
    Connection(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Cleared,
    Rejected,
    ReadFailed,
    /// The sink refused the call; the attempted state is still recorded.
    SinkFailed,
    NotConnected,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub file_path: PathBuf,
    pub connect_timeout: Duration,
    pub builder: ActivityBuilder,
}

pub struct PresenceSession<S> {
    sink: S,
    cfg: SessionConfig,
    status: SessionStatus,
    current: Option<ActivityState>,
}

impl<S: PresenceSink> PresenceSession<S> {
    pub fn new(sink: S, cfg: SessionConfig) -> Self {
        Self {
            sink,
            cfg,
            status: SessionStatus::Disconnected,
            current: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Last activity handed to the sink; `None` after a clear.
    pub fn current(&self) -> Option<&ActivityState> {
        self.current.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Connected {
            return Ok(());
        }
        self.status = SessionStatus::Connecting;

        let attempt = tokio::time::timeout(self.cfg.connect_timeout, self.sink.connect()).await;
        let res = match attempt {
            Ok(res) => res,
            Err(_) => Err(anyhow!(
                "connect timed out after {:?}",
                self.cfg.connect_timeout
            )),
        };

        if let Err(err) = res {
            self.status = SessionStatus::Disconnected;
            return Err(SessionError::Connection(err));
        }

        self.status = SessionStatus::Connected;
        info!("presence sink connected");
        self.refresh().await;
        Ok(())
    }

    pub async fn refresh(&mut self) -> UpdateOutcome {
        if self.status != SessionStatus::Connected {
            return UpdateOutcome::NotConnected;
        }
        match read_payload(&self.cfg.file_path).await {
            Ok(raw) => self.apply_update(&raw).await,
            Err(err) => {
                warn!(error = %err, "skipping presence update");
                UpdateOutcome::ReadFailed
            }
        }
    }

    pub async fn apply_update(&mut self, raw: &str) -> UpdateOutcome {
        if self.status != SessionStatus::Connected {
            return UpdateOutcome::NotConnected;
        }
        debug!(payload = raw, "now playing data");

        let record = match payload::parse(raw) {
            Ok(PayloadOutcome::Record(record)) => record,
            Ok(PayloadOutcome::Empty) => {
                self.current = None;
                return match self.sink.clear_activity().await {
                    Ok(()) => {
                        info!("now playing file empty; presence cleared");
                        UpdateOutcome::Cleared
                    }
                    Err(err) => {
                        warn!(error = %err, "clear_activity failed");
                        UpdateOutcome::SinkFailed
                    }
                };
            }
            Err(err) => {
                warn!(error = %err, "invalid data format in now playing file");
                return UpdateOutcome::Rejected;
            }
        };

        let window = timing::compute(SystemTime::now(), record.duration_secs);
        let activity = self.cfg.builder.build(&record, window);
        let res = self.sink.set_activity(&activity).await;
        self.current = Some(activity);

        match res {
            Ok(()) => {
                info!(title = %record.title, artist = %record.artist, "presence updated");
                UpdateOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "set_activity failed");
                UpdateOutcome::SinkFailed
            }
        }
    }

    pub async fn shutdown(&mut self) {
        if self.status == SessionStatus::Disconnected {
            return;
        }
        self.sink.disconnect().await;
        self.status = SessionStatus::Disconnected;
        info!("presence sink disconnected");
    }
}
