pub mod activity;
pub mod debounce;
pub mod session;

pub use activity::{ActivityBuilder, ActivityLink, ActivityState};
pub use debounce::ChangeDebouncer;
pub use session::{
    PresenceSession, PresenceSink, SessionConfig, SessionError, SessionStatus, UpdateOutcome,
};

use nowfile_presence_core::AppConfig;
use nowfile_presence_source::ChangeNotification;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

impl SessionConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            file_path: cfg.now_playing_file.clone(),
            connect_timeout: Duration::from_millis(cfg.intervals.connect_timeout_ms),
            builder: ActivityBuilder::from_app_config(cfg),
        }
    }
}

pub async fn run_sync_loop<S, F>(
    session: &mut PresenceSession<S>,
    notifications: &mut mpsc::Receiver<ChangeNotification>,
    debouncer: &mut ChangeDebouncer,
    shutdown: F,
) where
    S: PresenceSink,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            change = notifications.recv() => {
                match change {
                    Some(change) => {
                        info!(path = %change.path.display(), "now playing file changed");
                        debouncer.on_change();
                    }
                    None => {
                        debug!("change stream closed");
                        break;
                    }
                }
            }
            coalesced = debouncer.settled() => {
                debug!(coalesced, "change burst settled");
                session.refresh().await;
            }
            _ = &mut shutdown => {
                info!("shutting down sync loop");
                break;
            }
        }
    }

    session.shutdown().await;
}
