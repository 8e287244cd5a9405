use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct ChangeDebouncer {
    settle: Duration,
    deadline: Option<Instant>,
    coalesced: usize,
}

impl ChangeDebouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            deadline: None,
            coalesced: 0,
        }
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    pub fn on_change(&mut self) {
        self.deadline = Some(Instant::now() + self.settle);
        self.coalesced += 1;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Waits for the pending deadline and disarms. Returns how many
    /// notifications were folded into this firing. Never resolves while
    /// unarmed.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// debouncer armed.
    pub async fn settled(&mut self) -> usize {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;
        self.deadline = None;
        std::mem::take(&mut self.coalesced)
    }
}
