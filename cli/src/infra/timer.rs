//! Wall-clock implementation of the `RetryTimer` port.

use std::time::Duration;

use crate::application::ports::RetryTimer;

/// Waits a fixed delay between upgrade attempts.
#[derive(Debug, Clone, Copy)]
pub struct TokioRetryTimer {
    delay: Duration,
}

impl TokioRetryTimer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl RetryTimer for TokioRetryTimer {
    async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }
}
