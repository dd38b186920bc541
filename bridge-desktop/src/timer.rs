//! Timer Implementation using the Tokio runtime

use async_trait::async_trait;
use bridge_traits::time::Timer;
use std::time::Duration;

/// Sleeps on the Tokio timer wheel
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_uses_tokio_time() {
        let start = tokio::time::Instant::now();
        TokioTimer.sleep(Duration::from_secs(10)).await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
