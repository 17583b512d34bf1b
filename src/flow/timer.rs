use crate::types::SessionId;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Card flip animation length before the countdown starts
pub const DEFAULT_FLIP_DELAY: Duration = Duration::from_millis(600);

/// Polling period of the countdown
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Sent when a countdown reaches zero. `turn_counter` lets the controller
/// drop expiries that belong to a card no longer on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerExpired {
    pub session_id: SessionId,
    pub turn_counter: u64,
}

/// Polling countdown running on its own task.
///
/// Progress goes from 1.0 down to 0.0 on a watch channel; expiry is reported
/// once on the events channel. Dropping or cancelling the countdown aborts
/// the task, so a cancelled timer never fires.
#[derive(Debug)]
pub struct Countdown {
    handle: JoinHandle<()>,
    progress: watch::Receiver<f32>,
}

impl Countdown {
    pub fn start(
        expiry: TimerExpired,
        duration: Duration,
        delay: Duration,
        events: mpsc::UnboundedSender<TimerExpired>,
    ) -> Self {
        let (progress_tx, progress_rx) = watch::channel(1.0f32);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let total = duration.as_secs_f32();
            let mut remaining = duration;
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            // First tick completes immediately
            interval.tick().await;

            while !remaining.is_zero() {
                interval.tick().await;
                remaining = remaining.saturating_sub(TICK_INTERVAL);
                let _ = progress_tx.send(remaining.as_secs_f32() / total);
            }

            tracing::debug!(
                "Timer expired for session {} turn {}",
                expiry.session_id,
                expiry.turn_counter
            );
            // Receiver gone means the session was torn down
            let _ = events.send(expiry);
        });

        Self {
            handle,
            progress: progress_rx,
        }
    }

    /// Remaining share of the countdown, 1.0 until the flip delay has passed
    pub fn progress(&self) -> f32 {
        *self.progress.borrow()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry() -> TimerExpired {
        TimerExpired {
            session_id: "s1".to_string(),
            turn_counter: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay_and_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let countdown = Countdown::start(
            expiry(),
            Duration::from_secs(2),
            Duration::from_millis(600),
            tx,
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(countdown.progress(), 1.0);

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert!(rx.try_recv().is_err());
        let progress = countdown.progress();
        assert!(progress > 0.0 && progress < 1.0, "progress {}", progress);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, expiry());
        assert_eq!(countdown.progress(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let countdown = Countdown::start(
            expiry(),
            Duration::from_secs(1),
            Duration::from_millis(600),
            tx,
        );

        tokio::time::sleep(Duration::from_millis(800)).await;
        countdown.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Aborted task dropped its sender without sending
        assert!(rx.recv().await.is_none());
        assert!(countdown.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let countdown = Countdown::start(expiry(), Duration::from_secs(1), Duration::ZERO, tx);
        drop(countdown);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.recv().await.is_none());
    }
}
