//! Fixed-interval polling for screens that refresh on their own.
//!
//! A new call is issued on every tick whether or not the previous one has
//! settled, so a slow response can overlap the next call. Nothing is
//! deduplicated or queued: when the consumer falls behind and the result
//! buffer is full, ticks are skipped instead of piling up calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::ApiError;

/// Unread results plus in-flight calls; ticks beyond this are skipped.
const POLL_BUFFER: usize = 8;

/// Lower bound on the polling period.
const MIN_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Handle to a running poll. Dropping it stops the ticker and aborts
/// calls still in flight.
pub struct Poller<T> {
    rx: mpsc::Receiver<Result<T, ApiError>>,
    task: JoinHandle<()>,
}

impl<T> Poller<T> {
    /// Next settled call, in completion order.
    pub async fn next(&mut self) -> Option<Result<T, ApiError>> {
        self.rx.recv().await
    }

    pub fn stop(self) {}
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Call `call` immediately and then every `period`.
pub fn poll<T, F, Fut>(period: Duration, mut call: F) -> Poller<T>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let period = period.max(MIN_POLL_PERIOD);
    let (tx, rx) = mpsc::channel(POLL_BUFFER);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();

        loop {
            ticker.tick().await;
            while in_flight.try_join_next().is_some() {}

            // Each call holds a channel slot from the start, so in-flight
            // calls plus unread results never exceed POLL_BUFFER.
            let permit = match tx.clone().try_reserve_owned() {
                Ok(permit) => permit,
                Err(TrySendError::Full(_)) => {
                    debug!(in_flight = in_flight.len(), "Poll results unread, skipping tick");
                    continue;
                }
                Err(TrySendError::Closed(_)) => break,
            };

            let fut = call();
            in_flight.spawn(async move {
                permit.send(fut.await);
            });
        }
    });

    Poller { rx, task }
}
