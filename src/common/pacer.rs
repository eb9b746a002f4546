//! Fixed-spacing request pacer
//!
//! Keeps successive calls at least `min_spacing` apart to stay within
//! broker rate limits. The first call never waits.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Configuration for the pacer
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Minimum time between two successive calls
    pub min_spacing: Duration,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_spacing: Duration::from_millis(1500),
        }
    }
}

impl PacerConfig {
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }
}

/// Pacer shared by clones
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use breakout_tracker::common::{Pacer, PacerConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let pacer = Pacer::new(PacerConfig::default().with_spacing(Duration::from_millis(10)));
///     pacer.wait().await;
///     // Make API request...
/// }
/// ```
#[derive(Debug)]
pub struct Pacer {
    last_call: Arc<Mutex<Option<Instant>>>,
    min_spacing: Duration,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            last_call: Arc::new(Mutex::new(None)),
            min_spacing: config.min_spacing,
        }
    }

    pub fn with_spacing(spacing: Duration) -> Self {
        Self::new(PacerConfig::default().with_spacing(spacing))
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Wait until the next call is allowed and claim the slot.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            sleep_until(last + self.min_spacing).await;
        }
        *last_call = Some(Instant::now());
    }

    /// Like [`Pacer::wait`] but gives up when `cancel` fires.
    /// Returns `false` if cancelled; the slot is not claimed then.
    pub async fn wait_or_cancel(&self, cancel: &CancellationToken) -> bool {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            tokio::select! {
                _ = sleep_until(last + self.min_spacing) => {}
                _ = cancel.cancelled() => return false,
            }
        }
        if cancel.is_cancelled() {
            return false;
        }
        *last_call = Some(Instant::now());
        true
    }
}

impl Clone for Pacer {
    fn clone(&self) -> Self {
        Self {
            last_call: Arc::clone(&self.last_call),
            min_spacing: self.min_spacing,
        }
    }
}
