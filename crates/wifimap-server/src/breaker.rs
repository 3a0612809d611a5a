use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

#[derive(Debug)]
struct BreakerWindow {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_started_at: Option<Instant>,
}

/// Consecutive-failure circuit breaker for an upstream dependency.
///
/// After `threshold` failures in a row the circuit opens and [`allow`]
/// refuses calls for `cooldown`. After the cooldown exactly one trial call is
/// let through. A failure re-opens the circuit and a success closes it.
/// Until the trial settles every other caller is refused. A trial that never
/// settles is given up after another `cooldown`.
///
/// [`allow`]: CircuitBreaker::allow
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: Arc<Mutex<BreakerWindow>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            state: Arc::new(Mutex::new(BreakerWindow {
                consecutive_failures: 0,
                opened_at: None,
                trial_started_at: None,
            })),
        }
    }

    pub async fn allow(&self) -> bool {
        let mut window = self.state.lock().await;
        let Some(opened_at) = window.opened_at else {
            return true;
        };
        if opened_at.elapsed() < self.cooldown {
            return false;
        }
        match window.trial_started_at {
            Some(started) if started.elapsed() < self.cooldown => false,
            _ => {
                window.trial_started_at = Some(Instant::now());
                tracing::info!("circuit half-open, letting a trial request through");
                true
            }
        }
    }

    pub async fn record_success(&self) {
        let mut window = self.state.lock().await;
        window.consecutive_failures = 0;
        window.opened_at = None;
        window.trial_started_at = None;
    }

    pub async fn record_failure(&self) {
        let mut window = self.state.lock().await;
        window.consecutive_failures = window.consecutive_failures.saturating_add(1);
        if window.trial_started_at.take().is_some() {
            window.opened_at = Some(Instant::now());
            tracing::warn!(
                cooldown_secs = self.cooldown.as_secs(),
                "trial request failed, circuit re-opened"
            );
        } else if window.opened_at.is_none() && window.consecutive_failures >= self.threshold {
            window.opened_at = Some(Instant::now());
            tracing::warn!(
                failures = window.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit opened"
            );
        }
    }

    /// Ends a trial whose outcome says nothing about upstream health, so the
    /// next caller may try again.
    pub async fn release_trial(&self) {
        self.state.lock().await.trial_started_at = None;
    }
}
