use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Default fade-in length for a new question.
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
enum Phase {
    Held,
    Running(Instant),
}

/// Progress hint (0.0..=1.0) for the view's question transition.
///
/// `reset` pins the value at 0.0, `begin` drives it linearly to 1.0 over
/// `duration`. A later reset or begin replaces an earlier one.
#[derive(Debug)]
pub struct TransitionSignal {
    duration: Duration,
    phase: Mutex<Phase>,
    transitions: watch::Sender<u64>,
}

impl TransitionSignal {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        let (transitions, _) = watch::channel(0);
        Self {
            duration,
            phase: Mutex::new(Phase::Held),
            transitions,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn reset(&self) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = Phase::Held;
    }

    /// Starts driving toward 1.0 and notifies subscribers.
    pub fn begin(&self) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = Phase::Running(Instant::now());
        self.transitions.send_modify(|count| *count += 1);
    }

    #[must_use]
    pub fn progress(&self) -> f32 {
        let phase = *self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match phase {
            Phase::Held => 0.0,
            Phase::Running(_) if self.duration.is_zero() => 1.0,
            Phase::Running(started) => {
                let ratio = started.elapsed().as_secs_f32() / self.duration.as_secs_f32();
                ratio.clamp(0.0, 1.0)
            }
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Number of transitions begun so far.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        *self.transitions.borrow()
    }

    /// Receiver that changes every time a transition begins.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.transitions.subscribe()
    }
}

impl Default for TransitionSignal {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION)
    }
}
