/// Consecutive votes cast in the current app process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streak(u32);

impl Streak {
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Counts one more vote and returns the new streak.
    pub fn record_vote(&mut self) -> u32 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_counts_and_resets() {
        let mut streak = Streak::new();
        assert_eq!(streak.record_vote(), 1);
        assert_eq!(streak.record_vote(), 2);
        streak.reset();
        assert_eq!(streak.value(), 0);
    }
}
