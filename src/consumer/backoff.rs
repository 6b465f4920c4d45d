use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff for empty pulls and transport errors.
///
/// Delays double from `initial` up to `max`, with up to 25% subtractive
/// jitter so restarted consumers do not pull in lockstep.
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    /// Reset after a successful, non-empty pull.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn next_delay(&mut self) -> Duration {
        let base = match self.current {
            None => self.initial,
            Some(previous) => (previous * 2).min(self.max),
        };
        self.current = Some(base);

        let jitter = rand::rng().random_range(0.0..0.25);
        base.mul_f64(1.0 - jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_stay_bounded() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_millis(400));

        let first = backoff.next_delay();
        assert!(first <= Duration::from_millis(50));
        assert!(first >= Duration::from_millis(37));

        let mut last = first;
        for _ in 0..10 {
            last = backoff.next_delay();
            assert!(last <= Duration::from_millis(400));
        }

        // After enough doublings the delay sits at the bound (minus jitter).
        assert!(last >= Duration::from_millis(300));
    }

    #[test]
    fn reset_returns_to_the_initial_delay() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_millis(400));
        for _ in 0..5 {
            backoff.next_delay();
        }

        backoff.reset();
        assert!(backoff.next_delay() <= Duration::from_millis(50));
    }
}
