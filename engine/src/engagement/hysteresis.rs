//! Up/down counter that turns a noisy boolean into a stable one

/// Headroom kept above the threshold so a long positive run recovers quickly
const HEADROOM: u32 = 3;

/// Hysteresis counter
///
/// Positive readings count up, negative readings count down (floored at 0).
/// The stabilized value is true only while the counter is strictly above
/// the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteresis {
    counter: u32,
    threshold: u32,
}

impl Hysteresis {
    pub fn new(threshold: u32) -> Self {
        Self {
            counter: 0,
            threshold,
        }
    }

    /// Feed one raw reading and return the stabilized value
    pub fn update(&mut self, raw: bool) -> bool {
        self.counter = if raw {
            (self.counter + 1).min(self.ceiling())
        } else {
            self.counter.saturating_sub(1)
        };
        self.is_set()
    }

    pub fn is_set(&self) -> bool {
        self.counter > self.threshold
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Largest value the counter can hold
    pub fn ceiling(&self) -> u32 {
        self.threshold.saturating_add(HEADROOM)
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_requires_run_above_threshold() {
        let mut face = Hysteresis::new(2);
        assert!(!face.update(true));
        assert!(!face.update(true));
        assert!(face.update(true));
        assert_eq!(face.counter(), 3);
    }

    #[test]
    fn test_single_negative_does_not_flip_after_saturation() {
        let mut face = Hysteresis::new(2);
        for _ in 0..10 {
            face.update(true);
        }
        assert_eq!(face.counter(), face.ceiling());
        assert!(face.update(false));
        assert!(face.update(false));
        assert!(!face.update(false));
    }

    #[test]
    fn test_two_positives_then_negative_stay_unset() {
        // 1 -> 2 -> 1: never strictly above a threshold of 2
        let mut face = Hysteresis::new(2);
        face.update(true);
        face.update(true);
        assert!(!face.update(false));
        assert_eq!(face.counter(), 1);
    }

    #[test]
    fn test_floor_at_zero() {
        let mut look_away = Hysteresis::new(3);
        for _ in 0..5 {
            assert!(!look_away.update(false));
        }
        assert_eq!(look_away.counter(), 0);
        look_away.update(true);
        assert_eq!(look_away.counter(), 1);
    }

    proptest! {
        #[test]
        fn counter_stays_within_bounds(
            threshold in 0u32..8,
            readings in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let mut h = Hysteresis::new(threshold);
            let mut previous = h.counter();
            for raw in readings {
                let stable = h.update(raw);
                let now = h.counter();
                prop_assert!(now <= h.ceiling());
                prop_assert!(now.abs_diff(previous) <= 1);
                if raw {
                    prop_assert!(now >= previous);
                } else {
                    prop_assert!(now <= previous);
                }
                prop_assert_eq!(stable, now > threshold);
                previous = now;
            }
        }
    }
}
