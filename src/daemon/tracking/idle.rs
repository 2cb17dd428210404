use chrono::{DateTime, TimeDelta, Utc};

/// Active and idle parts of an accrued span. They never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Split {
    pub active: TimeDelta,
    pub idle: TimeDelta,
}

pub struct IdleEvaluator {
    threshold: TimeDelta,
}

impl IdleEvaluator {
    pub fn from_seconds(threshold_s: u32) -> Self {
        Self {
            threshold: TimeDelta::seconds(threshold_s.into()),
        }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    pub fn is_idle(&self, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_activity >= self.threshold
    }

    /// Moment after which, without new activity, time stops counting as active.
    pub fn idle_from(&self, last_activity: DateTime<Utc>) -> DateTime<Utc> {
        last_activity + self.threshold
    }

    /// Splits `[from, to]` into the part before the idle boundary and the part after it.
    pub fn split(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        last_activity: DateTime<Utc>,
    ) -> Split {
        if to <= from {
            return Split::default();
        }
        let idle_start = self.idle_from(last_activity).max(from);
        let idle = if to > idle_start {
            to - idle_start
        } else {
            TimeDelta::zero()
        };
        Split {
            active: (to - from) - idle,
            idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::{IdleEvaluator, Split};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    #[test]
    fn test_is_idle_at_threshold() {
        let evaluator = IdleEvaluator::from_seconds(300);
        assert!(!evaluator.is_idle(at(0), at(4)));
        assert!(evaluator.is_idle(at(0), at(5)));
    }

    #[test]
    fn test_split_before_threshold_is_active() {
        let evaluator = IdleEvaluator::from_seconds(300);
        assert_eq!(
            evaluator.split(at(1), at(4), at(0)),
            Split {
                active: TimeDelta::minutes(3),
                idle: TimeDelta::zero()
            }
        );
    }

    #[test]
    fn test_split_across_threshold() {
        let evaluator = IdleEvaluator::from_seconds(300);
        assert_eq!(
            evaluator.split(at(0), at(6), at(0)),
            Split {
                active: TimeDelta::minutes(5),
                idle: TimeDelta::minutes(1)
            }
        );
    }

    #[test]
    fn test_split_entirely_idle() {
        let evaluator = IdleEvaluator::from_seconds(300);
        assert_eq!(
            evaluator.split(at(7), at(9), at(0)),
            Split {
                active: TimeDelta::zero(),
                idle: TimeDelta::minutes(2)
            }
        );
    }

    #[test]
    fn test_split_backwards_is_empty() {
        let evaluator = IdleEvaluator::from_seconds(300);
        assert_eq!(evaluator.split(at(3), at(2), at(0)), Split::default());
    }
}
