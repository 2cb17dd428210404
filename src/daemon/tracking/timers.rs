use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    /// Fires once the idle threshold passed without activity.
    Idle,
    /// Periodic accrual while tracking.
    Accrual,
    /// Next local midnight.
    Midnight,
}

/// One deadline per purpose. Arming a timer replaces the previous deadline of the same kind, so
/// re-arming is always idempotent.
#[derive(Debug, Default)]
pub struct Timers {
    idle: Option<DateTime<Utc>>,
    accrual: Option<DateTime<Utc>>,
    midnight: Option<DateTime<Utc>>,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<DateTime<Utc>> {
        match kind {
            TimerKind::Idle => &mut self.idle,
            TimerKind::Accrual => &mut self.accrual,
            TimerKind::Midnight => &mut self.midnight,
        }
    }

    pub fn arm(&mut self, kind: TimerKind, at: DateTime<Utc>) {
        *self.slot(kind) = Some(at);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        *self.slot(kind) = None;
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<DateTime<Utc>> {
        match kind {
            TimerKind::Idle => self.idle,
            TimerKind::Accrual => self.accrual,
            TimerKind::Midnight => self.midnight,
        }
    }

    /// Earliest armed deadline.
    pub fn next(&self) -> Option<DateTime<Utc>> {
        [self.idle, self.accrual, self.midnight]
            .into_iter()
            .flatten()
            .min()
    }

    /// Disarms and returns every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<TimerKind> {
        let mut due = [TimerKind::Idle, TimerKind::Accrual, TimerKind::Midnight]
            .into_iter()
            .filter_map(|kind| {
                self.deadline(kind)
                    .filter(|deadline| *deadline <= now)
                    .map(|deadline| (deadline, kind))
            })
            .collect::<Vec<_>>();
        due.sort();
        due.into_iter()
            .map(|(_, kind)| {
                self.cancel(kind);
                kind
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::{TimerKind, Timers};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let mut timers = Timers::default();
        timers.arm(TimerKind::Idle, at(300));
        timers.arm(TimerKind::Idle, at(600));
        assert_eq!(timers.next(), Some(at(600)));
        assert!(timers.take_due(at(300)).is_empty());
    }

    #[test]
    fn test_take_due_orders_by_deadline() {
        let mut timers = Timers::default();
        timers.arm(TimerKind::Midnight, at(10));
        timers.arm(TimerKind::Accrual, at(30));
        timers.arm(TimerKind::Idle, at(20));

        assert_eq!(
            timers.take_due(at(25)),
            vec![TimerKind::Midnight, TimerKind::Idle]
        );
        assert_eq!(timers.next(), Some(at(30)));
        assert_eq!(timers.deadline(TimerKind::Idle), None);
    }

    #[test]
    fn test_cancel() {
        let mut timers = Timers::default();
        timers.arm(TimerKind::Accrual, at(30));
        timers.cancel(TimerKind::Accrual);
        assert_eq!(timers.next(), None);
    }
}
