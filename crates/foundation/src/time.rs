/// Engine time in seconds.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Self = Self(0.0);

    /// From a browser-style millisecond timestamp (`performance.now()`, rAF).
    pub fn from_millis(ms: f64) -> Self {
        Self(ms / 1000.0)
    }

    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }

    pub fn after_millis(self, ms: f64) -> Self {
        Self(self.0 + ms / 1000.0)
    }

    /// Seconds elapsed since `earlier`, never negative.
    pub fn seconds_since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

/// A point in time after which pending work is overdue.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Deadline(pub Time);

impl Deadline {
    pub fn in_millis(now: Time, ms: f64) -> Self {
        Self(now.after_millis(ms))
    }

    pub fn has_passed(&self, now: Time) -> bool {
        now.0 >= (self.0).0
    }
}

#[cfg(test)]
mod tests {
    use super::{Deadline, Time};

    #[test]
    fn millis_round_trip() {
        let t = Time::from_millis(1500.0);
        assert_eq!(t, Time(1.5));
        assert_eq!(t.as_millis(), 1500.0);
    }

    #[test]
    fn seconds_since_clamps_to_zero() {
        assert_eq!(Time(1.0).seconds_since(Time(2.0)), 0.0);
        assert_eq!(Time(3.0).seconds_since(Time(1.0)), 2.0);
    }

    #[test]
    fn deadline_passes_at_boundary() {
        let d = Deadline::in_millis(Time(1.0), 500.0);
        assert!(!d.has_passed(Time(1.25)));
        assert!(d.has_passed(Time(1.5)));
    }
}
