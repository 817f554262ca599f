//! Timestamped values — the building block of [`crate::schedule::StatusSchedule`].

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// A value paired with the instant it became effective.
///
/// Ordered by instant first, value as a tie-break — this keeps `Ord`
/// consistent with `Eq` (which compares both fields) even though
/// [`StatusSchedule`](crate::schedule::StatusSchedule) never actually
/// produces two entries sharing an instant (same-instant inserts replace
/// rather than coexist).
#[derive(Debug, Clone)]
pub struct Timestamped<T> {
    pub instant: DateTime<Utc>,
    pub value: T,
}

impl<T> Timestamped<T> {
    pub fn new(instant: DateTime<Utc>, value: T) -> Self {
        Self { instant, value }
    }

    pub fn now(value: T) -> Self {
        Self::new(crate::now(), value)
    }
}

impl<T: PartialEq> PartialEq for Timestamped<T> {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant && self.value == other.value
    }
}

impl<T: PartialEq> Eq for Timestamped<T> {}

impl<T: Ord> PartialOrd for Timestamped<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Timestamped<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant).then_with(|| self.value.cmp(&other.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn orders_by_instant_first() {
        let t0 = crate::now();
        let a = Timestamped::new(t0, "available");
        let b = Timestamped::new(t0 + Duration::seconds(1), "occupied");
        assert!(a < b);
    }

    #[test]
    fn breaks_ties_on_value_when_instants_are_equal() {
        let t0 = crate::now();
        let a = Timestamped::new(t0, "available");
        let b = Timestamped::new(t0, "occupied");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal, "Eq and Ord must agree on equal instants with differing values");
    }
}
