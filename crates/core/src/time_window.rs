use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An uncertainty-aware interval: the event started somewhere in
/// `[earliest_start, latest_start]` and ended somewhere in
/// `[earliest_end, latest_end]`.
///
/// Construction enforces the four-way ordering invariant
/// (`earliest_start ≤ latest_start`, `earliest_end ≤ latest_end`,
/// `earliest_start ≤ earliest_end`, `latest_start ≤ latest_end`); no other
/// code re-checks it. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub earliest_start: DateTime<FixedOffset>,
    pub latest_start: DateTime<FixedOffset>,
    pub earliest_end: DateTime<FixedOffset>,
    pub latest_end: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(
        earliest_start: DateTime<FixedOffset>,
        latest_start: DateTime<FixedOffset>,
        earliest_end: DateTime<FixedOffset>,
        latest_end: DateTime<FixedOffset>,
    ) -> Result<Self, CoreError> {
        if earliest_start > latest_start {
            return Err(CoreError::InvalidWindow(format!(
                "earliest_start {} > latest_start {}",
                earliest_start, latest_start
            )));
        }
        if earliest_end > latest_end {
            return Err(CoreError::InvalidWindow(format!(
                "earliest_end {} > latest_end {}",
                earliest_end, latest_end
            )));
        }
        if earliest_start > earliest_end {
            return Err(CoreError::InvalidWindow(format!(
                "earliest_start {} > earliest_end {}",
                earliest_start, earliest_end
            )));
        }
        if latest_start > latest_end {
            return Err(CoreError::InvalidWindow(format!(
                "latest_start {} > latest_end {}",
                latest_start, latest_end
            )));
        }
        Ok(Self {
            earliest_start,
            latest_start,
            earliest_end,
            latest_end,
        })
    }

    /// A window with no uncertainty: start and end are known exactly.
    pub fn exact(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, CoreError> {
        Self::new(start, start, end, end)
    }

    /// The start time, defined only when there is no start uncertainty.
    pub fn exact_start_time(&self) -> Option<DateTime<FixedOffset>> {
        (self.earliest_start == self.latest_start).then_some(self.earliest_start)
    }

    /// The end time, defined only when there is no end uncertainty.
    pub fn exact_end_time(&self) -> Option<DateTime<FixedOffset>> {
        (self.earliest_end == self.latest_end).then_some(self.earliest_end)
    }

    /// Conservative overlap test: true iff the *possible* intervals
    /// intersect. Appropriate for flagging possible physical conflicts
    /// under uncertainty; symmetric.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.earliest_start <= other.latest_end && other.earliest_start <= self.latest_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn ordering_invariant_enforced() {
        // latest_start before earliest_start
        assert!(TimeWindow::new(
            dt("2024-01-01T10:00:00+08:00"),
            dt("2024-01-01T09:00:00+08:00"),
            dt("2024-01-01T11:00:00+08:00"),
            dt("2024-01-01T11:00:00+08:00"),
        )
        .is_err());

        // end before start
        assert!(TimeWindow::new(
            dt("2024-01-01T10:00:00+08:00"),
            dt("2024-01-01T10:00:00+08:00"),
            dt("2024-01-01T09:00:00+08:00"),
            dt("2024-01-01T09:30:00+08:00"),
        )
        .is_err());

        // latest_start after latest_end
        assert!(TimeWindow::new(
            dt("2024-01-01T08:00:00+08:00"),
            dt("2024-01-01T12:00:00+08:00"),
            dt("2024-01-01T09:00:00+08:00"),
            dt("2024-01-01T11:00:00+08:00"),
        )
        .is_err());
    }

    #[test]
    fn exact_times_only_without_uncertainty() {
        let exact = TimeWindow::exact(
            dt("2024-01-01T10:00:00+08:00"),
            dt("2024-01-01T11:00:00+08:00"),
        )
        .unwrap();
        assert_eq!(
            exact.exact_start_time(),
            Some(dt("2024-01-01T10:00:00+08:00"))
        );
        assert_eq!(exact.exact_end_time(), Some(dt("2024-01-01T11:00:00+08:00")));

        let uncertain = TimeWindow::new(
            dt("2024-01-01T10:00:00+08:00"),
            dt("2024-01-01T10:30:00+08:00"),
            dt("2024-01-01T11:00:00+08:00"),
            dt("2024-01-01T11:00:00+08:00"),
        )
        .unwrap();
        assert_eq!(uncertain.exact_start_time(), None);
        assert_eq!(
            uncertain.exact_end_time(),
            Some(dt("2024-01-01T11:00:00+08:00"))
        );
    }

    #[test]
    fn overlap_is_symmetric() {
        let w1 = TimeWindow::exact(
            dt("2024-01-01T10:00:00+08:00"),
            dt("2024-01-01T12:00:00+08:00"),
        )
        .unwrap();
        let w2 = TimeWindow::exact(
            dt("2024-01-01T11:00:00+08:00"),
            dt("2024-01-01T13:00:00+08:00"),
        )
        .unwrap();
        let w3 = TimeWindow::exact(
            dt("2024-01-02T08:00:00+08:00"),
            dt("2024-01-02T09:00:00+08:00"),
        )
        .unwrap();

        assert!(w1.overlaps(&w2));
        assert!(w2.overlaps(&w1));
        assert!(!w1.overlaps(&w3));
        assert!(!w3.overlaps(&w1));
    }
}
