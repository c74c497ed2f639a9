//! Synthetic points: gap bridging and right-edge extension.
//!
//! Both only ever add readings that repeat an existing value, so a chart shows
//! "last value held" instead of a slope nobody measured.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::DateWindow;
use crate::reading::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapBridge {
    pub max_gap: TimeDelta,
    /// Held points are placed inside this window. Only a gap that straddles a
    /// window bound is affected.
    pub window: DateWindow,
}

impl GapBridge {
    pub fn new(max_gap: TimeDelta) -> Self {
        Self {
            max_gap,
            window: DateWindow::unbounded(),
        }
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    /// The point to hold before `next`, if the gap from `prev` needs one.
    fn held_point(&self, prev: &Reading, next: &Reading) -> Option<Reading> {
        if next.timestamp - prev.timestamp <= self.max_gap || prev.value == next.value {
            return None;
        }
        let mut at = next.timestamp - self.max_gap;
        if let Some(start) = self.window.start {
            at = at.max(start);
        }
        if let Some(end) = self.window.end {
            at = at.min(end);
        }
        (prev.timestamp < at && at < next.timestamp).then(|| prev.held_at(at))
    }

    /// Wherever two consecutive readings are more than `max_gap` apart, insert
    /// the earlier value at `later - max_gap`. Neighbors with equal values
    /// already draw a flat line and get nothing inserted. Applying the bridge
    /// to its own output changes nothing.
    pub fn apply(&self, series: &[Reading]) -> Vec<Reading> {
        let mut out = Vec::with_capacity(series.len());
        let mut inserted = 0usize;
        for (i, r) in series.iter().enumerate() {
            if i > 0 {
                if let Some(held) = self.held_point(&series[i - 1], r) {
                    out.push(held);
                    inserted += 1;
                }
            }
            out.push(*r);
        }
        if inserted > 0 {
            tracing::trace!(inserted, max_gap_s = self.max_gap.num_seconds(), "gaps bridged");
        }
        out
    }
}

/// Latest final timestamp over a set of series. Empty series are ignored.
pub fn latest_timestamp<'a>(
    series: impl IntoIterator<Item = &'a [Reading]>,
) -> Option<DateTime<Utc>> {
    series
        .into_iter()
        .filter_map(|s| s.last().map(|r| r.timestamp))
        .max()
}

/// Copy of `series` whose last value is repeated at `latest` when the series
/// ends earlier. Empty series stay empty.
pub fn extend_to(series: &[Reading], latest: DateTime<Utc>) -> Vec<Reading> {
    let mut out = series.to_vec();
    if let Some(last) = series.last() {
        if last.timestamp < latest {
            out.push(last.held_at(latest));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(min: i64, v: f64) -> Reading {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        Reading::new(t0 + TimeDelta::minutes(min), v)
    }

    #[test]
    fn bridges_two_hour_gap_with_earlier_value() {
        let g = GapBridge::new(TimeDelta::minutes(30));
        let out = g.apply(&[at(0, 10.0), at(120, 20.0)]);
        assert_eq!(out, vec![at(0, 10.0), at(90, 10.0), at(120, 20.0)]);
    }

    #[test]
    fn gap_of_exactly_max_is_left_alone() {
        let g = GapBridge::new(TimeDelta::minutes(30));
        let s = [at(0, 1.0), at(30, 2.0), at(61, 3.0)];
        let out = g.apply(&s);
        assert_eq!(out, vec![at(0, 1.0), at(30, 2.0), at(31, 2.0), at(61, 3.0)]);
    }

    #[test]
    fn equal_neighbors_are_not_bridged() {
        let g = GapBridge::new(TimeDelta::minutes(30));
        let s = [at(0, 5.0), at(300, 5.0)];
        assert_eq!(g.apply(&s), s.to_vec());
    }

    #[test]
    fn bridging_is_idempotent() {
        let g = GapBridge::new(TimeDelta::minutes(30));
        let once = g.apply(&[at(0, 1.0), at(200, 2.0), at(205, 2.5), at(900, 1.0)]);
        assert_eq!(g.apply(&once), once);
    }

    #[test]
    fn held_points_stay_inside_the_window() {
        // Boundary neighbor at 0, first in-window reading at 110, window from 100.
        let start = at(100, 0.0).timestamp;
        let g = GapBridge::new(TimeDelta::minutes(30))
            .within(DateWindow::new(Some(start), None).unwrap());
        let out = g.apply(&[at(0, 1.0), at(110, 2.0)]);
        assert_eq!(out, vec![at(0, 1.0), at(100, 1.0), at(110, 2.0)]);
        assert_eq!(g.apply(&out), out);

        // Right edge: the held point lands on the window end.
        let end = at(10, 0.0).timestamp;
        let g = GapBridge::new(TimeDelta::minutes(30))
            .within(DateWindow::new(None, Some(end)).unwrap());
        let out = g.apply(&[at(5, 1.0), at(100, 2.0)]);
        assert_eq!(out, vec![at(5, 1.0), at(10, 1.0), at(100, 2.0)]);
        assert_eq!(g.apply(&out), out);

        // Last in-window reading sits on the end itself: nothing to hold.
        let s = [at(10, 1.0), at(100, 2.0)];
        assert_eq!(g.apply(&s), s.to_vec());
    }

    #[test]
    fn extend_appends_held_value_only_when_short() {
        let a = [at(0, 1.0), at(600, 2.0)];
        let b = [at(10, 7.0), at(630, 8.0)];
        let latest = latest_timestamp([&a[..], &b[..]]).unwrap();
        assert_eq!(latest, at(630, 0.0).timestamp);
        assert_eq!(extend_to(&a, latest), vec![at(0, 1.0), at(600, 2.0), at(630, 2.0)]);
        assert_eq!(extend_to(&b, latest), b.to_vec());
        assert!(extend_to(&[], latest).is_empty());
    }

    #[test]
    fn latest_ignores_empty_series() {
        let empty: [Reading; 0] = [];
        assert_eq!(latest_timestamp([&empty[..]]), None);
    }
}
