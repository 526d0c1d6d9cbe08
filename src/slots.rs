use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Slot granularity for the whole system.
pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// A candidate bookable interval, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateSlot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// A date range plus a daily time window, expanded into discrete
/// non-overlapping slots of `interval` width, in ascending order.
///
/// Each day in `[start_date, end_date]` contributes slots covering
/// `[daily_start, daily_end)`; a day whose window is empty or inverted
/// contributes nothing, and an inverted date range yields an empty
/// sequence.
#[derive(Debug, Clone, Copy)]
pub struct SlotWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    pub interval: Duration,
}

impl SlotWindow {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        daily_start: NaiveTime,
        daily_end: NaiveTime,
    ) -> Self {
        Self {
            start_date,
            end_date,
            daily_start,
            daily_end,
            interval: Duration::minutes(SLOT_INTERVAL_MINUTES),
        }
    }

    /// Fresh iterator over the window; the window itself is reusable.
    pub fn iter(&self) -> SlotIter {
        SlotIter {
            window: *self,
            day: self.start_date,
            cursor: self.start_date.and_time(self.daily_start),
        }
    }
}

/// Lazy expansion of a `SlotWindow`.
///
/// Invariant: the cursor advances by exactly one interval per emitted
/// slot, so the iterator always makes forward progress.
pub struct SlotIter {
    window: SlotWindow,
    day: NaiveDate,
    cursor: NaiveDateTime,
}

impl Iterator for SlotIter {
    type Item = CandidateSlot;

    fn next(&mut self) -> Option<CandidateSlot> {
        loop {
            if self.day > self.window.end_date {
                return None;
            }

            let day_end = self.day.and_time(self.window.daily_end);
            if self.cursor < day_end {
                let start = self.cursor;
                self.cursor += self.window.interval;
                return Some(CandidateSlot {
                    start_at: start.and_utc(),
                    end_at: (start + self.window.interval).and_utc(),
                });
            }

            // Day exhausted (or its window empty); start fresh on the next one.
            self.day = self.day.succ_opt()?;
            self.cursor = self.day.and_time(self.window.daily_start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn single_day_one_hour_yields_two_slots() {
        let w = SlotWindow::new(date(2024, 1, 1), date(2024, 1, 1), time(9, 0), time(10, 0));
        let slots: Vec<_> = w.iter().collect();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_at.to_rfc3339(), "2024-01-01T09:00:00+00:00");
        assert_eq!(slots[0].end_at.to_rfc3339(), "2024-01-01T09:30:00+00:00");
        assert_eq!(slots[1].start_at.to_rfc3339(), "2024-01-01T09:30:00+00:00");
        assert_eq!(slots[1].end_at.to_rfc3339(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn two_day_range_restarts_each_day_at_daily_start() {
        let w = SlotWindow::new(date(2024, 1, 1), date(2024, 1, 2), time(9, 0), time(12, 0));
        let slots: Vec<_> = w.iter().collect();
        // 2 days x (3h / 30min) = 12
        assert_eq!(slots.len(), 12);
        assert_eq!(slots[6].start_at.to_rfc3339(), "2024-01-02T09:00:00+00:00");
        // contiguous within each day
        for pair in slots[..6].windows(2) {
            assert_eq!(pair[0].end_at, pair[1].start_at);
        }
        for pair in slots[6..].windows(2) {
            assert_eq!(pair[0].end_at, pair[1].start_at);
        }
    }

    #[test]
    fn inverted_daily_window_yields_nothing() {
        let w = SlotWindow::new(date(2024, 1, 1), date(2024, 1, 3), time(17, 0), time(9, 0));
        assert_eq!(w.iter().count(), 0);
    }

    #[test]
    fn equal_daily_bounds_yield_nothing() {
        let w = SlotWindow::new(date(2024, 1, 1), date(2024, 1, 1), time(9, 0), time(9, 0));
        assert_eq!(w.iter().count(), 0);
    }

    #[test]
    fn inverted_date_range_is_empty() {
        let w = SlotWindow::new(date(2024, 1, 5), date(2024, 1, 1), time(9, 0), time(17, 0));
        assert_eq!(w.iter().count(), 0);
    }

    #[test]
    fn window_not_divisible_by_interval_emits_ceil_slots() {
        // 75 minutes -> ceil(75/30) = 3, last slot runs past daily_end
        let w = SlotWindow::new(date(2024, 1, 1), date(2024, 1, 1), time(9, 0), time(10, 15));
        let slots: Vec<_> = w.iter().collect();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].start_at.to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert_eq!(slots[2].end_at.to_rfc3339(), "2024-01-01T10:30:00+00:00");
    }

    #[test]
    fn every_slot_is_exactly_one_interval_wide() {
        let w = SlotWindow::new(date(2024, 3, 1), date(2024, 3, 3), time(8, 0), time(18, 0));
        for s in w.iter() {
            assert_eq!(s.end_at - s.start_at, Duration::minutes(SLOT_INTERVAL_MINUTES));
        }
    }

    #[test]
    fn window_is_restartable() {
        let w = SlotWindow::new(date(2024, 1, 1), date(2024, 1, 2), time(9, 0), time(11, 0));
        let first: Vec<_> = w.iter().collect();
        let second: Vec<_> = w.iter().collect();
        assert_eq!(first, second);
    }
}
