//! Elapsed-time column bookkeeping.

use contracts::Timestamp;

/// Running offset written to the `timer` column.
///
/// Each instant adds one output period unless the gap from the previous
/// instant exceeds a period, in which case the offset restarts at zero. A
/// discarded row takes its period back.
#[derive(Debug, Clone)]
pub struct TimerOffset {
    period: i64,
    offset: i64,
    previous: Option<Timestamp>,
}

impl TimerOffset {
    pub fn new(period_micros: i64) -> Self {
        Self {
            period: period_micros,
            offset: 0,
            previous: None,
        }
    }

    /// Advance to `current` and return the offset for its row
    pub fn step(&mut self, current: Timestamp) -> i64 {
        match self.previous {
            Some(previous) if current.micros_since(previous) > self.period => self.offset = 0,
            _ => self.offset += self.period,
        }
        self.previous = Some(current);
        self.offset
    }

    /// Undo the increment of a row that was not written
    pub fn discard(&mut self) {
        self.offset -= self.period;
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: i64 = 250_000;

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn test_first_row_carries_one_period() {
        let mut timer = TimerOffset::new(P);
        assert_eq!(timer.step(at(0)), P);
        assert_eq!(timer.step(at(250)), 2 * P);
    }

    #[test]
    fn test_gap_resets_to_zero() {
        let mut timer = TimerOffset::new(P);
        timer.step(at(0));
        timer.step(at(250));
        assert_eq!(timer.step(at(2_000)), 0);
        assert_eq!(timer.step(at(2_250)), P);
    }

    #[test]
    fn test_discard_rolls_back() {
        let mut timer = TimerOffset::new(P);
        timer.step(at(0));
        timer.step(at(250));
        timer.discard();
        assert_eq!(timer.offset(), P);
        assert_eq!(timer.step(at(500)), 2 * P);
    }

    #[test]
    fn test_discard_after_reset_goes_negative() {
        let mut timer = TimerOffset::new(P);
        timer.step(at(0));
        assert_eq!(timer.step(at(5_000)), 0);
        timer.discard();
        assert_eq!(timer.offset(), -P);
    }
}
