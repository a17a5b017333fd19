pub const DEFAULT_DELAY_SECS: u64 = 120;

/// Zero-padded `MM:SS`. Minutes are not wrapped into hours.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// A whole-second countdown, advanced one tick at a time by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    total: u64,
    remaining: u64,
}

impl Countdown {
    pub fn new(secs: u64) -> Self {
        Self {
            total: secs,
            remaining: secs,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// One second passes. Returns true once the countdown has reached zero.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.is_finished()
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
    }

    pub fn text(&self) -> String {
        format_remaining(self.remaining)
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(120), "02:00");
        assert_eq!(format_remaining(119), "01:59");
        assert_eq!(format_remaining(5), "00:05");
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(6_000), "100:00");
    }

    #[test]
    fn ticks_down_to_zero_and_stays() {
        let mut countdown = Countdown::new(2);
        assert_eq!(countdown.text(), "00:02");
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(countdown.tick());
        assert_eq!(countdown.remaining(), 0);

        countdown.reset();
        assert_eq!(countdown.remaining(), 2);
        assert!(!countdown.is_finished());
    }

    #[test]
    fn default_is_two_minutes() {
        assert_eq!(Countdown::default().text(), "02:00");
    }
}
