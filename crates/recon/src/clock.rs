//! Wall-clock source for the "last updated" stamp.

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::TimestampConfig;
use crate::error::ConfigError;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Renders instants with the configured pattern and offset.
#[derive(Debug, Clone)]
pub struct StampFormat {
    format: String,
    offset: FixedOffset,
}

impl StampFormat {
    pub fn from_config(config: &TimestampConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            format: config.format.clone(),
            offset: config.offset()?,
        })
    }

    pub fn render(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(&self.format).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn render_in_offset() {
        let fmt = StampFormat::from_config(&TimestampConfig {
            format: "%d/%m/%Y, %H:%M:%S".into(),
            utc_offset: "-03:00".into(),
        })
        .unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 2, 15, 0).unwrap();
        assert_eq!(fmt.render(at), "28/02/2026, 23:15:00");
    }

    #[test]
    fn fixed_clock_is_stable() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), clock.now());
    }
}
