//! Request-scoped, ordered search log

use std::sync::Arc;

use time::format_description::well_known::Rfc3339;

use crate::ports::Clock;

/// Ordered, timestamped log lines collected while serving one search call.
/// Each entry is mirrored to `tracing` at debug level.
pub struct SearchLog {
    clock: Arc<dyn Clock>,
    lines: Vec<String>,
}

impl SearchLog {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            lines: Vec::new(),
        }
    }

    pub fn record(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let timestamp = self
            .clock
            .now()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown-time".to_string());
        tracing::debug!(target: "product_scout::search", "{}", message);
        self.lines.push(format!("[{}] {}", timestamp, message));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use time::macros::datetime;

    #[test]
    fn test_lines_are_timestamped_in_order() {
        let clock = Arc::new(FixedClock(datetime!(2024-05-01 12:00:00 UTC)));
        let mut log = SearchLog::new(clock);
        log.record("first");
        log.record("second");

        assert_eq!(
            log.lines(),
            &[
                "[2024-05-01T12:00:00Z] first".to_string(),
                "[2024-05-01T12:00:00Z] second".to_string()
            ]
        );
    }
}
