use chrono::{DateTime, Utc};

/// Hands out creation-time based ids that never repeat within a process.
///
/// Two items created within the same millisecond get consecutive ids.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        self.last = candidate.max(self.last + 1);
        self.last
    }

    /// Ensure ids restored from storage are never handed out again.
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_millisecond_yields_increasing_ids() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut ids = IdGenerator::new();
        let a = ids.next(now);
        let b = ids.next(now);
        assert_eq!(a, 1_700_000_000_000);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn observed_ids_are_skipped() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let mut ids = IdGenerator::new();
        ids.observe(5_000);
        assert_eq!(ids.next(now), 5_001);
    }
}
