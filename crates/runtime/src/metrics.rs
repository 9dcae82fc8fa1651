use std::collections::BTreeMap;

/// Session counters and gauges.
///
/// Counters count operation outcomes (`ops.applied`, `ops.skipped`,
/// `ops.failed`); gauges hold the latest observed level (`map.datasets`).
/// Names are kept sorted so a snapshot prints the same way every time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub gauges: Vec<(String, i64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: impl Into<String>, by: u64) {
        let name = name.into();
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: impl Into<String>, value: i64) {
        self.gauges.insert(name.into(), value);
    }

    /// Counters first, then gauges, each sorted by name.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (k, v) in &self.counters {
            writeln!(f, "{k} = {v}")?;
        }
        for (k, v) in &self.gauges {
            writeln!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc_counter("a", 1);
        m.inc_counter("a", 2);
        assert_eq!(m.counter("a"), 3);
        assert_eq!(m.counter("missing"), 0);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge("g"), None);
        m.set_gauge("g", 10);
        m.set_gauge("g", 11);
        assert_eq!(m.gauge("g"), Some(11));
    }

    #[test]
    fn snapshot_is_stably_sorted() {
        let mut m = Metrics::new();
        m.inc_counter("b", 1);
        m.inc_counter("a", 1);
        m.set_gauge("z", 1);
        m.set_gauge("m", 2);

        let snap = m.snapshot();
        assert_eq!(
            snap.counters,
            vec![("a".to_string(), 1), ("b".to_string(), 1)]
        );
        assert_eq!(
            snap.gauges,
            vec![("m".to_string(), 2), ("z".to_string(), 1)]
        );
        assert_eq!(snap.to_string(), "a = 1\nb = 1\nm = 2\nz = 1\n");
    }
}
