/// Minimal event type for traceability.
///
/// Structured text tagged with a monotonically increasing sequence number, so
/// the order in which a session observed things can be replayed in tests and
/// debug views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event under the next sequence number.
    pub fn emit(&mut self, kind: &'static str, message: impl Into<String>) {
        let seq = self.events.len() as u64;
        self.events.push(Event {
            seq,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;

    #[test]
    fn records_events_in_sequence() {
        let mut bus = EventBus::new();
        bus.emit("test", "hello");
        bus.emit("test", "again");
        let seqs: Vec<u64> = bus.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(bus.events()[1].message, "again");
    }

    #[test]
    fn filters_by_kind() {
        let mut bus = EventBus::new();
        bus.emit("a", "1");
        bus.emit("b", "2");
        bus.emit("a", "3");
        let msgs: Vec<_> = bus.of_kind("a").map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["1", "3"]);
        let seqs: Vec<u64> = bus.of_kind("a").map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 2]);
    }
}
