use crate::protocol::CountEvent;

/// Which counter a threshold search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CountField {
    Count,
    TotalCount,
}

/// Ordered, frame-keyed log of count changes.
///
/// Arrival order is preserved as-is; in playback mode the backend emits events
/// in ascending frame order and the index never resorts them. The backend
/// resends the log on each detection tick in live mode and once in full on
/// `complete` in playback mode, so the latest full payload is authoritative.
#[derive(Debug, Default, Clone)]
pub struct EventIndex {
    events: Vec<CountEvent>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last full payload wins.
    pub fn replace(&mut self, events: Vec<CountEvent>) {
        self.events = events;
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[CountEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// First event (in stored order) whose `field` value reaches or exceeds
    /// `target`. This is a threshold search, not exact match: counts can jump
    /// by more than one between sampled frames, so exact match would miss
    /// common inputs.
    pub fn find_by_count(&self, target: u64, field: CountField) -> Option<&CountEvent> {
        self.events.iter().find(|event| match field {
            CountField::Count => u64::from(event.count) >= target,
            CountField::TotalCount => event.total_count >= target,
        })
    }
}
