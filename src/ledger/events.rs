//! Append-only notification log

use uuid::Uuid;

use crate::types::*;

/// Events in the order the ledger emitted them
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event emitted by the call `call_id`
    pub fn record(&mut self, call_id: Uuid, event: VaultEvent) -> &EventRecord {
        let record = EventRecord {
            sequence: self.records.len() as u64,
            call_id,
            recorded_at: chrono::Utc::now().naive_utc(),
            event,
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop events past `len`; used when a failed call is rolled back
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records whose event names `owner`
    pub fn for_owner(&self, owner: &Address) -> Vec<EventRecord> {
        self.records
            .iter()
            .filter(|record| record.event.owner() == owner)
            .cloned()
            .collect()
    }
}
