//! In-process record store for dry runs and tests.

use chrono::{DateTime, Utc};

use super::record::{SessionRecord, SessionStore};
use crate::error::{DatabaseError, Result};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<SessionRecord>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted(mut records: Vec<SessionRecord>) -> Vec<SessionRecord> {
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        records
    }
}

impl SessionStore for MemoryStore {
    fn insert(&mut self, record: &SessionRecord) -> Result<i64> {
        record.validate()?;
        self.next_id += 1;
        let mut stored = record.clone();
        stored.id = self.next_id;
        self.records.push(stored);
        Ok(self.next_id)
    }

    fn update(&mut self, record: &SessionRecord) -> Result<()> {
        record.validate()?;
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(DatabaseError::NotFound(record.id))?;
        slot.check_update(record)?;
        slot.phase_seconds = record.phase_seconds.clone();
        slot.ended_at = record.ended_at;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<SessionRecord>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<SessionRecord>> {
        let hits = self
            .records
            .iter()
            .filter(|r| r.started_at >= from && r.started_at < to)
            .cloned()
            .collect();
        Ok(Self::sorted(hits))
    }

    fn recent(&self, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        let mut all = Self::sorted(self.records.clone());
        if let Some(limit) = limit {
            all.truncate(limit);
        }
        Ok(all)
    }

    fn delete(&mut self, id: i64) -> Result<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        Ok(self.records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use chrono::TimeZone;

    #[test]
    fn assigns_ids_and_orders_newest_first() {
        let mut store = MemoryStore::new();
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut a = SessionRecord::begin(late, 2);
        a.record_phase(1.0, late).unwrap();
        a.record_phase(2.0, late).unwrap();
        let mut b = a.clone();
        b.started_at = early;

        let id_a = store.insert(&a).unwrap();
        let id_b = store.insert(&b).unwrap();
        assert_ne!(id_a, id_b);

        let ids: Vec<_> = store.recent(None).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id_a, id_b]);
        assert!(store.delete(id_a).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_appends_but_never_rewrites() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let mut store = MemoryStore::new();
        let mut record = SessionRecord::begin(t, 2);
        record.id = store.insert(&record).unwrap();
        record.record_phase(12.37, t).unwrap();
        store.update(&record).unwrap();
        record.record_phase(8.02, t).unwrap();
        store.update(&record).unwrap();

        let mut rewrite = record.clone();
        rewrite.phase_seconds = vec![99.0, 1.0];
        assert!(matches!(
            store.update(&rewrite),
            Err(CoreError::Validation(ValidationError::AlreadyEnded(_)))
        ));
        assert_eq!(store.get(record.id).unwrap().unwrap().phase_seconds, vec![12.37, 8.02]);
    }
}
