//! In-memory record store for tests and single-process embedding.
//!
//! Implements the same optimistic-versioning contract as the durable
//! adapters: saves are conditional on the expected version, and a
//! mismatch surfaces as `Conflict`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::RwLock;

use crate::domain::emd::{Emd, EmdStatus};
use crate::domain::foundation::{DomainError, EmdId, TenderId, Timestamp};
use crate::domain::tender::TenderSnapshot;
use crate::ports::{EmdStore, RecordStore, TenderReader, Version, Versioned};

/// In-memory versioned store for one aggregate type.
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned. Acceptable for test
/// and embedded use; durable deployments use the PostgreSQL adapter.
pub struct InMemoryStore<ID, T> {
    entity: &'static str,
    records: RwLock<HashMap<ID, (T, Version)>>,
}

impl<ID, T> InMemoryStore<ID, T>
where
    ID: Eq + Hash + Clone,
    T: Clone,
{
    /// Creates an empty store; `entity` names the aggregate in errors.
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().expect("InMemoryStore: lock poisoned").len()
    }

    /// True when the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_records<R>(&self, f: impl FnOnce(&HashMap<ID, (T, Version)>) -> R) -> R {
        f(&self.records.read().expect("InMemoryStore: lock poisoned"))
    }
}

#[async_trait]
impl<ID, T> RecordStore<T, ID> for InMemoryStore<ID, T>
where
    ID: Eq + Hash + Clone + Debug + Display + Send + Sync,
    T: Clone + Send + Sync,
{
    async fn load(&self, id: &ID) -> Result<Option<Versioned<T>>, DomainError> {
        let records = self.records.read().expect("InMemoryStore: lock poisoned");
        Ok(records.get(id).map(|(record, version)| Versioned {
            record: record.clone(),
            version: *version,
        }))
    }

    async fn insert(&self, id: &ID, record: &T) -> Result<Version, DomainError> {
        let mut records = self.records.write().expect("InMemoryStore: lock poisoned");
        if records.contains_key(id) {
            return Err(DomainError::conflict(self.entity, id)
                .with_detail("reason", "record already exists"));
        }
        let version = Version::initial();
        records.insert(id.clone(), (record.clone(), version));
        Ok(version)
    }

    async fn save(&self, id: &ID, record: &T, expected: Version) -> Result<Version, DomainError> {
        let mut records = self.records.write().expect("InMemoryStore: lock poisoned");
        match records.get_mut(id) {
            None => Err(DomainError::not_found(self.entity, id)),
            Some((_, version)) if *version != expected => {
                Err(DomainError::conflict(self.entity, id)
                    .with_detail("expected_version", expected.to_string())
                    .with_detail("stored_version", version.to_string()))
            }
            Some(slot) => {
                let next = expected.next();
                *slot = (record.clone(), next);
                Ok(next)
            }
        }
    }
}

/// In-memory EMD store with the due-date scan for the expiration sweep.
pub struct InMemoryEmdStore {
    inner: InMemoryStore<EmdId, Emd>,
}

impl InMemoryEmdStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new("Emd"),
        }
    }
}

impl Default for InMemoryEmdStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore<Emd, EmdId> for InMemoryEmdStore {
    async fn load(&self, id: &EmdId) -> Result<Option<Versioned<Emd>>, DomainError> {
        self.inner.load(id).await
    }

    async fn insert(&self, id: &EmdId, record: &Emd) -> Result<Version, DomainError> {
        self.inner.insert(id, record).await
    }

    async fn save(&self, id: &EmdId, record: &Emd, expected: Version) -> Result<Version, DomainError> {
        self.inner.save(id, record, expected).await
    }
}

#[async_trait]
impl EmdStore for InMemoryEmdStore {
    async fn list_active_due(&self, before: Timestamp) -> Result<Vec<EmdId>, DomainError> {
        Ok(self.inner.with_records(|records| {
            records
                .values()
                .filter(|(emd, _)| emd.status() == EmdStatus::Active && emd.validity().is_before(&before))
                .map(|(emd, _)| emd.id())
                .collect()
        }))
    }
}

/// In-memory tender directory backing the `TenderReader` port.
pub struct InMemoryTenderDirectory {
    tenders: RwLock<HashMap<TenderId, TenderSnapshot>>,
}

impl InMemoryTenderDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            tenders: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces a tender snapshot.
    pub fn put(&self, snapshot: TenderSnapshot) {
        self.tenders
            .write()
            .expect("InMemoryTenderDirectory: lock poisoned")
            .insert(snapshot.id, snapshot);
    }

    /// Opens or closes a tender for submissions.
    pub fn set_open(&self, id: &TenderId, open: bool) {
        if let Some(t) = self
            .tenders
            .write()
            .expect("InMemoryTenderDirectory: lock poisoned")
            .get_mut(id)
        {
            t.open = open;
        }
    }
}

impl Default for InMemoryTenderDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenderReader for InMemoryTenderDirectory {
    async fn snapshot(&self, id: &TenderId) -> Result<Option<TenderSnapshot>, DomainError> {
        let tenders = self
            .tenders
            .read()
            .expect("InMemoryTenderDirectory: lock poisoned");
        Ok(tenders.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, ErrorCode, Money, OrgId};

    fn inr(amount: i64) -> Money {
        Money::new(amount, Currency::INR).unwrap()
    }

    #[tokio::test]
    async fn insert_then_load_returns_initial_version() {
        let store: InMemoryStore<u32, String> = InMemoryStore::new("Test");
        store.insert(&1, &"hello".to_string()).await.unwrap();

        let loaded = store.load(&1).await.unwrap().unwrap();
        assert_eq!(loaded.record, "hello");
        assert_eq!(loaded.version, Version::initial());
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store: InMemoryStore<u32, String> = InMemoryStore::new("Test");
        assert!(store.load(&404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn double_insert_conflicts() {
        let store: InMemoryStore<u32, String> = InMemoryStore::new("Test");
        store.insert(&1, &"a".to_string()).await.unwrap();
        let err = store.insert(&1, &"b".to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn save_bumps_version_when_expected_matches() {
        let store: InMemoryStore<u32, String> = InMemoryStore::new("Test");
        let v1 = store.insert(&1, &"a".to_string()).await.unwrap();
        let v2 = store.save(&1, &"b".to_string(), v1).await.unwrap();
        assert_eq!(v2, v1.next());
        assert_eq!(store.load(&1).await.unwrap().unwrap().record, "b");
    }

    #[tokio::test]
    async fn stale_save_conflicts_and_leaves_record_untouched() {
        let store: InMemoryStore<u32, String> = InMemoryStore::new("Test");
        let v1 = store.insert(&1, &"a".to_string()).await.unwrap();
        store.save(&1, &"b".to_string(), v1).await.unwrap();

        // A second writer still holding v1 loses the race
        let err = store.save(&1, &"c".to_string(), v1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.is_retryable());
        assert_eq!(store.load(&1).await.unwrap().unwrap().record, "b");
    }

    #[tokio::test]
    async fn save_missing_returns_not_found() {
        let store: InMemoryStore<u32, String> = InMemoryStore::new("Test");
        let err = store
            .save(&404, &"x".to_string(), Version::initial())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn emd_store_lists_only_active_due_deposits() {
        let store = InMemoryEmdStore::new();
        let now = Timestamp::now();

        let due = Emd::new(TenderId::new(), inr(1_000), now.minus_days(1));
        let fresh = Emd::new(TenderId::new(), inr(1_000), now.add_days(30));
        let mut refunded = Emd::new(TenderId::new(), inr(1_000), now.minus_days(1));
        let officer = crate::domain::foundation::Actor::new(
            crate::domain::foundation::ActorId::new("officer-1").unwrap(),
            crate::domain::foundation::ActorRole::Officer,
        );
        refunded.refund(&officer, "returned").unwrap();

        store.insert(&due.id(), &due).await.unwrap();
        store.insert(&fresh.id(), &fresh).await.unwrap();
        store.insert(&refunded.id(), &refunded).await.unwrap();

        let listed = store.list_active_due(now).await.unwrap();
        assert_eq!(listed, vec![due.id()]);
    }

    #[tokio::test]
    async fn tender_directory_round_trips_snapshots() {
        let directory = InMemoryTenderDirectory::new();
        let id = TenderId::new();
        directory.put(TenderSnapshot {
            id,
            org_id: OrgId::new(),
            open: true,
            emd_policy: None,
        });

        let snapshot = directory.snapshot(&id).await.unwrap().unwrap();
        assert!(snapshot.is_open());

        directory.set_open(&id, false);
        let snapshot = directory.snapshot(&id).await.unwrap().unwrap();
        assert!(!snapshot.is_open());

        assert!(directory.snapshot(&TenderId::new()).await.unwrap().is_none());
    }
}
