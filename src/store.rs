use crate::request::{RequestStatus, SigningRequest};
use crate::Error;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of trying to store a signed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The request was not pending at `signed_at`, nothing was written.
    Rejected(RequestStatus),
}

/// Persistence port for signing requests.
///
/// `compare_and_set_signed` must be one atomic step: "set signed where the
/// request is pending and not expired at `signed_at`". Implementations backed
/// by a database should express it as a single conditional update.
pub trait SigningRequestStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<SigningRequest>, Error>;

    /// Store a new request. An existing id is refused with
    /// [`Error::DuplicateRequest`], so a stored request only changes through
    /// `compare_and_set_signed` and `archive`.
    fn insert(&self, request: SigningRequest) -> Result<(), Error>;

    fn compare_and_set_signed(
        &self,
        id: &str,
        signed_document: Vec<u8>,
        signed_at: DateTime<Utc>,
    ) -> Result<CommitOutcome, Error>;

    /// Clear the signed document and mark the request archived.
    fn archive(&self, id: &str, archived_at: DateTime<Utc>) -> Result<(), Error>;
}

impl<S: SigningRequestStore + ?Sized> SigningRequestStore for Arc<S> {
    fn get(&self, id: &str) -> Result<Option<SigningRequest>, Error> {
        (**self).get(id)
    }

    fn insert(&self, request: SigningRequest) -> Result<(), Error> {
        (**self).insert(request)
    }

    fn compare_and_set_signed(
        &self,
        id: &str,
        signed_document: Vec<u8>,
        signed_at: DateTime<Utc>,
    ) -> Result<CommitOutcome, Error> {
        (**self).compare_and_set_signed(id, signed_document, signed_at)
    }

    fn archive(&self, id: &str, archived_at: DateTime<Utc>) -> Result<(), Error> {
        (**self).archive(id, archived_at)
    }
}

/// Keeps requests in a map behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    requests: Mutex<HashMap<String, SigningRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SigningRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SigningRequestStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<SigningRequest>, Error> {
        Ok(self.lock().get(id).cloned())
    }

    fn insert(&self, request: SigningRequest) -> Result<(), Error> {
        match self.lock().entry(request.id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateRequest(request.id)),
            Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(())
            }
        }
    }

    fn compare_and_set_signed(
        &self,
        id: &str,
        signed_document: Vec<u8>,
        signed_at: DateTime<Utc>,
    ) -> Result<CommitOutcome, Error> {
        let mut requests = self.lock();
        let request = requests
            .get_mut(id)
            .ok_or_else(|| Error::RequestNotFound(id.to_owned()))?;
        Ok(match request.mark_signed(signed_document, signed_at) {
            Ok(()) => CommitOutcome::Committed,
            Err(status) => CommitOutcome::Rejected(status),
        })
    }

    fn archive(&self, id: &str, archived_at: DateTime<Utc>) -> Result<(), Error> {
        let mut requests = self.lock();
        let request = requests
            .get_mut(id)
            .ok_or_else(|| Error::RequestNotFound(id.to_owned()))?;
        request.archive(archived_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap()
    }

    fn stored(store: &MemoryStore) -> String {
        let request = SigningRequest::new("doc", "doc.pdf", now(), Duration::days(7));
        let id = request.id.clone();
        store.insert(request).unwrap();
        id
    }

    #[test]
    fn compare_and_set_commits_once() {
        let store = MemoryStore::new();
        let id = stored(&store);

        let first = store
            .compare_and_set_signed(&id, b"one".to_vec(), now())
            .unwrap();
        let second = store
            .compare_and_set_signed(&id, b"two".to_vec(), now())
            .unwrap();
        assert_eq!(first, CommitOutcome::Committed);
        assert_eq!(second, CommitOutcome::Rejected(RequestStatus::Signed));

        let request = store.get(&id).unwrap().unwrap();
        assert_eq!(request.signed_document.as_deref(), Some(&b"one"[..]));
    }

    #[test]
    fn compare_and_set_rejects_expired() {
        let store = MemoryStore::new();
        let id = stored(&store);
        let outcome = store
            .compare_and_set_signed(&id, b"late".to_vec(), now() + Duration::days(8))
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Rejected(RequestStatus::Expired));
        assert!(store.get(&id).unwrap().unwrap().signed_document.is_none());
    }

    #[test]
    fn unknown_ids() {
        let store = MemoryStore::new();
        assert!(store.get("nope").unwrap().is_none());
        assert!(matches!(
            store.compare_and_set_signed("nope", Vec::new(), now()),
            Err(Error::RequestNotFound(_))
        ));
        assert!(matches!(
            store.archive("nope", now()),
            Err(Error::RequestNotFound(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn insert_does_not_replace() {
        let store = MemoryStore::new();
        let id = stored(&store);
        store
            .compare_and_set_signed(&id, b"pdf".to_vec(), now())
            .unwrap();

        let mut fresh = store.get(&id).unwrap().unwrap();
        fresh.signed_document = None;
        fresh.signed_at = None;
        assert!(matches!(
            store.insert(fresh),
            Err(Error::DuplicateRequest(_))
        ));
        let request = store.get(&id).unwrap().unwrap();
        assert_eq!(request.signed_document.as_deref(), Some(&b"pdf"[..]));
    }

    #[test]
    fn archive_resets_signed_document() {
        let store = MemoryStore::new();
        let id = stored(&store);
        store
            .compare_and_set_signed(&id, b"pdf".to_vec(), now())
            .unwrap();
        store.archive(&id, now()).unwrap();

        let request = store.get(&id).unwrap().unwrap();
        assert_eq!(request.status(now()), RequestStatus::Archived);
        assert!(request.signed_document.is_none());
        assert_eq!(store.len(), 1);
    }
}
