//! The signing workflow: create a request, sign it once, download or archive
//! the result.
//!
//! The service owns no HTTP or database code. It is handed a
//! [`SigningRequestStore`], a [`DocumentSource`] and a [`Clock`], and is
//! `Send + Sync` so a web layer can share it and run `sign` on a worker thread.

use crate::clock::{Clock, SystemClock};
use crate::compositor::Compositor;
use crate::config::SigningConfig;
use crate::documents::DocumentSource;
use crate::request::{RequestStatus, SigningRequest};
use crate::signature_asset::SignatureCapture;
use crate::store::{CommitOutcome, SigningRequestStore};
use crate::Error;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Answer to a signing attempt. Only `Signed` means something was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
    Signed,
    AlreadySigned,
    Expired,
    Archived,
}

impl From<RequestStatus> for SignOutcome {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Signed => SignOutcome::AlreadySigned,
            RequestStatus::Expired => SignOutcome::Expired,
            RequestStatus::Archived => SignOutcome::Archived,
            // A pending request that refused the commit can only have been
            // signed by someone else in between.
            RequestStatus::Pending => SignOutcome::AlreadySigned,
        }
    }
}

/// A signed PDF ready to be served as an attachment.
#[derive(Debug, Clone)]
pub struct SignedDownload {
    pub file_name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl SignedDownload {
    /// Hex SHA-256 of the document, usable as an `ETag`.
    pub fn etag(&self) -> String {
        format!("{:x}", Sha256::digest(&self.data))
    }
}

pub struct SigningService<S, D, C = SystemClock> {
    store: S,
    documents: D,
    clock: C,
    config: SigningConfig,
    compositor: Compositor,
    /// One lock per request id while it is being signed.
    signing_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S, D> SigningService<S, D, SystemClock>
where
    S: SigningRequestStore,
    D: DocumentSource,
{
    pub fn new(store: S, documents: D, config: SigningConfig) -> Result<Self, Error> {
        Self::with_clock(store, documents, config, SystemClock)
    }
}

impl<S, D, C> SigningService<S, D, C>
where
    S: SigningRequestStore,
    D: DocumentSource,
    C: Clock,
{
    pub fn with_clock(
        store: S,
        documents: D,
        config: SigningConfig,
        clock: C,
    ) -> Result<Self, Error> {
        config.validate()?;
        let compositor = Compositor::new(config.placement, config.staging.clone());
        Ok(SigningService {
            store,
            documents,
            clock,
            config,
            compositor,
            signing_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Register an uploaded document. The new request is pending.
    pub fn create(
        &self,
        source_document_ref: &str,
        file_name: &str,
    ) -> Result<SigningRequest, Error> {
        let request = SigningRequest::new(
            source_document_ref,
            file_name,
            self.clock.now(),
            self.config.ttl(),
        );
        self.store.insert(request.clone())?;
        log::info!(
            "Created signing request `{}` for `{}`, expires at {}.",
            request.id,
            file_name,
            request.expires_at
        );
        Ok(request)
    }

    pub fn get(&self, id: &str) -> Result<SigningRequest, Error> {
        self.store
            .get(id)?
            .ok_or_else(|| Error::RequestNotFound(id.to_owned()))
    }

    pub fn status(&self, id: &str) -> Result<RequestStatus, Error> {
        Ok(self.get(id)?.status(self.clock.now()))
    }

    /// Apply a signature captured as an image data URL.
    ///
    /// The signed document is fully built before anything is stored. Any
    /// error leaves the request untouched.
    pub fn sign(&self, id: &str, signature_data_url: &str) -> Result<SignOutcome, Error> {
        let lock = self.signing_lock(id);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.sign_locked(id, signature_data_url)
        };
        self.release_signing_lock(id, lock);
        outcome
    }

    fn sign_locked(&self, id: &str, signature_data_url: &str) -> Result<SignOutcome, Error> {
        let request = self.get(id)?;
        let status = request.status(self.clock.now());
        if status != RequestStatus::Pending {
            log::warn!("Signing request `{}` refused, request is {}.", id, status);
            return Ok(status.into());
        }

        let asset = SignatureCapture::from_data_url(signature_data_url)
            .and_then(|capture| capture.extract())
            .map_err(|err| {
                log::warn!("Signature for request `{}` rejected: {}", id, err);
                err
            })?;

        let source_pdf = self.documents.load(&request.source_document_ref)?;
        if source_pdf.len() > self.config.max_document_bytes {
            return Err(Error::InvalidSourceDocument(format!(
                "Document is {} bytes, the limit is {}.",
                source_pdf.len(),
                self.config.max_document_bytes
            )));
        }
        let signed_pdf = self.compositor.composite(&source_pdf, &asset)?;

        // Expiry is checked again at commit time.
        let signed_at = self.clock.now();
        match self
            .store
            .compare_and_set_signed(id, signed_pdf, signed_at)?
        {
            CommitOutcome::Committed => {
                log::info!("Signing request `{}` signed at {}.", id, signed_at);
                Ok(SignOutcome::Signed)
            }
            CommitOutcome::Rejected(status) => {
                log::warn!(
                    "Signed document for `{}` discarded, request became {}.",
                    id,
                    status
                );
                Ok(status.into())
            }
        }
    }

    /// The signed PDF, named `signed_<original name>`.
    pub fn download(&self, id: &str) -> Result<SignedDownload, Error> {
        let request = self.get(id)?;
        let file_name = request.signed_file_name();
        let data = request
            .signed_document
            .ok_or_else(|| Error::NotSigned(id.to_owned()))?;
        Ok(SignedDownload {
            file_name,
            content_type: "application/pdf",
            data,
        })
    }

    /// Administrative delete of the signed document. The request is archived
    /// and can not be signed again through the signing link.
    pub fn delete(&self, id: &str) -> Result<(), Error> {
        let lock = self.signing_lock(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.archive(id, self.clock.now())
        };
        self.release_signing_lock(id, lock);
        result?;
        log::info!("Signing request `{}` archived.", id);
        Ok(())
    }

    fn signing_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .signing_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the lock when nobody else is waiting on it.
    fn release_signing_lock(&self, id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .signing_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one held here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
    }
}
