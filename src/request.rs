use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requests can be signed for this long after they are created.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Where a signing request is in its life.
/// Only `Pending` accepts a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestStatus {
    Pending,
    Signed,
    /// Derived from the clock, never stored.
    Expired,
    /// The signed document was deleted by an administrator.
    Archived,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Signed => "signed",
            RequestStatus::Expired => "expired",
            RequestStatus::Archived => "archived",
        })
    }
}

/// One document on its way from upload to a signed copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    /// Random 128 bit token. Also the capability in the signing link.
    pub id: String,
    /// Key of the uploaded PDF in the document source.
    pub source_document_ref: String,
    /// Name of the uploaded file, used to name the download.
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub signed_document: Option<Vec<u8>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl SigningRequest {
    pub fn new(
        source_document_ref: impl Into<String>,
        file_name: impl Into<String>,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        SigningRequest {
            id: Self::generate_id(),
            source_document_ref: source_document_ref.into(),
            file_name: file_name.into(),
            created_at,
            expires_at: created_at + ttl,
            signed_document: None,
            signed_at: None,
            archived_at: None,
        }
    }

    /// 128 random bits as 32 lowercase hex characters.
    pub fn generate_id() -> String {
        format!("{:032x}", rand::random::<u128>())
    }

    /// Expiry is absolute: activity never extends it.
    pub fn is_expired(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> bool {
        now > expires_at
    }

    pub fn status(&self, now: DateTime<Utc>) -> RequestStatus {
        if self.signed_document.is_some() {
            RequestStatus::Signed
        } else if self.archived_at.is_some() {
            RequestStatus::Archived
        } else if Self::is_expired(now, self.expires_at) {
            RequestStatus::Expired
        } else {
            RequestStatus::Pending
        }
    }

    /// Pending to Signed. Returns the status that blocked the transition
    /// when the request is not pending, the request is then unchanged.
    pub(crate) fn mark_signed(
        &mut self,
        signed_document: Vec<u8>,
        signed_at: DateTime<Utc>,
    ) -> Result<(), RequestStatus> {
        match self.status(signed_at) {
            RequestStatus::Pending => {
                self.signed_document = Some(signed_document);
                self.signed_at = Some(signed_at);
                Ok(())
            }
            status => Err(status),
        }
    }

    /// Drop the signed document for good. The request does not become
    /// signable again.
    pub(crate) fn archive(&mut self, archived_at: DateTime<Utc>) {
        self.signed_document = None;
        self.signed_at = None;
        if self.archived_at.is_none() {
            self.archived_at = Some(archived_at);
        }
    }

    /// `signed_<file_name>`
    pub fn signed_file_name(&self) -> String {
        format!("signed_{}", self.file_name)
    }
}
