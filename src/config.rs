use crate::rectangle::Placement;
use crate::request::DEFAULT_TTL_DAYS;
use crate::staging::Staging;
use crate::Error;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Uploads larger than this are refused, 16 MiB.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SigningConfig {
    /// Where the signature goes on page 1.
    pub placement: Placement,
    /// Days a request stays signable after creation.
    pub ttl_days: i64,
    pub max_document_bytes: usize,
    pub staging: Staging,
}

impl Default for SigningConfig {
    fn default() -> Self {
        SigningConfig {
            placement: Placement::ORIGINAL,
            ttl_days: DEFAULT_TTL_DAYS,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            staging: Staging::InMemory,
        }
    }
}

impl SigningConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: SigningConfig = serde_json::from_str(json)
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.placement.validate()?;
        // Keep the ttl well inside what `chrono::Duration` can hold.
        if self.ttl_days <= 0 || self.ttl_days > 365 * 100 {
            return Err(Error::InvalidConfig(format!(
                "`ttlDays` must be between 1 and 36500, got {}.",
                self.ttl_days
            )));
        }
        if self.max_document_bytes == 0 {
            return Err(Error::InvalidConfig(
                "`maxDocumentBytes` must be positive.".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::days(self.ttl_days)
    }
}
