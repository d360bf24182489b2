use crate::Error;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Where uploaded PDFs are read from.
pub trait DocumentSource: Send + Sync {
    fn load(&self, document_ref: &str) -> Result<Vec<u8>, Error>;
}

impl<D: DocumentSource + ?Sized> DocumentSource for Arc<D> {
    fn load(&self, document_ref: &str) -> Result<Vec<u8>, Error> {
        (**self).load(document_ref)
    }
}

/// Uploaded files stored under one directory, referenced by relative path.
#[derive(Debug, Clone)]
pub struct UploadDirectory {
    root: PathBuf,
}

impl UploadDirectory {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        UploadDirectory { root: root.into() }
    }

    /// Only plain relative paths are accepted, `..` and absolute paths are not.
    fn resolve(&self, document_ref: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(document_ref);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if document_ref.is_empty() || !plain {
            return Err(Error::InvalidSourceDocument(format!(
                "Document reference `{}` is not a plain relative path.",
                document_ref
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentSource for UploadDirectory {
    fn load(&self, document_ref: &str) -> Result<Vec<u8>, Error> {
        let path = self.resolve(document_ref)?;
        std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::InvalidSourceDocument(format!(
                "Document `{}` does not exist.",
                document_ref
            )),
            _ => Error::Io(err),
        })
    }
}

/// Documents held in memory, keyed by reference.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document_ref: impl Into<String>, data: Vec<u8>) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document_ref.into(), data);
    }
}

impl DocumentSource for MemoryDocuments {
    fn load(&self, document_ref: &str) -> Result<Vec<u8>, Error> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_ref)
            .cloned()
            .ok_or_else(|| {
                Error::InvalidSourceDocument(format!("Document `{}` does not exist.", document_ref))
            })
    }
}
