use crate::Error;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Where the signature image is kept while the signature page is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staging {
    /// Decode straight from the in-memory asset.
    InMemory,
    /// Write the asset to a temporary file in this directory first.
    /// The file is removed when compositing finishes, also on failure.
    Directory(PathBuf),
}

impl Default for Staging {
    fn default() -> Self {
        Staging::InMemory
    }
}

/// A signature image held for the duration of one composite.
/// Dropping it releases the backing storage.
pub(crate) enum StagedImage<'a> {
    Memory(&'a [u8]),
    File(NamedTempFile),
}

impl Staging {
    pub(crate) fn stage<'a>(&self, image_data: &'a [u8]) -> Result<StagedImage<'a>, Error> {
        match self {
            Staging::InMemory => Ok(StagedImage::Memory(image_data)),
            Staging::Directory(dir) => {
                let mut file = tempfile::Builder::new()
                    .prefix("signature-")
                    .suffix(".png")
                    .tempfile_in(dir)?;
                file.write_all(image_data)?;
                file.flush()?;
                log::trace!("Staged signature image at `{}`.", file.path().display());
                Ok(StagedImage::File(file))
            }
        }
    }
}

impl<'a> StagedImage<'a> {
    /// A fresh reader positioned at the start of the image.
    pub(crate) fn reader(&self) -> Result<Box<dyn Read + 'a>, Error> {
        Ok(match self {
            StagedImage::Memory(data) => Box::new(*data),
            StagedImage::File(file) => Box::new(file.reopen()?),
        })
    }
}

impl Drop for StagedImage<'_> {
    fn drop(&mut self) {
        if let StagedImage::File(file) = self {
            log::trace!("Releasing staged signature image `{}`.", file.path().display());
        }
    }
}
