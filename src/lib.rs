//! Signing requests for PDF documents.
//!
//! A [`SigningRequest`] is created for an uploaded PDF and shared as a link.
//! The person signing draws a signature, which arrives as an image data URL.
//! White is keyed out of the drawing ([`signature_asset`]) and the result is
//! stamped onto a fixed rectangle of page 1 ([`Compositor`]). The signed PDF
//! is stored on the request exactly once.
//!
//! ```ignore
//! let service = SigningService::new(MemoryStore::new(), UploadDirectory::new("uploads"), SigningConfig::default())?;
//! let request = service.create("contract.pdf", "contract.pdf")?;
//! match service.sign(&request.id, &data_url)? {
//!     SignOutcome::Signed => { /* service.download(&request.id)? */ }
//!     SignOutcome::AlreadySigned | SignOutcome::Expired | SignOutcome::Archived => {}
//! }
//! ```

mod clock;
mod compositor;
mod config;
mod documents;
mod error;
mod image_xobject;
mod lopdf_utils;
mod pdf_object;
mod rectangle;
mod request;
mod service;
pub mod signature_asset;
mod signature_layer;
mod staging;
mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use compositor::Compositor;
pub use config::{SigningConfig, DEFAULT_MAX_DOCUMENT_BYTES};
pub use documents::{DocumentSource, MemoryDocuments, UploadDirectory};
pub use error::Error;
pub use lopdf;
pub use rectangle::{Placement, Rectangle, LETTER_HEIGHT, LETTER_WIDTH};
pub use request::{RequestStatus, SigningRequest, DEFAULT_TTL_DAYS};
pub use service::{SignOutcome, SignedDownload, SigningService};
pub use signature_asset::{SignatureAsset, SignatureCapture};
pub use signature_layer::SignatureLayer;
pub use staging::Staging;
pub use store::{CommitOutcome, MemoryStore, SigningRequestStore};
