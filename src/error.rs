use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The signature capture could not be turned into an image.
    InvalidSignatureData(String),
    /// The uploaded document could not be read as a PDF.
    InvalidSourceDocument(String),
    /// The uploaded document parsed but has no pages.
    EmptyDocument,
    RequestNotFound(String),
    /// A request with this id is already stored.
    DuplicateRequest(String),
    /// A download was requested for a request that holds no signed document.
    NotSigned(String),
    InvalidConfig(String),
    LoPdfError(lopdf::Error),
    Io(std::io::Error),
    TryFromIntError(std::num::TryFromIntError),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSignatureData(msg) => write!(f, "Invalid signature data: {}", msg),
            Error::InvalidSourceDocument(msg) => write!(f, "Invalid source document: {}", msg),
            Error::EmptyDocument => write!(f, "Source document has no pages"),
            Error::RequestNotFound(id) => write!(f, "Signing request `{}` not found", id),
            Error::DuplicateRequest(id) => write!(f, "Signing request `{}` already exists", id),
            Error::NotSigned(id) => write!(f, "Signing request `{}` is not signed", id),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::LoPdfError(err) => write!(f, "PDF error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::TryFromIntError(err) => write!(f, "Integer conversion error: {}", err),
            Error::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::LoPdfError(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::TryFromIntError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Self::LoPdfError(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Other(err.to_owned())
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(err: std::num::TryFromIntError) -> Self {
        Error::TryFromIntError(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

// A PNG that fails to decode or encode is always a signature asset problem.
impl From<png::DecodingError> for Error {
    fn from(err: png::DecodingError) -> Self {
        Error::InvalidSignatureData(err.to_string())
    }
}

impl From<png::EncodingError> for Error {
    fn from(err: png::EncodingError) -> Self {
        Error::InvalidSignatureData(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::InvalidSignatureData(err.to_string())
    }
}
