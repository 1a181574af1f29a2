use std::io;

use thiserror::Error;
use warp::http::StatusCode;

use crate::datetime::DatetimeError;
use crate::rdf::RdfError;

/// Constraint documents advertised through `rel="constrainedBy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    ServerManagedTriples,
    MementoBodyRequired,
    ReservedPath,
}

impl Constraint {
    pub const ALL: [Constraint; 3] =
        [Constraint::ServerManagedTriples, Constraint::MementoBodyRequired, Constraint::ReservedPath];

    pub fn from_document(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.document() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Constraint::ServerManagedTriples => {
                "Triples in the repository, Memento and LDP vocabularies are managed by the server and may not be sent by clients."
            }
            Constraint::MementoBodyRequired => {
                "A memento created with an explicit Memento-Datetime must carry the body it is to hold."
            }
            Constraint::ReservedPath => "Path segments starting with fcr: are reserved by the repository.",
        }
    }

    /// File name of the document under the configured constraints URL.
    pub fn document(self) -> &'static str {
        match self {
            Constraint::ServerManagedTriples => "ServerManagedPropertyException.rttl",
            Constraint::MementoBodyRequired => "MementoBodyRequiredException.rttl",
            Constraint::ReservedPath => "ReservedPathException.rttl",
        }
    }
}

#[derive(Debug, Error)]
pub enum VersioningError {
    #[error(transparent)]
    InvalidDatetime(#[from] DatetimeError),

    #[error("A memento with an explicit Memento-Datetime requires a body")]
    EmptyBody,

    #[error("A memento already exists at {0}")]
    DuplicateDatetime(String),

    #[error("{message}")]
    ConstrainedBy { constraint: Constraint, message: String },

    #[error("Binary mementos with an explicit Memento-Datetime require a Content-Type")]
    MissingMediaType,

    #[error("Method not allowed")]
    MethodNotAllowed { allow: &'static str },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("No acceptable representation: {0}")]
    NotAcceptable(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Rdf(#[from] RdfError),

    #[error("Storage failure: {0}")]
    Storage(#[from] io::Error),

    #[error("Poisoned Lock")]
    Poisoned,
}

impl VersioningError {
    pub fn status(&self) -> StatusCode {
        match self {
            VersioningError::InvalidDatetime(_)
            | VersioningError::EmptyBody
            | VersioningError::ConstrainedBy { .. }
            | VersioningError::UnsupportedAlgorithm(_)
            | VersioningError::BadRequest(_) => StatusCode::BAD_REQUEST,
            VersioningError::Rdf(RdfError::UnsupportedMediaType(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            VersioningError::Rdf(RdfError::Serialize(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            VersioningError::Rdf(_) => StatusCode::BAD_REQUEST,
            VersioningError::DuplicateDatetime(_) | VersioningError::Conflict(_) => StatusCode::CONFLICT,
            VersioningError::MissingMediaType | VersioningError::UnsupportedMediaType(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            VersioningError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            VersioningError::NotFound(_) => StatusCode::NOT_FOUND,
            VersioningError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            VersioningError::Storage(_) | VersioningError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The constraint to advertise alongside the error, if any.
    pub fn constraint(&self) -> Option<Constraint> {
        match self {
            VersioningError::ConstrainedBy { constraint, .. } => Some(*constraint),
            VersioningError::EmptyBody => Some(Constraint::MementoBodyRequired),
            _ => None,
        }
    }

    pub fn server_managed(message: impl Into<String>) -> Self {
        VersioningError::ConstrainedBy { constraint: Constraint::ServerManagedTriples, message: message.into() }
    }
}

impl<T> From<std::sync::PoisonError<T>> for VersioningError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        VersioningError::Poisoned
    }
}

pub type Result<T, E = VersioningError> = std::result::Result<T, E>;
