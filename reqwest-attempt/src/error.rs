use reqwest::{StatusCode, Url};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The request description could not be turned into a request
    #[error("Build error: {0}")]
    Build(anyhow::Error),
    /// Error from the underlying client (connection failure, timeout, middleware)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    /// The caller's context was cancelled
    #[error("context cancelled")]
    Cancelled,
    /// The caller's context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// The response status is not in the admitted set
    #[error("error constraint with status code: {}", .0.as_u16())]
    Status(StatusCode),
}

impl Error {
    pub fn build<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Build(err.into())
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Error::Transport(e) => e.url(),
            _ => None,
        }
    }

    /// Returns true if the request could not be built. These errors are never retried.
    pub fn is_build(&self) -> bool {
        matches!(self, Error::Build(_))
    }

    /// Returns true if the attempt failed before a response was received,
    /// including cancellation of the context while in flight.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Cancelled | Error::DeadlineExceeded
        )
    }

    /// Returns true if a response was received but its status was not admitted.
    pub fn is_status(&self) -> bool {
        matches!(self, Error::Status(_))
    }

    /// Returns true if the context was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// Returns true if the error is related to a timeout, either the
    /// per-attempt one or the context deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout(),
            Error::DeadlineExceeded => true,
            _ => false,
        }
    }

    /// Returns the rejected status code, if the error is a status rejection.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt may succeed where this one failed.
    pub fn is_retriable(&self) -> bool {
        !self.is_build()
    }
}
