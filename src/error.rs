use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("child {index} out of range ({len} children)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("feed {index} does not exist ({len} feeds)")]
    InvalidFeedIndex { index: usize, len: usize },

    #[error("post {index} does not exist ({len} posts)")]
    InvalidPostIndex { index: usize, len: usize },
}

impl Error {
    /// True for failures that happened talking to the remote API.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Status { .. })
    }

    pub(crate) fn decode(url: &str, reason: impl ToString) -> Self {
        Error::Decode {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
