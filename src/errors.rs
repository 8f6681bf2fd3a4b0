use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("input too short: {chars} characters (minimum {min})")]
    InputTooShort { chars: usize, min: usize },
    #[error("no sentences found in input")]
    NoSentencesFound,
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend timed out after {0}s")]
    Timeout(u64),
    #[error("http error: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("could not read the file: {0}")]
    MalformedUpload(String),
    #[error("could not read url: {0}")]
    UnreadableUrl(String),
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}
