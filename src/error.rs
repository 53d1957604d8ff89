use thiserror::Error;

/// Fatal ingestion failures. Anything row-local is reported as a skipped
/// row inside the parse outcome instead of aborting the run.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Upload could not be decoded as {format}: {reason}")]
    Undecodable { format: String, reason: String },

    #[error("Header row missing: expected at least one of FirstName, Phone, Notes, found {found:?}")]
    MissingHeader { found: Vec<String> },

    #[error("Unsupported upload format: {0}")]
    UnsupportedFormat(String),
}

/// Why a whole distribution run failed. Per-agent commit failures never
/// appear here; they accumulate inside the run's result.
#[derive(Error, Debug)]
pub enum DistributionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No agents available to receive leads")]
    NoAgents,

    #[error("Distribution run cancelled before committing")]
    Cancelled,

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, DistributionError>;
