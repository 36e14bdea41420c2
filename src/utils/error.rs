use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopycatError {
    #[error("{message}")]
    InvalidPattern { message: String },

    #[error("No fields in marc")]
    MissingFields,

    #[error("No subfields in marc")]
    MissingSubfields,

    #[error("{context} failed: {method} {url} returned {status} (expected {expected}): {body}")]
    UnexpectedStatus {
        context: &'static str,
        method: &'static str,
        url: String,
        status: u16,
        expected: u16,
        body: String,
    },

    #[error("{context} failed: {method} {url}: {source}")]
    Transport {
        context: &'static str,
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Missing \"{key}\" in response")]
    MissingResponseKey { key: &'static str },

    #[error("Did not get any instances after {retries} retries")]
    PollExhausted { retries: u32 },

    #[error("{operation} not allowed in job state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("{message}")]
    ValidationError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: {value}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Record retrieval failed: {0}")]
    RetrieveError(#[from] RetrieveError),
}

/// Failures of the external record source (Z39.50 target). Produced by
/// `RecordSource` implementations, consumed as-is by the import workflow.
#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("No record found")]
    NoRecordFound,

    #[error("Connection timeout to {url}")]
    ConnectionTimeout { url: String },

    #[error("Authentication rejected by target")]
    AuthRejected,

    #[error("Unsupported query: {query}")]
    UnsupportedQuery { query: String },

    #[error("Illegal options type for key {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, CopycatError>;
