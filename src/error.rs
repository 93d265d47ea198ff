use thiserror::Error;

use crate::shared::Namespace;

/// Errors raised while fetching datasets or writing them to the graph store.
#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("fetch error: {url} returned {status}")]
    Fetch { url: String, status: u16 },

    #[error("fetch error: {url} returned no data")]
    EmptyResponse { url: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store write error: {message} (operation: {operation})")]
    StoreWrite { message: String, operation: String },

    #[error("store query error: {message}")]
    StoreQuery { message: String },

    #[error("missing reference: no node for {namespace} {value}")]
    MissingReference { namespace: Namespace, value: String },

    #[error("invalid identifier: {message} ({namespace} {value:?})")]
    InvalidIdentifier {
        namespace: Namespace,
        value: String,
        message: String,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl CrawlerError {
    pub fn store_write(operation: &str, message: impl Into<String>) -> Self {
        CrawlerError::StoreWrite {
            message: message.into(),
            operation: operation.to_string(),
        }
    }

    /// Fatal errors abort the whole run; everything else is scoped to a record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrawlerError::Fetch { .. }
                | CrawlerError::EmptyResponse { .. }
                | CrawlerError::Http(_)
                | CrawlerError::Config { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CrawlerError>;

/// A record that could not be written, with the reason.
#[derive(Error, Debug)]
#[error("failed to upsert {record}: {source}")]
pub struct UpsertError {
    pub record: String,
    #[source]
    pub source: CrawlerError,
}

impl UpsertError {
    pub fn new(record: impl Into<String>, source: CrawlerError) -> Self {
        UpsertError {
            record: record.into(),
            source,
        }
    }
}
