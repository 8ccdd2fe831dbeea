use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Fetch Error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Couldn't parse page {page}: {source}")]
    Parse {
        page: u32,
        #[source]
        source: ParseError,
    },

    #[error("Snapshot has an unrecognized shape: {0}")]
    Schema(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bucket width must be positive, got {0}")]
    InvalidBucketWidth(i64),

    #[error("Too many {width}s buckets between {start} and {end}")]
    TooManyBuckets { start: i64, end: i64, width: i64 },
}

/// A single page request that didn't produce a body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Couldn't build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The page markup no longer matches the anchors the scraper relies on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("The listing marker is missing. Marker: {0}")]
    MissingListing(&'static str),

    #[error("Required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("Field `{field}` is malformed: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("Page count {0:?} is not a number")]
    MalformedPageCount(String),

    #[error("Row {index}: {source}")]
    Row {
        index: usize,
        #[source]
        source: Box<ParseError>,
    },
}
