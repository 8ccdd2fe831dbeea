use crate::record::BadgeIdentity;

/// Notices the core reports while it works. None of these are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    PageScraped {
        page: u32,
        page_count: u32,
        records: usize,
    },
    RecordAdded(BadgeIdentity),
    /// Scraped a record the store already held before this update began.
    KnownRecord(BadgeIdentity),
    /// Scraped a record added earlier in this same update, i.e. the pages shifted.
    PageOverlap(BadgeIdentity),
    StoppedOnExisting {
        page: u32,
    },
    ReachedEnd {
        page: u32,
        page_count: u32,
    },
    BucketRange(BucketRangeNotice),
}

/// An event fell outside the aggregation window and was left out of the counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRangeNotice {
    pub timestamp: i64,
    pub index: i64,
    pub bucket_count: usize,
}

/// Receives [`Diagnostic`]s. Frontends implement this to surface them.
pub trait Diagnostics {
    fn notice(&mut self, _event: Diagnostic) {}
}

/// Drops everything.
pub struct NullDiagnostics;
impl Diagnostics for NullDiagnostics {}

/// Keeps every notice in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Diagnostic>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scraped records that were already in the store, for either reason.
    pub fn duplicates(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Diagnostic::KnownRecord(_) | Diagnostic::PageOverlap(_)))
            .count()
    }

    pub fn bucket_notices(&self) -> Vec<BucketRangeNotice> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Diagnostic::BucketRange(notice) => Some(*notice),
                _ => None,
            })
            .collect()
    }
}

impl Diagnostics for Recorder {
    fn notice(&mut self, event: Diagnostic) {
        self.events.push(event);
    }
}

/// Forwards notices to `tracing`.
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn notice(&mut self, event: Diagnostic) {
        match event {
            Diagnostic::PageScraped {
                page,
                page_count,
                records,
            } => tracing::debug!(page, page_count, records, "Scraped page {page}/{page_count}"),
            Diagnostic::RecordAdded(id) => tracing::info!(?id, "Scraped badge"),
            Diagnostic::KnownRecord(id) => tracing::info!(?id, "Scraped already-known badge"),
            Diagnostic::PageOverlap(id) => {
                tracing::debug!(?id, "Badge seen twice in one update, pages shifted")
            }
            Diagnostic::StoppedOnExisting { page } => {
                tracing::info!(page, "Caught up with existing badges. Update complete.")
            }
            Diagnostic::ReachedEnd { page, page_count } => {
                tracing::info!(page, page_count, "Reached end of badge list. Update complete.")
            }
            Diagnostic::BucketRange(notice) => tracing::warn!(
                timestamp = notice.timestamp,
                index = notice.index,
                bucket_count = notice.bucket_count,
                "Ignoring award outside the bucket range"
            ),
        }
    }
}
