use std::collections::HashSet;
use std::time::Duration;

use crate::diag::{Diagnostic, Diagnostics};
use crate::parse::parse_page;
use crate::record::BadgeIdentity;
use crate::request::PageSource;
use crate::store::BadgeStore;
use crate::{Error, Result, REQUEST_INTERVAL_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Waited before every request, however long the previous one took.
    pub request_interval: Duration,
    /// Stop at the first scraped record the store held before the crawl began.
    pub stop_on_existing: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            request_interval: Duration::from_millis(REQUEST_INTERVAL_MS),
            stop_on_existing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlEnd {
    /// The fetched page number went past the page count that page reported.
    ReachedEnd,
    /// `stop_on_existing` hit a record from an earlier run.
    CaughtUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub end: CrawlEnd,
    pub pages: u32,
    pub added: usize,
    /// Records the store already held before the crawl began.
    pub known: usize,
    /// Records added earlier in this crawl and served again by a later page.
    pub overlaps: usize,
}

/// Walks the listing from page 1, merging each page into `store` as soon as it
/// is parsed.
///
/// A fetch or parse failure aborts the crawl, but every record merged from the
/// earlier pages stays in the store. The page count is re-read from every page
/// since the remote list keeps changing while we walk it.
pub async fn crawl<S: PageSource>(
    store: &mut BadgeStore,
    source: &S,
    opts: &CrawlOptions,
    diag: &mut dyn Diagnostics,
) -> Result<CrawlSummary> {
    let mut added_this_crawl: HashSet<BadgeIdentity> = HashSet::new();
    let mut summary = CrawlSummary {
        end: CrawlEnd::ReachedEnd,
        pages: 0,
        added: 0,
        known: 0,
        overlaps: 0,
    };

    let mut page_num: u32 = 1;
    loop {
        // Be polite.
        tokio::time::sleep(opts.request_interval).await;

        let html = source.fetch_page(page_num).await?;
        let page = parse_page(store.badge_id(), &html).map_err(|source| Error::Parse {
            page: page_num,
            source,
        })?;
        summary.pages = page_num;
        diag.notice(Diagnostic::PageScraped {
            page: page_num,
            page_count: page.page_count,
            records: page.records.len(),
        });

        for record in page.records {
            let id = record.identity().clone();
            if store.insert(record) {
                summary.added += 1;
                added_this_crawl.insert(id.clone());
                diag.notice(Diagnostic::RecordAdded(id));
            } else if added_this_crawl.contains(&id) {
                summary.overlaps += 1;
                diag.notice(Diagnostic::PageOverlap(id));
            } else {
                summary.known += 1;
                diag.notice(Diagnostic::KnownRecord(id));
                if opts.stop_on_existing {
                    diag.notice(Diagnostic::StoppedOnExisting { page: page_num });
                    summary.end = CrawlEnd::CaughtUp;
                    return Ok(summary);
                }
            }
        }

        if page_num > page.page_count {
            diag.notice(Diagnostic::ReachedEnd {
                page: page_num,
                page_count: page.page_count,
            });
            return Ok(summary);
        }
        page_num += 1;
    }
}
