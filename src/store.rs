use std::collections::BTreeMap;
use std::path::Path;

use crate::diag::Diagnostics;
use crate::process::{crawl, CrawlOptions, CrawlSummary};
use crate::record::{BadgeIdentity, BadgeRecord};
use crate::request::PageSource;
use crate::snapshot::{self, Document, RecordDoc};
use crate::{Error, Result};

/// Every known award of one badge on one host, deduplicated by identity.
///
/// Records are only ever added. Iteration is in ascending timestamp order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeStore {
    host: String,
    badge_id: u64,
    records: BTreeMap<BadgeIdentity, BadgeRecord>,
}

impl BadgeStore {
    pub fn new(host: impl Into<String>, badge_id: u64) -> Self {
        Self {
            host: host.into(),
            badge_id,
            records: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn badge_id(&self) -> u64 {
        self.badge_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, identity: &BadgeIdentity) -> bool {
        self.records.contains_key(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BadgeRecord> {
        self.records.values()
    }

    /// Adds `record` unless an identity-equal one is already present. The
    /// present one is kept as is.
    pub fn insert(&mut self, record: BadgeRecord) -> bool {
        match self.records.entry(record.identity().clone()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Merges `records`, returning the ones that were actually new.
    pub fn merge<I>(&mut self, records: I) -> Vec<BadgeRecord>
    where
        I: IntoIterator<Item = BadgeRecord>,
    {
        records
            .into_iter()
            .filter_map(|record| {
                let copy = record.clone();
                self.insert(record).then_some(copy)
            })
            .collect()
    }

    /// Crawls the listing and merges it page by page, see [`crawl`].
    pub async fn update<S: PageSource>(
        &mut self,
        source: &S,
        opts: &CrawlOptions,
        diag: &mut dyn Diagnostics,
    ) -> Result<CrawlSummary> {
        crawl(self, source, opts, diag).await
    }

    pub fn snapshot(&self) -> Document {
        Document {
            host: self.host.clone(),
            badge_id: self.badge_id,
            instances: self.iter().map(RecordDoc::from).collect(),
        }
    }

    pub fn restore(doc: Document) -> Result<Self> {
        let mut store = Self::new(doc.host, doc.badge_id);
        for instance in doc.instances {
            let record = instance.into_record(store.badge_id)?;
            store.insert(record);
        }
        Ok(store)
    }

    /// Loads the snapshot at `path`, or starts empty if there is none.
    pub async fn load(path: &Path, host: &str, badge_id: u64) -> Result<Self> {
        let Some(doc) = snapshot::load(path).await? else {
            return Ok(Self::new(host, badge_id));
        };
        if doc.host != host || doc.badge_id != badge_id {
            return Err(Error::Schema(format!(
                "{} holds {}/badges/{}, expected {host}/badges/{badge_id}",
                path.display(),
                doc.host,
                doc.badge_id
            )));
        }
        Self::restore(doc)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        snapshot::save(path, &self.snapshot()).await
    }
}

impl<'a> IntoIterator for &'a BadgeStore {
    type Item = &'a BadgeRecord;
    type IntoIter = std::collections::btree_map::Values<'a, BadgeIdentity, BadgeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}
