//! Persisted form of a [`BadgeStore`](crate::store::BadgeStore).
//!
//! Two record shapes exist in the wild: normalized objects carrying every field,
//! and legacy objects carrying the raw row markup plus a few derived fields.
//! Both load; each is written back in the shape it was read in.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::record::{BadgeFields, BadgeIdentity, BadgeRecord, MarkupRecord, Medals};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub host: String,
    pub badge_id: u64,
    pub instances: Vec<RecordDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDoc {
    // Tried first: only the legacy shape has `html`.
    Legacy(LegacyDoc),
    Normalized(NormalizedDoc),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDoc {
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_what: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_id: Option<u64>,
    pub user_id: u64,
    pub timestamp: i64,
    pub reason: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub reputation: u64,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub silver: u32,
    #[serde(default)]
    pub bronze: u32,
}

impl From<&BadgeRecord> for RecordDoc {
    fn from(record: &BadgeRecord) -> Self {
        match record {
            BadgeRecord::Markup(markup) => {
                let reason = record.reason();
                RecordDoc::Legacy(LegacyDoc {
                    html: markup.html().to_string(),
                    user_id: Some(record.user_id()),
                    for_what: (!reason.is_empty()).then(|| reason.to_string()),
                    stack_time: Some(record.stack_time()),
                    timestamp: Some(record.timestamp()),
                })
            }
            BadgeRecord::Parsed(fields) => RecordDoc::Normalized(NormalizedDoc {
                badge_id: Some(fields.identity.badge_id),
                user_id: fields.identity.user_id,
                timestamp: fields.identity.timestamp,
                reason: fields.identity.reason.clone(),
                display_name: fields.display_name.clone(),
                reputation: fields.reputation,
                gold: fields.medals.gold,
                silver: fields.medals.silver,
                bronze: fields.medals.bronze,
            }),
        }
    }
}

impl RecordDoc {
    /// Builds the record, checking any carried fields against what the markup says.
    pub fn into_record(self, badge_id: u64) -> Result<BadgeRecord> {
        match self {
            RecordDoc::Legacy(doc) => {
                let markup = MarkupRecord::new(badge_id, doc.html.clone())
                    .map_err(|err| Error::Schema(format!("legacy record markup: {err}")))?;
                let record = BadgeRecord::from(markup);
                check_carried("user_id", doc.user_id, record.user_id())?;
                check_carried("timestamp", doc.timestamp, record.timestamp())?;
                check_carried("stack_time", doc.stack_time, record.stack_time())?;
                if let Some(for_what) = doc.for_what {
                    check_carried("for_what", Some(for_what), record.reason().to_string())?;
                }
                Ok(record)
            }
            RecordDoc::Normalized(doc) => {
                if let Some(carried) = doc.badge_id {
                    if carried != badge_id {
                        return Err(Error::Schema(format!(
                            "record for badge {carried} in a snapshot of badge {badge_id}"
                        )));
                    }
                }
                Ok(BadgeRecord::from(BadgeFields {
                    identity: BadgeIdentity {
                        timestamp: doc.timestamp,
                        user_id: doc.user_id,
                        reason: doc.reason,
                        badge_id,
                    },
                    display_name: doc.display_name,
                    reputation: doc.reputation,
                    medals: Medals {
                        gold: doc.gold,
                        silver: doc.silver,
                        bronze: doc.bronze,
                    },
                }))
            }
        }
    }
}

fn check_carried<T>(field: &str, carried: Option<T>, derived: T) -> Result<()>
where
    T: PartialEq + std::fmt::Debug,
{
    match carried {
        Some(carried) if carried != derived => Err(Error::Schema(format!(
            "legacy record carries {field} {carried:?} but its markup says {derived:?}"
        ))),
        _ => Ok(()),
    }
}

/// `{data_dir}/{host}-{badge_id}.json`
pub fn path_for(data_dir: &Path, host: &str, badge_id: u64) -> PathBuf {
    data_dir.join(format!("{host}-{badge_id}.json"))
}

/// Reads a snapshot. A missing file is `None`; anything else that goes wrong is
/// an error, prior data is never silently dropped.
pub async fn load(path: &Path) -> Result<Option<Document>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let doc = serde_json::from_str(&text)
        .map_err(|err| Error::Schema(format!("{}: {err}", path.display())))?;
    Ok(Some(doc))
}

/// Replaces the snapshot at `path` as a whole: the document is written next to
/// it first and then renamed over it.
pub async fn save(path: &Path, doc: &Document) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let bytes = serde_json::to_vec(doc)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Wraps raw row markup in the legacy shape, with the derived fields the old
/// writer stored next to it.
pub fn legacy_doc(html: &str, badge_id: u64) -> Result<RecordDoc> {
    let markup = MarkupRecord::new(badge_id, html.to_string())
        .map_err(|err| Error::Schema(format!("legacy record markup: {err}")))?;
    Ok(RecordDoc::from(&BadgeRecord::from(markup)))
}
