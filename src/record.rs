use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::parse::{self, TIMESTAMP_FORMAT};
use crate::ParseError;

/// The fields that make two scraped rows the same award.
///
/// Field order matters: the derived `Ord` sorts by timestamp first, which is the
/// iteration order of a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BadgeIdentity {
    pub timestamp: i64,
    pub user_id: u64,
    pub reason: String,
    pub badge_id: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Medals {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
}

/// A fully extracted row.
#[derive(Debug, Clone)]
pub struct BadgeFields {
    pub identity: BadgeIdentity,
    pub display_name: String,
    pub reputation: u64,
    pub medals: Medals,
}

/// A row restored from a snapshot that only kept the raw markup.
///
/// Identity is extracted once when the record is built, everything else is
/// re-derived from `html` on every read.
#[derive(Debug, Clone)]
pub struct MarkupRecord {
    identity: BadgeIdentity,
    html: String,
}

impl MarkupRecord {
    pub fn new(badge_id: u64, html: String) -> Result<Self, ParseError> {
        let fields = parse::parse_row(badge_id, &html)?;
        Ok(Self {
            identity: fields.identity,
            html,
        })
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// One awarded badge. Equality, hashing and ordering only look at the identity.
#[derive(Debug, Clone)]
pub enum BadgeRecord {
    Parsed(BadgeFields),
    Markup(MarkupRecord),
}

impl BadgeRecord {
    pub fn identity(&self) -> &BadgeIdentity {
        match self {
            BadgeRecord::Parsed(fields) => &fields.identity,
            BadgeRecord::Markup(markup) => &markup.identity,
        }
    }

    pub fn badge_id(&self) -> u64 {
        self.identity().badge_id
    }

    pub fn user_id(&self) -> u64 {
        self.identity().user_id
    }

    /// Unix seconds, UTC.
    pub fn timestamp(&self) -> i64 {
        self.identity().timestamp
    }

    pub fn awarded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp(), 0)
    }

    /// The award time in the site's own `title` format.
    pub fn stack_time(&self) -> String {
        self.awarded_at()
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default()
    }

    pub fn reason(&self) -> &str {
        &self.identity().reason
    }

    pub fn display_name(&self) -> String {
        match self {
            BadgeRecord::Parsed(fields) => fields.display_name.clone(),
            BadgeRecord::Markup(markup) => parse::display_name(&markup.html).unwrap_or_default(),
        }
    }

    pub fn reputation(&self) -> u64 {
        match self {
            BadgeRecord::Parsed(fields) => fields.reputation,
            BadgeRecord::Markup(markup) => parse::reputation(&markup.html).unwrap_or(0),
        }
    }

    pub fn medals(&self) -> Medals {
        match self {
            BadgeRecord::Parsed(fields) => fields.medals,
            BadgeRecord::Markup(markup) => parse::medals(&markup.html).unwrap_or_default(),
        }
    }

    /// Raw row markup, only kept for legacy records.
    pub fn markup(&self) -> Option<&str> {
        match self {
            BadgeRecord::Parsed(_) => None,
            BadgeRecord::Markup(markup) => Some(markup.html()),
        }
    }
}

impl From<BadgeFields> for BadgeRecord {
    fn from(fields: BadgeFields) -> Self {
        BadgeRecord::Parsed(fields)
    }
}

impl From<MarkupRecord> for BadgeRecord {
    fn from(markup: MarkupRecord) -> Self {
        BadgeRecord::Markup(markup)
    }
}

impl PartialEq for BadgeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for BadgeRecord {}

impl Hash for BadgeRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for BadgeRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BadgeRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(other.identity())
    }
}
