use chrono::NaiveDateTime;

use crate::record::{BadgeFields, BadgeIdentity, BadgeRecord, Medals};
use crate::ParseError;

// Every literal the scraper depends on. When the site changes its markup this is
// the list to audit.
pub const LISTING_START: &str = r#"<div class="single-badge-table"#;
pub const PAGER_START: &str = r#"<div class="pager"#;
pub const ROW_START: &str = r#"<div class="single-badge-row-"#;
pub const PAGE_NUMBER: &str = r#"<span class="page-numbers">"#;
pub const USER_LINK: &str = r#"<a href="/users/"#;
pub const USER_DETAILS: &str = r#"<div class="user-details">"#;
pub const AWARDED_AT: &str = r#"Awarded <span title=""#;
pub const REASON: &str = r#"<div class="single-badge-reason">"#;
pub const REASON_END: &str = "</div>";
pub const REPUTATION: &str = r#"<span class="reputation-score""#;
pub const GOLD: &str = r#"<span class="badge1">"#;
pub const SILVER: &str = r#"<span class="badge2">"#;
pub const BRONZE: &str = r#"<span class="badge3">"#;
pub const BADGE_COUNT: &str = r#"<span class="badgecount">"#;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Everything one listing page yields.
#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<BadgeRecord>,
    /// Total page count as reported by this page's pager.
    pub page_count: u32,
}

/// Parses one page of a badge listing.
///
/// The listing region starts at [`LISTING_START`] and ends at [`PAGER_START`] (or
/// the end of the text). Each [`ROW_START`] inside it begins one record. A row
/// that lacks a required field rejects the whole page, a partially readable page
/// means the markup changed under us.
///
/// A page with neither listing nor pager holds no rows: the site serves those past
/// the last page and for badges nobody has earned yet.
pub fn parse_page(badge_id: u64, text: &str) -> Result<Page, ParseError> {
    let page_count = page_count(text)?;

    let Some(listing) = after(text, LISTING_START) else {
        if text.contains(PAGER_START) {
            return Err(ParseError::MissingListing(LISTING_START));
        }
        return Ok(Page {
            records: Vec::new(),
            page_count,
        });
    };
    let listing = match listing.find(PAGER_START) {
        Some(end) => &listing[..end],
        None => listing,
    };

    let records = listing
        .split(ROW_START)
        .skip(1)
        .enumerate()
        .map(|(index, chunk)| {
            parse_row(badge_id, chunk)
                .map(BadgeRecord::from)
                .map_err(|err| ParseError::Row {
                    index,
                    source: Box::new(err),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        records,
        page_count,
    })
}

/// Reads the last page number link. A page without a pager, or with an empty last
/// link, is the only page.
pub fn page_count(text: &str) -> Result<u32, ParseError> {
    let Some(start) = text.rfind(PAGE_NUMBER) else {
        return Ok(1);
    };
    let rest = &text[start + PAGE_NUMBER.len()..];
    let raw = rest.split('<').next().unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(1);
    }
    raw.parse()
        .map_err(|_| ParseError::MalformedPageCount(raw.to_string()))
}

/// Builds a record from one row chunk. User id, award time and reason are
/// required; the rest falls back to empty values when their anchors are absent.
pub fn parse_row(badge_id: u64, chunk: &str) -> Result<BadgeFields, ParseError> {
    let user_id = user_id(chunk)?;
    let timestamp = timestamp(chunk)?;
    let reason = reason(chunk).ok_or(ParseError::MissingField("reason"))?;

    Ok(BadgeFields {
        identity: BadgeIdentity {
            timestamp,
            user_id,
            reason,
            badge_id,
        },
        display_name: display_name(chunk).unwrap_or_default(),
        reputation: reputation(chunk)?,
        medals: medals(chunk)?,
    })
}

pub fn user_id(chunk: &str) -> Result<u64, ParseError> {
    let raw = between(chunk, USER_LINK, "/").ok_or(ParseError::MissingField("user_id"))?;
    raw.trim().parse().map_err(|_| malformed("user_id", raw))
}

pub fn timestamp(chunk: &str) -> Result<i64, ParseError> {
    let raw = between(chunk, AWARDED_AT, "\"").ok_or(ParseError::MissingField("timestamp"))?;
    timestamp_from_stack_time(raw).ok_or_else(|| malformed("timestamp", raw))
}

/// Converts the site's `2015-04-20 01:00:15Z` format to unix seconds.
pub fn timestamp_from_stack_time(raw: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|t| t.and_utc().timestamp())
}

/// Inner markup of the reason block, trimmed. Kept verbatim: it is an opaque code.
pub fn reason(chunk: &str) -> Option<String> {
    between(chunk, REASON, REASON_END).map(|s| s.trim().to_string())
}

pub fn display_name(chunk: &str) -> Option<String> {
    let details = after(chunk, USER_DETAILS)?;
    let link = after(details, USER_LINK)?;
    let name = between(link, ">", "</a>")?;
    Some(decode_entities(name.trim()))
}

/// Reputation score; `12.3k` means 12300. An absent score is 0.
pub fn reputation(chunk: &str) -> Result<u64, ParseError> {
    let Some(tag) = after(chunk, REPUTATION) else {
        return Ok(0);
    };
    let raw = between(tag, ">", "<").ok_or(ParseError::MissingField("reputation"))?;
    parse_abbreviated(raw).ok_or_else(|| malformed("reputation", raw))
}

pub fn medals(chunk: &str) -> Result<Medals, ParseError> {
    Ok(Medals {
        gold: medal_count(chunk, GOLD, "gold")?,
        silver: medal_count(chunk, SILVER, "silver")?,
        bronze: medal_count(chunk, BRONZE, "bronze")?,
    })
}

fn medal_count(chunk: &str, anchor: &str, field: &'static str) -> Result<u32, ParseError> {
    let Some(rest) = after(chunk, anchor) else {
        return Ok(0);
    };
    let raw = between(rest, BADGE_COUNT, "<").ok_or(ParseError::MissingField(field))?;
    raw.trim().replace(',', "").parse().map_err(|_| malformed(field, raw))
}

fn parse_abbreviated(raw: &str) -> Option<u64> {
    let cleaned = raw.trim().replace(',', "");
    let (number, scale) = match cleaned.strip_suffix('k') {
        Some(n) => (n, 1_000.0),
        None => match cleaned.strip_suffix('m') {
            Some(n) => (n, 1_000_000.0),
            None => return cleaned.parse().ok(),
        },
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * scale).round() as u64)
}

fn malformed(field: &'static str, raw: &str) -> ParseError {
    ParseError::MalformedField {
        field,
        value: raw.to_string(),
    }
}

/// Text after the first `open`.
#[inline]
fn after<'a>(s: &'a str, open: &str) -> Option<&'a str> {
    s.find(open).map(|i| &s[i + open.len()..])
}

/// Text between the first `open` and the following `close`.
#[inline]
fn between<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let rest = after(s, open)?;
    rest.find(close).map(|end| &rest[..end])
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: u64, stamp: &str, extra: &str) -> String {
        format!(
            r#"{ROW_START}{user_id}">
            <div class="single-badge-reason">for an <a href="/election/7">election</a></div>
            <div class="single-badge-awarded">{AWARDED_AT}{stamp}" class="relativetime">x</span></div>
            <div class="user-details"><a href="/users/{user_id}/someone">Someone {user_id}</a><br>{extra}</div>
            </div>"#
        )
    }

    fn page(rows: &[String], pager: &str) -> String {
        format!(
            "<html><body>{LISTING_START}\">\n{}\n</div>\n{PAGER_START}\">{pager}</div></body></html>",
            rows.join("\n")
        )
    }

    #[test]
    fn parses_rows_in_order_with_reported_page_count() {
        let rows = vec![
            row(10, "2015-04-20 01:00:15Z", ""),
            row(11, "2015-04-20 01:00:16Z", ""),
        ];
        let pager = r#"<a href="?page=2"><span class="page-numbers">2</span></a>
            <a href="?page=42"><span class="page-numbers">42</span></a>
            <a href="?page=2"><span class="page-numbers next"> next</span></a>"#;
        let parsed = parse_page(1974, &page(&rows, pager)).unwrap();

        assert_eq!(parsed.page_count, 42);
        let users: Vec<u64> = parsed.records.iter().map(|r| r.user_id()).collect();
        assert_eq!(users, vec![10, 11]);
        assert_eq!(parsed.records[0].timestamp(), 1429491615);
        assert_eq!(parsed.records[0].display_name(), "Someone 10");
    }

    #[test]
    fn missing_pager_means_single_page() {
        let text = format!("{LISTING_START}\">{}</div>", row(1, "1970-01-01 00:00:00Z", ""));
        let parsed = parse_page(3109, &text).unwrap();
        assert_eq!(parsed.page_count, 1);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].timestamp(), 0);
    }

    #[test]
    fn rows_after_the_pager_are_ignored() {
        let text = format!(
            "{}{}",
            page(&[row(1, "2015-04-20 01:00:15Z", "")], ""),
            row(2, "2015-04-20 01:00:15Z", "")
        );
        assert_eq!(parse_page(1, &text).unwrap().records.len(), 1);
    }

    #[test]
    fn pager_without_listing_rejects_page() {
        let text =
            format!(r#"<html>{PAGER_START}"><span class="page-numbers">3</span></div></html>"#);
        let err = parse_page(1, &text).unwrap_err();
        assert_eq!(err, ParseError::MissingListing(LISTING_START));
    }

    #[test]
    fn page_without_listing_or_pager_is_empty() {
        let parsed = parse_page(1, "<html><body><p>No badges here.</p></body></html>").unwrap();
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.page_count, 1);
    }

    #[test]
    fn row_without_timestamp_rejects_whole_page() {
        let broken = format!(
            r#"{ROW_START}x">{REASON}r</div><a href="/users/5/x">x</a></div>"#
        );
        let rows = vec![row(1, "2015-04-20 01:00:15Z", ""), broken];
        let err = parse_page(1, &page(&rows, "")).unwrap_err();
        assert_eq!(
            err,
            ParseError::Row {
                index: 1,
                source: Box::new(ParseError::MissingField("timestamp")),
            }
        );
    }

    #[test]
    fn row_without_reason_rejects_whole_page() {
        let broken = format!(
            r#"{ROW_START}x">{AWARDED_AT}2015-04-20 01:00:15Z"><a href="/users/5/x">x</a></div>"#
        );
        let rows = vec![broken, row(1, "2015-04-20 01:00:15Z", "")];
        let err = parse_page(1, &page(&rows, "")).unwrap_err();
        assert_eq!(
            err,
            ParseError::Row {
                index: 0,
                source: Box::new(ParseError::MissingField("reason")),
            }
        );
    }

    #[test]
    fn malformed_timestamp_is_reported() {
        let rows = vec![row(1, "hello world", "")];
        let err = parse_page(1, &page(&rows, "")).unwrap_err();
        let ParseError::Row { index: 0, source } = err else {
            panic!("expected a row error");
        };
        assert!(matches!(
            *source,
            ParseError::MalformedField {
                field: "timestamp",
                ..
            }
        ));
    }

    #[test]
    fn malformed_page_count_is_an_error() {
        let text = page(&[], r#"<span class="page-numbers">lots</span>"#);
        assert_eq!(
            parse_page(1, &text).unwrap_err(),
            ParseError::MalformedPageCount("lots".into())
        );
    }

    #[test]
    fn empty_page_count_means_single_page() {
        let text = page(&[], r#"<span class="page-numbers"> </span>"#);
        assert_eq!(parse_page(1, &text).unwrap().page_count, 1);
    }

    #[test]
    fn timestamps_use_the_site_format() {
        assert_eq!(timestamp_from_stack_time("2015-04-20 01:00:15Z"), Some(1429491615));
        assert_eq!(timestamp_from_stack_time("1970-01-01 00:00:00Z"), Some(0));
        assert_eq!(timestamp_from_stack_time("hello world"), None);
    }

    #[test]
    fn reputation_handles_abbreviations() {
        let chunk = |score: &str| {
            format!(r#"{REPUTATION} title="reputation score " dir="ltr">{score}</span>"#)
        };
        assert_eq!(reputation(&chunk("12.3k")).unwrap(), 12_300);
        assert_eq!(reputation(&chunk("1,234")).unwrap(), 1_234);
        assert_eq!(reputation(&chunk("101")).unwrap(), 101);
        assert_eq!(reputation(&chunk("1.1m")).unwrap(), 1_100_000);
        assert_eq!(reputation("no score here").unwrap(), 0);
        assert!(reputation(&chunk("n/a")).is_err());
    }

    #[test]
    fn absent_medals_count_as_zero() {
        let chunk = format!(
            r#"<span title="3 silver badges">{SILVER}</span>{BADGE_COUNT}3</span></span>
               <span title="12 bronze badges">{BRONZE}</span>{BADGE_COUNT}12</span></span>"#
        );
        assert_eq!(
            medals(&chunk).unwrap(),
            Medals {
                gold: 0,
                silver: 3,
                bronze: 12,
            }
        );
    }

    #[test]
    fn empty_reason_is_kept_as_empty_code() {
        let chunk = format!(
            r#"{REASON}   {REASON_END}{USER_LINK}9/x">x</a>{AWARDED_AT}2015-04-20 01:00:15Z">"#
        );
        let fields = parse_row(1, &chunk).unwrap();
        assert_eq!(fields.identity.reason, "");
    }
}
