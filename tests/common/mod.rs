#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;

use badge_scrap::parse::TIMESTAMP_FORMAT;
use badge_scrap::request::PageSource;
use badge_scrap::FetchError;
use chrono::DateTime;

pub const ELECTION_6: &str = r#"for an <a href="/election/6">election</a>"#;
pub const START: i64 = 1_429_491_615;

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path).unwrap()
}

/// One listing row the way the site renders it.
pub fn row(user_id: u64, timestamp: i64) -> String {
    let stamp = DateTime::from_timestamp(timestamp, 0)
        .unwrap()
        .format(TIMESTAMP_FORMAT);
    format!(
        r#"<div class="single-badge-row-reason">
    <div class="single-badge-reason">{ELECTION_6}</div>
    <div class="single-badge-awarded">Awarded <span title="{stamp}" class="relativetime">x</span></div>
    <div class="user-details"><a href="/users/{user_id}/user-{user_id}">user {user_id}</a><br>
        <span class="reputation-score" title="reputation score " dir="ltr">1,337</span></div>
</div>"#
    )
}

/// A full page holding `rows`, whose pager reports `page_count` pages.
pub fn listing_page(rows: &[(u64, i64)], page_count: u32) -> String {
    let rows: Vec<String> = rows.iter().map(|&(u, t)| row(u, t)).collect();
    format!(
        r#"<html><body>
<div class="single-badge-table">
{}
</div>
<div class="pager fl">
    <a href="?page=1"><span class="page-numbers">1</span></a>
    <a href="?page={page_count}"><span class="page-numbers">{page_count}</span></a>
    <a href="?page=2" rel="next"><span class="page-numbers next"> next</span></a>
</div>
</body></html>"#,
        rows.join("\n")
    )
}

/// `count` distinct rows, newest first like the site lists them.
pub fn rows(first_user: u64, count: u64, newest: i64) -> Vec<(u64, i64)> {
    (0..count)
        .map(|i| (first_user + i, newest - i as i64 * 60))
        .collect()
}

pub enum Scripted {
    Page(String),
    Status(u16),
}

/// Serves scripted pages; pages past the script are empty listings reporting
/// `fallback_count` pages.
pub struct ScriptedSource {
    pages: BTreeMap<u32, Scripted>,
    fallback_count: u32,
    pub requests: RefCell<Vec<u32>>,
}

impl ScriptedSource {
    pub fn new(fallback_count: u32) -> Self {
        Self {
            pages: BTreeMap::new(),
            fallback_count,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn page(mut self, num: u32, text: String) -> Self {
        self.pages.insert(num, Scripted::Page(text));
        self
    }

    pub fn status(mut self, num: u32, status: u16) -> Self {
        self.pages.insert(num, Scripted::Status(status));
        self
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requests.borrow().clone()
    }
}

impl PageSource for ScriptedSource {
    async fn fetch_page(&self, page_num: u32) -> Result<String, FetchError> {
        self.requests.borrow_mut().push(page_num);
        match self.pages.get(&page_num) {
            Some(Scripted::Page(text)) => Ok(text.clone()),
            Some(Scripted::Status(status)) => Err(FetchError::Status {
                url: format!("scripted://page/{page_num}"),
                status: *status,
            }),
            None => Ok(listing_page(&[], self.fallback_count)),
        }
    }
}
