use std::future::Future;

use reqwest::Client;

use crate::{FetchError, USER_AGENT};

/// Where listing pages come from. The crawl only ever has one request in flight.
pub trait PageSource {
    fn fetch_page(&self, page_num: u32) -> impl Future<Output = Result<String, FetchError>>;
}

/// Fetches `{scheme}://{host}/help/badges/{badge_id}?page={n}` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

/// The client every fetcher of a run shares. Fails only when the TLS backend
/// can't initialize.
pub fn client() -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(FetchError::Client)
}

impl HttpFetcher {
    /// Builds a fetcher with its own client.
    pub fn new(scheme: &str, host: &str, badge_id: u64) -> Result<Self, FetchError> {
        Ok(Self::with_client(client()?, scheme, host, badge_id))
    }

    /// Client uses Arc so it can be shared cheaply between fetchers.
    pub fn with_client(client: Client, scheme: &str, host: &str, badge_id: u64) -> Self {
        Self {
            client,
            base_url: format!("{scheme}://{host}/help/badges/{badge_id}"),
        }
    }

    pub fn page_url(&self, page_num: u32) -> String {
        format!("{}?page={page_num}", self.base_url)
    }
}

impl PageSource for HttpFetcher {
    /// Requests a page and returns its text. Any non-success status is an error.
    async fn fetch_page(&self, page_num: u32) -> Result<String, FetchError> {
        let url = self.page_url(page_num);

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        res.text()
            .await
            .map_err(|source| FetchError::Transport { url, source })
    }
}
