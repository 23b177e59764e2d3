//! HTTP seam used by the registry client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{Result, StoreError};

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET. Only transport failures are errors; any received status
    /// is returned as a response.
    async fn get(&self, url: &Url) -> Result<FetchResponse>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse { status, body })
    }
}

/// GET `url` and return the body of a successful response.
///
/// 404 becomes [`StoreError::NotFound`] for `id`; any other non-success
/// status is a [`StoreError::NetworkError`].
pub(crate) async fn fetch_body(fetcher: &dyn Fetcher, url: &Url, id: &str) -> Result<Vec<u8>> {
    let response = fetcher.get(url).await?;

    if response.is_success() {
        return Ok(response.body);
    }

    match response.status {
        404 => Err(StoreError::not_found(id)),
        status => Err(StoreError::NetworkError(format!(
            "GET {url} returned status {status}"
        ))),
    }
}
