use super::source::{TemplateSource, TileSource};
use crate::core::config::TileLoadingConfig;
use crate::core::constants::USER_AGENT;
use crate::core::geo::TileIndex;
use crate::{MapError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide client for callers without their own config. OpenStreetMap
/// rejects requests that carry no identifying User-Agent.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Anything that can hand back the raw bytes of one tile image
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, index: TileIndex) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T: TileFetcher + ?Sized> TileFetcher for Arc<T> {
    async fn fetch(&self, index: TileIndex) -> Result<Vec<u8>> {
        (**self).fetch(index).await
    }
}

/// Fetches tiles over HTTP from a [`TileSource`]
///
/// One attempt per tile: a non-success status or transport error is
/// returned to the caller, which treats it as an empty cell.
pub struct HttpTileFetcher {
    client: reqwest::Client,
    source: Box<dyn TileSource>,
    timeout: Duration,
}

impl HttpTileFetcher {
    pub fn from_config(config: &TileLoadingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            source: Box::new(TemplateSource::from_config(config)),
            timeout: config.timeout(),
        })
    }

    pub fn url(&self, index: TileIndex) -> String {
        self.source.url(index)
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, index: TileIndex) -> Result<Vec<u8>> {
        let url = self.source.url(index);
        log::debug!("fetch tile {:?} from {}", index, url);

        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Upstream(format!(
                "HTTP {} for tile {:?}",
                response.status(),
                index
            )));
        }

        let data = response.bytes().await?.to_vec();
        log::debug!("downloaded tile {:?} ({} bytes)", index, data.len());
        Ok(data)
    }
}
