//! Order book HTTP API client used to check whether a tradeable order was
//! already posted.
//!
//! <https://api.cow.fi/docs/#/default/get_api_v1_orders__UID_>

use {
    anyhow::{Context, Result, bail},
    model::order::OrderUid,
    reqwest::{StatusCode, Url},
};

#[mockall::automock]
#[async_trait::async_trait]
pub trait OrderBookApi: Send + Sync {
    /// Whether the order book knows about the order with `uid`.
    async fn order_exists(&self, uid: &OrderUid) -> Result<bool>;
}

/// Production order book API base URL for a chain.
pub fn default_base_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://api.cow.fi/mainnet/"),
        100 => Some("https://api.cow.fi/xdai/"),
        8453 => Some("https://api.cow.fi/base/"),
        42161 => Some("https://api.cow.fi/arbitrum_one/"),
        11155111 => Some("https://api.cow.fi/sepolia/"),
        _ => None,
    }
}

pub struct OrderBookClient {
    client: reqwest::Client,
    base: Url,
}

impl OrderBookClient {
    pub fn new(client: reqwest::Client, mut base: Url) -> Self {
        // `Url::join` replaces the last path segment unless it ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    pub fn for_chain(client: reqwest::Client, chain_id: u64) -> Result<Self> {
        let base = default_base_url(chain_id)
            .with_context(|| format!("no order book for chain {chain_id}"))?;
        Ok(Self::new(client, Url::parse(base)?))
    }

    fn order_url(&self, uid: &OrderUid) -> Result<Url> {
        Ok(self.base.join("api/v1/orders/")?.join(&uid.to_string())?)
    }
}

#[async_trait::async_trait]
impl OrderBookApi for OrderBookClient {
    async fn order_exists(&self, uid: &OrderUid) -> Result<bool> {
        let response = self.client.get(self.order_url(uid)?).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let text = response.text().await.unwrap_or_default();
                bail!("HTTP {status} error: {text}")
            }
        }
    }
}
