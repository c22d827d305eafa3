use crate::config::Credentials;
use crate::error::ApiError;
use crate::signer;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const DEVICES_PATH: &str = "/device/devices";
pub const MAX_PAGE_SIZE: usize = 1000;
pub const MAX_PAGES: usize = 10_000;

const VERB: &str = "GET";

/// Source of the epoch milliseconds that go into each signature.
pub type Clock = fn() -> i64;

fn wall_clock_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn datasources_path(device_id: &str) -> String {
    format!("{DEVICES_PATH}/{device_id}/devicedatasources")
}

pub fn instances_path(device_id: &str, datasource_id: &str) -> String {
    format!("{DEVICES_PATH}/{device_id}/devicedatasources/{datasource_id}/instances")
}

/// The `data` envelope of a list response.
#[derive(Debug, Clone, Default)]
pub struct ItemsPage {
    pub items: Vec<Value>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    credentials: Credentials,
    clock: Clock,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        Url::parse(base_url).context("parsing base URL")?;
        let http = Client::builder()
            .user_agent(HeaderValue::from_static("lmctl/0.1"))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credentials,
            clock: wall_clock_millis,
        })
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signed GET. Anything but a 200 becomes an [`ApiError`] carrying the
    /// status; the body is then parsed as JSON.
    pub fn get(&self, resource_path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = Url::parse(&format!("{}{}", self.base_url, resource_path))
            .with_context(|| format!("building URL for `{}`", resource_path))?;
        let signed = signer::sign(
            &self.credentials.access_id,
            &self.credentials.access_key,
            VERB,
            resource_path,
            "",
            (self.clock)(),
        )
        .context("signing request")?;

        let mut request = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, &signed.authorization)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if !query.is_empty() {
            request = request.query(query);
        }

        debug!(
            verb = %signed.verb,
            path = %signed.resource_path,
            epoch = signed.epoch,
            body_len = signed.body.len(),
            ?query,
            "sending request"
        );
        trace!(signature = %signed.signature, "signed request");
        let response = request.send().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(path = resource_path, status = status.as_u16(), "received response");
        let text = response.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        if status != StatusCode::OK {
            debug!(path = resource_path, body = %text, "non-200 response body");
            return Err(ApiError::from_status(status, resource_path).into());
        }

        let json = serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            path: resource_path.to_string(),
            source,
        })?;
        Ok(json)
    }

    /// GET a list endpoint and unwrap `data.items`.
    pub fn get_items(&self, resource_path: &str, query: &[(&str, String)]) -> Result<ItemsPage> {
        Ok(items_page(self.get(resource_path, query)?)?)
    }

    /// One request with the platform's default page size.
    pub fn list_devices(&self) -> Result<ItemsPage> {
        self.get_items(DEVICES_PATH, &[])
    }

    /// Walks `size`/`offset` pages until a short page or `total` is reached.
    /// Stops early when a page starts with the same item as the one before
    /// it (the server ignored `offset`), or after [`MAX_PAGES`] requests.
    pub fn list_all_devices(&self, page_size: usize) -> Result<Vec<Value>> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut items: Vec<Value> = Vec::new();
        let mut previous_first: Option<Value> = None;
        for _ in 0..MAX_PAGES {
            let query = [
                ("size", page_size.to_string()),
                ("offset", items.len().to_string()),
            ];
            let page = self.get_items(DEVICES_PATH, &query)?;
            let fetched = page.items.len();
            if fetched > 0 && page.items.first() == previous_first.as_ref() {
                warn!(offset = items.len(), "page repeated the previous one; stopping");
                break;
            }
            previous_first = page.items.first().cloned();
            items.extend(page.items);

            let reached_total = page
                .total
                .and_then(|t| usize::try_from(t).ok())
                .is_some_and(|t| items.len() >= t);
            if fetched < page_size || reached_total {
                break;
            }
        }
        debug!(count = items.len(), "fetched all device pages");
        Ok(items)
    }

    pub fn device_datasources(&self, device_id: &str) -> Result<ItemsPage> {
        self.get_items(&datasources_path(device_id), &[])
    }

    pub fn datasource_instances(&self, device_id: &str, datasource_id: &str) -> Result<ItemsPage> {
        self.get_items(&instances_path(device_id, datasource_id), &[])
    }
}

fn items_page(body: Value) -> Result<ItemsPage, ApiError> {
    let Value::Object(mut root) = body else {
        return Err(ApiError::MissingData);
    };
    let Some(Value::Object(mut data)) = root.remove("data") else {
        return Err(ApiError::MissingData);
    };
    let Some(Value::Array(items)) = data.remove("items") else {
        return Err(ApiError::MissingData);
    };
    let total = data.get("total").and_then(Value::as_u64);
    Ok(ItemsPage { items, total })
}
