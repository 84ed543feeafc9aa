//! GLEIF API client.
//!
//! Rate-limited HTTP client for the public GLEIF LEI records API.
//! Reference: https://api.gleif.org/api/v1/lei-records

use super::{LeiRecord, LeiRegistry, RegistryError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const GLEIF_API_BASE: &str = "https://api.gleif.org/api/v1";
const RATE_LIMIT_DELAY_MS: u64 = 200; // 5 req/sec to be safe

pub struct GleifClient {
    client: Client,
    base_url: String,
    last_request: Mutex<Instant>,
}

#[derive(Debug, Deserialize)]
struct GleifResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct GleifRecord {
    id: String,
    attributes: GleifAttributes,
}

#[derive(Debug, Deserialize)]
struct GleifAttributes {
    entity: GleifEntity,
}

#[derive(Debug, Deserialize)]
struct GleifEntity {
    #[serde(rename = "legalName")]
    legal_name: GleifName,
    jurisdiction: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GleifName {
    name: String,
}

impl GleifClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: GLEIF_API_BASE.to_string(),
            last_request: Mutex::new(Instant::now()),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enforce a polite delay between requests.
    async fn rate_limit(&self) {
        let elapsed = {
            let last = self.last_request.lock().unwrap();
            last.elapsed()
        };

        if elapsed < Duration::from_millis(RATE_LIMIT_DELAY_MS) {
            sleep(Duration::from_millis(RATE_LIMIT_DELAY_MS) - elapsed).await;
        }

        let mut last = self.last_request.lock().unwrap();
        *last = Instant::now();
    }

    async fn fetch_records(&self, url: &str) -> Result<Vec<LeiRecord>, RegistryError> {
        self.rate_limit().await;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "GLEIF API error {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let parsed: GleifResponse<Vec<serde_json::Value>> = serde_json::from_str(&text)
            .map_err(|e| {
                RegistryError::UnexpectedResponse(format!(
                    "GLEIF parse error: {}. First 200 chars: {}",
                    e,
                    &text[..text.len().min(200)]
                ))
            })?;

        let mut records = Vec::with_capacity(parsed.data.len());
        for raw in parsed.data {
            let record: GleifRecord = serde_json::from_value(raw.clone()).map_err(|e| {
                RegistryError::UnexpectedResponse(format!("GLEIF record parse error: {}", e))
            })?;
            records.push(LeiRecord {
                lei: record.id,
                legal_name: record.attributes.entity.legal_name.name,
                jurisdiction: record.attributes.entity.jurisdiction,
                status: record.attributes.entity.status,
                raw,
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl LeiRegistry for GleifClient {
    async fn lookup_by_registration(
        &self,
        authority: &str,
        number: &str,
    ) -> Result<Option<LeiRecord>, RegistryError> {
        let url = format!(
            "{}/lei-records?filter%5Bentity.registeredAt.id%5D={}&filter%5Bentity.registeredAs%5D={}&page%5Bsize%5D=2",
            self.base_url,
            encode(authority),
            encode(number)
        );
        let records = self.fetch_records(&url).await?;
        Ok(records.into_iter().next())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<LeiRecord>, RegistryError> {
        let url = format!(
            "{}/lei-records?filter%5Bentity.legalName%5D={}&page%5Bsize%5D=20",
            self.base_url,
            encode(name)
        );
        self.fetch_records(&url).await
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
