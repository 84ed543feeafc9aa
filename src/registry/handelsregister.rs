//! German Handelsregister client.
//!
//! The Handelsregister has no public JSON API; this client talks to an
//! internal gateway that wraps the register search and returns normalized
//! JSON records. The gateway base URL comes from `HANDELSREGISTER_BASE_URL`.

use super::{CompanyRecord, CompanyRegistry, RegistryError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct HandelsregisterClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GatewayRecord {
    register_number: Option<String>,
    register_type: Option<String>,
    court_code: Option<String>,
    name: Option<String>,
    legal_form: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    status: Option<String>,
}

impl HandelsregisterClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    async fn fetch(&self, path: &str) -> Result<Vec<CompanyRecord>, RegistryError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "Handelsregister gateway error {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let raw: Vec<serde_json::Value> = serde_json::from_str(&text).map_err(|e| {
            RegistryError::UnexpectedResponse(format!("Handelsregister parse error: {e}"))
        })?;

        Ok(raw
            .into_iter()
            .filter_map(|value| {
                let record: GatewayRecord = serde_json::from_value(value.clone()).ok()?;
                Some(CompanyRecord {
                    registry_number: record.register_number,
                    name: record.name,
                    legal_form: record.legal_form,
                    address: record.address,
                    city: record.city,
                    postal_code: record.postal_code,
                    status: record.status,
                    court_code: record.court_code,
                    register_type: record.register_type,
                    rsin: None,
                    registration_date: None,
                    raw: value,
                })
            })
            .collect())
    }
}

#[async_trait]
impl CompanyRegistry for HandelsregisterClient {
    async fn search_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CompanyRecord>, RegistryError> {
        let records = self
            .fetch(&format!("/search?register_number={}", encode(number)))
            .await?;
        Ok(records.into_iter().next())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<CompanyRecord>, RegistryError> {
        self.fetch(&format!("/search?name={}", encode(name))).await
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
