//! Belgian KBO/BCE clients.
//!
//! Two implementations of the same seam: the paid structured API (preferred
//! when configured) and the public interface. The paid client fetches the
//! company facet and the establishments facet concurrently and merges them
//! into one record.

use super::{CompanyRecord, CompanyRegistry, RegistryError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const KBO_API_BASE: &str = "https://api.kbodata.app/v1";
const KBO_PUBLIC_BASE: &str = "https://kbopub.economie.fgov.be/kbopub";

/// Paid structured KBO API.
pub struct KboApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KboApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: KBO_API_BASE.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>, RegistryError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "KBO API error {}",
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| RegistryError::UnexpectedResponse(format!("KBO parse error: {e}")))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl CompanyRegistry for KboApiClient {
    async fn search_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CompanyRecord>, RegistryError> {
        // Independent facets, joined before building the record.
        let company_path = format!("/enterprise/{}", encode(number));
        let establishments_path = format!("/enterprise/{}/establishments", encode(number));
        let (company, establishments) = futures::join!(
            self.get_json(&company_path),
            self.get_json(&establishments_path)
        );

        let Some(company) = company? else {
            return Ok(None);
        };
        let establishments = establishments.unwrap_or_default();
        debug!(kbo = number, "fetched structured KBO record");

        let get = |key: &str| {
            company
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };
        let seat = establishments
            .as_ref()
            .and_then(|e| e.get("items"))
            .and_then(|i| i.as_array())
            .and_then(|a| a.first())
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Ok(Some(CompanyRecord {
            registry_number: get("enterpriseNumber").or_else(|| Some(number.to_string())),
            name: get("denomination"),
            legal_form: get("juridicalForm"),
            address: seat
                .get("address")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            city: seat
                .get("municipality")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            postal_code: seat
                .get("zipcode")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            status: get("status"),
            raw: serde_json::json!({ "enterprise": company, "establishments": establishments }),
            ..Default::default()
        }))
    }

    async fn search_by_name(&self, _name: &str) -> Result<Vec<CompanyRecord>, RegistryError> {
        // Name search over KBO data is documented as unreliable and the
        // derivation module never asks for it.
        Ok(vec![])
    }
}

/// Public KBO interface fallback.
pub struct KboPublicClient {
    client: Client,
    base_url: String,
}

impl KboPublicClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: KBO_PUBLIC_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompanyRegistry for KboPublicClient {
    async fn search_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CompanyRecord>, RegistryError> {
        let url = format!(
            "{}/zoeknummerform.html?nummer={}&actionLu=Zoek&format=json",
            self.base_url,
            encode(number)
        );
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "KBO public interface error {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            RegistryError::UnexpectedResponse(format!("KBO public parse error: {e}"))
        })?;

        if body.get("enterpriseNumber").is_none() {
            return Ok(None);
        }
        let get = |key: &str| {
            body.get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        Ok(Some(CompanyRecord {
            registry_number: get("enterpriseNumber").or_else(|| Some(number.to_string())),
            name: get("denomination"),
            legal_form: get("juridicalForm"),
            address: get("address"),
            city: get("municipality"),
            postal_code: get("zipcode"),
            status: get("status"),
            raw: body,
            ..Default::default()
        }))
    }

    async fn search_by_name(&self, _name: &str) -> Result<Vec<CompanyRecord>, RegistryError> {
        Ok(vec![])
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
