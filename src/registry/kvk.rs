//! Dutch KVK (Kamer van Koophandel) API client.
//!
//! Uses the basisprofiel and zoeken endpoints of the KVK API. The RSIN is
//! part of the basisprofiel payload and is surfaced on the normalized record
//! so the NL derivation chain can pick it up.

use super::{CompanyRecord, CompanyRegistry, RegistryError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;

const KVK_API_BASE: &str = "https://api.kvk.nl/api/v1";

pub struct KvkClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KvkClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: KVK_API_BASE.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, url: &str) -> Result<Option<serde_json::Value>, RegistryError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "KVK API error {}",
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| RegistryError::UnexpectedResponse(format!("KVK parse error: {e}")))?;
        Ok(Some(body))
    }

    fn record_from_basisprofiel(payload: serde_json::Value) -> CompanyRecord {
        let get = |keys: &[&str]| -> Option<String> {
            let mut cur = &payload;
            for k in keys {
                cur = cur.get(k)?;
            }
            cur.as_str().map(|s| s.to_string())
        };

        let address = payload
            .pointer("/_embedded/hoofdvestiging/adressen/0")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        CompanyRecord {
            registry_number: get(&["kvkNummer"]),
            name: get(&["naam"]),
            legal_form: payload
                .pointer("/_embedded/eigenaar/rechtsvorm")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            address: address
                .get("volledigAdres")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            city: address
                .get("plaats")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            postal_code: address
                .get("postcode")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            status: get(&["statutaireNaam"]).map(|_| "ACTIVE".to_string()),
            court_code: None,
            register_type: None,
            rsin: get(&["rsin"]),
            registration_date: get(&["formeleRegistratiedatum"])
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y%m%d").ok()),
            raw: payload,
        }
    }
}

#[async_trait]
impl CompanyRegistry for KvkClient {
    async fn search_by_number(
        &self,
        number: &str,
    ) -> Result<Option<CompanyRecord>, RegistryError> {
        let url = format!("{}/basisprofielen/{}", self.base_url, encode(number));
        Ok(self
            .get_json(&url)
            .await?
            .map(Self::record_from_basisprofiel))
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<CompanyRecord>, RegistryError> {
        let url = format!(
            "{}/zoeken?naam={}&type=rechtspersoon",
            self.base_url,
            encode(name)
        );
        let Some(body) = self.get_json(&url).await? else {
            return Ok(vec![]);
        };

        let items = body
            .get("resultaten")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(items
            .into_iter()
            .map(|item| CompanyRecord {
                registry_number: item
                    .get("kvkNummer")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                name: item
                    .get("naam")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                raw: item,
                ..Default::default()
            })
            .collect())
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
