//! Peppol Directory client.
//!
//! Reference: https://directory.peppol.eu/public — search API v1.

use super::{PeppolDirectory, PeppolParticipant, RegistryError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const PEPPOL_DIRECTORY_BASE: &str = "https://directory.peppol.eu/search/1.0/json";

pub struct PeppolDirectoryClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    #[serde(rename = "participantID")]
    participant_id: ParticipantId,
    #[serde(default)]
    entities: Vec<MatchEntity>,
}

#[derive(Debug, Deserialize)]
struct ParticipantId {
    value: String,
}

#[derive(Debug, Deserialize)]
struct MatchEntity {
    name: Option<serde_json::Value>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

impl PeppolDirectoryClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: PEPPOL_DIRECTORY_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<PeppolParticipant>, RegistryError> {
        let url = format!("{}?{}", self.base_url, query);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "Peppol Directory error {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let body: SearchResponse = serde_json::from_str(&text).map_err(|e| {
            RegistryError::UnexpectedResponse(format!("Peppol Directory parse error: {e}"))
        })?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| {
                let entity = m.entities.first();
                PeppolParticipant {
                    participant_id: m.participant_id.value,
                    // The directory renders names either as a plain string or
                    // as a list of multilingual name objects.
                    name: entity.and_then(|e| match &e.name {
                        Some(serde_json::Value::String(s)) => Some(s.clone()),
                        Some(serde_json::Value::Array(items)) => items
                            .first()
                            .and_then(|i| i.get("name"))
                            .and_then(|n| n.as_str())
                            .map(|s| s.to_string()),
                        _ => None,
                    }),
                    country: entity.and_then(|e| e.country_code.clone()),
                    raw: serde_json::Value::Null,
                }
            })
            .collect())
    }
}

#[async_trait]
impl PeppolDirectory for PeppolDirectoryClient {
    async fn lookup(
        &self,
        scheme: &str,
        value: &str,
    ) -> Result<Option<PeppolParticipant>, RegistryError> {
        let query = format!(
            "participant=iso6523-actorid-upis%3A%3A{}%3A{}",
            encode(scheme),
            encode(value)
        );
        let results = self.search(&query).await?;
        Ok(results.into_iter().next())
    }

    async fn search_by_name(
        &self,
        name: &str,
        country: &str,
    ) -> Result<Vec<PeppolParticipant>, RegistryError> {
        let query = format!("name={}&country={}", encode(name), encode(country));
        self.search(&query).await
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
