//! EU VIES VAT validation client (REST interface).

use super::{RegistryError, VatValidation, VatValidator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VIES_API_BASE: &str = "https://ec.europa.eu/taxation_customs/vies/rest-api";

pub struct ViesClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckVatRequest<'a> {
    country_code: &'a str,
    vat_number: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckVatResponse {
    valid: bool,
    name: Option<String>,
    address: Option<String>,
}

impl ViesClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: VIES_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VatValidator for ViesClient {
    async fn validate(
        &self,
        country: &str,
        number: &str,
    ) -> Result<VatValidation, RegistryError> {
        let url = format!("{}/check-vat-number", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CheckVatRequest {
                country_code: country,
                vat_number: number,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "VIES error {}",
                response.status()
            )));
        }

        let body: CheckVatResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::UnexpectedResponse(format!("VIES parse error: {e}")))?;

        Ok(VatValidation {
            is_valid: body.valid,
            trader_name: body.name.filter(|n| n != "---"),
            trader_address: body.address.filter(|a| a != "---"),
        })
    }
}
