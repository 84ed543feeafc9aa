//! Logo discovery from a company web domain.

use super::{LogoFinder, RegistryError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const LOGO_PROVIDER_BASE: &str = "https://logo.clearbit.com";

pub struct LogoClient {
    client: Client,
    provider_base: String,
}

impl LogoClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            provider_base: LOGO_PROVIDER_BASE.to_string(),
        })
    }

    pub fn with_provider_base(mut self, base: impl Into<String>) -> Self {
        self.provider_base = base.into();
        self
    }

    async fn probe(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LogoFinder for LogoClient {
    async fn find_logo(&self, domain: &str) -> Result<Option<String>, RegistryError> {
        let provider_url = format!("{}/{}", self.provider_base, domain);
        let favicon_url = format!("https://{}/favicon.ico", domain);

        // Both probes are independent; prefer the provider's rendering.
        let (provider_ok, favicon_ok) =
            futures::join!(self.probe(&provider_url), self.probe(&favicon_url));

        if provider_ok {
            Ok(Some(provider_url))
        } else if favicon_ok {
            Ok(Some(favicon_url))
        } else {
            Ok(None)
        }
    }
}
