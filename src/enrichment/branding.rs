//! Logo-from-domain side enrichment. Best-effort: never fails the run.

use crate::models::LegalEntity;
use crate::registry::LogoFinder;
use crate::store::EnrichmentStore;
use tracing::{debug, warn};

/// Returns (logo_fetched, logo_url) for the summary.
pub async fn enrich_branding(
    entity: &LegalEntity,
    store: &dyn EnrichmentStore,
    logos: &dyn LogoFinder,
) -> (bool, Option<String>) {
    if entity.logo_url.is_some() {
        return (false, entity.logo_url.clone());
    }
    let Some(domain) = entity.domain.as_deref() else {
        return (false, None);
    };

    match logos.find_logo(domain).await {
        Ok(Some(url)) => {
            if let Err(e) = store.set_logo_url(entity.id, &url).await {
                warn!(legal_entity_id = %entity.id, error = %e, "Failed to store logo URL");
                return (false, None);
            }
            debug!(legal_entity_id = %entity.id, url = %url, "Logo fetched");
            (true, Some(url))
        }
        Ok(None) => (false, None),
        Err(e) => {
            warn!(legal_entity_id = %entity.id, error = %e, "Logo lookup failed");
            (false, None)
        }
    }
}
