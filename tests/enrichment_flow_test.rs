//! End-to-end orchestrator behavior over the in-memory store: module
//! ordering, idempotency, fault isolation and the side enrichments.

mod common;

use common::*;
use registry_enrichment::models::{IdentifierType, RegistrySource};
use registry_enrichment::{EnrichError, EnrichmentStatus};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn unknown_entity_is_the_only_fatal_error() {
    let store = MemoryStore::new();
    let service = service(store, empty_registries());

    let missing = Uuid::new_v4();
    let err = service.enrich(missing).await.unwrap_err();
    assert!(matches!(err, EnrichError::EntityNotFound(id) if id == missing));
}

#[tokio::test]
async fn dutch_chain_derives_rsin_vat_and_euid_from_a_kvk_number() {
    let store = MemoryStore::new();
    let entity = entity("NL", "Acme B.V.");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Kvk, "12345678");

    let mut kvk = MockCompanyRegistry::default();
    let mut record = company_record("12345678", "Acme B.V.");
    record.rsin = Some("001671248".to_string());
    kvk.by_number.insert("12345678".to_string(), record);

    let mut vies = MockVies::default();
    vies.valid.insert("NL:001671248B01".to_string());

    let mut registries = empty_registries();
    registries.kvk = Arc::new(kvk);
    registries.vies = Arc::new(vies);

    let service = service(store.clone(), registries);
    let summary = service.enrich(id).await.unwrap();

    let rsin = result_for(&summary, IdentifierType::Rsin);
    assert_eq!(rsin.status, EnrichmentStatus::Added);
    assert_eq!(rsin.value.as_deref(), Some("001671248"));

    let vat = result_for(&summary, IdentifierType::Vat);
    assert_eq!(vat.status, EnrichmentStatus::Added);
    assert_eq!(vat.value.as_deref(), Some("NL001671248B01"));

    let euid = result_for(&summary, IdentifierType::Euid);
    assert_eq!(euid.status, EnrichmentStatus::Added);
    assert_eq!(euid.value.as_deref(), Some("NL.KVK.12345678"));

    // The live KVK response was cached as a snapshot, and the VIES
    // confirmation was kept alongside the derived VAT number.
    assert!(store.snapshot(id, RegistrySource::Kvk).is_some());
    let vies_snapshot = store.snapshot(id, RegistrySource::Vies).unwrap();
    assert_eq!(vies_snapshot.name.as_deref(), Some("Mock Trader"));

    // Nothing registered in GLEIF or the Peppol Directory.
    assert_eq!(
        result_for(&summary, IdentifierType::Lei).status,
        EnrichmentStatus::NotAvailable
    );
    assert_eq!(
        result_for(&summary, IdentifierType::Peppol).status,
        EnrichmentStatus::NotAvailable
    );
}

#[tokio::test]
async fn a_second_run_adds_nothing_and_duplicates_nothing() {
    let store = MemoryStore::new();
    let entity = entity("NL", "Acme B.V.");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Kvk, "12345678");

    let mut kvk = MockCompanyRegistry::default();
    let mut record = company_record("12345678", "Acme B.V.");
    record.rsin = Some("001671248".to_string());
    kvk.by_number.insert("12345678".to_string(), record);

    let mut vies = MockVies::default();
    vies.valid.insert("NL:001671248B01".to_string());

    let mut registries = empty_registries();
    registries.kvk = Arc::new(kvk);
    registries.vies = Arc::new(vies);

    let service = service(store.clone(), registries);
    service.enrich(id).await.unwrap();
    let second = service.enrich(id).await.unwrap();

    assert!(
        second.bucket(EnrichmentStatus::Added).is_empty(),
        "second run must not add identifiers: {:?}",
        second.results
    );
    assert!(second.bucket(EnrichmentStatus::Error).is_empty());
    assert_eq!(
        result_for(&second, IdentifierType::Rsin).status,
        EnrichmentStatus::Exists
    );
    assert_eq!(
        result_for(&second, IdentifierType::Vat).status,
        EnrichmentStatus::Exists
    );
    assert_eq!(
        result_for(&second, IdentifierType::Euid).status,
        EnrichmentStatus::Exists
    );

    for ty in [
        IdentifierType::Kvk,
        IdentifierType::Rsin,
        IdentifierType::Vat,
        IdentifierType::Euid,
    ] {
        assert_eq!(store.identifier_count(id, ty), 1, "duplicate {} rows", ty);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_runs_never_duplicate_identifiers() {
    let store = MemoryStore::new();
    let entity = entity("NL", "Acme B.V.");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Kvk, "12345678");

    let mut kvk = MockCompanyRegistry::default();
    let mut record = company_record("12345678", "Acme B.V.");
    record.rsin = Some("001671248".to_string());
    kvk.by_number.insert("12345678".to_string(), record);

    let mut vies = MockVies::default();
    vies.valid.insert("NL:001671248B01".to_string());

    let mut registries = empty_registries();
    registries.kvk = Arc::new(kvk);
    registries.vies = Arc::new(vies);

    let service = Arc::new(service(store.clone(), registries));
    let (first, second) = tokio::join!(
        tokio::spawn({
            let service = service.clone();
            async move { service.enrich(id).await }
        }),
        tokio::spawn({
            let service = service.clone();
            async move { service.enrich(id).await }
        }),
    );
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();

    // Exactly one active row per type, no matter how the runs interleaved.
    for ty in [
        IdentifierType::Kvk,
        IdentifierType::Rsin,
        IdentifierType::Vat,
        IdentifierType::Euid,
    ] {
        assert_eq!(store.identifier_count(id, ty), 1, "duplicate {} rows", ty);

        let added = [&first, &second]
            .iter()
            .flat_map(|s| s.results.iter())
            .filter(|r| r.identifier == ty && r.status == EnrichmentStatus::Added)
            .count();
        assert!(added <= 1, "{} reported added by both runs", ty);
    }

    assert!(first.bucket(EnrichmentStatus::Error).is_empty());
    assert!(second.bucket(EnrichmentStatus::Error).is_empty());
}

#[tokio::test]
async fn rsin_comes_from_the_cached_snapshot_before_any_live_call() {
    let store = MemoryStore::new();
    let entity = entity("NL", "Acme B.V.");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Kvk, "12345678");
    // RSIN only in the raw payload, the way older snapshots carry it.
    store.seed_snapshot(raw_snapshot(
        id,
        RegistrySource::Kvk,
        json!({"rsin": "001671248"}),
    ));

    let mut vies = MockVies::default();
    vies.valid.insert("NL:001671248B01".to_string());

    let mut registries = empty_registries();
    // A live KVK call would fail loudly; the cache must make it unnecessary.
    registries.kvk = Arc::new(MockCompanyRegistry {
        fail: true,
        ..MockCompanyRegistry::default()
    });
    registries.vies = Arc::new(vies);

    let service = service(store.clone(), registries);
    let summary = service.enrich(id).await.unwrap();

    let rsin = result_for(&summary, IdentifierType::Rsin);
    assert_eq!(rsin.status, EnrichmentStatus::Added);
    assert_eq!(rsin.value.as_deref(), Some("001671248"));
    assert_eq!(
        result_for(&summary, IdentifierType::Vat).status,
        EnrichmentStatus::Added
    );
}

#[tokio::test]
async fn a_gleif_outage_does_not_affect_the_other_modules() {
    let store = MemoryStore::new();
    let entity = entity("NL", "Acme B.V.");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Kvk, "12345678");

    let mut kvk = MockCompanyRegistry::default();
    let mut record = company_record("12345678", "Acme B.V.");
    record.rsin = Some("001671248".to_string());
    kvk.by_number.insert("12345678".to_string(), record);

    let mut vies = MockVies::default();
    vies.valid.insert("NL:001671248B01".to_string());

    let mut registries = empty_registries();
    registries.kvk = Arc::new(kvk);
    registries.vies = Arc::new(vies);
    registries.gleif = Arc::new(MockGleif {
        fail: true,
        ..MockGleif::default()
    });

    let service = service(store.clone(), registries);
    let summary = service.enrich(id).await.unwrap();

    let lei = result_for(&summary, IdentifierType::Lei);
    assert_eq!(lei.status, EnrichmentStatus::Error);
    assert!(lei.message.as_deref().unwrap().contains("mock outage"));

    // Everything around the failing module still completed.
    assert_eq!(
        result_for(&summary, IdentifierType::Rsin).status,
        EnrichmentStatus::Added
    );
    assert_eq!(
        result_for(&summary, IdentifierType::Vat).status,
        EnrichmentStatus::Added
    );
    assert_eq!(
        result_for(&summary, IdentifierType::Euid).status,
        EnrichmentStatus::Added
    );
}

#[tokio::test]
async fn vat_outcome_is_reported_for_countries_without_a_derivation() {
    let store = MemoryStore::new();
    let entity = entity("FR", "Société Exemple");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Siren, "552100554");

    let service = service(store.clone(), empty_registries());
    let summary = service.enrich(id).await.unwrap();

    let vat = result_for(&summary, IdentifierType::Vat);
    assert_eq!(vat.status, EnrichmentStatus::NotAvailable);
    assert!(vat.message.as_deref().unwrap().contains("only NL"));

    // The generic EUID rule still applies.
    let euid = result_for(&summary, IdentifierType::Euid);
    assert_eq!(euid.status, EnrichmentStatus::Added);
    assert_eq!(euid.value.as_deref(), Some("FR.RCS.552100554"));
}

#[tokio::test]
async fn an_existing_vat_number_is_reported_as_such_everywhere() {
    let store = MemoryStore::new();
    let entity = entity("DK", "Eksempel ApS");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Vat, "DK12345678");

    let service = service(store.clone(), empty_registries());
    let summary = service.enrich(id).await.unwrap();

    assert_eq!(
        result_for(&summary, IdentifierType::Vat).status,
        EnrichmentStatus::Exists
    );
}

#[tokio::test]
async fn entity_fields_are_synced_from_the_kvk_snapshot() {
    let store = MemoryStore::new();
    let entity = entity("NL", "Acme");
    let id = entity.id;
    store.add_entity(entity);
    store.seed_identifier(id, IdentifierType::Kvk, "12345678");

    let mut kvk = MockCompanyRegistry::default();
    let mut record = company_record("12345678", "Acme Besloten Vennootschap B.V.");
    record.rsin = Some("001671248".to_string());
    record.address = Some("Keizersgracht 1".to_string());
    record.city = Some("Amsterdam".to_string());
    kvk.by_number.insert("12345678".to_string(), record);

    let mut vies = MockVies::default();
    vies.valid.insert("NL:001671248B01".to_string());

    let mut registries = empty_registries();
    registries.kvk = Arc::new(kvk);
    registries.vies = Arc::new(vies);

    let service = service(store.clone(), registries);
    let summary = service.enrich(id).await.unwrap();

    assert!(summary.company_details_updated);
    assert!(summary.updated_fields.contains(&"name".to_string()));
    assert!(summary.updated_fields.contains(&"address".to_string()));
    assert!(summary.updated_fields.contains(&"city".to_string()));

    let entity = store.entity(id).unwrap();
    assert_eq!(entity.name, "Acme Besloten Vennootschap B.V.");
    assert_eq!(entity.city.as_deref(), Some("Amsterdam"));
}

#[tokio::test]
async fn a_logo_is_fetched_once_and_kept() {
    let store = MemoryStore::new();
    let mut entity = entity("DK", "Eksempel ApS");
    entity.domain = Some("eksempel.dk".to_string());
    let id = entity.id;
    store.add_entity(entity);

    let mut registries = empty_registries();
    registries.logos = Arc::new(FixedLogo("https://logos.test/eksempel.png".to_string()));

    let service = service(store.clone(), registries);
    let summary = service.enrich(id).await.unwrap();

    assert!(summary.logo_fetched);
    assert_eq!(
        summary.logo_url.as_deref(),
        Some("https://logos.test/eksempel.png")
    );
    assert_eq!(
        store.entity(id).unwrap().logo_url.as_deref(),
        Some("https://logos.test/eksempel.png")
    );

    // Re-running must not fetch again: the stored URL is reported instead.
    let second = service.enrich(id).await.unwrap();
    assert!(!second.logo_fetched);
    assert_eq!(
        second.logo_url.as_deref(),
        Some("https://logos.test/eksempel.png")
    );
}

#[tokio::test]
async fn entities_without_a_domain_skip_the_logo_lookup() {
    let store = MemoryStore::new();
    let entity = entity("DK", "Eksempel ApS");
    let id = entity.id;
    store.add_entity(entity);

    let mut registries = empty_registries();
    registries.logos = Arc::new(FixedLogo("https://logos.test/never.png".to_string()));

    let service = service(store.clone(), registries);
    let summary = service.enrich(id).await.unwrap();

    assert!(!summary.logo_fetched);
    assert!(store.entity(id).unwrap().logo_url.is_none());
}
