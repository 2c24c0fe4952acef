//! Work ingestion integration tests
//!
//! Full pipeline runs against an in-memory catalog with authority
//! enrichment disabled.

mod helpers;

use folio_ingest::db::{agents, dates, identifiers, instances, OwnerKind};
use folio_ingest::models::{DateType, IdentifierRecord, InstanceRecord, WorkRecord};
use folio_ingest::IngestError;
use helpers::{agent, count_rows, create_test_db, instance, memory_pool, moby_dick, test_ingester};

#[tokio::test]
async fn tc_first_ingest_creates_everything() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let report = ingester.ingest(moby_dick()).await.unwrap();

    assert!(report.work_created);
    assert_eq!(report.agents_created, 3);
    assert_eq!(report.agents_matched, 0);
    assert_eq!(report.instances_created, 2);
    assert_eq!(report.instances_failed, 0);

    assert_eq!(count_rows(&pool, "works").await, 1);
    assert_eq!(count_rows(&pool, "instances").await, 2);
    // Birth, death and two publication dates
    assert_eq!(count_rows(&pool, "date_ranges").await, 4);
}

#[tokio::test]
async fn tc_reingest_is_idempotent() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let first = ingester.ingest(moby_dick()).await.unwrap();
    let tables = [
        "works",
        "instances",
        "agents",
        "agent_aliases",
        "identifiers",
        "work_identifiers",
        "instance_identifiers",
        "work_agents",
        "instance_agents",
        "date_ranges",
    ];
    let mut before = Vec::new();
    for table in tables {
        before.push(count_rows(&pool, table).await);
    }

    let second = ingester.ingest(moby_dick()).await.unwrap();

    assert_eq!(second.work_id, first.work_id);
    assert!(!second.work_created);
    assert_eq!(second.agents_created, 0);
    assert_eq!(second.agents_matched, 3);
    assert_eq!(second.instances_created, 0);
    assert_eq!(second.instances_merged, 2);

    for (table, expected) in tables.iter().zip(before) {
        assert_eq!(count_rows(&pool, table).await, expected, "row count changed in {}", table);
    }
}

#[tokio::test]
async fn tc_reingest_without_work_identifiers_is_idempotent() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let walden = || WorkRecord {
        title: "Walden".to_string(),
        instances: vec![instance("Boston", "Ticknor and Fields", "1854", &[("oclc", "555")])],
        ..Default::default()
    };

    let first = ingester.ingest(walden()).await.unwrap();
    let second = ingester.ingest(walden()).await.unwrap();

    assert_eq!(second.work_id, first.work_id);
    assert!(!second.work_created);
    assert_eq!(second.instances_merged, 1);
    assert_eq!(second.instances_created, 0);
    assert_eq!(count_rows(&pool, "works").await, 1);
    assert_eq!(count_rows(&pool, "instances").await, 1);
}

#[tokio::test]
async fn tc_instance_classification_code_does_not_match_work() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let first = ingester.ingest(moby_dick()).await.unwrap();

    let unrelated = WorkRecord {
        title: "Redburn".to_string(),
        instances: vec![instance("London", "Richard Bentley", "1849", &[("ddc", "813.3")])],
        ..Default::default()
    };
    let second = ingester.ingest(unrelated).await.unwrap();

    assert_ne!(second.work_id, first.work_id);
    assert!(second.work_created);
}

#[tokio::test]
async fn tc_work_found_by_identifier_despite_new_title() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let first = ingester.ingest(moby_dick()).await.unwrap();

    let other_source = WorkRecord {
        title: "Moby Dick; or, The Whale".to_string(),
        language: Some("eng".to_string()),
        identifiers: vec![IdentifierRecord::new("OCLC", "work-10001")],
        ..Default::default()
    };
    let second = ingester.ingest(other_source).await.unwrap();

    assert_eq!(second.work_id, first.work_id);
    assert!(!second.work_created);
    assert_eq!(count_rows(&pool, "works").await, 1);
}

#[tokio::test]
async fn tc_classification_code_alone_does_not_match_work() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let first = ingester.ingest(moby_dick()).await.unwrap();

    let unrelated = WorkRecord {
        title: "Pierre".to_string(),
        identifiers: vec![IdentifierRecord::new("ddc", "813.3")],
        ..Default::default()
    };
    let second = ingester.ingest(unrelated).await.unwrap();

    assert_ne!(second.work_id, first.work_id);
    assert!(second.work_created);
}

#[tokio::test]
async fn tc_instance_merged_across_sources() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let first = ingester.ingest(moby_dick()).await.unwrap();

    let mut observed = instance("New York", "Harper & Brothers", "1851", &[("lccn", "2222"), ("isbn", "9990001")]);
    observed.extent = Some("xxiii, 635 p.".to_string());
    let second_source = WorkRecord {
        title: "Moby-Dick".to_string(),
        identifiers: vec![IdentifierRecord::new("oclc", "work-10001")],
        instances: vec![observed],
        ..Default::default()
    };
    let report = ingester.ingest(second_source).await.unwrap();

    assert_eq!(report.instances_merged, 1);
    assert_eq!(report.instances_created, 0);

    let mut conn = pool.acquire().await.unwrap();
    let stored = instances::instances_for_work(&mut conn, first.work_id).await.unwrap();
    assert_eq!(stored.len(), 2);

    let merged = &stored[0];
    assert_eq!(merged.extent.as_deref(), Some("xxiii, 635 p."));
    let ids = identifiers::identifiers_for(&mut conn, OwnerKind::Instance, merged.guid)
        .await
        .unwrap();
    let keys: Vec<String> = ids.iter().map(IdentifierRecord::key).collect();
    assert_eq!(keys, vec!["oclc/1111", "lccn/2222", "isbn/9990001"]);
}

#[tokio::test]
async fn tc_instances_within_one_record_deduplicate() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let record = WorkRecord {
        title: "Typee".to_string(),
        instances: vec![
            instance("London", "John Murray", "1846", &[("oclc", "500")]),
            instance("London", "John Murray", "1846", &[("oclc", "500"), ("isbn", "600")]),
            instance("New York", "Wiley and Putnam", "1846", &[("oclc", "700")]),
        ],
        ..Default::default()
    };

    let report = ingester.ingest(record).await.unwrap();

    assert_eq!(report.instances_created, 2);
    assert_eq!(report.instances_merged, 1);
    assert_eq!(count_rows(&pool, "instances").await, 2);
}

#[tokio::test]
async fn tc_empty_agent_name_skips_only_that_agent() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let record = WorkRecord {
        title: "Omoo".to_string(),
        agents: vec![agent(" [ ] ", "author"), agent("Melville, Herman", "author")],
        ..Default::default()
    };

    let report = ingester.ingest(record).await.unwrap();

    assert_eq!(report.agents_skipped, 1);
    assert_eq!(report.agents_created, 1);
    assert_eq!(count_rows(&pool, "agents").await, 1);
}

#[tokio::test]
async fn tc_missing_title_is_rejected() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let err = ingester.ingest(WorkRecord::default()).await.unwrap_err();

    assert!(matches!(err, IngestError::MissingTitle));
    assert_eq!(count_rows(&pool, "works").await, 0);
}

#[tokio::test]
async fn tc_failed_instance_is_rolled_back_and_skipped() {
    let pool = memory_pool().await;
    sqlx::query(
        r#"
        CREATE TRIGGER reject_nowhere BEFORE INSERT ON instances
        WHEN NEW.pub_place = 'Nowhere'
        BEGIN
            SELECT RAISE(ABORT, 'rejected by test trigger');
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    let ingester = test_ingester(&pool);

    let record = WorkRecord {
        title: "Mardi".to_string(),
        instances: vec![
            instance("Nowhere", "Ghost Press", "1849", &[("oclc", "900")]),
            instance("London", "Richard Bentley", "1849", &[("oclc", "901")]),
        ],
        ..Default::default()
    };

    let report = ingester.ingest(record).await.unwrap();

    assert_eq!(report.instances_failed, 1);
    assert_eq!(report.instances_created, 1);
    assert_eq!(count_rows(&pool, "instances").await, 1);
    assert_eq!(count_rows(&pool, "instance_identifiers").await, 1);
}

#[tokio::test]
async fn tc_publication_date_normalized_on_instance() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let record = WorkRecord {
        title: "The Confidence-Man".to_string(),
        instances: vec![InstanceRecord {
            pub_date: Some("[185?]".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };

    let report = ingester.ingest(record).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let stored = instances::instances_for_work(&mut conn, report.work_id).await.unwrap();
    let date = dates::load_date(&mut conn, OwnerKind::Instance, stored[0].guid, &DateType::Publication)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(date.display, "185?");
    assert_eq!(date.lower().map(|d| d.to_string()), Some("1849-01-01".to_string()));
    assert_eq!(date.upper().map(|d| d.to_string()), Some("1851-12-31".to_string()));
}

#[tokio::test]
async fn tc_agents_shared_across_works() {
    let pool = memory_pool().await;
    let ingester = test_ingester(&pool);

    let first = ingester.ingest(moby_dick()).await.unwrap();

    let mut author = agent("Melville, Herman", "author");
    author.viaf = Some("27068555".to_string());
    let bartleby = WorkRecord {
        title: "Bartleby, the Scrivener".to_string(),
        agents: vec![author],
        ..Default::default()
    };
    let second = ingester.ingest(bartleby).await.unwrap();

    assert_ne!(first.work_id, second.work_id);
    assert_eq!(second.agents_matched, 1);

    let mut conn = pool.acquire().await.unwrap();
    let melville = agents::find_by_authority(&mut conn, Some("27068555"), None)
        .await
        .unwrap();
    assert_eq!(melville.len(), 1);
    let roles = agents::roles_for(&mut conn, OwnerKind::Work, second.work_id, melville[0].guid)
        .await
        .unwrap();
    assert!(roles.contains("author"));
}

#[tokio::test]
async fn tc_on_disk_catalog_persists_between_pools() {
    let (temp_dir, pool) = create_test_db().await.unwrap();
    let report = test_ingester(&pool).ingest(moby_dick()).await.unwrap();
    pool.close().await;

    let reopened = folio_common::db::init_database(&temp_dir.path().join("test_folio.db"))
        .await
        .unwrap();
    let second = test_ingester(&reopened).ingest(moby_dick()).await.unwrap();

    assert_eq!(second.work_id, report.work_id);
    assert!(!second.work_created);
}
