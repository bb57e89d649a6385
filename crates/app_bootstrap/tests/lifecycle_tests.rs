//! Start-up and tear-down against a real PostgreSQL instance
//!
//! Needs a Docker daemon; run with `cargo test -p app_bootstrap -- --ignored`.

use app_bootstrap::{AppConfig, Application, DatabaseSettings};
use core_kernel::OperationContext;
use test_utils::{EventFixtures, TestDatabase};

fn config_for(db: &TestDatabase) -> AppConfig {
    AppConfig {
        database: DatabaseSettings {
            url: db.url().to_string(),
            max_connections: 4,
            min_connections: 1,
            ..DatabaseSettings::default()
        },
        ..AppConfig::default()
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_init_serves_events_until_shutdown() {
    let db = TestDatabase::new().await.unwrap();
    let app = Application::init(config_for(&db)).await.unwrap();
    let ctx = OperationContext::new();

    let created = app
        .service()
        .create_and_associate_feeding_event(
            &ctx,
            EventFixtures::night_feed_event(),
            EventFixtures::night_feed(),
        )
        .await
        .unwrap();
    let fetched = app.service().get_feeding_event(&ctx, created.event_id()).await.unwrap();
    assert_eq!(fetched, created);

    let pool = app.pool().clone();
    app.shutdown().await;
    assert!(pool.is_closed());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_migrations_are_idempotent_across_restarts() {
    let db = TestDatabase::new().await.unwrap();

    let first = Application::init(config_for(&db)).await.unwrap();
    first.shutdown().await;

    let second = Application::init(config_for(&db)).await.unwrap();
    assert!(second.service().health_check().await.is_healthy());
    second.shutdown().await;
}
