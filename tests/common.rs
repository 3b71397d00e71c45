//! Common test utilities.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pressroom::event::event_bus::EventBus;
use pressroom::event::event_bus::RetryPolicy;
use pressroom::model::UserModel;
use pressroom::repository::Repository;
use pressroom::repository::table::Table;
use pressroom::service::Services;
use pressroom::subscriber;
use uuid::Uuid;

/// Sets up a temporary test database.
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("pressroom-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

/// Cleans up the test database file.
pub async fn teardown_db(db_path: PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let path = PathBuf::from(format!("{}{suffix}", db_path.display()));
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Event bus with all built-in subscribers and a short retry delay.
#[allow(dead_code)]
pub fn setup_bus(db: Arc<Repository>) -> Arc<EventBus> {
    let bus = EventBus::with_retry_policy(RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_millis(10),
    });
    subscriber::register_all(&bus, db).expect("Failed to register subscribers");
    Arc::new(bus)
}

#[allow(dead_code)]
pub fn setup_services(db: Arc<Repository>) -> (Services, Arc<EventBus>) {
    let bus = setup_bus(db.clone());
    (Services::new(db, bus.clone()), bus)
}

/// Inserts a user directly, bypassing registration signals.
#[allow(dead_code)]
pub async fn create_user(db: &Repository, username: &str) -> UserModel {
    let id = db
        .user
        .insert(&UserModel {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            nickname: username.to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to insert user");
    reload_user(db, id).await
}

#[allow(dead_code)]
pub async fn reload_user(db: &Repository, id: i64) -> UserModel {
    db.user
        .select(&id)
        .await
        .expect("Failed to select user")
        .expect("User not found")
}
