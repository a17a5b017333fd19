//! Client against a real server bound to a loopback port.

use std::sync::Arc;

use tempfile::{TempDir, tempdir};
use uuid::Uuid;

use still_api::{AppStateInner, Environment, router};
use still_client::bootstrap::resolve_user;
use still_client::device::DeviceStore;
use still_client::emotion::process_emotion_data;
use still_client::session::{Outcome, Phase, Session};
use still_client::{ApiClient, ClientError};
use still_db::Database;
use still_types::api::{CreateMoodRequest, UpdateMoodRequest};
use still_types::models::UrgeStatus;

async fn spawn_server() -> ApiClient {
    let db = Database::open_in_memory().unwrap();
    let app = router(AppStateInner::new(db, Environment::Development));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ApiClient::new(format!("http://{}/", addr))
}

fn temp_store() -> (TempDir, DeviceStore) {
    let dir = tempdir().unwrap();
    let store = DeviceStore::new(dir.path().join("identity.json"));
    (dir, store)
}

#[tokio::test]
async fn health_and_not_found_errors() {
    let client = spawn_server().await;
    assert_eq!(client.health().await.unwrap().status, "ok");

    let err = client.get_user_by_device_id("nobody").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Resource not found: User not found");

    let err = client.get_mood(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn bootstrap_registers_once_per_device() {
    let client = spawn_server().await;
    let (_dir, store) = temp_store();

    let identity = resolve_user(&client, &store).await.unwrap();
    let user = client.get_user_by_device_id(&identity.device_id).await.unwrap();
    assert_eq!(user.id, identity.user_id);

    // Losing the stored user ID finds the same user again.
    store.clear_user_id().await.unwrap();
    let again = resolve_user(&client, &store).await.unwrap();
    assert_eq!(again, identity);
}

#[tokio::test]
async fn session_reports_outcome_to_server() {
    let client = spawn_server().await;
    let (_dir, store) = temp_store();
    let identity = resolve_user(&client, &store).await.unwrap();

    let session = Session::with_delay(Arc::new(client.clone()), identity.user_id, 1);
    let mut rx = session.subscribe();
    session.start_delay().unwrap();
    rx.wait_for(|s| s.phase() == Phase::Free && s.urge_id().is_some())
        .await
        .unwrap();

    let urge = session.choose(Outcome::Peaceful).await.unwrap();
    assert_eq!(urge.status, UrgeStatus::Peaceful);
    assert_eq!(urge.user_id, Some(identity.user_id));
    session.close().await;

    let stats = client.get_urge_stats(Some(identity.user_id)).await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.recent[0].id, urge.id);

    let map = client.get_emotion_map(identity.user_id, 7).await.unwrap();
    assert_eq!(map.total_days, 1);
    assert_eq!(map.daily_data[0].counts.peaceful, 1);

    let days = process_emotion_data(&map.daily_data);
    assert!(days[0].intensity > 0.0);
}

#[tokio::test]
async fn mood_crud_through_client() {
    let client = spawn_server().await;
    let (_dir, store) = temp_store();
    let identity = resolve_user(&client, &store).await.unwrap();

    let mood = client
        .create_mood(&CreateMoodRequest {
            user_id: identity.user_id,
            text: "steady".into(),
            emoji: Some("🙂".into()),
        })
        .await
        .unwrap();
    assert_eq!(client.get_mood(mood.id).await.unwrap(), mood);

    let updated = client
        .update_mood(
            mood.id,
            &UpdateMoodRequest {
                text: "restless".into(),
                emoji: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "restless");
    assert_eq!(updated.emoji, None);

    let moods = client.get_user_moods(identity.user_id).await.unwrap();
    assert_eq!(moods.len(), 1);

    let deleted = client.delete_mood(mood.id).await.unwrap();
    assert!(deleted.success);
    assert!(client.get_user_moods(identity.user_id).await.unwrap().is_empty());

    let err = client
        .create_mood(&CreateMoodRequest {
            user_id: identity.user_id,
            text: String::new(),
            emoji: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}
