//! lgk-testkit
//!
//! Shared fixtures for cross-crate scenario tests: in-memory dual stores,
//! canned users and catalog records, and collaborator doubles. The scenario
//! tests themselves live under `tests/`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tempfile::TempDir;

use lgk_schemas::{CatalogRecord, User};
use lgk_session::{
    ContentFetcher, FetchError, LessonPayload, LessonRequest, PaymentHandoff, SessionDeps,
};
use lgk_store::{user_key, DualStore, MemoryStore};

/// A fixed "now" for deterministic fixtures.
pub fn fixed_now() -> DateTime<Utc> {
    "2026-03-01T10:00:00Z".parse().expect("valid timestamp")
}

/// Fresh dual store over two in-memory tiers, with handles to both for
/// seeding and assertions.
pub fn memory_dual_store() -> (Arc<DualStore>, Arc<MemoryStore>, Arc<MemoryStore>) {
    let local = Arc::new(MemoryStore::new("local"));
    let remote = Arc::new(MemoryStore::new("remote"));
    let store = Arc::new(DualStore::new(local.clone(), remote.clone()));
    (store, local, remote)
}

/// Student account with the given balance, created a month before
/// [`fixed_now`] so first-session bonus logic stays out of the way.
pub fn student(id: &str, credits: u32) -> User {
    let mut user = User::new_student(id, "Asha", fixed_now() - chrono::Duration::days(30));
    user.credits = credits;
    user
}

/// Seed a user snapshot into the local cache so a session can load it.
pub async fn seed_user(store: &DualStore, user: &User) {
    store
        .write_local(
            &user_key(&user.id),
            serde_json::to_value(user).expect("encode user"),
        )
        .await
        .expect("seed user");
}

/// A catalog record carrying every tier of content.
pub fn full_catalog_record() -> CatalogRecord {
    CatalogRecord {
        free_notes_html: Some("<p>free notes</p>".to_string()),
        premium_notes_html: Some("<p>premium notes</p>".to_string()),
        ultra_pdf_link: Some("https://example.invalid/ultra.pdf".to_string()),
        free_video_link: Some("https://example.invalid/video".to_string()),
        ai_payload: Some(json!({ "mcqs": [{ "q": "2+2?", "a": "4" }] })),
        ..CatalogRecord::default()
    }
}

/// Let spawned background tasks (remote propagation, reconciler) run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

/// Content fetcher returning a fixed payload, or failing when configured.
pub struct StaticFetcher {
    pub payload: LessonPayload,
    pub fail: bool,
}

impl StaticFetcher {
    pub fn ok() -> Self {
        Self {
            payload: LessonPayload {
                title: Some("Generated lesson".to_string()),
                body: json!({ "sections": ["generated"] }),
                price: None,
            },
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: LessonPayload {
                title: None,
                body: json!(null),
                price: None,
            },
            fail: true,
        }
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch_lesson(&self, _request: &LessonRequest) -> Result<LessonPayload, FetchError> {
        if self.fail {
            Err(FetchError("backend unreachable".to_string()))
        } else {
            Ok(self.payload.clone())
        }
    }
}

/// Payment handoff double recording every external open.
#[derive(Default)]
pub struct RecordingPayments {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl PaymentHandoff for RecordingPayments {
    fn open_external(&self, message: &str, link: &str) {
        self.sent
            .lock()
            .expect("sent lock")
            .push((message.to_string(), link.to_string()));
    }
}

/// Session dependencies over a fresh in-memory dual store and a temp audit
/// log. Returns the temp dir so it outlives the session.
pub fn session_deps(
    store: Arc<DualStore>,
    fetcher: Arc<dyn ContentFetcher>,
) -> (SessionDeps, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let deps = SessionDeps {
        store,
        fetcher,
        payments: Arc::new(RecordingPayments::default()),
        audit_path: dir.path().join("activity.jsonl"),
    };
    (deps, dir)
}
