#![allow(dead_code)]

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tokio::sync::{Mutex, OnceCell};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;
use uuid::Uuid;

use cram::app::auth::AuthService;
use cram::config::AppConfig;
use cram::infra::db::Db;
use cram::infra::notify::{NewNotification, NotificationQueue};
use cram::AppState;

pub const DEFAULT_PASSWORD: &str = "testpassword123";

// ---------------------------------------------------------------------------
// TestApp — shared, lazily initialized once per test binary. Tests are
// skipped cleanly when TEST_DATABASE_URL is not exported.
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    // The dispatcher task is not running in tests; suites drain the queue
    // deterministically via `drain_notifications`.
    notifications_rx: Mutex<UnboundedReceiver<Vec<NewNotification>>>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn error_code(&self) -> String {
        self.json()["code"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub token: String,
}

static TEST_APP: OnceCell<Option<TestApp>> = OnceCell::const_new();

/// Get (or lazily create) the shared TestApp. `None` when no test database
/// is configured; callers should return early in that case.
pub async fn try_app() -> Option<&'static TestApp> {
    TEST_APP
        .get_or_init(|| async {
            match std::env::var("TEST_DATABASE_URL") {
                Ok(url) => Some(TestApp::setup(&url).await),
                Err(_) => {
                    eprintln!("TEST_DATABASE_URL not set, skipping integration test");
                    None
                }
            }
        })
        .await
        .as_ref()
}

impl TestApp {
    async fn setup(database_url: &str) -> Self {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .expect("cannot connect to test database");

        // ---- Run migrations ----
        let mut migration_files: Vec<_> = std::fs::read_dir("migrations")
            .expect("cannot read migrations/")
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
            .collect();
        migration_files.sort_by_key(|e| e.file_name());

        for entry in &migration_files {
            let sql = std::fs::read_to_string(entry.path())
                .unwrap_or_else(|_| panic!("cannot read {:?}", entry.path()));
            sqlx::raw_sql(&sql)
                .execute(&db_pool)
                .await
                .unwrap_or_else(|e| panic!("migration {:?} failed: {}", entry.file_name(), e));
        }

        // ---- Truncate all tables for clean test state ----
        sqlx::raw_sql(
            "DO $$ DECLARE r RECORD; BEGIN \
             FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = 'public') LOOP \
             EXECUTE 'TRUNCATE TABLE ' || quote_ident(r.tablename) || ' CASCADE'; \
             END LOOP; END $$;",
        )
        .execute(&db_pool)
        .await
        .expect("failed to truncate tables");

        db_pool.close().await;

        // ---- Build AppState via AppConfig (same code path as production) ----
        std::env::set_var("DATABASE_URL", database_url);
        std::env::set_var("DB_MAX_CONNECTIONS", "10");
        std::env::set_var("DB_CONNECT_TIMEOUT_SECONDS", "30");
        // Each #[tokio::test] creates a separate tokio runtime, but the pool
        // is shared via OnceCell.  Connections created in one runtime become
        // stale when that runtime is dropped.  Setting idle_timeout to 0 forces
        // the pool to discard all idle connections on acquire and create fresh
        // ones in the current runtime.
        std::env::set_var("DB_IDLE_TIMEOUT_SECONDS", "0");

        let config = AppConfig::from_env().expect("failed to build AppConfig");
        let db = Db::connect(&config.db).await.expect("Db::connect failed");
        let (notifications, notifications_rx) = NotificationQueue::new();

        let state = AppState {
            db,
            notifications,
            session_ttl_hours: config.session_ttl_hours,
            suspension_default_days: config.suspension_default_days,
        };

        let router = cram::http::router(state.clone());

        TestApp {
            router,
            state,
            notifications_rx: Mutex::new(notifications_rx),
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, None, token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    pub fn pool(&self) -> &PgPool {
        self.state.db.pool()
    }

    /// Create a user directly in the DB and issue a session token.
    pub async fn create_user(&self, suffix: &str) -> TestUser {
        self.create_user_with_role(suffix, "user").await
    }

    pub async fn create_admin(&self, suffix: &str) -> TestUser {
        self.create_user_with_role(suffix, "admin").await
    }

    async fn create_user_with_role(&self, suffix: &str, role: &str) -> TestUser {
        let unique = Uuid::new_v4().simple().to_string();
        let handle = format!("testuser_{}_{}", suffix, &unique[..8]);
        let email = format!("test_{}_{}@example.com", suffix, &unique[..8]);

        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let hash = Argon2::default()
            .hash_password(DEFAULT_PASSWORD.as_bytes(), &salt)
            .expect("password hash failed")
            .to_string();

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (handle, email, password_hash, role) \
             VALUES ($1, $2, $3, $4::user_role) RETURNING id",
        )
        .bind(&handle)
        .bind(&email)
        .bind(&hash)
        .bind(role)
        .fetch_one(self.pool())
        .await
        .expect("insert test user failed");

        let auth = AuthService::new(self.state.db.clone(), self.state.session_ttl_hours);
        let session = auth
            .issue_session(user_id)
            .await
            .expect("issue_session failed");

        TestUser {
            id: user_id,
            handle,
            email,
            token: session.token,
        }
    }

    /// Insert a public note directly in DB. Returns the note id.
    pub async fn create_note_for(&self, owner_id: Uuid) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO notes (owner_id, title, body) \
             VALUES ($1, 'test note', 'body') RETURNING id",
        )
        .bind(owner_id)
        .fetch_one(self.pool())
        .await
        .expect("insert test note failed")
    }

    pub async fn create_deck_for(&self, owner_id: Uuid) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO decks (owner_id, title, description) \
             VALUES ($1, 'test deck', 'about') RETURNING id",
        )
        .bind(owner_id)
        .fetch_one(self.pool())
        .await
        .expect("insert test deck failed")
    }

    /// Insert a report row directly, bypassing the API toggle.
    pub async fn insert_report(
        &self,
        reporter_id: Uuid,
        kind: &str,
        content_id: Uuid,
        reason: &str,
    ) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO reports (reporter_id, content_kind, content_id, reason) \
             VALUES ($1, $2::content_kind, $3, $4::report_reason) RETURNING id",
        )
        .bind(reporter_id)
        .bind(kind)
        .bind(content_id)
        .bind(reason)
        .fetch_one(self.pool())
        .await
        .expect("insert test report failed")
    }

    /// Force a user's trust fields directly in DB.
    pub async fn set_standing(
        &self,
        user_id: Uuid,
        score: i32,
        status: &str,
        suspended_until: Option<OffsetDateTime>,
    ) {
        sqlx::query(
            "UPDATE users SET score = $2, status = $3::account_status, suspended_until = $4 \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(score)
        .bind(status)
        .bind(suspended_until)
        .execute(self.pool())
        .await
        .expect("set standing failed");
    }

    /// Rewind the recovery clock without touching anything else.
    pub async fn set_updated_at_days_ago(&self, user_id: Uuid, days: i64) {
        sqlx::query(
            "UPDATE users SET updated_at = now() - make_interval(days => $2) WHERE id = $1",
        )
        .bind(user_id)
        .bind(days)
        .execute(self.pool())
        .await
        .expect("set updated_at failed");
    }

    pub async fn user_standing(&self, user_id: Uuid) -> (i32, String, Option<OffsetDateTime>) {
        let row = sqlx::query(
            "SELECT score, status::text AS status, suspended_until FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .expect("fetch user standing failed");
        (
            row.get("score"),
            row.get("status"),
            row.get("suspended_until"),
        )
    }

    pub async fn report_statuses(&self, kind: &str, content_id: Uuid) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT status::text FROM reports \
             WHERE content_kind = $1::content_kind AND content_id = $2 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(kind)
        .bind(content_id)
        .fetch_all(self.pool())
        .await
        .expect("fetch report statuses failed")
    }

    /// Drain the notification queue into the inbox table, standing in for
    /// the dispatcher task. Returns how many rows were written.
    pub async fn drain_notifications(&self) -> usize {
        let mut rx = self.notifications_rx.lock().await;
        let mut written = 0;
        while let Ok(batch) = rx.try_recv() {
            cram::jobs::notifier::deliver(&self.state.db, &batch)
                .await
                .expect("deliver notifications failed");
            written += batch.len();
        }
        written
    }

    pub async fn notification_kinds(&self, user_id: Uuid) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT kind FROM notifications WHERE user_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .expect("fetch notification kinds failed")
    }
}
