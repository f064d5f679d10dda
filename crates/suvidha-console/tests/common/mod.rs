//! Common test utilities for console integration tests

#![allow(dead_code, clippy::unwrap_used)]

use serde_json::{Value, json};
use std::sync::{Arc, Once};
use suvidha_console::AppState;
use suvidha_core::{Config, Session, User};
use suvidha_session::MemoryStore;
use wiremock::MockServer;

pub const KEY: &str = "admin-auth-storage";
pub const ADMIN_TOKEN: &str = "tok-admin";

static INIT_LOGGER: Once = Once::new();

/// Initialize test logging (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Console state wired to a mock gateway and an in-memory store
pub struct TestConsole {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestConsole {
    pub async fn start() -> Self {
        init_test_logging();

        let server = MockServer::start().await;
        let mut config = Config::default();
        config.api.base_url = format!("{}/api", server.uri());

        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_store(config, store.clone()).unwrap();

        Self {
            server,
            store,
            state,
        }
    }

    /// Store an administrator session as if login had completed
    pub fn login_admin(&self) {
        self.state
            .session
            .login(Session::new(ADMIN_TOKEN, User::admin(1)))
            .unwrap();
    }

    /// Authorization headers of every request the gateway received
    pub async fn authorization_headers(&self) -> Vec<Option<String>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| {
                request
                    .headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            })
            .collect()
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

pub fn metrics_json() -> Value {
    json!({
        "complaints": { "total": 8, "resolved": 6, "active": 2 },
        "bills": {
            "totalAttempts": 10,
            "successfulPayments": 9,
            "revenueCollected": 1520.5
        }
    })
}

pub fn complaint_json(id: i64, status: &str, priority: &str) -> Value {
    json!({
        "id": id,
        "referenceNumber": format!("GRV-2024-{id:04}"),
        "category": "WATER_SUPPLY",
        "description": "No water since Monday",
        "priority": priority,
        "status": status,
        "createdAt": "2024-03-15T10:00:00Z"
    })
}
