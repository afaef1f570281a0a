use std::sync::Arc;

use innoverse_core::MockClock;
use innoverse_domain::ClientConfig;
use innoverse_infra::database::{DbManager, SqliteKeyValueStore};
use innoverse_infra::InnoverseClient;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock backend plus a client wired to it over a temporary SQLite store.
///
/// The temp directory lives as long as the backend so the database file
/// survives for the whole test.
pub struct TestBackend {
    pub server: MockServer,
    pub client: InnoverseClient,
    pub clock: MockClock,
    pub db: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(customize: impl FnOnce(&mut ClientConfig)) -> Self {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db = Arc::new(
            DbManager::open(temp_dir.path().join("innoverse.db"), 4)
                .expect("db manager should be created"),
        );
        let clock = MockClock::new();

        let mut config = ClientConfig::with_base_url(server.uri());
        config.prefetch_delay_ms = 10;
        customize(&mut config);

        let client = client_over(&db, &clock, config);
        Self { server, client, clock, db, _temp_dir: temp_dir }
    }

    /// A second client sharing this backend's database and clock, as after
    /// an app restart.
    pub fn restarted_client(&self) -> InnoverseClient {
        client_over(&self.db, &self.clock, self.client.config().clone())
    }

    pub fn store(&self) -> SqliteKeyValueStore {
        SqliteKeyValueStore::new(self.db.clone())
    }
}

fn client_over(db: &Arc<DbManager>, clock: &MockClock, config: ClientConfig) -> InnoverseClient {
    InnoverseClient::builder()
        .config(config)
        .store(Arc::new(SqliteKeyValueStore::new(db.clone())))
        .clock(Arc::new(clock.clone()))
        .build()
        .expect("client should build")
}

pub fn login_body(access: &str, refresh: &str) -> Value {
    json!({
        "access": access,
        "refresh": refresh,
        "user": {"id": 42, "username": "volunteer", "email": "volunteer@example.org"}
    })
}

/// Mount a successful `/login/` answering with the given tokens.
pub async fn mount_login(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body(access, refresh)))
        .mount(server)
        .await;
}
