//! Test server harness.

use halal::config::Settings;
use halal::context::AppContext;
use halal::detection::MockLogoDetector;
use halal::embedding::{SentenceConfig, SentenceEmbedder};
use halal::knowledge::{HalalStatus, KbEntry, KnowledgeBase};
use halal::ocr::MockTextExtractor;
use halal_server::gateway::{HandlerState, create_router_with_state};
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub type MockContext = AppContext<MockLogoDetector, MockTextExtractor>;

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub port: u16,
    /// What the mock detector reports for every image.
    pub logo_detected: bool,
    /// Text the mock OCR returns.
    pub ocr_text: String,
    pub semantic_threshold: f32,
    pub top_k_chat_results: usize,
    /// Load the KB from files written to a temp dir instead of building it in memory.
    pub kb_from_disk: bool,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            logo_detected: false,
            ocr_text: "Ingredients: sugar, salt, water.".to_string(),
            semantic_threshold: 0.70,
            top_k_chat_results: 5,
            kb_from_disk: false,
        }
    }
}

impl TestServerConfig {
    pub fn with_logo(mut self) -> Self {
        self.logo_detected = true;
        self
    }

    pub fn with_ocr_text(mut self, text: impl Into<String>) -> Self {
        self.ocr_text = text.into();
        self
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub ctx: MockContext,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _temp_dir: Option<TempDir>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn find_available_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    Ok(addr.port())
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Reference rows shared by the integration tests.
pub fn test_entries() -> Vec<KbEntry> {
    vec![
        KbEntry::new("gelatin", "Gelatin (porcine)", HalalStatus::Haram),
        KbEntry::new("sugar salt water", "Sugar, salt, water", HalalStatus::Halal),
        KbEntry::new("e471 emulsifier", "E471 emulsifier", HalalStatus::Doubtful),
        KbEntry::new("carmine", "Carmine (E120)", HalalStatus::Haram),
    ]
}

fn stub_embedder() -> Result<SentenceEmbedder, ServerStartupError> {
    SentenceEmbedder::load(SentenceConfig::stub())
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))
}

/// Builds the KB in memory, or round-trips it through the on-disk format.
fn build_knowledge(
    from_disk: bool,
) -> Result<(KnowledgeBase, Option<TempDir>), ServerStartupError> {
    let knowledge = KnowledgeBase::from_entries(test_entries(), stub_embedder()?)
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    if !from_disk {
        return Ok((knowledge, None));
    }

    let temp_dir = TempDir::new()?;
    let table = temp_dir.path().join("kb_table.json");
    let embeddings = temp_dir.path().join("kb_embeddings.safetensors");
    knowledge
        .save(&table, &embeddings)
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let loaded = KnowledgeBase::load(&table, &embeddings, stub_embedder()?)
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    Ok((loaded, Some(temp_dir)))
}

/// Spawns a server whose detector and OCR are mocks and whose KB uses the stub embedder.
///
/// The returned [`TestServer`] exposes the context so tests can inspect mock call counts.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let port = if config.port == 0 {
        find_available_port().await?
    } else {
        config.port
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let (knowledge, _temp_dir) = build_knowledge(config.kb_from_disk)?;

    let settings = Settings {
        port: local_addr.port(),
        semantic_threshold: config.semantic_threshold,
        top_k_chat_results: config.top_k_chat_results,
        ..Settings::default()
    };

    let ctx = AppContext::new(
        settings,
        knowledge,
        MockLogoDetector::new(config.logo_detected),
        MockTextExtractor::new(config.ocr_text),
    );

    let app = create_router_with_state(HandlerState::new(ctx.clone()));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        ctx,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
        _temp_dir,
    })
}
