//! Shared harness for the gateway API integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cangw_api::{create_router, AppState};
use cangw_bus::{MockConfig, MockTransport, TransportHandle};
use cangw_core::{
    AllowList, CanLink, CommandGateway, DatabaseLoader, FileDatabaseLoader, Parameter,
    ParameterStore, StaticDatabaseLoader,
};
use cangw_dbc::SignalDatabase;
use tokio::net::TcpListener;

pub const BODY_YAML: &str = r#"
meta:
  name: Body CAN
messages:
  - name: Engine_Status
    frame_id: 0x0C0
    length: 4
    signals:
      - name: Engine_RPM
        start_bit: 0
        length: 16
        scale: 0.25
        max: 16383.75
      - name: Coolant_Temp
        start_bit: 16
        length: 8
        offset: -40
        initial: 20
  - name: Lamp_Control
    frame_id: 0x200
    length: 2
    signals:
      - name: Lamp_On
        start_bit: 0
        length: 1
      - name: Brightness
        start_bit: 8
        length: 8
        min: 0
        max: 100
  - name: Diag_Request
    frame_id: 0x7DF
    length: 1
    signals:
      - name: Service
        start_bit: 0
        length: 8
"#;

/// A gateway served on an ephemeral port, shut down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub mock: Arc<MockTransport>,
    pub link: Arc<CanLink>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Gateway over [`BODY_YAML`] allowing Engine_Status and Lamp_Control
    pub async fn start() -> Self {
        let database = SignalDatabase::from_yaml(BODY_YAML).expect("valid test database");
        Self::start_with_loader(Box::new(StaticDatabaseLoader::new(database))).await
    }

    /// Gateway whose database file does not exist
    pub async fn start_without_database() -> Self {
        Self::start_with_loader(Box::new(FileDatabaseLoader::new(
            "/nonexistent/cangw/body.yaml",
        )))
        .await
    }

    async fn start_with_loader(loader: Box<dyn DatabaseLoader>) -> Self {
        let mock = Arc::new(MockTransport::new(&MockConfig::default()));
        let link = Arc::new(CanLink::new(
            Some(loader),
            TransportHandle::borrowed(mock.clone()),
            HashMap::new(),
        ));
        let parameters = Arc::new(
            ParameterStore::new(Some(link.clone())).with_initial([Parameter::new("speed", 0.0)]),
        );
        let gateway = Arc::new(CommandGateway::new(
            link.clone(),
            AllowList::parse("Engine_Status, Lamp_Control"),
            Some("Lamp_Control".to_string()),
        ));
        let router = create_router(AppState::new(gateway, parameters));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("client"),
            mock,
            link,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Read an SSE response until the accumulated body contains `needle`
pub async fn read_until(response: &mut reqwest::Response, needle: &str) -> String {
    let mut body = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !body.contains(needle) {
        let chunk = tokio::time::timeout_at(deadline, response.chunk())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {:?}, got {:?}", needle, body))
            .expect("stream error")
            .expect("stream ended");
        body.push_str(&String::from_utf8_lossy(&chunk));
    }
    body
}
