//! End-to-end tests for camera-node against a real central server.
//!
//! The central router runs on a local port; the node announces over HTTP with
//! `HttpAnnouncer`, and the central prober checks the node's own router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use camera_node::{
    router as node_router, ClientConfig, ClientPhase, HttpAnnouncer, NodeIdentity, NodeState,
    RegistrationClient,
};
use central_server::{router as server_router, AppState, HttpHealthCheck};
use registry_core::{
    Clock, HealthProber, ManualClock, PeerStatus, PeerStore, ProbeConfig, Resolution,
};
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Helpers
// ============================================================================

/// Serve `app` on a random local port.
async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    serve_on(listener, app)
}

fn serve_on(listener: TcpListener, app: Router) -> SocketAddr {
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Central server with a manual clock.
async fn central() -> (SocketAddr, Arc<PeerStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let store = Arc::new(PeerStore::new(clock.clone()));
    let state = Arc::new(AppState {
        store: store.clone(),
        heartbeat_timeout: TIMEOUT,
    });
    let addr = serve(server_router(state)).await;
    (addr, store, clock)
}

fn node(id: &str, port: u16) -> Arc<NodeState> {
    Arc::new(NodeState::new(NodeIdentity {
        id: id.into(),
        name: format!("camera-{}", id),
        port,
        resolution: Resolution(1280, 720),
        ip_override: Some("127.0.0.1".into()),
    }))
}

fn announcer(server: SocketAddr) -> HttpAnnouncer {
    HttpAnnouncer::new(&format!("http://{}", server), Duration::from_secs(2)).unwrap()
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_node_registers_and_is_listed() {
    let (server, store, _clock) = central().await;
    let node = node("cam1", 8000);
    let mut client =
        RegistrationClient::new(announcer(server), node.clone(), ClientConfig::default());

    let delay = client.attempt().await;

    assert_eq!(delay, Duration::from_secs(30));
    assert_eq!(client.phase(), ClientPhase::Waiting(Duration::from_secs(30)));
    let record = store.get("cam1").expect("node should be registered");
    assert_eq!(record.name, "camera-cam1");
    assert_eq!(record.ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(record.resolution, Some(Resolution(1280, 720)));
}

#[tokio::test]
async fn test_unreachable_server_backs_off() {
    // Reserve a port and release it so nothing is listening there
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let mut client =
        RegistrationClient::new(announcer(closed), node("cam1", 8000), ClientConfig::default());

    assert_eq!(client.attempt().await, Duration::from_secs(5));
    assert_eq!(client.attempt().await, Duration::from_secs(10));
    assert_eq!(client.failures(), 2);
}

#[tokio::test]
async fn test_server_coming_up_later_registers_node() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client =
        RegistrationClient::new(announcer(addr), node("late", 8000), ClientConfig::default());
    assert_eq!(client.attempt().await, Duration::from_secs(5));

    // Bring the central server up on the same port
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(PeerStore::new(clock));
    let state = Arc::new(AppState {
        store: store.clone(),
        heartbeat_timeout: TIMEOUT,
    });
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_on(listener, server_router(state));

    assert_eq!(client.attempt().await, Duration::from_secs(30));
    assert_eq!(client.failures(), 0);
    assert!(store.get("late").is_some());
}

// ============================================================================
// Health probing
// ============================================================================

#[tokio::test]
async fn test_central_probe_follows_node_status() {
    let (server, store, clock) = central().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let node_port = listener.local_addr().unwrap().port();
    let node = node("cam1", node_port);
    serve_on(listener, node_router(node.clone()));
    node.set_status(PeerStatus::Running);

    let mut client =
        RegistrationClient::new(announcer(server), node.clone(), ClientConfig::default());
    client.attempt().await;

    let check = HttpHealthCheck::new(Duration::from_secs(2)).unwrap();
    let prober = HealthProber::new(store.clone(), check, ProbeConfig::default());

    prober.probe_cycle(clock.now_ms()).await;
    assert_eq!(store.get("cam1").unwrap().status, PeerStatus::Running);

    node.set_status(PeerStatus::Error);
    clock.advance(31_000);
    prober.probe_cycle(clock.now_ms()).await;
    assert_eq!(store.get("cam1").unwrap().status, PeerStatus::Error);
}
