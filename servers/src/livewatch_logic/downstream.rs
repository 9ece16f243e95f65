use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use lib_livewatch::core::{Dispatcher, Scheduler};

use crate::livewatch_logic::model::ServerMessage;

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

/// Shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub scheduler: Scheduler,
}

/// `/ws` and `/health`; every other path is a static file from `public_dir`.
pub fn router(state: AppState, public_dir: &Path) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(public_dir))
        .layer(cors)
        .with_state(state)
}

/// Serves until `shutdown` resolves, then drains open connections.
pub async fn run<F>(port: u16, public_dir: &Path, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Downstream server listening on {}", addr);

    axum::serve(listener, router(state, public_dir))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Downstream server failed")?;

    info!("Downstream server shut down.");
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let client_id = format!("ws-{}", NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed));
    let mut frames = state.dispatcher.add_client(&client_id);

    // A late joiner should not wait for the next timer tick.
    let outcome = state.scheduler.trigger();
    debug!(client = %client_id, ?outcome, "refresh requested on connect");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Nothing to read from clients; pings are answered by axum.
                Some(Ok(_)) => {}
            },
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                let text = match ServerMessage::status_update(&frame).to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        error!(cycle = frame.cycle, "Failed to serialize status update: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break; // client disconnected
                }
            }
        }
    }

    state.dispatcher.remove_client(&client_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use lib_livewatch::core::{CycleJob, SnapshotSink};
    use lib_livewatch::{CreatorSnapshot, RosterEntry};
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Publishes a one-creator snapshot without touching the network.
    struct FixedCycle {
        sink: Arc<Dispatcher>,
    }

    #[async_trait]
    impl CycleJob for FixedCycle {
        async fn run_cycle(&self) {
            let mut record = CreatorSnapshot::neutral(&RosterEntry::new("A", "a_tw", ""));
            record.twitch_login = "a_tw".into();
            record.twitch_live = true;
            self.sink.publish(1, vec![record]);
        }
    }

    async fn spawn_server(public_dir: &Path) -> (SocketAddr, Arc<Dispatcher>, oneshot::Sender<()>) {
        let dispatcher = Arc::new(Dispatcher::new());
        let scheduler = Scheduler::new(Arc::new(FixedCycle { sink: dispatcher.clone() }));
        let state = AppState {
            dispatcher: dispatcher.clone(),
            scheduler,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let app = router(state, public_dir);
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    rx.await.ok();
                })
                .await
                .unwrap();
        });
        (addr, dispatcher, tx)
    }

    #[tokio::test]
    async fn test_new_websocket_client_receives_status_update() {
        let public = tempfile::tempdir().unwrap();
        let (addr, dispatcher, shutdown) = spawn_server(public.path()).await;

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no status update")
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(message.to_text().unwrap()).unwrap();

        assert_eq!(value["type"], "statusUpdate");
        assert_eq!(value["data"][0]["name"], "A");
        assert_eq!(value["data"][0]["twitchLive"], true);
        assert!(value["data"][0]["videoId"].is_null());
        assert_eq!(dispatcher.client_count(), 1);

        drop(ws);
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_health_and_static_files() {
        let public = tempfile::tempdir().unwrap();
        std::fs::write(public.path().join("index.html"), "<h1>live</h1>").unwrap();
        let (addr, _, shutdown) = spawn_server(public.path()).await;

        let health = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert!(health.status().is_success());
        assert_eq!(health.text().await.unwrap(), "OK");

        let index = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(index.text().await.unwrap(), "<h1>live</h1>");

        let missing = reqwest::get(format!("http://{}/nope.js", addr)).await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_bundled_ui_never_renders_snapshot_fields_as_markup() {
        let public = Path::new(env!("CARGO_MANIFEST_DIR")).join("../public");
        let (addr, _, shutdown) = spawn_server(&public).await;

        let page = reqwest::get(format!("http://{}/", addr)).await.unwrap().text().await.unwrap();
        assert!(page.contains("statusUpdate"));
        assert!(page.contains("textContent"));
        assert!(!page.contains("innerHTML"));

        let _ = shutdown.send(());
    }
}
