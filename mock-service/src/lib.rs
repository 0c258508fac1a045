use axum::{debug_handler, extract::Path, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub async fn run(addr: SocketAddr) {
    let app = Router::new()
        .route("/ok", get(ok))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/status/:code", get(status));

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

#[debug_handler]
pub async fn ok() -> &'static str {
    HIT_COUNT.fetch_add(1, Ordering::Relaxed);
    "ok"
}

#[debug_handler]
pub async fn delay(Path(delay_ms): Path<u64>) -> &'static str {
    HIT_COUNT.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    "ok"
}

#[debug_handler]
pub async fn status(Path(code): Path<u16>) -> StatusCode {
    HIT_COUNT.fetch_add(1, Ordering::Relaxed);
    debug!("MOCK SERVER ___ status {code}");
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/** Throughput printer **/

static HIT_COUNT: AtomicU64 = AtomicU64::new(0);

pub async fn hit_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let hits = HIT_COUNT.swap(0, Ordering::Relaxed);
        println!("{hits} hits/s");
    }
}
