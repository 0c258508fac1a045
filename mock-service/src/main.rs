use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    tokio::task::spawn(async { mock_service::hit_measure_task().await });

    let addr: SocketAddr = "0.0.0.0:3010".parse().unwrap();
    mock_service::run(addr).await;
}
