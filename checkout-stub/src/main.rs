use anyhow::Context;
use http_test_util::{StubRoutes, StubServer};
use hyper::{Method, StatusCode};
use mimalloc::MiMalloc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkout_stub=info,http_test_util=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    let addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let _guard = rt.enter();
    rt.block_on(run_app(&addr))
}

async fn run_app(addr: &str) -> anyhow::Result<()> {
    let routes = StubRoutes::new().route(Method::GET, "/checkout", StatusCode::OK);
    let server = StubServer::bind(addr, routes).await?;
    tracing::info!(addr = %server.local_addr(), "checkout stub listening");
    tokio::select! {
        res = server.join() => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("checkout stub shutting down");
            Ok(())
        }
    }
}
