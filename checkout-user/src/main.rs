use anyhow::Context;
use checkout_user::config::Cli;
use checkout_user::registry::default_registry;
use checkout_user::scenario::run;
use checkout_user::transport::{HyperTransport, RecordingTransport, Transport};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkout_user=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let _guard = rt.enter();
    rt.block_on(run_tester(cli))
}

async fn run_tester(cli: Cli) -> anyhow::Result<()> {
    let registry = default_registry()?;
    if cli.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }
    let mut profile = match &cli.user_class {
        Some(name) => registry.get(name)?,
        None => registry.first().context("No user classes registered")?,
    };
    if let Some(host) = &cli.host {
        profile = Arc::new(profile.as_ref().clone().with_host(host)?);
    }
    let options = cli.run_options()?;
    let transport: Arc<dyn Transport> = if cli.dry_run {
        Arc::new(RecordingTransport::new())
    } else {
        Arc::new(HyperTransport::new())
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_tx.send_replace(true);
        }
    });
    let report = run(profile, transport, options, stop_rx).await?;
    if cli.json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
    } else {
        println!("{report}");
    }
    Ok(())
}
