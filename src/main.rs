use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scene_sync::application::SyncSupervisor;
use scene_sync::domain::ports::{SearchSyncClient, SourceCollection};
use scene_sync::infrastructure::{
    create_pool, Config, FileTokenStore, InMemorySearchClient, QdrantSearchClient,
    RedisChangeFeed, RedisSourceStore, TextEmbedding,
};

#[derive(Debug, Default)]
struct Args {
    full_sync: bool,
    full_sync_only: bool,
    reset_token: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--full-sync" => args.full_sync = true,
            "--full-sync-only" => args.full_sync_only = true,
            "--reset-token" => args.reset_token = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watcher=debug,scene_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let args = parse_args()?;
    let config = Config::from_env();

    let tokens = FileTokenStore::new(&config.resume_token_path);
    if args.reset_token {
        tokens.clear();
    }

    // Startup is the only place a failure is fatal; past this point the
    // watcher degrades and retries instead of crashing.
    let pool = create_pool(&config.redis_url).context("cannot create redis pool")?;
    let source: Arc<dyn SourceCollection> =
        Arc::new(RedisSourceStore::new(pool.clone(), &config.source_mirror_key));
    source
        .ping()
        .await
        .context("cannot reach the document store")?;
    info!("document store connected");

    let search: Arc<dyn SearchSyncClient> = match config.backend.as_str() {
        "memory" => Arc::new(InMemorySearchClient::new()),
        _ => {
            let embedding = Arc::new(TextEmbedding::from_config(&config.embedding));
            Arc::new(
                QdrantSearchClient::new(
                    &config.qdrant_url,
                    &config.scenes_collection,
                    &config.contents_collection,
                    embedding,
                )
                .await
                .context("search backend setup failed")?,
            )
        }
    };
    info!(backend = %config.backend, "search backend ready");

    let feed = Arc::new(RedisChangeFeed::new(pool, &config.change_stream_key));
    let supervisor = SyncSupervisor::new(source, feed, search, tokens);

    if args.full_sync || args.full_sync_only {
        supervisor.full_sync().await?;
        if args.full_sync_only {
            return Ok(());
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    supervisor.run(shutdown_rx).await?;
    Ok(())
}
