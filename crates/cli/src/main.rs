//! harbor: command-line access to the offline cache.
//!
//! Shares configuration loading (`HARBOR_*`, `HARBOR_CONFIG_FILE`) and the
//! SQLite store with the MCP server.

mod args;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use harbor_client::{FetchClient, FetchConfig, Network, ServiceWorker, WorkerOptions, canonicalize, install, serve};
use harbor_core::{AppConfig, CacheDb, CacheStorage, Request, Route};
use tracing_subscriber::EnvFilter;
use url::Url;

use args::{Cli, Commands, parse_header};

struct Context {
    storage: CacheStorage,
    network: Arc<dyn Network>,
    options: WorkerOptions,
}

impl Context {
    async fn build(config: &AppConfig) -> Result<Self> {
        let db = CacheDb::open(&config.db_path)
            .await
            .with_context(|| format!("opening {}", config.db_path.display()))?;
        tracing::debug!(db = %config.db_path.display(), origin = %config.app_origin, "cache opened");
        Ok(Self {
            storage: CacheStorage::new(Arc::new(db), config.vary_headers.clone()),
            network: Arc::new(FetchClient::new(FetchConfig::from_app_config(config))?),
            options: WorkerOptions::from_config(config)?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Route { url, method } => {
            let options = WorkerOptions::from_config(&config)?;
            let request = Request::new(&method, parse_url(&url)?);
            let rule = options.routes.matching_rule(&request.url).map_or("none", |r| r.name);
            let route = options.routes.classify(&request);
            match route {
                Route::Passthrough => println!("{route} (rule: {rule})"),
                Route::Handle { namespace, .. } => {
                    println!("{route} -> {} (rule: {rule})", options.namespaces.name(namespace));
                }
            }
        }
        Commands::Fetch { url, method, headers } => {
            let ctx = Context::build(&config).await?;
            let mut request = Request::new(&method, parse_url(&url)?);
            for raw in &headers {
                let Some((name, value)) = parse_header(raw) else {
                    bail!("invalid header {raw:?}, expected `name: value`");
                };
                request = request.with_header(name, value);
            }
            fetch(&ctx, &request).await?;
        }
        Commands::Install => {
            let ctx = Context::build(&config).await?;
            let report =
                install(&ctx.storage, ctx.network.as_ref(), &ctx.options.namespaces, &ctx.options.assets).await?;
            tracing::info!(
                static_cached = report.static_cached,
                external_cached = report.external_cached,
                "install finished"
            );
            println!("{}: {} cached", ctx.options.namespaces.static_ns, report.static_cached);
            if let Some(reason) = &report.static_skipped {
                println!("  skipped: {reason}");
            }
            println!("{}: {} cached", ctx.options.namespaces.dynamic_ns, report.external_cached);
            for (url, reason) in &report.external_failed {
                println!("  failed {url}: {reason}");
            }
        }
        Commands::Activate => {
            let ctx = Context::build(&config).await?;
            let worker = ServiceWorker::new(ctx.storage, ctx.network, ctx.options);
            let (installed, activated) = worker.start().await?;
            tracing::info!(version = worker.version(), deleted = activated.deleted.len(), "worker activated");
            println!(
                "{} activated: {} static, {} external cached",
                worker.version(),
                installed.static_cached,
                installed.external_cached
            );
            for name in &activated.deleted {
                println!("deleted {name}");
            }
        }
        Commands::Namespaces => {
            let ctx = Context::build(&config).await?;
            for name in ctx.storage.keys().await? {
                let entries = ctx.storage.backend().count_entries(&name).await?;
                let marker = if ctx.options.namespaces.is_current(&name) { "*" } else { " " };
                println!("{marker} {name}\t{entries}");
            }
        }
        Commands::Delete { namespace } => {
            let ctx = Context::build(&config).await?;
            if ctx.storage.delete(&namespace).await? {
                tracing::info!("deleted namespace {}", namespace);
                println!("deleted {namespace}");
            } else {
                println!("no namespace named {namespace}");
            }
        }
    }

    Ok(())
}

fn parse_url(raw: &str) -> Result<Url> {
    canonicalize(raw).with_context(|| format!("invalid url {raw:?}"))
}

/// Run one request through its route without a worker lifecycle.
async fn fetch(ctx: &Context, request: &Request) -> Result<()> {
    let route = ctx.options.routes.classify(request);
    tracing::info!("{} {} routed {}", request.method, request.url, route);

    let (source, response) = match route {
        Route::Passthrough => ("passthrough", ctx.network.fetch(request).await?),
        Route::Handle { strategy, namespace } => {
            let name = ctx.options.namespaces.name(namespace);
            let outcome =
                serve(strategy, &ctx.storage, name, request, ctx.network.as_ref(), &ctx.options.offline).await;
            (outcome.served.as_str(), outcome.response)
        }
    };

    eprintln!("{} {} [{route}, {source}]", response.status, response.status_text);
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response.body)?;
    stdout.flush()?;
    Ok(())
}
