//! Agent DevTools CLI - run an instrumented demo app, make tracked calls,
//! and pull exports from a running instance.

mod demo;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use devtools_client::{ClientConfig, HttpTransport, HyperTransport, TrackedTransport};
use devtools_proto::{CapturedRequest, DEBUG_PREFIX};
use devtools_server::{install, DevtoolsConfig};
use devtools_store::DevtoolsStore;
use http::{header, Method, Request};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Agent DevTools - capture HTTP traffic and UI annotations during development
#[derive(Parser, Debug)]
#[command(name = "agent-devtools")]
#[command(about = "Development-time request capture and annotation export", long_about = None)]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo app with devtools installed
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000", env = "AGENT_DEVTOOLS_BIND")]
        bind: SocketAddr,

        /// Run in development mode (devtools are inert otherwise)
        #[arg(long, env = "AGENT_DEVTOOLS_DEV")]
        dev: bool,

        /// Keep devtools off even in development mode
        #[arg(long)]
        disabled: bool,

        /// Mount point of the debug endpoints
        #[arg(long, default_value = DEBUG_PREFIX)]
        debug_prefix: String,
    },

    /// Make tracked HTTP calls and print what was captured
    Fetch {
        /// Target URLs, fetched concurrently
        #[arg(required = true)]
        urls: Vec<String>,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request body, sent as JSON
        #[arg(short, long)]
        body: Option<String>,

        /// Requests-ingest endpoint to forward captures to
        /// (e.g. http://127.0.0.1:3000/api/__agent/requests)
        #[arg(long, env = "AGENT_DEVTOOLS_INGEST")]
        ingest: Option<String>,
    },

    /// Print the export of a running instance
    Export {
        /// Base URL of the instrumented app
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Mount point of the debug endpoints
        #[arg(long, default_value = DEBUG_PREFIX)]
        debug_prefix: String,

        /// Print the markdown report instead of JSON
        #[arg(long)]
        markdown: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Serve {
            bind,
            dev,
            disabled,
            debug_prefix,
        } => serve(bind, dev, disabled, debug_prefix).await,
        Commands::Fetch {
            urls,
            method,
            body,
            ingest,
        } => fetch(urls, method, body, ingest).await,
        Commands::Export {
            server,
            debug_prefix,
            markdown,
        } => export(server, debug_prefix, markdown).await,
    }
}

async fn serve(bind: SocketAddr, dev: bool, disabled: bool, debug_prefix: String) -> Result<()> {
    let config = DevtoolsConfig::builder()
        .enabled(!disabled)
        .dev(dev)
        .debug_prefix(debug_prefix)
        .build()
        .context("Invalid devtools configuration")?;

    let store = DevtoolsStore::new();
    let app = install(demo::router(), &config, store.clone()).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!("Demo app listening on http://{}", bind);
    if config.is_active() {
        info!("   Requests: http://{}{}/requests", bind, config.debug_prefix);
        info!("   Export:   http://{}{}/export", bind, config.debug_prefix);
        info!("   Events:   http://{}{}/events", bind, config.debug_prefix);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let counts = store.counts();
    info!(
        "Stopped with {} client requests, {} server requests and {} annotations captured",
        counts.client, counts.server, counts.annotations
    );

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn fetch(
    urls: Vec<String>,
    method: String,
    body: Option<String>,
    ingest: Option<String>,
) -> Result<()> {
    let mut builder = ClientConfig::builder();
    if let Some(ingest) = ingest {
        builder = builder.ingest_url(ingest);
    }
    let config = builder.build().context("Invalid client configuration")?;

    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .context("Invalid HTTP method")?;

    let store = DevtoolsStore::new();
    let transport = TrackedTransport::new(HyperTransport::new(), config, store.clone());

    let mut requests = Vec::with_capacity(urls.len());
    for url in &urls {
        let mut request = Request::builder().method(method.clone()).uri(url.as_str());
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.clone().map(Bytes::from).unwrap_or_default())
            .with_context(|| format!("Invalid request for {}", url))?;
        requests.push(request);
    }

    let results = futures::future::join_all(requests.into_iter().map(|r| transport.send(r))).await;
    for (url, result) in urls.iter().zip(&results) {
        if let Err(e) = result {
            warn!("{} failed: {}", url, e);
        }
    }

    // Completion order, as recorded
    for entry in store.client_requests() {
        println!("{}", summary_line(&entry));
    }

    transport.close().await;
    Ok(())
}

fn summary_line(entry: &CapturedRequest) -> String {
    format!(
        "{} {:<6} {} {}ms{}",
        entry.status,
        entry.method,
        entry.url,
        entry.duration,
        if entry.error { "  [error]" } else { "" }
    )
}

async fn export(server: String, debug_prefix: String, markdown: bool) -> Result<()> {
    let path = if markdown { "export/markdown" } else { "export" };
    let url = format!("{}{}/{}", server.trim_end_matches('/'), debug_prefix, path);

    let request = Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .body(Bytes::new())
        .with_context(|| format!("Invalid export URL {}", url))?;

    let response = HyperTransport::new()
        .send(request)
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    if !response.status().is_success() {
        bail!(
            "{} answered {} (is the app running with --dev?)",
            url,
            response.status()
        );
    }

    let body: serde_json::Value =
        serde_json::from_slice(response.body()).context("Export was not valid JSON")?;

    if markdown {
        let document = body["markdown"]
            .as_str()
            .context("Export response has no markdown field")?;
        println!("{}", document);
    } else {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    Ok(())
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to initialize logging filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_cli_parses_serve_flags() {
        let cli = Cli::parse_from(["agent-devtools", "serve", "--dev", "--bind", "0.0.0.0:4000"]);
        match cli.command {
            Commands::Serve {
                bind,
                dev,
                disabled,
                debug_prefix,
            } => {
                assert_eq!(bind.port(), 4000);
                assert!(dev);
                assert!(!disabled);
                assert_eq!(debug_prefix, DEBUG_PREFIX);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_summary_line_marks_errors() {
        let entry = CapturedRequest {
            id: "c1".to_string(),
            method: "GET".to_string(),
            url: "http://localhost:3000/api/widgets".to_string(),
            status: 500,
            status_text: "Internal Server Error".to_string(),
            duration: 7,
            timestamp: Utc::now(),
            request_headers: Default::default(),
            response_headers: Default::default(),
            request_body: None,
            response_body: None,
            error: true,
        };

        assert_eq!(
            summary_line(&entry),
            "500 GET    http://localhost:3000/api/widgets 7ms  [error]"
        );
    }
}
