//! meshcache-node
//!
//! A cache node serving one `meshcache` group to its peers and, optionally,
//! to local API consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      meshcache-node                        │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────┐   │
//! │  │  API server │──▶│  cache group │──▶│  peer protocol │   │
//! │  │ (optional)  │   │ (hot + main) │   │ (HTTP mesh)    │   │
//! │  └─────────────┘   └──────────────┘   └────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Peers are supplied statically on the command line; every node of a
//! cluster gets the same `--peers` list and its own `--listen` address.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshcache::error::Result;
use meshcache::peers::Getter;
use meshcache::transport::{self, ServerPool};
use meshcache::{Error, Group};

// =============================================================================
// CLI Arguments
// =============================================================================

/// meshcache node - distributed read-through cache peer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address this node serves the peer protocol on (host:port)
    #[arg(long, env = "MESHCACHE_LISTEN", default_value = "127.0.0.1:9001")]
    listen: String,

    /// Comma-separated cluster addresses, including this node
    #[arg(long, env = "MESHCACHE_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Main cache byte budget per group
    #[arg(long, env = "MESHCACHE_CACHE_BYTES", default_value = "67108864")]
    cache_bytes: u64,

    /// Optional address for the client-facing API (host:port)
    #[arg(long, env = "MESHCACHE_API_LISTEN")]
    api_listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Demo Data Source
// =============================================================================

/// Stand-in for the expensive backing store: a static table with a
/// simulated lookup delay.
struct SlowTable {
    rows: HashMap<&'static str, &'static str>,
}

impl SlowTable {
    fn new() -> Self {
        Self {
            rows: [("Tom", "630"), ("Jack", "589"), ("Sam", "567")].into(),
        }
    }
}

#[async_trait::async_trait]
impl Getter for SlowTable {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        info!(key, "loading from backing table");
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.rows
            .get(key)
            .map(|row| row.as_bytes().to_vec())
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{key} does not exist"),
                ))
            })
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting meshcache node");
    info!("  Listen address: {}", args.listen);
    info!("  Cache budget: {} bytes", args.cache_bytes);

    let group = Group::new("scores", args.cache_bytes, Arc::new(SlowTable::new()));

    let pool = Arc::new(ServerPool::new(args.listen.clone()));
    let peers = if args.peers.is_empty() {
        warn!("no --peers supplied, running as a single-node cluster");
        vec![args.listen.clone()]
    } else {
        args.peers.clone()
    };
    pool.set_peers(peers)?;
    group.register_peers(pool);

    if let Some(api_addr) = &args.api_listen {
        let api = Router::new()
            .route("/api/{key}", get(handle_api_get))
            .with_state(Arc::clone(&group));
        let listener = tokio::net::TcpListener::bind(api_addr).await?;
        info!("  API server: http://{api_addr}/api/{{key}}");
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, api).await {
                warn!(error = %err, "API server stopped");
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("peer server running on {}", args.listen);
    transport::serve(listener).await
}

async fn handle_api_get(
    State(group): State<Arc<Group>>,
    Path(key): Path<String>,
) -> std::result::Result<Vec<u8>, (StatusCode, String)> {
    match group.get(&key).await {
        Ok(value) => Ok(value.to_vec()),
        Err(err @ Error::EmptyKey) => Err((StatusCode::BAD_REQUEST, err.to_string())),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
