use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use snomed_annotator::snowstorm::{DEFAULT_LANG, DEFAULT_SNOWSTORM_BASE};
use snomed_annotator::{AppState, Annotator, SnowstormClient, Stopwords, router};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_CANDIDATES_LIMIT: usize = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!(
        "using snowstorm at {} (lang: {}, timeout: {}s)",
        config.snowstorm_base, config.lang, config.timeout_secs
    );
    if config.lookup_concurrency > 0 {
        info!("lookup concurrency limited to {}", config.lookup_concurrency);
    }

    let stopwords = Arc::new(Stopwords::spanish_clinical());
    info!("loaded {} stopwords", stopwords.len());

    let client = SnowstormClient::new(
        config.snowstorm_base.clone(),
        Duration::from_secs(config.timeout_secs),
    )
    .context("failed to build snowstorm client")?;
    let annotator = Annotator::new(client, stopwords, config.lang.clone())
        .with_lookup_concurrency(config.lookup_concurrency);

    let state = AppState {
        annotator: Arc::new(annotator),
        max_candidates_limit: config.max_candidates_limit,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    snowstorm_base: String,
    lang: String,
    timeout_secs: u64,
    lookup_concurrency: usize,
    max_candidates_limit: usize,
}

fn load_config() -> Config {
    let mut cli_base: Option<String> = None;
    let mut cli_lang: Option<String> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--snowstorm-base" => cli_base = args.next(),
            "--lang" => cli_lang = args.next(),
            _ => {
                if let Some(base) = arg.strip_prefix("--snowstorm-base=") {
                    cli_base = Some(base.to_string());
                } else if let Some(lang) = arg.strip_prefix("--lang=") {
                    cli_lang = Some(lang.to_string());
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let snowstorm_base = cli_base
        .or_else(|| env::var("SNOWSTORM_BASE").ok())
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SNOWSTORM_BASE.to_string());
    let lang = cli_lang
        .or_else(|| env::var("ACCEPT_LANGUAGE").ok())
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANG.to_string());
    let timeout_secs = env::var("SNOWSTORM_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let lookup_concurrency = env::var("LOOKUP_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let max_candidates_limit = env::var("MAX_CANDIDATES_LIMIT")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_CANDIDATES_LIMIT);

    Config {
        host,
        port,
        snowstorm_base,
        lang,
        timeout_secs,
        lookup_concurrency,
        max_candidates_limit,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
