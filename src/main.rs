use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use geodict_db::{Gazetteer, LoadMode};
use geodict_parser::{GeoParser, ParserConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use geodict::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_GAZETTEER_PATH: &str = "gazetteer";
const DEFAULT_GAZETTEER_IMAGE_PATH: &str = "/app/gazetteer";
const DEFAULT_MAX_TEXT_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config()?;
    info!("binding to {}:{}", config.host, config.port);
    info!(
        "using gazetteer at {} (mode: {:?})",
        config.gazetteer_path.display(),
        config.gazetteer_mode
    );
    info!(
        "word budget {}, {} sequence patterns",
        config.parser.word_max,
        config.parser.patterns.len()
    );

    let start = Instant::now();
    let gazetteer = Gazetteer::load_with_mode(&config.gazetteer_path, config.gazetteer_mode)?;
    info!("gazetteer loaded in {} ms", start.elapsed().as_millis());

    let state = AppState {
        parser: Arc::new(GeoParser::new(gazetteer, config.parser)?),
        max_text_bytes: config.max_text_bytes,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    gazetteer_path: PathBuf,
    gazetteer_mode: LoadMode,
    parser: ParserConfig,
    max_text_bytes: usize,
}

fn load_config() -> anyhow::Result<Config> {
    let mut cli_gazetteer_dir: Option<PathBuf> = None;
    let mut cli_gazetteer_mode: Option<LoadMode> = None;
    let mut args = env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--gazetteer-dir" => {
                if let Some(path) = args.next() {
                    cli_gazetteer_dir = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--gazetteer-dir=") {
                    cli_gazetteer_dir = Some(PathBuf::from(path));
                } else if let Some(mode) = arg.strip_prefix("--load-mode=") {
                    cli_gazetteer_mode = parse_load_mode(mode);
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let gazetteer_path = cli_gazetteer_dir
        .or_else(|| env::var("GAZETTEER_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(default_gazetteer_path);
    let gazetteer_mode = cli_gazetteer_mode
        .or_else(|| {
            env::var("GAZETTEER_LOAD_MODE")
                .ok()
                .as_deref()
                .and_then(parse_load_mode)
        })
        .unwrap_or(LoadMode::Mmap);
    let max_text_bytes = env::var("MAX_TEXT_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_TEXT_BYTES);

    let mut parser = ParserConfig::default();
    if let Some(word_max) = env::var("GEODICT_WORD_MAX")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
    {
        parser.word_max = word_max;
    }
    if let Ok(raw) = env::var("GEODICT_PATTERNS") {
        parser.patterns = ParserConfig::parse_patterns(&raw)?;
    }

    Ok(Config {
        host,
        port,
        gazetteer_path,
        gazetteer_mode,
        parser,
        max_text_bytes,
    })
}

fn default_gazetteer_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_GAZETTEER_PATH);
    if local.exists() {
        return local;
    }
    PathBuf::from(DEFAULT_GAZETTEER_IMAGE_PATH)
}

fn parse_load_mode(raw: &str) -> Option<LoadMode> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Some(LoadMode::Mmap),
        "owned" => Some(LoadMode::Owned),
        _ => None,
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
