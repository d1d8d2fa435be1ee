//! Tile Proxy - signed-URL reverse proxy for map tiles and styles.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tile_proxy::{
    clock::{Clock, SystemClock},
    config::{CheckConfig, Cli, Command, OriginArgs, ServeConfig, SignConfig, SignOutputFormat},
    create_s3_client,
    server::{create_router, RouterConfig},
    store::{HttpOriginStore, OriginStore, S3OriginStore, SharedStore},
    style::{has_token_marker, signed_tile_url, DEFAULT_STYLE_KEY},
    token::{SharedSecret, Signer},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Tile Proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    log_origin(&config.origin);
    if let Some(ref public_url) = config.public_url {
        info!("  Public URL: {}", public_url);
    } else {
        info!("  Public URL: derived from request headers");
    }
    info!("  Signed source: {}", config.style_source);
    info!("  Token TTL: {}s", config.token_ttl);
    info!(
        "  Cache: style max-age={}, assets max-age={}",
        config.style_max_age, config.asset_max_age
    );

    let store = build_origin_store(&config.origin).await;
    let router_config = build_router_config(&config);
    let router = create_router(store, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/style.json", addr);
    info!("    curl http://{}/sprite.json", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Log where objects and the style come from.
fn log_origin(origin: &OriginArgs) {
    if let Some(ref base) = origin.bucket_base {
        info!("  Object store: {}", base);
    }
    if let Some(ref bucket) = origin.s3_bucket {
        info!("  S3 bucket: {}", bucket);
        if let Some(ref prefix) = origin.s3_prefix {
            info!("  S3 prefix: {}", prefix);
        }
        if let Some(ref endpoint) = origin.s3_endpoint {
            info!("  S3 endpoint: {}", endpoint);
        }
        info!("  S3 region: {}", origin.s3_region);
    }
    match origin.style_origin {
        Some(ref url) => info!("  Style origin: {}", url),
        None => info!("  Style origin: {} in object store", DEFAULT_STYLE_KEY),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tile_proxy=debug,tower_http=debug"
    } else {
        "tile_proxy=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the origin store selected by the configuration (call validate() first).
async fn build_origin_store(origin: &OriginArgs) -> SharedStore {
    match origin.bucket_base {
        Some(ref base) => Arc::new(HttpOriginStore::new(base.clone())),
        None => {
            let client =
                create_s3_client(origin.s3_endpoint.as_deref(), &origin.s3_region).await;
            Arc::new(S3OriginStore::new(
                client,
                origin.s3_bucket.clone().unwrap_or_default(),
                origin.s3_prefix.clone(),
            ))
        }
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.secret_or_empty())
        .with_token_ttl(config.token_ttl)
        .with_style_source(config.style_source.clone())
        .with_style_max_age(config.style_max_age)
        .with_asset_max_age(config.asset_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref url) = config.origin.style_origin {
        router_config = router_config.with_style_origin(Arc::new(HttpOriginStore::new(url.clone())));
    }
    if let Some(ref url) = config.sprite_url {
        router_config = router_config.with_sprite_url(url.clone());
    }
    if let Some(ref url) = config.glyphs_url {
        router_config = router_config.with_glyphs_url(url.clone());
    }
    if let Some(ref url) = config.public_url {
        router_config = router_config.with_public_url(url.clone());
    }
    if let Some(ref prefix) = config.tiles_prefix {
        router_config = router_config.with_tiles_prefix(prefix.clone());
    }

    router_config
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let signer = Signer::new(SharedSecret::new(&config.secret));
    let exp = SystemClock.now().saturating_add(config.ttl);
    let token = signer.mint(exp);

    let origin = config.base_url.as_deref().unwrap_or("");
    let template = signed_tile_url(origin, &token);

    match config.format {
        SignOutputFormat::Query => {
            println!("{}", token.query());
        }
        SignOutputFormat::Json => {
            let json = serde_json::json!({
                "exp": token.exp,
                "sig": token.sig,
                "ttl": config.ttl,
                "template": template,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        SignOutputFormat::Url => {
            println!("{}", template);
            if config.base_url.is_none() {
                eprintln!();
                eprintln!("Tip: Use --base-url to generate a complete URL");
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("Tile Proxy Configuration Check");
    println!("═══════════════════════════════");
    println!();

    if let Err(e) = config.origin.validate() {
        println!("✗ Origin: {}", e);
        return ExitCode::FAILURE;
    }

    let store = build_origin_store(&config.origin).await;
    println!("✓ Object store: {}", store.identifier());

    let (style_store, style_key): (SharedStore, &str) = match config.origin.style_origin {
        Some(ref url) => (Arc::new(HttpOriginStore::new(url.clone())), ""),
        None => (store.clone(), DEFAULT_STYLE_KEY),
    };
    println!("✓ Style origin: {} {}", style_store.identifier(), style_key);
    println!();

    print!("Fetching style... ");
    let object = match style_store.fetch(style_key).await {
        Ok(object) => {
            println!("✓ {} bytes", object.body.len());
            object
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let style: serde_json::Value = match serde_json::from_slice(&object.body) {
        Ok(style) => style,
        Err(e) => {
            println!("✗ Style is not valid JSON: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tiles = style
        .get("sources")
        .and_then(|s| s.get(&config.style_source))
        .and_then(|s| s.get("tiles"))
        .and_then(|t| t.as_array())
        .filter(|t| !t.is_empty());

    match tiles {
        None => {
            println!(
                "! Source '{}' has no tile list; the style will be served unsigned",
                config.style_source
            );
        }
        Some(tiles) => {
            let first = tiles[0].as_str().unwrap_or("");
            println!("✓ Source '{}': {} template(s)", config.style_source, tiles.len());
            println!("  {}", first);
            if has_token_marker(first) {
                println!("! Template already carries a token; it will be served as-is");
            }
        }
    }

    println!();
    println!("═══════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
