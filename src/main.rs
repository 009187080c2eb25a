use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use log::{error, info};
use std::net::TcpListener;
use warp::Filter;

use photo_diary::config::Config;
use photo_diary::db::{create_db_pool, PhotoStore};
use photo_diary::handlers_diary::build_diary_routes;
use photo_diary::handlers_health::build_health_routes;
use photo_diary::warp_helpers::{cors, handle_rejection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let addr = config.bind_address()?;

    info!("Starting photo diary server on {}", addr);
    info!("Database: {}", config.db_path);
    if config.admin_token.is_none() {
        info!("PHOTO_DIARY_ADMIN_TOKEN not set, metadata edits are disabled");
    }

    // Check if port is available BEFORE initializing services
    if !is_port_available(addr) {
        error!(
            "Port {} is already in use. Please stop any existing photo diary instances or use a different port.",
            config.port
        );
        error!(
            "You can check what's using the port with: lsof -i :{}",
            config.port
        );
        return Err(format!("Port {} is already in use", config.port).into());
    }

    let db_pool = create_db_pool(&config.db_path, config.max_connections).await?;
    info!("Database initialized successfully");
    let store = PhotoStore::new(db_pool);

    let health_routes = build_health_routes(store.clone());
    let diary_routes = build_diary_routes(store, config.admin_token.clone());

    let routes = health_routes
        .or(diary_routes)
        .with(cors(&config.cors_origins))
        .with(warp::log("photo_diary"))
        .recover(handle_rejection);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(addr: std::net::SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}
