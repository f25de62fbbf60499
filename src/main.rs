use std::sync::Arc;

use gzstatic::config::{AppState, Config};
use gzstatic::handler::AssetServer;
use gzstatic::server;
use gzstatic::{logger, DirFs};
use tokio::sync::Notify;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut builder = AssetServer::builder(DirFs::new(&cfg.assets.root))
        .encode_on_init(cfg.assets.encode_on_init);
    if cfg.assets.brotli {
        builder = builder.with_brotli();
    }
    let assets = match builder.build() {
        Ok(assets) => assets,
        Err(e) => {
            logger::log_error(&format!("Failed to index '{}': {e}", cfg.assets.root));
            std::process::exit(1);
        }
    };

    // Worker threads follow the config, default is one per core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, assets))
}

async fn async_main(cfg: Config, assets: AssetServer) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    let state = Arc::new(AppState::new(cfg, assets));
    server::start_server_loop(listener, state, shutdown).await?;
    Ok(())
}
