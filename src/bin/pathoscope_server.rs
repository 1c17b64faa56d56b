use jemallocator::Jemalloc;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use actix_files::Files;
use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use PathoScope::analysis::disease_report::ReportBuilder;
use PathoScope::collaborators::client::Collaborators;
use PathoScope::config::ServerConfig;
use PathoScope::server::routes::{configure, AppState};
use PathoScope::utils::history::JsonFileHistory;
use PathoScope::utils::presets::PresetStore;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::parse();
    info!("Starting PathoScope server");

    let history = JsonFileHistory::open(&config.history_file)
        .with_context(|| format!("Failed to open history file '{}'", config.history_file))?;
    let presets = PresetStore::open(&config.presets_file)
        .with_context(|| format!("Failed to open presets file '{}'", config.presets_file))?;

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set, AI explanations will be unavailable");
    }

    let state = Data::new(AppState {
        reports: ReportBuilder::new(Collaborators::new(config.collaborator_config())),
        history: Box::new(history),
        presets,
    });

    let static_dir = config.static_dir.clone();
    let serve_static = static_dir.is_dir();
    if !serve_static {
        warn!("Static directory {} not found, serving the API only", static_dir.display());
    }

    let server = HttpServer::new(move || {
        let app = App::new()
            .app_data(state.clone())
            .configure(configure)
            .wrap(Logger::default());
        if serve_static {
            app.service(Files::new("/", static_dir.clone()).index_file("index.html"))
        } else {
            app
        }
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}", config.server_url()))?
    .run();

    info!("Listening on {}", config.server_url());
    if config.open_browser {
        if let Err(e) = webbrowser::open(&config.server_url()) {
            warn!("Could not open browser: {}", e);
        }
    }

    server.await.context("Server terminated with an error")?;
    info!("All done. Have a nice day!");
    Ok(())
}
