use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use student_feedback::config::AppConfig;
use student_feedback::gemini::{GeminiClient, LanguageModel};
use student_feedback::routes::{self, AppState};
use student_feedback::storage::open_store;

#[derive(Parser)]
#[command(name = "student_feedback", version, about = "Student feedback form and AI-assisted dashboard")]
struct Cli {
    /// TOML config file (defaults to ./feedback.toml when present)
    #[arg(long, env = "FEEDBACK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("student_feedback=info,actix_web=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let store = open_store(&config)
        .await
        .context("Failed to open feedback storage")?;

    let model: Option<Arc<dyn LanguageModel>> = match GeminiClient::new(&config.gemini) {
        Ok(client) => {
            info!("AI analysis enabled with model {}", client.model());
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("AI analysis disabled: {}", e);
            None
        }
    };

    let state = web::Data::new(AppState {
        store,
        model,
        form_policy: config.form,
    });

    let (host, port) = config.bind_address();
    info!("Starting Student Feedback Analyzer on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {}:{}", host, port))?
    .run()
    .await?;

    Ok(())
}
