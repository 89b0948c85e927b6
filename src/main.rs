use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use taskhub::api::{AppState, router};
use taskhub::config::{AppConfig, DatabaseConfig};
use taskhub::projects::{GoogleSheetsSource, SheetSource};
use taskhub::store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // Console always; daily-rolled file when TASKHUB_LOG_DIR is set.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "taskhub.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    eprintln!("📋 TaskHub v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Domain: {}", config.company_domain);
    eprintln!("   Admin: {}", config.admin_email);
    eprintln!("   Team: {} members", config.team.len());

    // ── Database ─────────────────────────────────────────────────────────
    match &config.database {
        DatabaseConfig::Local(path) => eprintln!("   Database: {}", path.display()),
        DatabaseConfig::Remote { url, .. } => eprintln!("   Database: {url}"),
    }
    let db = store::connect(&config.database)
        .await
        .context("Failed to open database")?;

    // ── Project sheet ────────────────────────────────────────────────────
    let sheets: Option<Arc<dyn SheetSource>> = match &config.sheets {
        Some(sheets) => {
            eprintln!("   Projects: sheet {} / {}", sheets.spreadsheet_id, sheets.worksheet);
            Some(Arc::new(GoogleSheetsSource::new(sheets)))
        }
        None => {
            eprintln!("   Projects: sync disabled");
            None
        }
    };

    // ── HTTP ─────────────────────────────────────────────────────────────
    let port = config.port;
    let app = router(AppState::new(&config, db, sheets));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    eprintln!("   API: http://0.0.0.0:{port}/api\n");
    tracing::info!(port, "TaskHub server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("TaskHub server stopped");
    Ok(())
}
