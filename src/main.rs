//! Demo server.
//!
//! Serves a small in-memory account API:
//!
//! ```text
//! GET    /health
//! POST   /account              {"name": "...", "age": 23}
//! GET    /account/:name
//! DELETE /account/:name        (requires X-Admin: true)
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use serde::{Deserialize, Serialize};

use tessera::config::load_config;
use tessera::observability::{init_logging, metrics};
use tessera::{
    ctx, params, raw, Context, Json, RouteManager, Server, ServerConfig, ServerError, StatusCode,
};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Demo account API built on tessera", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    name: String,
    age: u32,
}

#[derive(Debug, Default)]
struct AccountPath {
    name: String,
}

params!(AccountPath { name });

type Store = Arc<Mutex<HashMap<String, Account>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    init_logging(&config.observability.log_level);
    tracing::info!("tessera v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = Server::with_config(config);
    let store: Store = Arc::default();

    server.use_middleware([raw(|req, _res| {
        tracing::info!(
            method = %req.method(),
            path = %req.path(),
            request_id = req.request_id().unwrap_or("unknown"),
            "Request"
        );
        Ok(())
    })])?;

    server.get("/health", [ctx(|c| c.json(&Json::new().with("status", "ok")))])?;

    server.route("/account", |account| -> tessera::Result {
        let db = store.clone();
        account.post(
            "/",
            [ctx(move |c| {
                let new: Account = c.body_parser().map_err(|_| {
                    ServerError::json(StatusCode::BAD_REQUEST, "invalid body")
                })?;
                lock(&db).insert(new.name.clone(), new.clone());
                c.status(StatusCode::CREATED).json(&new)
            })],
        )?;

        let db = store.clone();
        account.get("/:name", [ctx(move |c| find_account(c, &db))])?;

        let db = store.clone();
        let admin = account.group("/", [raw(|req, _res| match req.header("x-admin") {
            Some("true") => Ok(()),
            _ => Err(ServerError::json(StatusCode::FORBIDDEN, "admin only").into()),
        })]);
        admin.delete(
            "/:name",
            [ctx(move |c| {
                let mut path = AccountPath::default();
                c.params_parser(&mut path)?;
                match lock(&db).remove(&path.name) {
                    Some(_) => c.send_status(StatusCode::NO_CONTENT),
                    None => Err(not_found(&path.name)),
                }
            })],
        )
    })?;

    server.listen().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn find_account(c: &mut Context<'_>, db: &Store) -> tessera::Result {
    let mut path = AccountPath::default();
    c.params_parser(&mut path)?;
    let found = lock(db).get(&path.name).cloned();
    match found {
        Some(account) => c.json(&account),
        None => Err(not_found(&path.name)),
    }
}

fn not_found(name: &str) -> tessera::Error {
    ServerError::json(StatusCode::NOT_FOUND, format!("account {name} not found")).into()
}

fn lock(db: &Store) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}
