//! Demo service wired through the chassis core: an encrypted notes API.

use anyhow::Context;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use sqlx::Row;
use tracing_subscriber::EnvFilter;

use chassis::config::Config;
use chassis::envelope::respond;
use chassis::error::AppError;
use chassis::server::{self, ServiceRoutes};
use chassis::state::ServiceContext;

#[derive(Parser)]
#[command(name = "chassis", version, about = "Demo service wired through the chassis core")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let config = chassis::config::load_from_env()?;
    init_tracing(&config);
    config.print_summary();

    server::run(config, routes()).await
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn routes() -> ServiceRoutes {
    ServiceRoutes {
        protected: Router::new().route("/notes", post(create_note).get(list_notes)),
        open: Router::new().route("/health", get(health)),
    }
}

#[derive(Deserialize)]
struct NewNote {
    text: String,
}

/// `POST /notes` - stores a note from an encrypted payload and returns the
/// new id, encrypted.
async fn create_note(State(ctx): State<ServiceContext>, body: Bytes) -> Response {
    let plaintext = match respond::payload(&ctx.envelope, &body) {
        Ok(p) => p,
        Err(rejection) => return rejection,
    };

    let note: NewNote = match serde_json::from_slice(&plaintext) {
        Ok(note) => note,
        Err(e) => {
            return respond::failure(&ctx.envelope, &AppError::BadPayload(e.to_string()));
        }
    };

    let row = match ctx
        .db
        .write(sqlx::query("INSERT INTO notes (text) VALUES ($1) RETURNING id").bind(&note.text))
        .await
    {
        Ok(row) => row,
        Err(e) => return respond::failure(&ctx.envelope, &e.into()),
    };

    match row.try_get::<i64, _>("id") {
        Ok(id) => {
            ctx.bus.publish("notes.created", json!({ "id": id }));
            respond::success(
                &ctx.envelope,
                StatusCode::OK,
                json!({ "id": id }).to_string().as_bytes(),
            )
        }
        Err(e) => respond::failure(&ctx.envelope, &AppError::Internal(e.to_string())),
    }
}

/// `GET /notes` - lists stored notes from the replica, encrypted.
async fn list_notes(State(ctx): State<ServiceContext>) -> Response {
    let rows = match ctx
        .db
        .query_many(sqlx::query("SELECT id, text FROM notes ORDER BY id"))
        .await
    {
        Ok(rows) => rows,
        Err(e) => return respond::failure(&ctx.envelope, &e.into()),
    };

    let mut notes = Vec::with_capacity(rows.len());
    for row in rows {
        match (row.try_get::<i64, _>("id"), row.try_get::<String, _>("text")) {
            (Ok(id), Ok(text)) => notes.push(json!({ "id": id, "text": text })),
            (Err(e), _) | (_, Err(e)) => {
                return respond::failure(&ctx.envelope, &AppError::Internal(e.to_string()));
            }
        }
    }

    respond::success(
        &ctx.envelope,
        StatusCode::OK,
        json!({ "notes": notes }).to_string().as_bytes(),
    )
}

/// `GET /health` - component status on the open stack.
async fn health(State(ctx): State<ServiceContext>) -> impl IntoResponse {
    let database = match ctx.db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            "error"
        }
    };
    let cache = if ctx.cache.health_check().await {
        "ok"
    } else {
        "error"
    };

    let healthy = database == "ok" && cache == "ok";
    let body = Json(json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "database": database,
            "cache": cache,
        }
    }));

    if healthy {
        (StatusCode::OK, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body)
    }
}
