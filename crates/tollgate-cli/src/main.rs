//! Admin CLI for the token service. Talks straight to the Postgres
//! store, so it works without a running server.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use tollgate_engine::TokenEngine;
use tollgate_store::PgStore;

#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about = "Tollgate admin CLI")]
struct Cli {
    /// Postgres URL of the token store
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a new token for a user
    Mint {
        #[arg(long)]
        user: String,
        /// Justification recorded in the token history
        #[arg(long)]
        reason: String,
    },

    /// Revoke a token on behalf of its owner
    Revoke {
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
        /// Justification recorded in the token history
        #[arg(long)]
        reason: String,
    },

    /// List a user's tokens, valid ones first
    List {
        #[arg(long)]
        user: String,
    },

    /// Check whether a token is valid for the required groups
    Check {
        #[arg(long)]
        token: String,
        /// Required group; repeat for multiple groups
        #[arg(long = "group")]
        groups: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .init();

    let cli = Cli::parse();

    let store = Arc::new(PgStore::connect(&cli.database_url).await?);
    store.ensure_schema().await?;
    let engine = TokenEngine::new(store.clone(), store);

    match cli.cmd {
        Command::Mint { user, reason } => {
            let record = engine.create(&user, &reason).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Revoke {
            user,
            token,
            reason,
        } => {
            let record = engine.revoke(&user, &token, &reason).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::List { user } => {
            let records = engine.list(&user).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Check { token, groups } => {
            let ok = engine.validate(&groups, &token).await?;
            println!("{}", serde_json::to_string_pretty(&json!({ "ok": ok }))?);
        }
    }

    Ok(())
}
