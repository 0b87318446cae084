//! Dev-database maintenance CLI. Kept from the teacher's small diagnostic
//! binaries (`bin/pg_truncate.rs`), generalized to this crate's schema and
//! given a single `truncate` subcommand; not wired into the simulation
//! server at all, since production databases are never touched by this
//! tool's intended audience (local dev / CI fixtures).

use aurelia::config::CONFIG;
use aurelia::db::DbClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("truncate") => truncate().await,
        _ => {
            eprintln!("usage: db_admin truncate");
            std::process::exit(2);
        }
    }
}

async fn truncate() {
    let db = DbClient::connect(&CONFIG.database_url, CONFIG.db_pool_size)
        .await
        .expect("failed to connect to database");
    db.truncate_all().await.expect("failed to truncate tables");
    println!("all tables truncated");
}
