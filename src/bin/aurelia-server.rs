//! Simulation server entry point. Boots the dedicated tick thread (spec.md
//! §4.2, never touching tokio), the multi-thread tokio runtime that owns
//! the HTTP/WS surface and the persistence bridge's executor, and wires the
//! two together through the command queue, the read-path query channel,
//! and the `Bridge`/`EventSink` handles — the same shape the teacher's own
//! `bin/main.rs`/`bin/web-api.rs` boot sequence uses (`dotenvy::dotenv`,
//! `tracing_subscriber` init, connect, spawn, serve).

use aurelia::config::CONFIG;
use aurelia::db::DbClient;
use aurelia::ecs::Command;
use aurelia::events::EventSink;
use aurelia::notify::{InMemoryNotifier, Notifier};
use aurelia::persist::{hydrate, Bridge};
use aurelia::sim::query::QueryRequest;
use aurelia::sim::scheduler::Scheduler;
use aurelia::sim::Simulation;
use aurelia::web_api_server::{AppState, StubTokenVerifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use tracing::{info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Force the lazy CONFIG/constant tables to initialize and be validated
    // before anything else runs.
    info!(tick_rate = CONFIG.tick_rate, enable_db = CONFIG.enable_db, "starting aurelia-server");

    let bridge = Arc::new(Bridge::new());
    let events = Arc::new(EventSink::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let notifier_trait: Arc<dyn Notifier> = notifier.clone();

    let (commands_tx, commands_rx) = mpsc::channel::<Command>();
    let (queries_tx, queries_rx) = mpsc::channel::<QueryRequest>();

    let mut sim = Simulation::new(notifier_trait.clone(), events.clone(), bridge.clone(), commands_rx);
    sim.set_queries(queries_rx);

    if CONFIG.enable_db {
        match DbClient::connect(&CONFIG.database_url, CONFIG.db_pool_size).await {
            Ok(db) => {
                if let Err(e) = hydrate(&mut sim, &db).await {
                    warn!(error = %e, "startup hydration failed; continuing with an empty world");
                }
                bridge.set_db(Arc::new(db));
            }
            Err(e) => warn!(error = %e, "database connection failed; running with persistence disabled"),
        }
    } else {
        sim.loaded = true;
    }

    bridge.set_handle(tokio::runtime::Handle::current());
    events.set_handle(tokio::runtime::Handle::current());

    let running = Arc::new(AtomicBool::new(true));
    let sim_thread = {
        let running = running.clone();
        std::thread::Builder::new()
            .name("aurelia-sim".to_string())
            .spawn(move || {
                let mut scheduler = Scheduler::new();
                scheduler.run(&mut sim, &running);
            })
            .expect("failed to spawn simulation thread")
    };

    let state = AppState {
        commands: Arc::new(Mutex::new(commands_tx)),
        queries: Arc::new(Mutex::new(queries_tx)),
        notifier: notifier_trait,
        events,
        bridge,
        verifier: Arc::new(StubTokenVerifier),
    };

    let serve_result = tokio::select! {
        result = aurelia::web_api_server::serve(state, &CONFIG.http_bind_addr) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };
    if let Err(e) = serve_result {
        warn!(error = %e, "http server exited with an error");
    }

    running.store(false, Ordering::Relaxed);
    if sim_thread.join().is_err() {
        warn!("simulation thread panicked");
    }
}
