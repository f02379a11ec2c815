use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::time::Duration;

use bioattend::config::Config;
use bioattend::db::init_db;
use bioattend::docs::ApiDoc;
use bioattend::engine::events::LedgerEvents;
use bioattend::kiosk::orchestrator::Kiosk;
use bioattend::kiosk::resolver::HttpResolver;
use bioattend::kiosk::roster::RosterCache;
use bioattend::{routes, scheduler};

use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Service is up and running!"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;
    let events = LedgerEvents::default();
    let roster = RosterCache::new(pool.clone(), config.roster_cache_ttl_secs);
    let resolver = HttpResolver::new(&config.resolver_url, config.resolver_timeout_secs);
    let kiosk = Data::new(Kiosk::new(
        resolver,
        roster.clone(),
        config.confidence_threshold,
        config.kiosk_continuous_mode,
        Duration::from_secs(config.kiosk_auto_confirm_secs),
        config.duplicate_window_minutes,
    ));

    let roster_for_warmup = roster.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = roster_for_warmup.warmup().await {
            eprintln!("Failed to warmup roster cache: {:?}", e);
        }
    });

    // Nightly absent marking, plus a catch-up sweep for today on start
    let pool_for_sweep = pool.clone();
    let events_for_sweep = events.clone();
    let sweep_parallelism = config.sweep_parallelism;
    actix_web::rt::spawn(async move {
        scheduler::run(pool_for_sweep, events_for_sweep, sweep_parallelism).await;
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(events.clone()))
            .app_data(Data::new(roster.clone()))
            .app_data(kiosk.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
