use crate::api::{events, kiosk, marks, reports, sessions};
use crate::config::Config;
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let scan_limiter = Arc::new(build_limiter(config.rate_scan_per_min));
    let api_limiter = Arc::new(build_limiter(config.rate_api_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(api_limiter)
            .service(
                web::scope("/sessions")
                    .service(
                        web::resource("")
                            .route(web::post().to(sessions::create_session))
                            .route(web::get().to(sessions::list_sessions)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(sessions::get_session))
                            .route(web::put().to(sessions::rename_session))
                            .route(web::delete().to(sessions::delete_session)),
                    )
                    .service(
                        web::resource("/{id}/entries")
                            .route(web::get().to(sessions::list_session_entries)),
                    ),
            )
            .service(
                web::scope("/marks")
                    .service(web::resource("").route(web::post().to(marks::mark_attendance)))
                    .service(web::resource("/manual").route(web::post().to(marks::manual_mark))),
            )
            .service(web::resource("/reconcile").route(web::post().to(reports::reconcile_now)))
            .service(
                web::scope("/reports")
                    .service(web::resource("/ledger").route(web::get().to(reports::ledger_report)))
                    .service(
                        web::resource("/daily-summary")
                            .route(web::get().to(reports::daily_summary)),
                    ),
            )
            .service(
                web::scope("/kiosk")
                    .service(
                        web::resource("/scan")
                            .wrap(scan_limiter.clone())
                            .route(web::post().to(kiosk::scan)),
                    )
                    .service(
                        web::resource("/terminals/{terminal_id}/phase")
                            .route(web::get().to(kiosk::terminal_phase)),
                    )
                    .service(
                        web::resource("/roster/{staff_id}/refresh")
                            .route(web::post().to(kiosk::refresh_roster)),
                    ),
            )
            .service(web::resource("/events").route(web::get().to(events::stream))),
    );
}
