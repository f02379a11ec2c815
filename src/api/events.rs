use crate::engine::events::LedgerEvents;
use actix_web::{HttpResponse, Responder, web};
use futures_util::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// SSE stream of ledger-changed events
///
/// Emitted after every successful mark, bulk mark and backfill, so UI
/// layers refresh on change instead of polling on a timer. Consumers that
/// fall behind miss events rather than stalling the writers.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses((status = 200, description = "text/event-stream of ledger events")),
    tag = "Events"
)]
pub async fn stream(events: web::Data<LedgerEvents>) -> impl Responder {
    let stream = BroadcastStream::new(events.subscribe()).filter_map(|event| async move {
        match event {
            Ok(event) => {
                let payload = serde_json::to_string(&event).ok()?;
                Some(Ok::<_, actix_web::Error>(web::Bytes::from(format!(
                    "data: {payload}\n\n"
                ))))
            }
            // lagged receiver: skip dropped events, keep streaming
            Err(_) => None,
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}
