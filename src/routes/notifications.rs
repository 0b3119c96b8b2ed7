use std::convert::Infallible;

use axum::{
    Extension, Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing,
};
use futures::{Stream, stream};
use tokio::sync::broadcast::error::RecvError;

use crate::app_state::AppState;
use crate::middleware;

/// SSE endpoint; joining it is what establishes the user's notification
/// channel. Not part of the OpenAPI surface.
pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/notifications",
        Router::new()
            .route("/stream", routing::get(coupon_stream))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

async fn coupon_stream(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.subscribe(user_id).await;

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    match Event::default()
                        .event("payment_success_coupon")
                        .json_data(&payload)
                    {
                        Ok(event) => return Some((Ok::<_, Infallible>(event), rx)),
                        Err(_) => continue,
                    }
                }
                // best-effort contract: overwritten entries are simply lost
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
