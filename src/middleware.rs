use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::app_error::AppError;

/// Header carrying the authenticated user id, set by the gateway in front of
/// this service. Session handling itself lives outside this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Rejects requests without a parseable user id and exposes it to handlers
/// as an `Extension<i32>`.
pub async fn users_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i32>().ok())
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
