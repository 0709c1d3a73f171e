use rocket::{Request, catch, http::Status, serde::json::Json};
use tracing::warn;

use super::ErrorBody;

/// Keeps the `{"error", "message"}` body for failures Rocket reports before a
/// handler runs, such as malformed JSON or unmatched routes.
#[catch(default)]
pub fn default_catcher(
    status: Status,
    request: &Request<'_>,
) -> (Status, Json<ErrorBody>) {
    let kind = status
        .reason()
        .unwrap_or("error")
        .to_lowercase()
        .replace(' ', "_");
    let message = match status.code {
        400 => "Request body is not valid JSON".to_string(),
        404 => format!("No route for {} {}", request.method(), request.uri()),
        413 => "Request body is too large".to_string(),
        422 => "Request body must be {\"image\": \"<base64>\"}".to_string(),
        _ => status.to_string(),
    };
    warn!(
        method = %request.method(),
        uri = %request.uri(),
        status = status.code,
        "Rejected request"
    );
    (
        status,
        Json(ErrorBody {
            error: kind,
            message,
        }),
    )
}
