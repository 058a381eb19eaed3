use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use creditkit::Error;
use serde_json::json;

use crate::ApiState;

/// Headers the provider may carry the hex HMAC digest in, checked in order
const SIGNATURE_HEADERS: [&str; 2] = ["X-Signature", "X-Webhook-Signature"];

/// POST /api/firmas/webhook
///
/// Takes the raw body so the signature is verified over the exact bytes the
/// provider signed.
pub(crate) async fn post_firma_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Response> {
    let signature = SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok());

    let ack = state
        .ingestor
        .process(signature, &body)
        .await
        .map_err(|err| {
            tracing::error!("Could not process webhook: {}", err);
            into_response(err)
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Webhook procesado correctamente",
        "data": ack,
    }))
    .into_response())
}

pub fn into_response(error: Error) -> Response {
    let status = match error {
        Error::MissingSignature | Error::InvalidSignature => StatusCode::UNAUTHORIZED,
        Error::InvalidPayload(_)
        | Error::InvalidSolicitudId
        | Error::UnknownProviderState(_)
        | Error::State(_) => StatusCode::BAD_REQUEST,
        Error::ApplicationNotFound | Error::PostulationNotFound => StatusCode::NOT_FOUND,
        Error::Timeout | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(json!({
            "success": false,
            "error": error.to_string(),
        })),
    )
        .into_response()
}
