//! Request unpacking: token / data separation.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Uri, header, uri::PathAndQuery},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::api::middleware::body::DecodedBody;
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::utils::qs;

/// Applies [`Envelope::unpack`] to the query string and decoded body.
///
/// The resulting [`Envelope`] is stored in the request extensions. The
/// request itself is rewritten to match it: the URI carries the unpacked
/// query and a decoded body is replaced by its `data` payload as JSON, so
/// stock `Query` and `Json` extractors downstream see the payload only.
///
/// A query string with neither a `token` nor a `data` key is left byte for
/// byte as the client sent it.
///
/// # Errors
///
/// Returns `500 Internal Server Error` if the rewritten request cannot be built.
pub async fn layer(req: Request, next: Next) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let query = parts.uri.query().map(qs::parse).unwrap_or_default();
    let carries_envelope = query.contains_key("token") || query.contains_key("data");
    let decoded = parts.extensions.remove::<DecodedBody>().map(|d| d.0);
    let had_body = decoded.is_some();

    let mut envelope = Envelope::new(query, decoded);
    envelope.unpack();

    if carries_envelope {
        parts.uri = with_query(&parts.uri, &envelope.query)?;
    }

    let body = if had_body {
        let bytes = match &envelope.body {
            Some(payload) => {
                parts.headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                serde_json::to_vec(payload)
                    .map_err(|e| AppError::internal(format!("failed to encode body: {e}")))?
            }
            None => {
                parts.headers.remove(header::CONTENT_TYPE);
                Vec::new()
            }
        };
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        Body::from(bytes)
    } else {
        body
    };

    parts.extensions.insert(envelope);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn with_query(uri: &Uri, query: &Map<String, Value>) -> Result<Uri, AppError> {
    let encoded = qs::stringify(query);
    let path_and_query = if encoded.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), encoded)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse::<PathAndQuery>()
            .map_err(|e| AppError::internal(format!("failed to rewrite query: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| AppError::internal(format!("failed to rewrite query: {e}")))
}
