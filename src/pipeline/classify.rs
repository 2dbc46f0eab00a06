//! Mapping HTTP outcomes and transport errors onto [`ErrorCategory`].
//!
//! Classification is structural first (status code, content type, transport
//! error kind). Substring matching is only used for transport errors that
//! carry no structure.

use serde_json::Value;

use crate::error::{ErrorCategory, Failure};
use crate::transport::{HttpResponse, TransportError, TransportErrorKind};

/// Category for a non-2xx status.
pub fn classify_status(status: u16) -> ErrorCategory {
    match status {
        400 => ErrorCategory::BadRequest,
        401 => ErrorCategory::Unauthorized,
        403 => ErrorCategory::Forbidden,
        404 => ErrorCategory::NotFound,
        429 => ErrorCategory::RateLimited,
        500 | 502 | 503 | 504 => ErrorCategory::ServerError { status },
        other => ErrorCategory::UnknownHttp { status: other },
    }
}

/// Turn a received response into a JSON payload or a classified failure.
///
/// - 2xx with a JSON content type and a parseable body → `Ok(payload)`
/// - 2xx otherwise → `InvalidResponseFormat`
/// - non-2xx → the status category; the detail is the backend's
///   `{"error": "..."}` message when present, else the status line
pub fn classify_response(resp: &HttpResponse) -> Result<Value, Failure> {
    if resp.is_success() {
        if !resp.is_json() {
            return Err(Failure::new(
                ErrorCategory::InvalidResponseFormat,
                format!(
                    "Server returned an invalid response format: '{}'",
                    resp.content_type.as_deref().unwrap_or("no content type")
                ),
            ));
        }
        return serde_json::from_str(&resp.body).map_err(|e| {
            Failure::new(
                ErrorCategory::InvalidResponseFormat,
                format!("response body is not valid JSON: {e}"),
            )
        });
    }

    let category = classify_status(resp.status);
    match backend_error_message(resp) {
        Some(message) => Err(Failure::from_backend(category, message)),
        None => Err(Failure::new(category, resp.status_line())),
    }
}

/// The `error` string from a JSON error body, if there is one.
fn backend_error_message(resp: &HttpResponse) -> Option<String> {
    if !resp.is_json() {
        return None;
    }
    let body: Value = serde_json::from_str(&resp.body).ok()?;
    body.get("error")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map(String::from)
}

/// Classify a failure below the HTTP layer. Never yields an HTTP category
/// unless the opaque message names one.
pub fn classify_transport_error(err: &TransportError) -> Failure {
    let category = match err.kind {
        TransportErrorKind::Connect | TransportErrorKind::Body => ErrorCategory::NetworkError,
        TransportErrorKind::Timeout => ErrorCategory::Timeout,
        TransportErrorKind::Other => {
            classify_legacy_message(&err.message).unwrap_or(ErrorCategory::NetworkError)
        }
    };
    Failure::new(category, err.to_string())
}

/// Best-effort category for an opaque error string.
///
/// Checks run in a fixed order, so `"fetch timeout"` is a network error.
/// Returns `None` when nothing matches.
///
/// # Examples
///
/// ```
/// use everyday_ai::error::ErrorCategory;
/// use everyday_ai::pipeline::classify_legacy_message;
///
/// assert_eq!(
///     classify_legacy_message("TypeError: Failed to fetch"),
///     Some(ErrorCategory::NetworkError)
/// );
/// assert_eq!(
///     classify_legacy_message("Server error (429): Too Many Requests"),
///     Some(ErrorCategory::RateLimited)
/// );
/// assert_eq!(classify_legacy_message("something odd"), None);
/// ```
pub fn classify_legacy_message(text: &str) -> Option<ErrorCategory> {
    let has = |needle: &str| text.contains(needle);

    if has("Unexpected token") || has("not valid JSON") {
        return Some(ErrorCategory::ServerError { status: 500 });
    }
    if has("fetch") || has("network") {
        return Some(ErrorCategory::NetworkError);
    }
    if has("timeout") || has("AbortError") {
        return Some(ErrorCategory::Timeout);
    }

    const STATUS_PHRASES: [(u16, &str); 9] = [
        (500, "Internal Server Error"),
        (429, "Too Many Requests"),
        (400, "Bad Request"),
        (401, "Unauthorized"),
        (403, "Forbidden"),
        (404, "Not Found"),
        (502, "Bad Gateway"),
        (503, "Service Unavailable"),
        (504, "Gateway Timeout"),
    ];
    for (status, phrase) in STATUS_PHRASES {
        if has(&format!("Server error ({status})")) || has(phrase) {
            return Some(classify_status(status));
        }
    }

    if has("invalid response format") {
        return Some(ErrorCategory::InvalidResponseFormat);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_table() {
        assert_eq!(classify_status(400), ErrorCategory::BadRequest);
        assert_eq!(classify_status(401), ErrorCategory::Unauthorized);
        assert_eq!(classify_status(403), ErrorCategory::Forbidden);
        assert_eq!(classify_status(404), ErrorCategory::NotFound);
        assert_eq!(classify_status(429), ErrorCategory::RateLimited);
        for status in [500, 502, 503, 504] {
            assert_eq!(classify_status(status), ErrorCategory::ServerError { status });
        }
        assert_eq!(classify_status(418), ErrorCategory::UnknownHttp { status: 418 });
        assert_eq!(classify_status(501), ErrorCategory::UnknownHttp { status: 501 });
        assert_eq!(classify_status(302), ErrorCategory::UnknownHttp { status: 302 });
    }

    #[test]
    fn json_success_is_payload() {
        let resp = HttpResponse::json(200, &json!({"enhanced_email": "Hi"}));
        let payload = classify_response(&resp).unwrap_or_default();
        assert_eq!(payload["enhanced_email"], "Hi");
    }

    #[test]
    fn html_success_is_invalid_format() {
        let resp = HttpResponse::new(200, Some("text/html"), "<html></html>");
        let failure = classify_response(&resp).err();
        assert_eq!(
            failure.map(|f| f.category()),
            Some(ErrorCategory::InvalidResponseFormat)
        );
    }

    #[test]
    fn missing_content_type_is_invalid_format() {
        let resp = HttpResponse::new(200, None, "{}");
        assert!(matches!(
            classify_response(&resp).map_err(|f| f.category()),
            Err(ErrorCategory::InvalidResponseFormat)
        ));
    }

    #[test]
    fn json_content_type_with_garbage_is_invalid_format() {
        let resp = HttpResponse::new(200, Some("application/json"), "{not json");
        assert!(matches!(
            classify_response(&resp).map_err(|f| f.category()),
            Err(ErrorCategory::InvalidResponseFormat)
        ));
    }

    #[test]
    fn error_body_becomes_backend_detail() {
        let resp = HttpResponse::json(429, &json!({"error": "rate limited"}));
        match classify_response(&resp) {
            Err(failure) => {
                assert_eq!(failure.category(), ErrorCategory::RateLimited);
                assert_eq!(failure.detail(), "rate limited");
                assert!(failure.is_backend_reported());
            }
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn html_error_uses_status_line() {
        let resp = HttpResponse::new(502, Some("text/html"), "<h1>Bad Gateway</h1>");
        match classify_response(&resp) {
            Err(failure) => {
                assert_eq!(failure.category(), ErrorCategory::ServerError { status: 502 });
                assert_eq!(failure.detail(), "Server error (502): Bad Gateway");
                assert!(!failure.is_backend_reported());
            }
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn json_error_without_error_field_uses_status_line() {
        let resp = HttpResponse::json(500, &json!({"message": "nope"}));
        match classify_response(&resp) {
            Err(failure) => assert_eq!(failure.detail(), "Server error (500): Internal Server Error"),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn transport_kinds() {
        let connect = TransportError::new(TransportErrorKind::Connect, "connection refused");
        assert_eq!(
            classify_transport_error(&connect).category(),
            ErrorCategory::NetworkError
        );

        let timeout = TransportError::new(TransportErrorKind::Timeout, "operation timed out");
        assert_eq!(classify_transport_error(&timeout).category(), ErrorCategory::Timeout);

        let body = TransportError::new(TransportErrorKind::Body, "connection reset");
        assert_eq!(classify_transport_error(&body).category(), ErrorCategory::NetworkError);
    }

    #[test]
    fn opaque_transport_error_uses_legacy_matching() {
        let abort = TransportError::new(TransportErrorKind::Other, "AbortError: aborted");
        assert_eq!(classify_transport_error(&abort).category(), ErrorCategory::Timeout);

        let unknown = TransportError::new(TransportErrorKind::Other, "builder error");
        assert_eq!(
            classify_transport_error(&unknown).category(),
            ErrorCategory::NetworkError
        );
    }

    #[test]
    fn legacy_messages() {
        let cases = [
            ("Unexpected token < in JSON", Some(ErrorCategory::ServerError { status: 500 })),
            ("TypeError: Failed to fetch", Some(ErrorCategory::NetworkError)),
            ("network unreachable", Some(ErrorCategory::NetworkError)),
            ("request timeout", Some(ErrorCategory::Timeout)),
            ("AbortError", Some(ErrorCategory::Timeout)),
            ("Server error (400): Bad Request", Some(ErrorCategory::BadRequest)),
            ("Unauthorized", Some(ErrorCategory::Unauthorized)),
            ("Server error (403)", Some(ErrorCategory::Forbidden)),
            ("Not Found", Some(ErrorCategory::NotFound)),
            ("Server error (429): Too Many Requests", Some(ErrorCategory::RateLimited)),
            ("Bad Gateway", Some(ErrorCategory::ServerError { status: 502 })),
            ("Service Unavailable", Some(ErrorCategory::ServerError { status: 503 })),
            ("Gateway Timeout", Some(ErrorCategory::ServerError { status: 504 })),
            (
                "Server returned an invalid response format",
                Some(ErrorCategory::InvalidResponseFormat),
            ),
            ("", None),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_legacy_message(text), expected, "text {text:?}");
        }
    }

    #[test]
    fn legacy_order_prefers_network() {
        assert_eq!(
            classify_legacy_message("fetch timeout"),
            Some(ErrorCategory::NetworkError)
        );
    }
}
