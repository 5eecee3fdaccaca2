pub mod anthropic;
pub mod openai;

use codeloom_core::error::ServiceErrorKind;

/// Map an HTTP status to the service error taxonomy.
pub(crate) fn classify_status(status: reqwest::StatusCode) -> ServiceErrorKind {
    match status.as_u16() {
        401 | 403 => ServiceErrorKind::Auth,
        429 => ServiceErrorKind::RateLimit,
        _ => ServiceErrorKind::Other,
    }
}

/// Map a reqwest transport failure to the service error taxonomy.
pub(crate) fn classify_transport(err: &reqwest::Error) -> ServiceErrorKind {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ServiceErrorKind::Network
    } else {
        ServiceErrorKind::Other
    }
}
