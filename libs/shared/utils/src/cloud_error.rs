use tracing::warn;

use shared_models::error::AppError;

const AUTH_CODES: [&str; 6] = [
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "AuthFailure",
    "UnrecognizedClientException",
    "MissingAuthenticationToken",
    "ExpiredToken",
];

const FORBIDDEN_CODES: [&str; 3] = ["AccessDenied", "AccessDeniedException", "UnauthorizedOperation"];

const TIMEOUT_CODES: [&str; 2] = ["RequestTimeout", "RequestExpired"];

/// Maps a cloud provider error to the response status the route returns.
///
/// The provider's error code wins; the raw HTTP status is only consulted when
/// the code is unknown. `detail` is used as the message when the provider
/// did not send one.
pub fn classify(
    code: Option<&str>,
    message: Option<&str>,
    http_status: Option<u16>,
    detail: &str,
) -> AppError {
    let message = message.unwrap_or(detail).to_string();
    warn!(code = ?code, status = ?http_status, "Cloud provider error: {}", message);

    if let Some(code) = code {
        if code.ends_with("NotFound") || code.ends_with("NotFoundFault") || code.ends_with("NotFoundException") {
            return AppError::NotFound(message);
        }
        if AUTH_CODES.contains(&code) {
            return AppError::Auth(message);
        }
        if FORBIDDEN_CODES.contains(&code) {
            return AppError::Forbidden(message);
        }
        if TIMEOUT_CODES.contains(&code) {
            return AppError::Timeout(message);
        }
    }

    match http_status {
        Some(404) => AppError::NotFound(message),
        Some(401) => AppError::Auth(message),
        Some(status) if (400..500).contains(&status) => AppError::BadRequest(message),
        _ => AppError::ExternalService(message),
    }
}
