//! Mapping SDK failures onto [`ServiceError`].

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_glacier::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use coldpush_upload::ServiceError;

const AUTHENTICATION_CODES: &[&str] = &[
    "AccessDeniedException",
    "ExpiredTokenException",
    "InvalidSignatureException",
    "MissingAuthenticationTokenException",
    "UnrecognizedClientException",
];

/// Convert a failed SDK call into a [`ServiceError`].
///
/// Errors the service answered are classified by their error code. Anything
/// that never got an answer (dispatch, timeout, unparseable response) is a
/// [`ServiceError::Transport`].
pub(crate) fn from_sdk<E, R>(operation: &'static str, err: &SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    match err.as_service_error() {
        Some(service_err) => classify(service_err),
        None => ServiceError::Transport(format!("{operation}: {}", DisplayErrorContext(err))),
    }
}

/// Classify a service-reported error by its code and message.
pub(crate) fn classify(err: &impl ProvideErrorMetadata) -> ServiceError {
    let code = err.code().unwrap_or("Unknown");
    let message = err.message().unwrap_or_default();
    let detail = if message.is_empty() {
        code.to_owned()
    } else {
        format!("{code}: {message}")
    };

    if AUTHENTICATION_CODES.contains(&code) {
        return ServiceError::Authentication(detail);
    }

    match code {
        "LimitExceededException" => ServiceError::Quota(detail),
        "ResourceNotFoundException" => ServiceError::InvalidContainer(detail),
        "InvalidParameterValueException" => classify_invalid_parameter(message, detail),
        _ => ServiceError::Transport(detail),
    }
}

fn classify_invalid_parameter(message: &str, detail: String) -> ServiceError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("checksum") || lower.contains("tree hash") {
        ServiceError::ChecksumMismatch(detail)
    } else if lower.contains("range") {
        ServiceError::RangeConflict(detail)
    } else if lower.contains("size") {
        ServiceError::SizeMismatch(detail)
    } else {
        ServiceError::Transport(detail)
    }
}
