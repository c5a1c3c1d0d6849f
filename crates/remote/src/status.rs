//! HTTP status → [`ZiplineError`] mapping.

use zipgate_core::{ZiplineError, ZiplineErrorKind};

/// Map a failed response's status (and body, if any) to a typed error.
///
/// Total: every status not in the fixed table becomes
/// `InternalZiplineError` carrying the numeric code.
pub fn map_status(status: u16, body: Option<String>) -> ZiplineError {
    let kind = match status {
        401 => ZiplineErrorKind::UnauthorizedAccess,
        403 => ZiplineErrorKind::ForbiddenOperation,
        404 => ZiplineErrorKind::ResourceNotFound,
        413 => ZiplineErrorKind::PayloadTooLarge,
        429 => ZiplineErrorKind::RateLimitExceeded,
        _ => ZiplineErrorKind::InternalZiplineError,
    };
    ZiplineError::new(kind, status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_table() {
        let cases = [
            (401, "UNAUTHORIZED_ACCESS"),
            (403, "FORBIDDEN_OPERATION"),
            (404, "RESOURCE_NOT_FOUND"),
            (413, "PAYLOAD_TOO_LARGE"),
            (429, "RATE_LIMIT_EXCEEDED"),
            (500, "INTERNAL_ZIPLINE_ERROR"),
        ];
        for (status, code) in cases {
            let err = map_status(status, None);
            assert_eq!(err.kind.code(), code, "status {status}");
            assert_eq!(err.http_status, status);
        }
    }

    #[test]
    fn not_found_points_at_listing() {
        let err = map_status(404, None);
        assert_eq!(err.kind, ZiplineErrorKind::ResourceNotFound);
        assert!(err.resolution_guidance.contains("list your uploaded files"));
    }

    #[test]
    fn total_over_every_status() {
        for status in (100..=599).chain([0, 1, 99, 600, 999, u16::MAX]) {
            let err = map_status(status, None);
            assert!(!err.resolution_guidance.is_empty(), "status {status}");
            assert!(!err.message.is_empty());
        }
    }

    #[test]
    fn unmapped_status_embeds_code() {
        let err = map_status(418, None);
        assert_eq!(err.kind, ZiplineErrorKind::InternalZiplineError);
        assert!(err.message.contains("418"));
        assert!(err.to_string().contains("418"));
    }

    #[test]
    fn body_kept_verbatim() {
        let body = r#"{"error":"nope","token":"abc"}"#.to_string();
        let err = map_status(400, Some(body.clone()));
        assert_eq!(err.response_body.as_deref(), Some(body.as_str()));
    }
}
