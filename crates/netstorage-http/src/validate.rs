//! Response validation and clock-skew detection.

use chrono::{DateTime, TimeDelta, Utc};
use http::response::Parts;
use http::{HeaderMap, StatusCode, header};
use hyper::ext::ReasonPhrase;
use tracing::warn;

use crate::error::{NetStorageError, NetStorageResult};

/// Largest tolerated difference between local time and the server `Date`.
pub const MAX_CLOCK_SKEW_SECS: i64 = 30;

/// Check a response head.
///
/// Only `200 OK` is a success. For any other status, a server `Date` more
/// than [`MAX_CLOCK_SKEW_SECS`] away from `now` in either direction is
/// reported as [`NetStorageError::ClockSkew`]; everything else is an
/// [`NetStorageError::Api`] error carrying the status line's reason phrase.
/// A `Date` that cannot be parsed is treated as absent.
pub fn validate_response(head: &Parts, now: DateTime<Utc>) -> NetStorageResult<()> {
    let status = head.status;
    if status == StatusCode::OK {
        return Ok(());
    }

    if let Some(date) = server_date(&head.headers) {
        let skew = now - date;
        if skew.abs() > TimeDelta::seconds(MAX_CLOCK_SKEW_SECS) {
            let skew_secs = skew.num_seconds();
            warn!(skew_secs, %status, "server clock out of sync");
            return Err(NetStorageError::ClockSkew { skew_secs, status });
        }
    }

    let reason = reason_phrase(head);
    warn!(%status, reason = %reason, "unexpected response from server");
    Err(NetStorageError::Api {
        status,
        reason,
        headers: head.headers.clone(),
    })
}

/// The reason phrase the server sent, or the canonical one for the status.
///
/// The HTTP/1 client only records a phrase that differs from the canonical
/// one.
#[must_use]
pub fn reason_phrase(head: &Parts) -> String {
    match head.extensions.get::<ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => head.status.canonical_reason().unwrap_or_default().to_owned(),
    }
}

/// Parse the RFC 1123 `Date` response header.
#[must_use]
pub fn server_date(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(header::DATE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use http::{HeaderValue, Response};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 11, 11, 12, 0, 0).unwrap()
    }

    fn with_date(date: DateTime<Utc>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = date.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        headers.insert(header::DATE, HeaderValue::from_str(&value).unwrap());
        headers
    }

    fn head(status: StatusCode, headers: HeaderMap) -> Parts {
        let mut response = Response::new(());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response.into_parts().0
    }

    fn validate(
        status: StatusCode,
        headers: HeaderMap,
        now: DateTime<Utc>,
    ) -> NetStorageResult<()> {
        validate_response(&head(status, headers), now)
    }

    #[test]
    fn test_should_accept_200_regardless_of_date() {
        let headers = with_date(now() - TimeDelta::days(365));
        assert!(validate(StatusCode::OK, headers, now()).is_ok());
    }

    #[test]
    fn test_should_reject_other_2xx() {
        let err = validate(StatusCode::CREATED, HeaderMap::new(), now()).unwrap_err();
        assert!(matches!(err, NetStorageError::Api { status, .. } if status == StatusCode::CREATED));
    }

    #[test]
    fn test_should_report_clock_skew_for_old_server_date() {
        let headers = with_date(now() - TimeDelta::seconds(31));
        let err = validate(StatusCode::FORBIDDEN, headers, now()).unwrap_err();
        assert!(matches!(
            err,
            NetStorageError::ClockSkew { skew_secs: 31, status } if status == StatusCode::FORBIDDEN
        ));
    }

    #[test]
    fn test_should_report_clock_skew_for_future_server_date() {
        let headers = with_date(now() + TimeDelta::minutes(5));
        let err = validate(StatusCode::FORBIDDEN, headers, now()).unwrap_err();
        assert!(matches!(err, NetStorageError::ClockSkew { skew_secs: -300, .. }));
    }

    #[test]
    fn test_should_report_clock_skew_past_boundary_by_a_fraction_of_a_second() {
        let headers = with_date(now());
        let late = now() + TimeDelta::milliseconds(30_900);
        let err = validate(StatusCode::FORBIDDEN, headers, late).unwrap_err();
        assert!(matches!(err, NetStorageError::ClockSkew { skew_secs: 30, .. }));
    }

    #[test]
    fn test_should_prefer_server_reason_phrase() {
        let mut parts = head(StatusCode::NOT_FOUND, HeaderMap::new());
        parts
            .extensions
            .insert(ReasonPhrase::from_static(b"No Such Object"));
        assert_eq!(reason_phrase(&parts), "No Such Object");

        let err = validate_response(&parts, now()).unwrap_err();
        assert!(matches!(
            err,
            NetStorageError::Api { ref reason, .. } if reason == "No Such Object"
        ));
    }

    #[test]
    fn test_should_report_api_error_within_skew_window() {
        let headers = with_date(now() - TimeDelta::seconds(30));
        let err = validate(StatusCode::NOT_FOUND, headers.clone(), now()).unwrap_err();
        match err {
            NetStorageError::Api {
                status,
                reason,
                headers: returned,
            } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(reason, "Not Found");
                assert_eq!(returned, headers);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_should_treat_unparseable_date_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::DATE, HeaderValue::from_static("yesterday"));
        let err = validate(StatusCode::SERVICE_UNAVAILABLE, headers, now()).unwrap_err();
        assert!(matches!(err, NetStorageError::Api { .. }));
    }

    #[test]
    fn test_should_parse_rfc1123_date() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::DATE,
            HeaderValue::from_static("Mon, 11 Nov 2013 00:00:00 GMT"),
        );
        assert_eq!(server_date(&headers).map(|d| d.timestamp()), Some(1_384_128_000));
    }
}
