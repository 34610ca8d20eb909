pub mod calendar;
pub mod gmail;
pub mod oauth;

pub use oauth::GoogleAuth;

/// Minimal URL encoding for query parameters.
pub(crate) fn urlencode(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace(':', "%3A")
        .replace('?', "%3F")
        .replace('#', "%23")
}
