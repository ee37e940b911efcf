use axum::http::{HeaderMap, header};

pub const FALLBACK_LANGUAGE: &str = "en";
pub const LANGUAGES: &[&str] = &["en", "hi", "ta", "te", "bn"];
pub const LANGUAGE_COOKIE: &str = "i18next";

/// Page language for revalidation paths: the `i18next` cookie, then
/// `Accept-Language`, then English.
pub fn language(headers: &HeaderMap) -> &'static str {
    cookie_language(headers)
        .or_else(|| accept_language(headers))
        .unwrap_or(FALLBACK_LANGUAGE)
}

fn supported(tag: &str) -> Option<&'static str> {
    let primary = tag.trim().split(['-', '_']).next()?;
    LANGUAGES.iter().copied().find(|l| l.eq_ignore_ascii_case(primary))
}

fn cookie_language(headers: &HeaderMap) -> Option<&'static str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LANGUAGE_COOKIE)
        .and_then(|(_, value)| supported(value))
}

fn accept_language(headers: &HeaderMap) -> Option<&'static str> {
    let raw = headers.get(header::ACCEPT_LANGUAGE)?.to_str().ok()?;
    raw.split(',')
        .filter_map(|entry| entry.split(';').next())
        .find_map(supported)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn cookie_wins_over_accept_language() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; i18next=ta"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("hi-IN,hi;q=0.9"));
        assert_eq!(language(&headers), "ta");
    }

    #[test]
    fn falls_back_through_accept_language_to_english() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("i18next=fr"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR, bn;q=0.8"));
        assert_eq!(language(&headers), "bn");

        assert_eq!(language(&HeaderMap::new()), "en");
    }
}
