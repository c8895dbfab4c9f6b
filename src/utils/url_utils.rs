// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// Query parameters stripped during normalization. Tracking noise only,
/// never content-addressing.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mtm_campaign"];

/// Resolve a possibly relative path against a base URL.
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// Canonicalize a URL for deduplication.
///
/// Drops the fragment, tracking query parameters and trailing slashes on
/// non-root paths. The `url` crate already lowercases scheme/host and strips
/// default ports during parsing, so the result is stable:
/// `normalize(normalize(u)) == normalize(u)`.
pub fn normalize_url(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);

    let kept: Vec<(String, String)> = u
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        u.set_query(None);
    } else {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        u.set_query(Some(&qs));
    }

    let path = u.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        u.set_path(path.trim_end_matches('/'));
    }

    u.to_string()
}

/// Normalize a URL given as a string.
pub fn normalize_str(url_str: &str) -> Result<String, ParseError> {
    Ok(normalize_url(&Url::parse(url_str)?))
}

fn bare_host(url: &Url) -> Option<&str> {
    url.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h))
}

/// Whether two URLs belong to the same site. `www.` prefixes are ignored,
/// other subdomains are not collapsed.
pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (bare_host(a), bare_host(b)) {
        (Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb),
        _ => false,
    }
}

/// Key identifying a host for politeness accounting: `host:port`.
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Origin of a URL (`scheme://host[:port]`) without path, query or fragment.
pub fn origin(url: &Url) -> String {
    let mut o = url.clone();
    o.set_path("/");
    o.set_query(None);
    o.set_fragment(None);
    let s = o.to_string();
    s.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        let path = "http://t.co/c";
        assert_eq!(resolve_url(&base, path).unwrap().as_str(), "http://t.co/c");
    }

    #[test]
    fn test_resolve_root_relative_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        let path = "/c";
        assert_eq!(
            resolve_url(&base, path).unwrap().as_str(),
            "http://example.com/c"
        );
    }

    #[test]
    fn test_normalize_strips_fragment_and_trailing_slash() {
        let u = Url::parse("https://Example.com/downloads/#section").unwrap();
        assert_eq!(normalize_url(&u), "https://example.com/downloads");
    }

    #[test]
    fn test_normalize_strips_tracking_params() {
        let u = Url::parse("https://example.com/p?utm_source=x&year=2025&fbclid=abc").unwrap();
        assert_eq!(normalize_url(&u), "https://example.com/p?year=2025");
    }

    #[test]
    fn test_normalize_keeps_root_path() {
        let u = Url::parse("https://example.com/").unwrap();
        assert_eq!(normalize_url(&u), "https://example.com/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "https://Example.com:443/Downloads/Netzentgelte/?utm_campaign=x&y=1#top",
            "http://www.dno.de/a//",
            "https://dno.de/preisblatt.pdf?v=2&utm_source=mail",
            "https://dno.de/?q=a b",
        ];
        for input in inputs {
            let once = normalize_str(input).unwrap();
            let twice = normalize_str(&once).unwrap();
            assert_eq!(once, twice, "normalization must be idempotent for {}", input);
        }
    }

    #[test]
    fn test_same_domain_ignores_www() {
        let a = Url::parse("https://www.dno.de/x").unwrap();
        let b = Url::parse("https://dno.de/y").unwrap();
        let c = Url::parse("https://cdn.dno.de/y").unwrap();
        assert!(same_domain(&a, &b));
        assert!(!same_domain(&a, &c));
    }

    #[test]
    fn test_host_key_includes_port() {
        let u = Url::parse("http://localhost:8080/x").unwrap();
        assert_eq!(host_key(&u), "localhost:8080");
        let u = Url::parse("https://dno.de/x").unwrap();
        assert_eq!(host_key(&u), "dno.de:443");
    }

    #[test]
    fn test_origin() {
        let u = Url::parse("https://dno.de/downloads/x.pdf?a=1").unwrap();
        assert_eq!(origin(&u), "https://dno.de");
    }
}
