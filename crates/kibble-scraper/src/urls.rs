//! URL normalization helpers shared by the extractors.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static PAGE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/page[/-](\d{1,4})(?:/|$)").expect("valid regex"));

/// Query parameters retailers use for the page number.
const PAGE_PARAMS: &[&str] = &["page", "p", "pageno", "pn", "pg", "currentpage"];

/// Resolves `href` against `base`, dropping the fragment.
///
/// Returns `None` for in-page anchors, non-navigational schemes (`mailto:`,
/// `javascript:`, `tel:`, `data:`) and anything that is not http(s) after
/// resolution. Protocol-relative hrefs (`//cdn.example.com/x.jpg`) inherit the
/// base scheme.
#[must_use]
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lowered = href.to_ascii_lowercase();
    if ["mailto:", "javascript:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

/// Lowercased host of `url`, if it parses.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Path plus `?query` when present, the part retailer patterns match on.
#[must_use]
pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

/// Page number carried by a listing URL, from a query parameter
/// (`?page=3`, `?p=3`, `?pageNo=3`) or a path segment (`/page/3`).
#[must_use]
pub fn page_number(url: &Url) -> Option<u32> {
    let from_query = url.query_pairs().find_map(|(key, value)| {
        PAGE_PARAMS
            .iter()
            .any(|p| key.eq_ignore_ascii_case(p))
            .then(|| value.trim().parse::<u32>().ok())
            .flatten()
    });
    from_query
        .or_else(|| {
            PAGE_PATH_RE
                .captures(url.path())
                .and_then(|caps| caps[1].parse().ok())
        })
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.zooplus.co.uk/shop/dogs/dry_dog_food?page=2#reviews").unwrap()
    }

    #[test]
    fn resolves_relative_and_protocol_relative() {
        assert_eq!(
            resolve_href(&base(), "/shop/dogs/royal_canin/123").unwrap().as_str(),
            "https://www.zooplus.co.uk/shop/dogs/royal_canin/123"
        );
        assert_eq!(
            resolve_href(&base(), "//media.zooplus.com/a.jpg").unwrap().as_str(),
            "https://media.zooplus.com/a.jpg"
        );
    }

    #[test]
    fn strips_fragment_and_rejects_non_navigation() {
        assert_eq!(
            resolve_href(&base(), "/p/1#details").unwrap().as_str(),
            "https://www.zooplus.co.uk/p/1"
        );
        assert!(resolve_href(&base(), "#top").is_none());
        assert!(resolve_href(&base(), "javascript:void(0)").is_none());
        assert!(resolve_href(&base(), "mailto:help@zooplus.co.uk").is_none());
        assert!(resolve_href(&base(), "ftp://files.example.com/x").is_none());
    }

    #[test]
    fn page_number_from_query_variants() {
        for (url, expected) in [
            ("https://a.test/dogs?page=3", Some(3)),
            ("https://a.test/dogs?sort=price&p=4", Some(4)),
            ("https://a.test/dogs?pageNo=5", Some(5)),
            ("https://a.test/dogs/page/6/", Some(6)),
            ("https://a.test/dogs/page-7", Some(7)),
            ("https://a.test/dogs?page=0", None),
            ("https://a.test/dogs", None),
            ("https://a.test/pages/about", None),
        ] {
            let parsed = Url::parse(url).unwrap();
            assert_eq!(page_number(&parsed), expected, "{url}");
        }
    }

    #[test]
    fn host_is_lowercased() {
        assert_eq!(
            host_of("https://WWW.Tesco.com/groceries").as_deref(),
            Some("www.tesco.com")
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn path_and_query_joins_parts() {
        assert_eq!(path_and_query(&base()), "/shop/dogs/dry_dog_food?page=2");
    }
}
