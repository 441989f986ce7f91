//! Browser navigation header set and layered merging.

/// Headers a desktop browser sends on a top-level navigation.
///
/// `Accept-Encoding` is left to reqwest so the body is always decodable.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-GB,en;q=0.9"),
    ("Cache-Control", "max-age=0"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// Merges header layers in increasing precedence. A later layer replaces an
/// earlier value for the same name, compared case-insensitively; the first
/// spelling of the name is dropped with it.
#[must_use]
pub fn merge_headers(layers: &[&[(String, String)]]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = BROWSER_HEADERS
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    for layer in layers {
        for (name, value) in *layer {
            merged.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            merged.push((name.clone(), value.clone()));
        }
    }
    merged
}

/// Case-insensitive header lookup in a merged list.
#[must_use]
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn built_in_set_is_present_without_layers() {
        let merged = merge_headers(&[]);
        for name in [
            "Accept",
            "Accept-Language",
            "Sec-Fetch-Dest",
            "Sec-Fetch-Mode",
            "Sec-Fetch-Site",
            "Sec-Fetch-User",
            "Upgrade-Insecure-Requests",
            "Cache-Control",
        ] {
            assert!(find_header(&merged, name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn later_layers_win_case_insensitively() {
        let defaults = layer(&[("accept-language", "fr-FR")]);
        let retailer = layer(&[("Referer", "https://www.zooplus.co.uk/")]);
        let call = layer(&[("ACCEPT-LANGUAGE", "de-DE"), ("referer", "https://x.test/")]);
        let merged = merge_headers(&[&defaults, &retailer, &call]);

        assert_eq!(find_header(&merged, "Accept-Language"), Some("de-DE"));
        assert_eq!(find_header(&merged, "Referer"), Some("https://x.test/"));
        let language_count = merged
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("accept-language"))
            .count();
        assert_eq!(language_count, 1);
    }

    #[test]
    fn configured_defaults_override_built_ins() {
        let defaults = layer(&[("Cache-Control", "no-cache")]);
        let merged = merge_headers(&[&defaults]);
        assert_eq!(find_header(&merged, "cache-control"), Some("no-cache"));
    }
}
