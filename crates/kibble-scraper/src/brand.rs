use kibble_core::RetailerCatalog;

/// Words a brand field sometimes holds that are not brands.
const NOT_BRANDS: &[&str] = &[
    "brand", "brands", "unknown", "n/a", "na", "none", "generic", "other", "various",
];

/// Recognises known brands for one retailer.
#[derive(Debug, Clone, Default)]
pub struct BrandMatcher {
    /// `(lowercased alias, canonical name)`, longest alias first.
    aliases: Vec<(String, String)>,
    generic_terms: Vec<String>,
}

impl BrandMatcher {
    #[must_use]
    pub fn new(catalog: &RetailerCatalog, retailer_slug: &str) -> Self {
        Self {
            aliases: catalog
                .brand_aliases_for(retailer_slug)
                .into_iter()
                .map(|(alias, canonical)| (alias.to_lowercase(), canonical))
                .collect(),
            generic_terms: catalog
                .generic_terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
        }
    }

    /// Brand validity check: at least two characters, contains a letter, and
    /// is neither a catalog generic term nor a placeholder.
    #[must_use]
    pub fn is_plausible(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        let lowered = candidate.to_lowercase();
        candidate.chars().count() >= 2
            && candidate.chars().any(char::is_alphabetic)
            && !NOT_BRANDS.contains(&lowered.as_str())
            && !self.generic_terms.contains(&lowered)
    }

    /// Canonical name when `candidate` is exactly a known alias, otherwise
    /// the trimmed candidate.
    #[must_use]
    pub fn canonicalize(&self, candidate: &str) -> String {
        let lowered = candidate.trim().to_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map_or_else(|| candidate.trim().to_owned(), |(_, canonical)| canonical.clone())
    }

    /// Longest known alias appearing as a whole word in `text`.
    #[must_use]
    pub fn find_in(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| contains_word(&lowered, alias))
            .map(|(_, canonical)| canonical.clone())
    }
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = !haystack[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        let after_ok = !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        before_ok && after_ok
    })
}
