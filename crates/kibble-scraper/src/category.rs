//! Category inference from URLs and breadcrumb trails.

use std::sync::LazyLock;

use kibble_core::{CategoryKeyword, RetailerCatalog};
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::extract::dom::{self, Locator};

/// Path shapes ordered from most to least specific. Each captures one
/// segment naming a category.
static URL_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("shelf", r"/shelf/([^/?#]+)"),
        ("shelf", r"/shop/[^/?#]+/[^/?#]+/([^/?#]+)"),
        ("aisle", r"/aisle/([^/?#]+)"),
        ("aisle", r"/shop/[^/?#]+/([^/?#]+)"),
        ("department", r"/department/([^/?#]+)"),
        ("department", r"/shop/([^/?#]+)"),
        ("category", r"/(?:c|category|categories)/(?:[^/?#]+/)*([^/?#]+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Animal words recognised anywhere in a URL path, plural forms included.
static ANIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[/_\-\s])(dog|puppy|puppies|cat|kitten|rabbit|guinea[-_ ]pig|hamster|ferret|bird|fish|reptile|horse|small[-_ ]animal)s?(?:$|[/_\-\s.?])",
    )
    .expect("valid regex")
});

/// Food-type words that make a URL segment a meaningful category on their own.
const FOOD_TYPES: &[&str] = &[
    "food", "treats", "treat", "chews", "litter", "wet", "dry", "raw", "biscuits", "pouches",
    "tins", "snacks", "supplements", "hay", "bedding",
];

/// Segments that never name a category.
const BUILTIN_GENERIC: &[&str] = &[
    "all", "shop", "en", "en-gb", "en gb", "groceries", "c", "category", "products", "browse",
];

#[derive(Debug, Clone, Default)]
pub struct CategoryInferer {
    generic_terms: Vec<String>,
    keywords: Vec<CategoryKeyword>,
}

impl CategoryInferer {
    #[must_use]
    pub fn new(catalog: &RetailerCatalog) -> Self {
        Self {
            generic_terms: catalog
                .generic_terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            keywords: catalog.category_keywords.clone(),
        }
    }

    #[must_use]
    pub fn is_generic(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        label.is_empty()
            || BUILTIN_GENERIC.contains(&label.as_str())
            || self.generic_terms.iter().any(|t| *t == label)
    }

    /// Infers a category from the URL path shape, most specific rule first:
    /// shelf, aisle, department, generic category paths, then a bare animal
    /// mention. Hyphens and underscores become spaces.
    #[must_use]
    pub fn extract_from_url(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let path = parsed.path().to_lowercase();
        for (rule, pattern) in URL_RULES.iter() {
            let Some(caps) = pattern.captures(&path) else {
                continue;
            };
            let label = normalize_segment(&caps[1]);
            if !self.is_generic(&label) && !looks_like_identifier(&label) {
                tracing::trace!(url, rule, category = %label, "category from URL shape");
                return Some(label);
            }
        }
        ANIMAL_RE
            .captures(&path)
            .map(|caps| normalize_segment(&caps[1]))
            .map(|animal| singular_animal(&animal))
    }

    /// Picks the crumb `depth_from_end` places from the end of `trail`
    /// (0 = last). A generic crumb falls back to the last one; trails shorter
    /// than two crumbs yield nothing.
    #[must_use]
    pub fn extract_from_breadcrumbs(&self, trail: &[String], depth_from_end: usize) -> Option<String> {
        let crumbs: Vec<&str> = trail
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if crumbs.len() < 2 {
            return None;
        }
        let last = crumbs[crumbs.len() - 1];
        let picked = crumbs
            .len()
            .checked_sub(depth_from_end + 1)
            .map_or(last, |idx| crumbs[idx]);
        if !self.is_generic(picked) {
            return Some(picked.to_owned());
        }
        (!self.is_generic(last)).then(|| last.to_owned())
    }

    /// Collects the breadcrumb trail with the given locators.
    #[must_use]
    pub fn breadcrumbs_from_html(doc: &Html, locators: &[Locator]) -> Vec<String> {
        dom::values(doc.root_element(), locators)
            .into_iter()
            .map(|crumb| crumb.trim_matches(|c: char| c == '>' || c == '/' || c == '›' || c.is_whitespace()).to_owned())
            .filter(|crumb| !crumb.is_empty())
            .collect()
    }

    /// First catalog keyword contained in the URL path.
    #[must_use]
    pub fn extract_from_keywords(&self, url: &str) -> Option<String> {
        let path = Url::parse(url).ok()?.path().to_lowercase();
        self.keywords
            .iter()
            .find(|k| path.contains(&k.keyword.to_lowercase()))
            .map(|k| k.category.clone())
    }

    /// Maps a retailer-specific URL segment through the animal and food-type
    /// vocabulary. Unknown or generic segments map to nothing.
    #[must_use]
    pub fn map_segment(&self, segment: &str) -> Option<String> {
        let slug = segment.trim().to_lowercase();
        if let Some(keyword) = self
            .keywords
            .iter()
            .find(|k| k.keyword.eq_ignore_ascii_case(&slug))
        {
            return Some(keyword.category.clone());
        }
        let label = normalize_segment(&slug);
        if self.is_generic(&label) || looks_like_identifier(&label) {
            return None;
        }
        let known_word = ANIMAL_RE.is_match(&slug)
            || label.split(' ').any(|word| FOOD_TYPES.contains(&word));
        known_word.then_some(label)
    }
}

fn normalize_segment(segment: &str) -> String {
    let decoded = segment.replace("%20", " ");
    let stem = decoded
        .rsplit_once('.')
        .filter(|(_, ext)| matches!(*ext, "html" | "htm" | "aspx" | "php"))
        .map_or(decoded.as_str(), |(stem, _)| stem);
    stem.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Product codes and numeric ids that happen to sit where a category would.
fn looks_like_identifier(label: &str) -> bool {
    let digits = label.chars().filter(char::is_ascii_digit).count();
    digits * 2 >= label.chars().filter(|c| !c.is_whitespace()).count()
}

fn singular_animal(animal: &str) -> String {
    match animal {
        "puppies" => "puppy".to_owned(),
        other => other.trim_end_matches('s').to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> RetailerCatalog {
        RetailerCatalog::from_yaml_str(
            r#"
generic_terms: [Home, Shop, Pets, "All Products"]
category_keywords:
  - keyword: "dry-dog-food"
    category: "dry dog food"
  - keyword: "cat-litter"
    category: "cat litter"
  - keyword: "dog"
    category: "dog"
"#,
        )
        .unwrap()
    }

    fn trail(crumbs: &[&str]) -> Vec<String> {
        crumbs.iter().map(|c| (*c).to_owned()).collect()
    }

    #[test]
    fn breadcrumb_depth_one_picks_parent() {
        let inferer = CategoryInferer::new(&catalog());
        let crumbs = trail(&["Home", "Pets", "Dog", "Dog Food"]);
        assert_eq!(
            inferer.extract_from_breadcrumbs(&crumbs, 1).as_deref(),
            Some("Dog")
        );
        assert_eq!(
            inferer.extract_from_breadcrumbs(&crumbs, 0).as_deref(),
            Some("Dog Food")
        );
    }

    #[test]
    fn generic_crumb_falls_back_to_last() {
        let inferer = CategoryInferer::new(&catalog());
        let crumbs = trail(&["Home", "Pets", "Dog Food"]);
        assert_eq!(
            inferer.extract_from_breadcrumbs(&crumbs, 1).as_deref(),
            Some("Dog Food")
        );
    }

    #[test]
    fn generic_parent_in_four_crumb_trail_falls_back_to_last() {
        let catalog = RetailerCatalog::from_yaml_str("generic_terms: [Home, Pets, Dog]\n").unwrap();
        let inferer = CategoryInferer::new(&catalog);
        let crumbs = trail(&["Home", "Pets", "Dog", "Dog Food"]);
        assert_eq!(
            inferer.extract_from_breadcrumbs(&crumbs, 1).as_deref(),
            Some("Dog Food")
        );
    }

    #[test]
    fn short_trail_is_skipped() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(inferer.extract_from_breadcrumbs(&trail(&["Dog Food"]), 0), None);
        assert_eq!(inferer.extract_from_breadcrumbs(&[], 0), None);
    }

    #[test]
    fn depth_beyond_trail_uses_last_crumb() {
        let inferer = CategoryInferer::new(&catalog());
        let crumbs = trail(&["Home", "Cat Litter"]);
        assert_eq!(
            inferer.extract_from_breadcrumbs(&crumbs, 5).as_deref(),
            Some("Cat Litter")
        );
    }

    #[test]
    fn all_generic_trail_yields_nothing() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(
            inferer.extract_from_breadcrumbs(&trail(&["Home", "Shop"]), 0),
            None
        );
    }

    #[test]
    fn breadcrumbs_read_from_html() {
        let doc = Html::parse_document(
            r#"<ol class="breadcrumb"><li><a>Home</a> ›</li><li><a>Dog</a> /</li><li>Dry Dog Food</li></ol>"#,
        );
        let locators = dom::compile_all("test", &[".breadcrumb li".to_owned()]).unwrap();
        assert_eq!(
            CategoryInferer::breadcrumbs_from_html(&doc, &locators),
            trail(&["Home", "Dog", "Dry Dog Food"])
        );
    }

    #[test]
    fn url_shelf_is_most_specific() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(
            inferer
                .extract_from_url(
                    "https://www.tesco.com/groceries/en-GB/shop/pets/dog-food-and-treats/dry-dog-food/all"
                )
                .as_deref(),
            Some("dry dog food")
        );
    }

    #[test]
    fn url_aisle_with_underscores() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(
            inferer
                .extract_from_url("https://www.zooplus.co.uk/shop/cats/dry_cat_food")
                .as_deref(),
            Some("dry cat food")
        );
    }

    #[test]
    fn url_category_path_takes_deepest_segment() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(
            inferer
                .extract_from_url("https://www.jollyes.co.uk/c/dog/dog-treats")
                .as_deref(),
            Some("dog treats")
        );
    }

    #[test]
    fn url_falls_back_to_bare_animal() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(
            inferer
                .extract_from_url("https://www.petscorner.co.uk/cats-kittens-toys/")
                .as_deref(),
            Some("cat")
        );
        assert_eq!(inferer.extract_from_url("https://www.example.com/about-us"), None);
    }

    #[test]
    fn keyword_table_in_order() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(
            inferer
                .extract_from_keywords("https://x.test/range/dry-dog-food/adult")
                .as_deref(),
            Some("dry dog food")
        );
        assert_eq!(
            inferer.extract_from_keywords("https://x.test/dog-beds").as_deref(),
            Some("dog")
        );
        assert_eq!(inferer.extract_from_keywords("https://x.test/fish-tanks"), None);
    }

    #[test]
    fn segment_vocabulary_mapping() {
        let inferer = CategoryInferer::new(&catalog());
        assert_eq!(inferer.map_segment("cat-litter").as_deref(), Some("cat litter"));
        assert_eq!(inferer.map_segment("wet-dog-food").as_deref(), Some("wet dog food"));
        assert_eq!(inferer.map_segment("puppy").as_deref(), Some("puppy"));
        assert_eq!(inferer.map_segment("gift-cards"), None);
        assert_eq!(inferer.map_segment("all"), None);
        assert_eq!(inferer.map_segment("7136893"), None);
    }
}
