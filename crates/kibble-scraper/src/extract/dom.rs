//! CSS selector cascade over parsed HTML.
//!
//! A field is located by an ordered list of [`Locator`]s. The first locator
//! whose value passes the field's validity check wins.

use scraper::{ElementRef, Selector};

use crate::error::ScraperError;
use crate::parse::collapse_whitespace;

/// A compiled selector candidate.
///
/// Written as `"css"` to read an element's text, or `"css@attr"` to read an
/// attribute, e.g. `"meta[property='og:title']@content"`.
#[derive(Debug, Clone)]
pub struct Locator {
    raw: String,
    selector: Selector,
    attr: Option<String>,
}

impl Locator {
    /// # Errors
    ///
    /// Returns a description of the problem if the CSS part does not parse.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let spec = spec.trim();
        let (css, attr) = match spec.rsplit_once('@') {
            Some((css, attr)) if !css.trim().is_empty() && is_attr_name(attr) => {
                (css.trim(), Some(attr.to_owned()))
            }
            _ => (spec, None),
        };
        let selector = Selector::parse(css).map_err(|e| e.to_string())?;
        Ok(Self {
            raw: spec.to_owned(),
            selector,
            attr,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// Elements matched below `scope`, in document order.
    pub fn select<'a>(&'a self, scope: ElementRef<'a>) -> scraper::element_ref::Select<'a, 'a> {
        scope.select(&self.selector)
    }

    /// Trimmed, whitespace-collapsed value of `el`; `None` when empty.
    #[must_use]
    pub fn value_of(&self, el: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => collapse_whitespace(el.value().attr(attr)?),
            None => element_text(el),
        };
        (!value.is_empty()).then_some(value)
    }
}

fn is_attr_name(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Compiles a profile's selector strings.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] naming the first bad entry.
pub fn compile_all(retailer: &str, specs: &[String]) -> Result<Vec<Locator>, ScraperError> {
    specs
        .iter()
        .map(|spec| {
            Locator::parse(spec).map_err(|reason| ScraperError::InvalidSelector {
                retailer: retailer.to_owned(),
                selector: spec.clone(),
                reason,
            })
        })
        .collect()
}

/// Concatenated text content with whitespace collapsed.
#[must_use]
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// First value, in locator order then document order, accepted by `accept`.
pub fn first_value(
    scope: ElementRef<'_>,
    locators: &[Locator],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    locators.iter().find_map(|locator| {
        locator
            .select(scope)
            .filter_map(|el| locator.value_of(el))
            .find(|value| accept(value))
    })
}

/// Every value of the first locator that yields at least one.
#[must_use]
pub fn values(scope: ElementRef<'_>, locators: &[Locator]) -> Vec<String> {
    for locator in locators {
        let found: Vec<String> = locator
            .select(scope)
            .filter_map(|el| locator.value_of(el))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// `true` when any locator matches an element.
#[must_use]
pub fn exists(scope: ElementRef<'_>, locators: &[Locator]) -> bool {
    locators
        .iter()
        .any(|locator| locator.select(scope).next().is_some())
}

#[must_use]
pub fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    fn locators(specs: &[&str]) -> Vec<Locator> {
        let owned: Vec<String> = specs.iter().map(|s| (*s).to_owned()).collect();
        compile_all("test", &owned).unwrap()
    }

    #[test]
    fn first_valid_candidate_wins() {
        let doc = Html::parse_document(
            r#"<html><body><div class="title">  </div><h1>Premium Kibble</h1></body></html>"#,
        );
        let title = first_value(doc.root_element(), &locators(&[".title", "h1"]), non_empty);
        assert_eq!(title.as_deref(), Some("Premium Kibble"));
    }

    #[test]
    fn attribute_source() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content=" Chews 200g "></head></html>"#,
        );
        let title = first_value(
            doc.root_element(),
            &locators(&["meta[property='og:title']@content"]),
            non_empty,
        );
        assert_eq!(title.as_deref(), Some("Chews 200g"));
    }

    #[test]
    fn validity_check_skips_to_next_match() {
        let doc = Html::parse_document(
            r#"<html><body><span class="price">Price</span><span class="price">£4.50</span></body></html>"#,
        );
        let price = first_value(doc.root_element(), &locators(&[".price"]), |v| {
            v.contains('£')
        });
        assert_eq!(price.as_deref(), Some("£4.50"));
    }

    #[test]
    fn values_come_from_first_productive_locator() {
        let doc = Html::parse_document(
            r#"<ul class="crumbs"><li>Home</li><li>Dog</li></ul><nav><a>Other</a></nav>"#,
        );
        let found = values(
            doc.root_element(),
            &locators(&[".missing li", ".crumbs li", "nav a"]),
        );
        assert_eq!(found, vec!["Home".to_owned(), "Dog".to_owned()]);
    }

    #[test]
    fn at_sign_inside_selector_is_not_an_attribute() {
        let locator = Locator::parse("a[href='mailto:help@shop.test']").unwrap();
        assert_eq!(locator.attr(), None);
        let locator = Locator::parse("img.hero@data-src").unwrap();
        assert_eq!(locator.attr(), Some("data-src"));
    }

    #[test]
    fn invalid_selector_names_retailer() {
        let err = compile_all("zooplus", &["div[".to_owned()]).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidSelector { ref retailer, .. } if retailer == "zooplus"));
    }

    #[test]
    fn exists_detects_marker() {
        let doc = Html::parse_fragment(r#"<div><span class="verified"></span></div>"#);
        assert!(exists(doc.root_element(), &locators(&[".verified"])));
        assert!(!exists(doc.root_element(), &locators(&[".missing"])));
    }
}
