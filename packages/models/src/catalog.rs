//! The crime category catalog.
//!
//! The category-listing endpoint returns an array of objects such as
//! `{"url": "anti-social-behaviour", "name": "Anti-social behaviour"}`.
//! Only the `url` field is used: it is the identifier that appears in the
//! `category` field of every crime record, and it becomes the name of the
//! one-hot column for that category.

use serde::{Deserialize, Serialize};

/// A single entry of the category-listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Category identifier (e.g., `"burglary"`).
    pub url: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Ordered vocabulary of category identifiers used for one-hot encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<String>,
}

impl CategoryCatalog {
    /// Builds a catalog from identifiers, keeping their order and dropping
    /// repeats.
    #[must_use]
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for category in categories {
            let category = category.into();
            if !out.contains(&category) {
                out.push(category);
            }
        }
        Self { categories: out }
    }

    /// Parses the raw JSON body of the category-listing endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not an array of objects carrying a
    /// `url` string.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<CategoryEntry> = serde_json::from_str(body)?;
        Ok(Self::new(entries.into_iter().map(|e| e.url)))
    }

    /// Category identifiers in catalog order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether `category` is part of the vocabulary.
    #[must_use]
    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the catalog has no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_listing() {
        let body = r#"[
            {"url": "all-crime", "name": "All crime"},
            {"url": "anti-social-behaviour", "name": "Anti-social behaviour"},
            {"url": "burglary", "name": "Burglary"}
        ]"#;
        let catalog = CategoryCatalog::from_json(body).unwrap();
        assert_eq!(
            catalog.categories(),
            ["all-crime", "anti-social-behaviour", "burglary"]
        );
        assert!(catalog.contains("burglary"));
        assert!(!catalog.contains("shoplifting"));
    }

    #[test]
    fn rejects_entries_without_url() {
        assert!(CategoryCatalog::from_json(r#"[{"name": "Burglary"}]"#).is_err());
        assert!(CategoryCatalog::from_json(r#"{"url": "burglary"}"#).is_err());
    }

    #[test]
    fn drops_repeated_identifiers() {
        let catalog = CategoryCatalog::new(["drugs", "robbery", "drugs"]);
        assert_eq!(catalog.len(), 2);
    }
}
