//! Read-only taxonomy consumed by the facet-tree builder.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// One node of the ordered category tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaxonomyNode {
    /// A category with ordered children.
    Branch {
        /// English category name.
        category: String,
        /// Localized category name.
        #[serde(rename = "heCategory", default)]
        he_category: String,
        /// Child categories and books, in display order.
        #[serde(default)]
        contents: Vec<TaxonomyNode>,
    },
    /// A single book.
    Leaf {
        /// English title.
        title: String,
        /// Localized title.
        #[serde(rename = "heTitle", default)]
        he_title: String,
    },
}

impl TaxonomyNode {
    /// English name used as the path segment.
    pub fn name(&self) -> &str {
        match self {
            Self::Branch { category, .. } => category,
            Self::Leaf { title, .. } => title,
        }
    }

    /// Localized name.
    pub fn localized_name(&self) -> &str {
        match self {
            Self::Branch { he_category, .. } => he_category,
            Self::Leaf { he_title, .. } => he_title,
        }
    }
}

/// A localized term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// English form.
    pub en: String,
    /// Localized form.
    pub he: String,
}

/// Source of category structure and localized terms.
pub trait Taxonomy {
    /// Root categories in display order.
    fn categories(&self) -> &[TaxonomyNode];

    /// Localized term for `key`, if known.
    fn term(&self, key: &str) -> Option<Term>;
}

/// A taxonomy loaded once from JSON and held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticTaxonomy {
    /// Root categories.
    #[serde(default)]
    pub categories: Vec<TaxonomyNode>,
    /// Localized terms keyed by English form.
    #[serde(default)]
    pub terms: HashMap<String, Term>,
}

impl StaticTaxonomy {
    /// Build from roots and terms.
    pub fn new(categories: Vec<TaxonomyNode>, terms: HashMap<String, Term>) -> Self {
        Self { categories, terms }
    }

    /// Load from a JSON file of the form `{"categories": [...], "terms": {...}}`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the file cannot be read, and
    /// [`SearchError::Parse`] if it is not a valid taxonomy.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("cannot read taxonomy {}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| SearchError::Parse(format!("taxonomy {}: {e}", path.display())))
    }
}

impl Taxonomy for StaticTaxonomy {
    fn categories(&self) -> &[TaxonomyNode] {
        &self.categories
    }

    fn term(&self, key: &str) -> Option<Term> {
        self.terms.get(key).cloned()
    }
}
