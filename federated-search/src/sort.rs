//! Sort-metadata registry.
//!
//! Maps a content type to its ordered sort-mode descriptors and its
//! aggregation fields. The primary provider's native request is derived
//! from the descriptor matching `(type, sort mode)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::ContentType;

/// Sort direction of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// One sort mode available for a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDescriptor {
    /// Sort mode name, e.g. `relevance`.
    #[serde(rename = "type")]
    pub sort_type: String,
    /// Provider sort method (`score` or `sort`).
    pub sort_method: String,
    /// Fields the provider sorts on, in priority order.
    #[serde(rename = "fieldArray")]
    pub field_array: Vec<String>,
    /// Score assigned to documents missing the sort field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_missing: Option<f64>,
    /// Sort direction.
    pub direction: Direction,
}

/// Sort modes and aggregation fields of one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMetadata {
    /// Available sort modes.
    #[serde(rename = "sortTypeArray")]
    pub sort_types: Vec<SortDescriptor>,
    /// Aggregation fields offered as facets.
    #[serde(rename = "aggregation_field_array", default)]
    pub aggregation_fields: Vec<String>,
}

/// Registry keyed by content type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortRegistry {
    types: HashMap<String, TypeMetadata>,
}

impl SortRegistry {
    /// Build a registry from explicit per-type metadata.
    pub fn new(types: HashMap<String, TypeMetadata>) -> Self {
        Self { types }
    }

    /// Metadata for a content type, if registered.
    fn metadata(&self, content_type: ContentType) -> Option<&TypeMetadata> {
        self.types.get(content_type.name())
    }

    /// Find the descriptor for `(content_type, sort_type)`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnknownSortMode`] if either key is missing.
    pub fn lookup(
        &self,
        content_type: ContentType,
        sort_type: &str,
    ) -> Result<&SortDescriptor, SearchError> {
        self.metadata(content_type)
            .and_then(|meta| meta.sort_types.iter().find(|d| d.sort_type == sort_type))
            .ok_or_else(|| SearchError::UnknownSortMode {
                content_type: content_type.name().into(),
                sort_type: sort_type.into(),
            })
    }
}

impl Default for SortRegistry {
    fn default() -> Self {
        let mut types = HashMap::new();
        types.insert(
            ContentType::Text.name().to_string(),
            TypeMetadata {
                sort_types: vec![
                    SortDescriptor {
                        sort_type: "chronological".into(),
                        sort_method: "sort".into(),
                        field_array: vec!["comp_date".into(), "order".into()],
                        score_missing: None,
                        direction: Direction::Asc,
                    },
                    SortDescriptor {
                        sort_type: "relevance".into(),
                        sort_method: "score".into(),
                        field_array: vec!["pagesheetrank".into()],
                        score_missing: Some(0.04),
                        direction: Direction::Desc,
                    },
                ],
                aggregation_fields: vec!["path".into()],
            },
        );
        types.insert(
            ContentType::Sheet.name().to_string(),
            TypeMetadata {
                sort_types: vec![
                    SortDescriptor {
                        sort_type: "relevance".into(),
                        sort_method: "score".into(),
                        field_array: Vec::new(),
                        score_missing: None,
                        direction: Direction::Desc,
                    },
                    SortDescriptor {
                        sort_type: "dateCreated".into(),
                        sort_method: "sort".into(),
                        field_array: vec!["dateCreated".into()],
                        score_missing: None,
                        direction: Direction::Desc,
                    },
                    SortDescriptor {
                        sort_type: "views".into(),
                        sort_method: "sort".into(),
                        field_array: vec!["views".into()],
                        score_missing: None,
                        direction: Direction::Desc,
                    },
                ],
                aggregation_fields: vec!["collections".into(), "topics_en".into()],
            },
        );
        Self { types }
    }
}
