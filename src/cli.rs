//! Command-line arguments of the `fedsearch` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use federated_search::{ContentType, SearchRequest};

/// Content type selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Text,
    Sheet,
}

impl From<TypeArg> for ContentType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Text => ContentType::Text,
            TypeArg::Sheet => ContentType::Sheet,
        }
    }
}

/// fedsearch: federated text search over two providers.
#[derive(Debug, Parser)]
#[command(name = "fedsearch", version, about)]
pub struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Content type to search.
    #[arg(long = "type", value_enum, default_value = "text")]
    pub content_type: TypeArg,

    /// Sort mode (see the sort-metadata registry).
    #[arg(long, default_value = "relevance")]
    pub sort: String,

    /// Page size requested from each provider.
    #[arg(long, default_value_t = 20)]
    pub size: usize,

    /// Fetch this many pages of one lineage and print each.
    #[arg(long, default_value_t = 1)]
    pub pages: usize,

    /// Category path filter, e.g. `Tanakh/Torah`. Repeatable.
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Exact-phrase matching.
    #[arg(long)]
    pub exact: bool,

    /// Also print the facet tree built from the category aggregation.
    #[arg(long)]
    pub facets: bool,

    /// Query text.
    #[arg(required = true)]
    pub query: Vec<String>,
}

impl Cli {
    /// The first request of the lineage described by the arguments.
    pub fn to_request(&self) -> SearchRequest {
        let query = self.query.join(" ");
        let mut request = match self.content_type {
            TypeArg::Text => SearchRequest::text(query, self.size),
            TypeArg::Sheet => SearchRequest::sheet(query, self.size),
        };
        request.sort_type = self.sort.clone();
        request.exact = self.exact;
        request.applied_filter_agg_types = vec!["path".into(); self.filters.len()];
        request.applied_filters = self.filters.clone();
        if self.facets && request.content_type == ContentType::Text {
            request.aggregations_to_update = vec!["path".into()];
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["fedsearch", "שלום"]).expect("parse");
        let request = cli.to_request();
        assert_eq!(request.query, "שלום");
        assert_eq!(request.content_type, ContentType::Text);
        assert_eq!(request.sort_type, "relevance");
        assert_eq!(request.size, 20);
        assert!(request.aggregations_to_update.is_empty());
        assert_eq!(cli.pages, 1);
    }

    #[test]
    fn filters_and_flags() {
        let cli = Cli::try_parse_from([
            "fedsearch",
            "--sort",
            "chronological",
            "--size",
            "5",
            "--filter",
            "Tanakh/Torah",
            "--filter",
            "Talmud",
            "--exact",
            "--facets",
            "אור",
            "חדש",
        ])
        .expect("parse");
        let request = cli.to_request();
        assert_eq!(request.query, "אור חדש");
        assert_eq!(request.sort_type, "chronological");
        assert_eq!(request.size, 5);
        assert!(request.exact);
        assert_eq!(request.applied_filters, vec!["Tanakh/Torah", "Talmud"]);
        assert_eq!(request.applied_filter_agg_types, vec!["path", "path"]);
        assert_eq!(request.aggregations_to_update, vec!["path"]);
    }

    #[test]
    fn sheet_type() {
        let cli = Cli::try_parse_from(["fedsearch", "--type", "sheet", "shabbat"]).expect("parse");
        let request = cli.to_request();
        assert_eq!(request.content_type, ContentType::Sheet);
        assert_eq!(request.field, "content");
    }

    #[test]
    fn query_is_required() {
        assert!(Cli::try_parse_from(["fedsearch"]).is_err());
    }
}
