//! Library catalog search and indexing.

use serde::Deserialize;
use serde_json::{Value, json};
use spicebox_library::SearchQuery;

use super::{Schema, boolean, integer, string, string_list};
use crate::args::{ToolArgs, parse_args, require_items};
use crate::dispatcher::{ToolDispatcher, ToolSpec};
use crate::error::{Result, ToolError};
use crate::response::ToolResponse;

const DEFAULT_SEARCH_LIMIT: usize = 50;

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "library_search",
            "Search indexed SPICE libraries for models and subcircuits by name.",
            Schema::new()
                .required("query", string("Case-insensitive name substring; empty matches all"))
                .optional("type", string("Model type filter, e.g. diode, npn, nmos; excludes subcircuits"))
                .optional("limit", integer("Maximum models and subcircuits returned, each; default 50"))
                .optional("include_parameters", boolean("Include model and subcircuit parameters"))
                .build(),
            library_search,
        ),
        ToolSpec::new(
            "library_index",
            "Index library files or directories into the catalog.",
            Schema::new()
                .required("paths", string_list("Files or directories, scanned recursively"))
                .optional("clear", boolean("Empty the catalog first"))
                .build(),
            library_index,
        ),
    ]
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default, rename = "type")]
    device_type: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    include_parameters: bool,
}

impl ToolArgs for SearchArgs {
    fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(ToolError::validation("limit must be at least 1"));
        }
        Ok(())
    }
}

impl SearchArgs {
    fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::new(self.query.trim()).with_limit(self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        if let Some(device_type) = self.device_type.as_deref().filter(|t| !t.trim().is_empty()) {
            query = query.with_type(device_type.trim());
        }
        if self.include_parameters {
            query = query.with_parameters();
        }
        query
    }
}

fn library_search(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: SearchArgs = parse_args("library_search", arguments)?;
    let query = args.query();

    let summary = d.with_catalog(|catalog| match catalog {
        None => json!({
            "error": "library_unavailable",
            "message": "Library catalog not available: no library paths are configured. \
                        Start the server with --library or call library_index.",
            "query": args.query,
            "count": 0,
            "models": [],
            "subcircuits": [],
        }),
        Some(catalog) => {
            let results = catalog.search(&query);
            json!({
                "query": args.query,
                "type": args.device_type,
                "count": results.count(),
                "total_models": results.total_models,
                "total_subcircuits": results.total_subcircuits,
                "models": results.models,
                "subcircuits": results.subcircuits,
            })
        }
    });
    ToolResponse::json(&summary)
}

#[derive(Deserialize)]
struct IndexArgs {
    paths: Vec<String>,
    #[serde(default)]
    clear: bool,
}

impl ToolArgs for IndexArgs {
    fn validate(&self) -> Result<()> {
        require_items("paths", &self.paths)
    }
}

fn library_index(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: IndexArgs = parse_args("library_index", arguments)?;
    let report = d.index_libraries(&args.paths, args.clear);
    let (models, subcircuits) = d.with_catalog(|catalog| {
        catalog.map_or((0, 0), |c| (c.model_count(), c.subcircuit_count()))
    });
    ToolResponse::json(&json!({
        "status": "indexed",
        "report": report,
        "total_models": models,
        "total_subcircuits": subcircuits,
    }))
}
