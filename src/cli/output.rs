//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::document::Document;
use crate::index::reader::DocId;

/// One hit as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitOutput {
    pub doc: DocId,
    pub score: f32,
    pub document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<String>>,
}

/// Result structure for a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutput {
    pub query: String,
    pub total_hits: u64,
    pub max_score: f32,
    pub hits: Vec<HitOutput>,
    pub duration_ms: u64,
}

/// Render a result as JSON.
pub fn format_json<T: Serialize>(result: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}
