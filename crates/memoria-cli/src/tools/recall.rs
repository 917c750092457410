//! Recall Tool (Deprecated - use search_unified instead)
//!
//! Search and retrieve knowledge from memory.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use vestige_core::{RecallInput, SearchMode, Storage};

/// Input schema for recall tool
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of results (default: 10)",
                "default": 10,
                "minimum": 1,
                "maximum": 100
            },
            "min_retention": {
                "type": "number",
                "description": "Minimum retention strength (0.0-1.0, default: 0.0)",
                "default": 0.0,
                "minimum": 0.0,
                "maximum": 1.0
            }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecallArgs {
    query: String,
    limit: Option<i32>,
    min_retention: Option<f64>,
}

pub async fn execute(
    storage: &Arc<Storage>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: RecallArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    if args.query.trim().is_empty() {
        return Err("Query cannot be empty".to_string());
    }

    let input = RecallInput {
        query: args.query.clone(),
        limit: args.limit.unwrap_or(10).clamp(1, 100),
        min_retention: args.min_retention.unwrap_or(0.0).clamp(0.0, 1.0),
        search_mode: SearchMode::Hybrid,
        valid_at: None,
    };

    let nodes = storage.recall(input).map_err(|e| e.to_string())?;

    let results: Vec<Value> = nodes
        .iter()
        .map(|n| {
            serde_json::json!({
                "id": n.id,
                "content": n.content,
                "nodeType": n.node_type,
                "retentionStrength": n.retention_strength,
                "stability": n.stability,
                "difficulty": n.difficulty,
                "reps": n.reps,
                "tags": n.tags,
                "source": n.source,
                "createdAt": n.created_at.to_rfc3339(),
                "lastAccessed": n.last_accessed.to_rfc3339(),
                "nextReview": n.next_review.map(|d| d.to_rfc3339()),
            })
        })
        .collect();

    Ok(serde_json::json!({
        "query": args.query,
        "total": results.len(),
        "results": results,
    }))
}

// ============================================================================
// TESTS
// ============================================================================
