//! Explore connections tool — Graph exploration, chain building, bridge discovery.
//! v1.5.0: Wires MemoryChainBuilder + ActivationNetwork + HippocampalIndex.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cognitive::CognitiveEngine;
use vestige_core::Storage;

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "action": {
                "type": "string",
                "enum": ["chain", "associations", "bridges"],
                "description": "Type of exploration: 'chain' builds reasoning path, 'associations' finds related memories, 'bridges' finds connecting memories"
            },
            "from": {
                "type": "string",
                "description": "Source memory ID"
            },
            "to": {
                "type": "string",
                "description": "Target memory ID (required for 'chain' and 'bridges')"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum results (default: 10)",
                "default": 10
            }
        },
        "required": ["action", "from"]
    })
}

pub async fn execute(
    _storage: &Arc<Storage>,
    cognitive: &Arc<Mutex<CognitiveEngine>>,
    args: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let args = args.ok_or("Missing arguments")?;
    let action = args.get("action").and_then(|v| v.as_str()).ok_or("Missing 'action'")?;
    let from = args.get("from").and_then(|v| v.as_str()).ok_or("Missing 'from'")?;
    let to = args.get("to").and_then(|v| v.as_str());
    let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(10) as usize;

    let cog = cognitive.lock().await;

    match action {
        "chain" => {
            let to_id = to.ok_or("'to' is required for chain action")?;
            match cog.chain_builder.build_chain(from, to_id) {
                Some(chain) => {
                    Ok(serde_json::json!({
                        "action": "chain",
                        "from": from,
                        "to": to_id,
                        "steps": chain.steps.iter().map(|s| serde_json::json!({
                            "memory_id": s.memory_id,
                            "memory_preview": s.memory_preview,
                            "connection_type": format!("{:?}", s.connection_type),
                            "connection_strength": s.connection_strength,
                            "reasoning": s.reasoning,
                        })).collect::<Vec<_>>(),
                        "confidence": chain.confidence,
                        "total_hops": chain.total_hops,
                    }))
                }
                None => {
                    Ok(serde_json::json!({
                        "action": "chain",
                        "from": from,
                        "to": to_id,
                        "steps": [],
                        "message": "No chain found between these memories"
                    }))
                }
            }
        }
        "associations" => {
            let activation_assocs = cog.activation_network.get_associations(from);
            let hippocampal_assocs = cog.hippocampal_index.get_associations(from, 2)
                .unwrap_or_default();

            let mut all_associations: Vec<serde_json::Value> = Vec::new();

            for assoc in activation_assocs.iter().take(limit) {
                all_associations.push(serde_json::json!({
                    "memory_id": assoc.memory_id,
                    "strength": assoc.association_strength,
                    "link_type": format!("{:?}", assoc.link_type),
                    "source": "spreading_activation",
                }));
            }
            for m in hippocampal_assocs.iter().take(limit) {
                all_associations.push(serde_json::json!({
                    "memory_id": m.index.memory_id,
                    "semantic_score": m.semantic_score,
                    "text_score": m.text_score,
                    "source": "hippocampal_index",
                }));
            }

            all_associations.truncate(limit);

            Ok(serde_json::json!({
                "action": "associations",
                "from": from,
                "associations": all_associations,
                "count": all_associations.len(),
            }))
        }
        "bridges" => {
            let to_id = to.ok_or("'to' is required for bridges action")?;
            let bridges = cog.chain_builder.find_bridge_memories(from, to_id);
            let limited: Vec<_> = bridges.iter().take(limit).collect();
            Ok(serde_json::json!({
                "action": "bridges",
                "from": from,
                "to": to_id,
                "bridges": limited,
                "count": limited.len(),
            }))
        }
        _ => Err(format!("Unknown action: '{}'. Expected: chain, associations, bridges", action)),
    }
}
