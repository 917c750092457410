//! Intentions Tools (Deprecated - use intention_unified instead)
//!
//! Prospective memory tools for setting and checking future intentions.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use chrono::{DateTime, Utc, Duration};
use uuid::Uuid;

use vestige_core::{IntentionRecord, Storage};

/// Schema for set_intention tool
pub fn set_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "description": {
                "type": "string",
                "description": "What to remember to do"
            },
            "trigger": {
                "type": "object",
                "description": "When to trigger this intention",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["time", "context", "event"],
                        "description": "Trigger type: time-based, context-based, or event-based"
                    },
                    "at": {
                        "type": "string",
                        "description": "ISO timestamp for time-based triggers"
                    },
                    "in_minutes": {
                        "type": "integer",
                        "description": "Minutes from now for duration-based triggers"
                    },
                    "codebase": {
                        "type": "string",
                        "description": "Trigger when working in this codebase"
                    },
                    "file_pattern": {
                        "type": "string",
                        "description": "Trigger when editing files matching this pattern"
                    },
                    "topic": {
                        "type": "string",
                        "description": "Trigger when discussing this topic"
                    },
                    "condition": {
                        "type": "string",
                        "description": "Natural language condition for event triggers"
                    }
                }
            },
            "priority": {
                "type": "string",
                "enum": ["low", "normal", "high", "critical"],
                "default": "normal",
                "description": "Priority level"
            },
            "deadline": {
                "type": "string",
                "description": "Optional deadline (ISO timestamp)"
            }
        },
        "required": ["description"]
    })
}

/// Schema for check_intentions tool
pub fn check_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "context": {
                "type": "object",
                "description": "Current context for matching intentions",
                "properties": {
                    "current_time": {
                        "type": "string",
                        "description": "Current ISO timestamp (defaults to now)"
                    },
                    "codebase": {
                        "type": "string",
                        "description": "Current codebase/project name"
                    },
                    "file": {
                        "type": "string",
                        "description": "Current file path"
                    },
                    "topics": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Current discussion topics"
                    }
                }
            },
            "include_snoozed": {
                "type": "boolean",
                "default": false,
                "description": "Include snoozed intentions"
            }
        }
    })
}

/// Schema for complete_intention tool
pub fn complete_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "intentionId": {
                "type": "string",
                "description": "ID of the intention to mark as complete"
            }
        },
        "required": ["intentionId"]
    })
}

/// Schema for snooze_intention tool
pub fn snooze_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "intentionId": {
                "type": "string",
                "description": "ID of the intention to snooze"
            },
            "minutes": {
                "type": "integer",
                "description": "Minutes to snooze for",
                "default": 30
            }
        },
        "required": ["intentionId"]
    })
}

/// Schema for list_intentions tool
pub fn list_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "enum": ["active", "fulfilled", "cancelled", "snoozed", "all"],
                "default": "active",
                "description": "Filter by status"
            },
            "limit": {
                "type": "integer",
                "default": 20,
                "description": "Maximum number to return"
            }
        }
    })
}

#[derive(Debug, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerSpec {
    #[serde(rename = "type")]
    trigger_type: Option<String>,
    at: Option<String>,
    in_minutes: Option<i64>,
    codebase: Option<String>,
    file_pattern: Option<String>,
    topic: Option<String>,
    condition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetIntentionArgs {
    description: String,
    trigger: Option<TriggerSpec>,
    priority: Option<String>,
    deadline: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextSpec {
    #[allow(dead_code)] // Deserialized from JSON but not yet used in context matching
    current_time: Option<String>,
    codebase: Option<String>,
    file: Option<String>,
    topics: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckIntentionsArgs {
    context: Option<ContextSpec>,
    #[allow(dead_code)] // Deserialized from JSON for future snoozed intentions filter
    include_snoozed: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentionIdArgs {
    intention_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnoozeArgs {
    intention_id: String,
    minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListArgs {
    status: Option<String>,
    limit: Option<i32>,
}

/// Execute set_intention tool
pub async fn execute_set(
    storage: &Arc<Storage>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: SetIntentionArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    if args.description.trim().is_empty() {
        return Err("Description cannot be empty".to_string());
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();

    // Determine trigger type and data
    let (trigger_type, trigger_data) = if let Some(trigger) = &args.trigger {
        let t_type = trigger.trigger_type.clone().unwrap_or_else(|| "time".to_string());
        let data = serde_json::to_string(trigger).unwrap_or_else(|_| "{}".to_string());
        (t_type, data)
    } else {
        ("manual".to_string(), "{}".to_string())
    };

    // Parse priority
    let priority = match args.priority.as_deref() {
        Some("low") => 1,
        Some("high") => 3,
        Some("critical") => 4,
        _ => 2, // normal
    };

    // Parse deadline
    let deadline = args.deadline.and_then(|s| {
        DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))
    });

    // Calculate trigger time if specified
    let trigger_at = if let Some(trigger) = &args.trigger {
        if let Some(at) = &trigger.at {
            DateTime::parse_from_rfc3339(at).ok().map(|dt| dt.with_timezone(&Utc))
        } else {
            trigger.in_minutes.map(|mins| now + Duration::minutes(mins))
        }
    } else {
        None
    };

    let record = IntentionRecord {
        id: id.clone(),
        content: args.description.clone(),
        trigger_type,
        trigger_data,
        priority,
        status: "active".to_string(),
        created_at: now,
        deadline,
        fulfilled_at: None,
        reminder_count: 0,
        last_reminded_at: None,
        notes: None,
        tags: vec![],
        related_memories: vec![],
        snoozed_until: None,
        source_type: "mcp".to_string(),
        source_data: None,
    };

    storage.save_intention(&record).map_err(|e| e.to_string())?;

    Ok(serde_json::json!({
        "success": true,
        "intentionId": id,
        "message": format!("Intention created: {}", args.description),
        "priority": priority,
        "triggerAt": trigger_at.map(|dt| dt.to_rfc3339()),
        "deadline": deadline.map(|dt| dt.to_rfc3339()),
    }))
}

/// Execute check_intentions tool
pub async fn execute_check(
    storage: &Arc<Storage>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: CheckIntentionsArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => CheckIntentionsArgs { context: None, include_snoozed: None },
    };

    let now = Utc::now();

    // Get active intentions
    let intentions = storage.get_active_intentions().map_err(|e| e.to_string())?;

    let mut triggered = Vec::new();
    let mut pending = Vec::new();

    for intention in intentions {
        // Parse trigger data
        let trigger: Option<TriggerSpec> = serde_json::from_str(&intention.trigger_data).ok();

        // Check if triggered
        let is_triggered = if let Some(t) = &trigger {
            match t.trigger_type.as_deref() {
                Some("time") => {
                    if let Some(at) = &t.at {
                        if let Ok(trigger_time) = DateTime::parse_from_rfc3339(at) {
                            trigger_time.with_timezone(&Utc) <= now
                        } else {
                            false
                        }
                    } else if let Some(mins) = t.in_minutes {
                        let trigger_time = intention.created_at + Duration::minutes(mins);
                        trigger_time <= now
                    } else {
                        false
                    }
                }
                Some("context") => {
                    if let Some(ctx) = &args.context {
                        // Check codebase match
                        if let (Some(trigger_codebase), Some(current_codebase)) = (&t.codebase, &ctx.codebase) {
                            current_codebase.to_lowercase().contains(&trigger_codebase.to_lowercase())
                        // Check file pattern match
                        } else if let (Some(pattern), Some(file)) = (&t.file_pattern, &ctx.file) {
                            file.contains(pattern)
                        // Check topic match
                        } else if let (Some(topic), Some(topics)) = (&t.topic, &ctx.topics) {
                            topics.iter().any(|t| t.to_lowercase().contains(&topic.to_lowercase()))
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                }
                _ => false,
            }
        } else {
            false
        };

        // Check if overdue
        let is_overdue = intention.deadline.map(|d| d < now).unwrap_or(false);

        let item = serde_json::json!({
            "id": intention.id,
            "description": intention.content,
            "priority": match intention.priority {
                1 => "low",
                3 => "high",
                4 => "critical",
                _ => "normal",
            },
            "createdAt": intention.created_at.to_rfc3339(),
            "deadline": intention.deadline.map(|d| d.to_rfc3339()),
            "isOverdue": is_overdue,
        });

        if is_triggered || is_overdue {
            triggered.push(item);
        } else {
            pending.push(item);
        }
    }

    Ok(serde_json::json!({
        "triggered": triggered,
        "pending": pending,
        "checkedAt": now.to_rfc3339(),
    }))
}

/// Execute complete_intention tool
pub async fn execute_complete(
    storage: &Arc<Storage>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: IntentionIdArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing intention_id".to_string()),
    };

    let updated = storage.update_intention_status(&args.intention_id, "fulfilled")
        .map_err(|e| e.to_string())?;

    if updated {
        Ok(serde_json::json!({
            "success": true,
            "message": "Intention marked as complete",
            "intentionId": args.intention_id,
        }))
    } else {
        Err(format!("Intention not found: {}", args.intention_id))
    }
}

/// Execute snooze_intention tool
pub async fn execute_snooze(
    storage: &Arc<Storage>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: SnoozeArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing intention_id".to_string()),
    };

    let minutes = args.minutes.unwrap_or(30);
    let snooze_until = Utc::now() + Duration::minutes(minutes);

    let updated = storage.snooze_intention(&args.intention_id, snooze_until)
        .map_err(|e| e.to_string())?;

    if updated {
        Ok(serde_json::json!({
            "success": true,
            "message": format!("Intention snoozed for {} minutes", minutes),
            "intentionId": args.intention_id,
            "snoozedUntil": snooze_until.to_rfc3339(),
        }))
    } else {
        Err(format!("Intention not found: {}", args.intention_id))
    }
}

/// Execute list_intentions tool
pub async fn execute_list(
    storage: &Arc<Storage>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: ListArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => ListArgs { status: None, limit: None },
    };

    let status = args.status.as_deref().unwrap_or("active");

    let intentions = if status == "all" {
        // Get all by combining different statuses
        let mut all = storage.get_active_intentions().map_err(|e| e.to_string())?;
        all.extend(storage.get_intentions_by_status("fulfilled").map_err(|e| e.to_string())?);
        all.extend(storage.get_intentions_by_status("cancelled").map_err(|e| e.to_string())?);
        all.extend(storage.get_intentions_by_status("snoozed").map_err(|e| e.to_string())?);
        all
    } else if status == "active" {
        // Use get_active_intentions for proper priority ordering
        storage.get_active_intentions().map_err(|e| e.to_string())?
    } else {
        storage.get_intentions_by_status(status).map_err(|e| e.to_string())?
    };

    let limit = args.limit.unwrap_or(20) as usize;
    let now = Utc::now();

    let items: Vec<Value> = intentions
        .into_iter()
        .take(limit)
        .map(|i| {
            let is_overdue = i.deadline.map(|d| d < now).unwrap_or(false);
            serde_json::json!({
                "id": i.id,
                "description": i.content,
                "status": i.status,
                "priority": match i.priority {
                    1 => "low",
                    3 => "high",
                    4 => "critical",
                    _ => "normal",
                },
                "createdAt": i.created_at.to_rfc3339(),
                "deadline": i.deadline.map(|d| d.to_rfc3339()),
                "isOverdue": is_overdue,
                "snoozedUntil": i.snoozed_until.map(|d| d.to_rfc3339()),
            })
        })
        .collect();

    Ok(serde_json::json!({
        "intentions": items,
        "total": items.len(),
        "status": status,
    }))
}

// ============================================================================
// TESTS
// ============================================================================
