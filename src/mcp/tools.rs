//! The five MCP tools — descriptors, argument marshalling, and dispatch.
//!
//! Tool handlers return a JSON value on success and an error on failure; the
//! server packages either into a `ToolResult`. The `context` argument is
//! accepted on every tool but has no runtime effect: the process is bound to
//! one context at startup, and switching contexts requires a separate
//! process.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::entity::{self, EntityInput};
use crate::db::{journal, observation, relation, search};
use crate::mcp::context::memory_context;
use crate::mcp::protocol::Tool;
use crate::mcp::server::Server;

/// Descriptors for the `tools/list` response.
pub fn all_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "memory_context",
            description: "Call this FIRST, before responding to any coding task or question \
                about the project — without it you have no memory of previous sessions and \
                will repeat work or miss known constraints. Returns recent activity (last \
                24h by default), top entities, recent journal entries, and the storage path. \
                Example: memory_context({}) to load the default context.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "since": {"type": "string", "description": "Time window: 2h|24h|7d|ISO date (default 24h)"},
                    "limit": {"type": "integer", "description": "Max recent observations (default 20)"},
                },
            }),
        },
        Tool {
            name: "memory_store",
            description: "Store facts, decisions, and progress notes so they survive into \
                future sessions; store proactively after completing work or discovering \
                something non-obvious. Use the journal field (not entities) for append-only \
                session logs — journal entries are never deduplicated. Examples: \
                memory_store({entities: [{name: \"auth-service\", entityType: \"module\", \
                observations: [\"Uses JWT with 1h expiry\"]}]}); \
                memory_store({journal: \"Completed refresh flow; blocker: pool exhaustion\"}).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "entities": {
                        "type": "array",
                        "description": "Entities to store (mutually exclusive with journal)",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "entityType": {"type": "string"},
                                "observations": {"type": "array", "items": {"type": "string"}},
                                "tags": {"type": "array", "items": {"type": "string"}},
                            },
                            "required": ["name", "entityType", "observations"],
                        },
                    },
                    "journal": {"type": "string", "description": "Journal entry (no dedup; mutually exclusive with entities)"},
                    "tags": {"type": "array", "items": {"type": "string"}, "description": "Tags for journal entry"},
                    "context": {"type": "string", "description": "Named memory context"},
                },
            }),
        },
        Tool {
            name: "memory_search",
            description: "Search stored memory by keyword, exact name, or browse all \
                entities; also reads journal logs. Use memory_context for recent activity \
                and memory_search to find specific things. Examples: \
                memory_search({query: \"redis connection\"}); \
                memory_search({name: \"auth-service\"}); \
                memory_search({journal: true, since: \"7d\"}).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Full-text query; empty string = list all"},
                    "name": {"type": "string", "description": "Exact entity name lookup (priority over query)"},
                    "journal": {"type": "boolean", "description": "Read journal entries instead of entities"},
                    "since": {"type": "string", "description": "Time filter for journal: 2h|24h|7d|ISO date"},
                    "context": {"type": "string", "description": "Named memory context"},
                    "type": {"type": "string", "description": "Filter by entity type"},
                    "tags": {"type": "array", "items": {"type": "string"}, "description": "AND tag filter"},
                    "limit": {"type": "integer", "description": "Max results (default 10, max 50)"},
                    "sort": {"type": "string", "enum": ["recent", "accessed", "name"], "description": "Sort order for list mode"},
                },
            }),
        },
        Tool {
            name: "memory_forget",
            description: "Correct wrong information: retract a single bad observation, or \
                delete a whole entity. Soft delete is the default and reversible by \
                re-storing the entity; pass permanent:true only when sure. Examples: \
                memory_forget({name: \"auth-service\", observation: \"Uses JWT with 1h expiry\"}); \
                memory_forget({name: \"old-feature\"}).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Entity name"},
                    "observation": {"type": "string", "description": "Exact observation to retract; omit to delete entity"},
                    "permanent": {"type": "boolean", "description": "Hard delete (irreversible); default false"},
                    "context": {"type": "string", "description": "Named memory context"},
                },
                "required": ["name"],
            }),
        },
        Tool {
            name: "memory_link",
            description: "Connect two entities with a named relationship to map \
                dependencies, ownership, and associations. Missing endpoints are created \
                automatically. Use active-voice relation types such as uses, fixes, \
                depends_on, implements, owns, blocks. Example: \
                memory_link({from: \"payment-service\", to: \"Redis\", relation: \"uses\"}).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {"type": "string", "description": "Source entity name"},
                    "to": {"type": "string", "description": "Target entity name"},
                    "relation": {"type": "string", "description": "Relation type, e.g. uses|fixes|depends_on"},
                    "context": {"type": "string", "description": "Named memory context"},
                },
                "required": ["from", "to", "relation"],
            }),
        },
    ]
}

/// Route a tool call to its handler.
pub async fn dispatch(server: &Server, name: &str, args: Value) -> Result<Value> {
    // Absent arguments behave like an empty object.
    let args = if args.is_null() { json!({}) } else { args };

    match name {
        "memory_context" => memory_context(server, args).await,
        "memory_store" => memory_store(server, args).await,
        "memory_search" => memory_search(server, args).await,
        "memory_forget" => memory_forget(server, args).await,
        "memory_link" => memory_link(server, args).await,
        _ => bail!("unknown tool: {name}"),
    }
}

#[derive(Debug, Deserialize)]
struct StoreArgs {
    #[serde(default)]
    entities: Vec<EntityInput>,
    #[serde(default)]
    journal: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    context: String,
}

/// `memory_store` — journal mode when `journal` is non-empty, else batch
/// entity storage.
async fn memory_store(server: &Server, args: Value) -> Result<Value> {
    let args: StoreArgs = serde_json::from_value(args).context("invalid params")?;

    if !args.journal.is_empty() {
        let (content, tags) = (args.journal, args.tags);
        let entry = server
            .with_db(move |conn| journal::append_journal(conn, &content, &tags))
            .await?;
        return Ok(json!({
            "stored": "journal",
            "id": entry.id,
        }));
    }

    if args.entities.is_empty() {
        bail!("entities or journal is required");
    }

    let inputs = args.entities;
    let results = server
        .with_db(move |conn| entity::store_entities(conn, &inputs))
        .await?;
    Ok(json!({
        "stored": "entities",
        "count": results.len(),
        "entities": results,
    }))
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    journal: bool,
    #[serde(default)]
    since: String,
    #[serde(default)]
    #[allow(dead_code)]
    context: String,
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    sort: String,
}

/// `memory_search` — mode order: journal window, exact name, ranked search.
/// The limit is clamped to [1, 50] at this layer.
async fn memory_search(server: &Server, args: Value) -> Result<Value> {
    let args: SearchArgs = serde_json::from_value(args).context("invalid params")?;

    let limit = if args.limit <= 0 { 10 } else { args.limit.min(50) };

    if args.journal {
        let since = args.since;
        let entries = server
            .with_db(move |conn| journal::list_journal(conn, &since, limit))
            .await?;
        let count = entries.len();
        return Ok(json!({
            "journal": entries,
            "count": count,
        }));
    }

    if !args.name.is_empty() {
        let name = args.name;
        let found = server
            .with_db(move |conn| entity::get_entity(conn, &name))
            .await?;
        return Ok(match found {
            Some(e) => json!({ "entities": [e], "count": 1 }),
            None => json!({ "entities": [], "count": 0 }),
        });
    }

    let (query, entity_type, tags, sort) = (args.query, args.entity_type, args.tags, args.sort);
    let fts_query = query.clone();
    let results = server
        .with_db(move |conn| search::search(conn, &fts_query, &entity_type, &tags, &sort, limit))
        .await?;
    let count = results.len();
    let mut response = json!({
        "entities": results,
        "count": count,
    });

    // A keyword query also searches the journal.
    if !query.is_empty() {
        let journal_results = server
            .with_db(move |conn| journal::search_journal(conn, &query, limit))
            .await?;
        response["journal_count"] = json!(journal_results.len());
        response["journal"] = json!(journal_results);
    }

    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ForgetArgs {
    #[serde(default)]
    name: String,
    #[serde(default)]
    observation: String,
    #[serde(default)]
    permanent: bool,
    #[serde(default)]
    #[allow(dead_code)]
    context: String,
}

/// `memory_forget` — retract one observation, or soft/hard delete an entity.
async fn memory_forget(server: &Server, args: Value) -> Result<Value> {
    let args: ForgetArgs = serde_json::from_value(args).context("invalid params")?;
    if args.name.is_empty() {
        bail!("name is required");
    }

    if !args.observation.is_empty() {
        let (name, content) = (args.name.clone(), args.observation.clone());
        let remaining = server
            .with_db(move |conn| observation::retract_observation(conn, &name, &content))
            .await?;
        return Ok(json!({
            "action": "retract_observation",
            "entity": args.name,
            "deleted": args.observation,
            "remaining_observations": remaining,
        }));
    }

    let name = args.name.clone();
    if args.permanent {
        server
            .with_db(move |conn| entity::hard_delete_entity(conn, &name))
            .await?;
        return Ok(json!({ "action": "hard_delete", "entity": args.name }));
    }

    server
        .with_db(move |conn| entity::soft_delete_entity(conn, &name))
        .await?;
    Ok(json!({ "action": "soft_delete", "entity": args.name }))
}

#[derive(Debug, Deserialize)]
struct LinkArgs {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    relation: String,
    #[serde(default)]
    #[allow(dead_code)]
    context: String,
}

/// `memory_link` — upsert a directed typed edge by endpoint names.
async fn memory_link(server: &Server, args: Value) -> Result<Value> {
    let args: LinkArgs = serde_json::from_value(args).context("invalid params")?;
    if args.from.is_empty() || args.to.is_empty() || args.relation.is_empty() {
        bail!("from, to, and relation are required");
    }

    let (from, to, rel) = (args.from.clone(), args.to.clone(), args.relation.clone());
    server
        .with_db(move |conn| relation::upsert_relation_by_name(conn, &from, &to, &rel))
        .await?;
    Ok(json!({
        "from": args.from,
        "to": args.to,
        "relation": args.relation,
        "created": crate::db::now_ms(),
    }))
}
