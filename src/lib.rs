//! Persistent, searchable memory for AI coding agents.
//!
//! aimemo is an [MCP](https://modelcontextprotocol.io/) server that gives AI
//! agents (Claude Code, Cursor, Windsurf) a durable memory: named entities
//! with typed observations, tags, and directed relations, plus an
//! append-only journal — all stored in a local SQLite database and reachable
//! through five tools over newline-delimited JSON-RPC on stdio.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 (`porter unicode61`) indexes over entity
//!   names, observation contents, and journal entries, kept in sync with the
//!   base tables by triggers
//! - **Search**: keyword matches ranked by an importance score combining
//!   recency and access count
//! - **Transport**: MCP over stdio, one concurrent worker per request with a
//!   single shared database handle
//!
//! # Modules
//!
//! - [`config`] — TOML configuration with defaults
//! - [`db`] — schema, pragmas, and the typed storage operations
//! - [`exchange`] — knowledge-graph export/import records
//! - [`locate`] — project-local vs. per-user database discovery
//! - [`mcp`] — JSON-RPC server and the five memory tools

pub mod config;
pub mod db;
pub mod exchange;
pub mod locate;
pub mod mcp;
