//! # Memory Harness
//!
//! A local-first retrieval-augmented memory store for AI tools.
//!
//! Memory Harness ingests free text — short notes or long documents — splits
//! long text into overlapping chunks, embeds each chunk through a local
//! Ollama instance, indexes the vectors in a file-backed store, and answers
//! semantic queries with ranked, context-expanded document snippets.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────┐
//! │ remember /   │──▶│   Pipeline     │──▶│ Vector index │
//! │ ingest text  │   │ Chunk + Embed │   │ + Registry   │
//! └──────────────┘   └───────────────┘   └──────┬──────┘
//!                                               │
//!                            ┌──────────────────┤
//!                            ▼                  ▼
//!                       ┌─────────┐       ┌──────────┐
//!                       │   CLI   │       │   HTTP   │
//!                       │  (mem)  │       │  (tools) │
//!                       └─────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mem init                              # create the data directory
//! mem remember "the sky is blue" --tag color
//! mem ingest --file notes.md --tag docs
//! mem recall "sky color" --limit 3
//! mem serve mcp                         # start the HTTP tool server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and tag normalization |
//! | [`chunk`] | Overlap-aware chunking and reassembly |
//! | [`registry`] | Durable document registry |
//! | [`guard`] | Exclusive access guard |
//! | [`index`] | Vector index trait and local implementation |
//! | [`backend`] | Ollama embedding/generation client |
//! | [`store`] | Store owner object; list and forget |
//! | [`ingest`] | Ingestion pipeline |
//! | [`recall`] | Recall pipeline with HyDE |
//! | [`transfer`] | JSONL download/upload |
//! | [`server`] | HTTP tool server |
//! | [`error`] | Error kinds |

pub mod backend;
pub mod chunk;
pub mod config;
pub mod error;
pub mod guard;
pub mod index;
pub mod ingest;
pub mod models;
pub mod recall;
pub mod registry;
pub mod server;
pub mod store;
pub mod transfer;
