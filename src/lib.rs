//! # hackscope
//!
//! Cached AI analyses of hackathon project pages and their source
//! repositories.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────┐
//! │  GitHub  │──▶│  Sampler  │──▶│ Requester │──▶│ Orchestrator │
//! │  (REST)  │   │ (bounded) │   │ (retry)   │   │ cache+store  │
//! └──────────┘   └───────────┘   └───────────┘   └──────┬───────┘
//!                                                       │
//!                                   ┌───────────────────┤
//!                                   ▼                   ▼
//!                              ┌──────────┐       ┌──────────┐
//!                              │   CLI    │       │   HTTP   │
//!                              └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`errors`] | Typed pipeline errors |
//! | [`github`] | Source-hosting client |
//! | [`generate`] | Text-generation client |
//! | [`scrape`] | Page-scraping client |
//! | [`sampler`] | Repository content sampling |
//! | [`retry`] | Bounded async retry |
//! | [`requester`] | Prompt, generate, validate, degrade |
//! | [`orchestrator`] | Repository analysis cache/store ladder |
//! | [`project`] | Project page analysis |
//! | [`services`] | Service construction |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite store implementation |
//! | [`sqlite_cache`] | Fast cache shared across processes |
//!
//! Pure logic (models, validation, sampling policy, prompts, backoff,
//! placeholder records and the store traits) lives in `hackscope-core`.

pub mod config;
pub mod db;
pub mod errors;
pub mod generate;
pub mod github;
pub mod logging;
pub mod migrate;
pub mod orchestrator;
pub mod project;
pub mod requester;
pub mod retry;
pub mod sampler;
pub mod scrape;
pub mod server;
pub mod services;
pub mod sqlite_cache;
pub mod sqlite_store;
