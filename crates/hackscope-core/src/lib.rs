//! # hackscope core
//!
//! Runtime-independent logic for hackscope: data models, response
//! validation, the content-sampling policy, prompt templates, the retry
//! policy, placeholder records, project listing and scoring types, and the
//! store/cache traits.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or other native-only
//! dependencies.

pub mod catalog;
pub mod degraded;
pub mod models;
pub mod prompt;
pub mod retry;
pub mod sample;
pub mod store;
pub mod validate;
