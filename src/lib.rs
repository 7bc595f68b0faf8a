//! # widegate
//!
//! Compiles entity-attribute-value fact tables into wide, one-row-per-entity
//! relations and publishes tier-gated, column-redacted views over them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        RecruitingConfig (catalogs, access rules,         │
//! │        categories) + Settings (dialect, namespaces)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolve]
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Blueprint                           │
//! └─────────────────────────────────────────────────────────┘
//!              │                               │
//!              ▼ [wide, derived, relations]    ▼ [access]
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │   Intermediate relations  │   │       Gated views         │
//! └───────────────────────────┘   └───────────────────────────┘
//!              │                               │
//!              └───────────────┬───────────────┘
//!                              ▼ [schedule]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Ordered steps ─► Executor (script | SQLite)       │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod catalog;
pub mod config;
pub mod derived;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod relations;
pub mod safe_cast;
pub mod schedule;
pub mod sql;
pub mod wide;

pub use pipeline::{BuildError, Phase, Pipeline};
