//! Jenkins Deck - terminal dashboard core for Jenkins
//!
//! A response cache with per-resource TTLs and in-flight request
//! deduplication sits between the dashboard and the Jenkins API. A change
//! detector polls the job inventory in the background and announces
//! finished builds, pending input steps and the aggregate tray status.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod monitor;
pub mod poll;
pub mod service;
pub mod ui;

pub use context::DeckContext;
pub use error::{DeckError, DeckResult};
pub use service::DeckService;
