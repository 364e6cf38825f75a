//! Core state-tracking and reconciliation layer for Provenance Manager
//!
//! This crate ties the lower layers together into the engine that knows
//! what should exist, what does exist, and how the two diverge:
//!
//! - **ProvenanceStore**: append-only, diffable record of how every tracked
//!   file came to be
//! - **Drift classification**: fresh comparison of a live scan against the
//!   store on every run
//! - **HealingPlanner**: minimal corrective actions that never destroy data
//! - **Session**: an explicitly constructed context owning the store, the
//!   identity cache, and the plugin tables — no process-wide globals
//!
//! # Architecture
//!
//! `prov-core` sits above the leaf crates and below any driving surface:
//!
//! ```text
//!              driving surface (out of scope)
//!                          |
//!                      prov-core
//!                          |
//!          +---------+-----+------+
//!          |         |            |
//!      prov-fs  prov-archive  prov-instr
//! ```

pub mod classify;
pub mod error;
pub mod healing;
pub mod model;
pub mod session;
pub mod store;

pub use classify::{DriftClassification, DriftReport, classify};
pub use error::{Error, Result};
pub use healing::{
    Action, ArchiveAvailability, HealingPlan, HealingReport, execute_plan, plan_healing,
};
pub use model::{
    Mod, ModId, ModPack, ModPackMember, ProvenanceEntry, entries_from_simulation,
    entries_from_solution,
};
pub use session::{Session, SessionConfig};
pub use store::ProvenanceStore;
