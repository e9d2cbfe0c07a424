//! Static vetting and sandboxed execution of untrusted Othello bots.
//!
//! Uploaded bots are Python files implementing a small duck-typed player
//! interface (`__init__(my_color, opp_color)` plus
//! `select_move(board) -> (row, col)`). This crate is the full path such a
//! file takes before and while it plays:
//!
//! - [`vetter`] statically analyzes the source and rejects files that
//!   import outside a small allow-list, call dynamic-execution builtins,
//!   or touch reflective dunder attributes;
//! - [`SecurityLog`] quarantines rejected uploads and keeps an append-only
//!   audit trail;
//! - [`BotCatalog`] owns the [`BotDescriptor`] records for builtin and
//!   uploaded bots;
//! - [`BotProcess`] runs one vetted bot in its own interpreter process and
//!   converts every runtime failure (crash, bad output, blown deadline)
//!   into a [`BotFault`] instead of propagating it.
//!
//! Vetting proves only the absence of the listed constructs; the hard
//! wall-clock deadlines in [`BotProcess`] are the second line of defense.

mod catalog;
mod runtime;
mod security_log;
pub mod vetter;

pub use catalog::{BotCatalog, BotDescriptor, CatalogError, Provenance};
pub use runtime::{BotFault, BotProcess};
pub use security_log::{SecurityLog, SecurityLogEntry};
pub use vetter::{vet_source, SecurityViolation, ViolationKind};
