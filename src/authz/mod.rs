//! Authorization module - campus/RTI scoped access control
//!
//! Encodes the multi-tier permission model over the academic hierarchy
//! (RTI -> Campus -> Program -> Term -> CurricularUnit -> Course -> planning
//! chain):
//! - campus/RTI gate: the caller's active positions must reach the campuses
//!   where the target's program is offered, directly or via an RTI grant
//! - teacher ownership: callers holding only the Teacher role additionally
//!   need an assignment (or an existing course) inside the target scope
//! - operation tiers: plain access, planning management, metadata update and
//!   delete each apply a different role/ownership rule
//!
//! Every operation takes the caller's [`Principal`] explicitly; nothing here
//! reads ambient request state. NotFound always wins over Forbidden so that a
//! denied caller cannot probe which ids exist.

mod catalog;
mod evaluator;
mod principal;

pub use catalog::{Catalog, CourseScope, SqlCatalog};
pub use evaluator::AccessEvaluator;
pub use principal::{CampusRef, Principal};
