//! Execution engine for wasconf
//!
//! The engine orchestrates:
//! 1. Planning - order and filter the declared resources
//! 2. Diffing - compare documents on disk with the declarations
//! 3. Executing - one wsadmin pass per resource that drifted

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ApplyOptions, ApplyOutcome, execute};
pub use planner::build_plan;
