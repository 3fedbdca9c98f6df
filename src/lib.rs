//! MILP scheduling of marshalling-yard operations: decoupling arriving
//! trains, assembling and readying departures, and, at the deepest planning
//! level, assigning the human tasks around them to crew shifts.
//!
//! The pipeline is `parser` -> `encode` -> `solve` -> `schedule`: instances
//! load into a [`problem::Problem`], the encoders lower it to the [`model`]
//! IR for a chosen [`encode::Milestone`], and a feasible assignment projects
//! back to a verified, exportable schedule.

pub mod config;
pub mod encode;
pub mod model;
pub mod objective;
pub mod parser;
pub mod problem;
pub mod schedule;
pub mod solve;
pub mod time;
pub mod vars;
