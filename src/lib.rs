//! Client-side orchestration for a QKD link demonstration: local noise
//! model and particle animation, sequential distance sweeps against a remote
//! simulator, and aggregation of the results into series, history and CSV.
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod io;
pub mod runner;

pub use crate::core::*;
pub use crate::runner::{SweepReport, SweepRunner};
