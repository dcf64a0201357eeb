//! Trailer load planning.
//!
//! Lays pallet types out on a trailer floor in shelf rows, reports floor and
//! payload utilization, and keeps the registry of order links per pallet type.
//! The [`api`] module serves all of it over HTTP.

pub mod api;
pub mod config;
pub mod geometry;
pub mod links;
pub mod model;
pub mod planner;
pub mod report;
pub mod types;
