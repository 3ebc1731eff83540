//! Aggregates job listings from applicant tracking systems, filters them
//! per organization, resolves publication dates and appends only unseen
//! listings to a per-organization CSV store.

pub mod config;
pub mod error;
pub mod harvest;
pub mod telemetry;
