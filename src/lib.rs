//! Identity Merge - person and patient identity merging
//!
//! Folds a duplicate (non-preferred) person record into a preferred one:
//! demographics, identifiers, relationships, clinical history and user
//! accounts move across, the duplicate is voided, and every change is
//! captured in an audit record that commits atomically with the merge.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
