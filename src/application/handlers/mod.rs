//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod merge;

pub use merge::{
    GetMergeAuditHandler, GetMergeAuditQuery, ListPersonMergesQuery, MergeIdentitiesCommand,
    MergeIdentitiesHandler, MergeIdentitiesResult, MergeSettings,
};
