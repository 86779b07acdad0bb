//! Merge handlers.

mod get_merge_audit;
mod merge_identities;

pub use get_merge_audit::{GetMergeAuditHandler, GetMergeAuditQuery, ListPersonMergesQuery};
pub use merge_identities::{
    MergeIdentitiesCommand, MergeIdentitiesHandler, MergeIdentitiesResult, MergeSettings,
};
