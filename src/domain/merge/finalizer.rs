//! Voiding and retirement of the non-preferred identity.

use tracing::debug;

use crate::domain::foundation::{OperationContext, UserAccountId, VoidInfo, Voidable};

use super::MergeWorkingSet;

/// What the finalizer changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Names, addresses, identifiers and attributes voided in cascade.
    pub voided_members: usize,
    pub retired_users: Vec<UserAccountId>,
}

pub struct MergeFinalizer;

impl MergeFinalizer {
    /// Voids the non-preferred identity and everything it still owns, and
    /// retires any account still attached to it.
    pub fn finalize(
        ws: &mut MergeWorkingSet,
        ctx: &OperationContext,
        void_reason: &str,
    ) -> FinalizeReport {
        let info = VoidInfo::new(ctx.user.clone(), void_reason, ctx.started_at());
        let non_preferred = ws.pair.non_preferred;

        ws.non_preferred.void(info.clone());
        ws.non_preferred.touch(&ctx.user, ctx.started_at());
        let voided_members = ws.non_preferred.void_owned_collections(&info);

        let mut retired_users = Vec::new();
        for user in ws
            .users
            .iter_mut()
            .filter(|u| u.person == non_preferred && !u.is_retired())
        {
            user.retire(info.clone());
            debug!(user_id = %user.id, "Retired user account left on voided identity");
            retired_users.push(user.id);
        }

        ws.preferred.touch(&ctx.user, ctx.started_at());

        FinalizeReport {
            voided_members,
            retired_users,
        }
    }
}
