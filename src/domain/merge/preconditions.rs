//! Merge preconditions.
//!
//! Checked before anything is mutated, in this order: identity equality,
//! voided identities, conflicting active orders.

use std::collections::HashSet;

use crate::domain::foundation::{OrderTypeId, Timestamp, Voidable};

use super::{MergeError, MergePair, MergeWorkingSet};

pub struct MergePreconditions;

impl MergePreconditions {
    /// Rejects a merge of an identity with itself.
    pub fn check_pair(pair: &MergePair) -> Result<(), MergeError> {
        if pair.preferred == pair.non_preferred {
            return Err(MergeError::IdentityEquality(pair.preferred));
        }
        Ok(())
    }

    /// Runs every precondition against the loaded working set.
    pub fn check(ws: &MergeWorkingSet, now: Timestamp) -> Result<(), MergeError> {
        let pair = ws.pair;
        Self::check_pair(&pair)?;

        for identity in [&ws.preferred, &ws.non_preferred] {
            if identity.is_voided() {
                return Err(MergeError::VoidedIdentity {
                    pair,
                    voided: identity.id,
                });
            }
        }

        let preferred_types: HashSet<OrderTypeId> = ws
            .orders
            .iter()
            .filter(|o| o.patient == pair.preferred && o.is_active(now))
            .map(|o| o.order_type.id)
            .collect();

        let conflict = ws.orders.iter().find(|o| {
            o.patient == pair.non_preferred
                && o.is_active(now)
                && preferred_types.contains(&o.order_type.id)
        });

        if let Some(order) = conflict {
            return Err(MergeError::ConflictingActiveOrder {
                pair,
                order_type: order.order_type.name.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clinical::{Order, OrderType};
    use crate::domain::foundation::{ActingUser, ConceptId, PersonId, VoidInfo};
    use crate::domain::merge::PersonGraph;
    use crate::domain::person::PersonIdentity;

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn working_set(preferred: PersonGraph, non_preferred: PersonGraph) -> MergeWorkingSet {
        MergeWorkingSet::assemble(preferred, non_preferred, Vec::new())
    }

    fn graphs() -> (PersonGraph, PersonGraph) {
        (
            PersonGraph::new(PersonIdentity::new_patient(PersonId::new())),
            PersonGraph::new(PersonIdentity::new_patient(PersonId::new())),
        )
    }

    fn active_order(patient: PersonId, kind: &OrderType) -> Order {
        Order::new(patient, ConceptId::new(), kind.clone(), now().add_days(-2))
    }

    #[test]
    fn same_identity_is_rejected() {
        let id = PersonId::new();
        let result = MergePreconditions::check_pair(&MergePair::new(id, id));
        assert_eq!(result, Err(MergeError::IdentityEquality(id)));
    }

    #[test]
    fn clean_pair_passes() {
        let (p, np) = graphs();
        assert!(MergePreconditions::check(&working_set(p, np), now()).is_ok());
    }

    #[test]
    fn voided_non_preferred_is_rejected() {
        let (p, mut np) = graphs();
        np.person.void(VoidInfo::new(ActingUser::new("admin").unwrap(), "dup", now()));
        let voided = np.id();

        let err = MergePreconditions::check(&working_set(p, np), now()).unwrap_err();

        assert!(matches!(err, MergeError::VoidedIdentity { voided: v, .. } if v == voided));
    }

    #[test]
    fn active_orders_of_same_type_conflict() {
        let drug = OrderType::new("Drug order");
        let (mut p, mut np) = graphs();
        p.orders.push(active_order(p.id(), &drug));
        np.orders.push(active_order(np.id(), &drug));

        let err = MergePreconditions::check(&working_set(p, np), now()).unwrap_err();

        match err {
            MergeError::ConflictingActiveOrder { order_type, .. } => assert_eq!(order_type, "Drug order"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn one_sided_active_order_passes() {
        let drug = OrderType::new("Drug order");
        let (p, mut np) = graphs();
        np.orders.push(active_order(np.id(), &drug));

        assert!(MergePreconditions::check(&working_set(p, np), now()).is_ok());
    }

    #[test]
    fn different_order_types_do_not_conflict() {
        let (mut p, mut np) = graphs();
        p.orders.push(active_order(p.id(), &OrderType::new("Drug order")));
        np.orders.push(active_order(np.id(), &OrderType::new("Lab order")));

        assert!(MergePreconditions::check(&working_set(p, np), now()).is_ok());
    }

    #[test]
    fn stopped_order_does_not_conflict() {
        let drug = OrderType::new("Drug order");
        let (mut p, mut np) = graphs();
        p.orders.push(active_order(p.id(), &drug));
        let mut stopped = active_order(np.id(), &drug);
        stopped.date_stopped = Some(now().add_days(-1));
        np.orders.push(stopped);

        assert!(MergePreconditions::check(&working_set(p, np), now()).is_ok());
    }
}
