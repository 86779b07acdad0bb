//! Visit and encounter migration.
//!
//! Visits are move-only: every visit of the non-preferred identity, voided or
//! not, changes owner together with its encounters. Encounters outside any
//! visit move too. Moving an encounter carries its obs trees and the orders
//! placed in it. Orders placed outside any encounter move last and are
//! listed separately in the audit.

use std::collections::HashSet;
use tracing::debug;

use crate::domain::foundation::{EncounterId, OperationContext, PersonId};
use crate::domain::merge::obs_relocator::{ObsTreeRelocator, RelocationTarget};
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

pub struct VisitMigrator;

impl VisitMigrator {
    fn move_encounter(
        ws: &mut MergeWorkingSet,
        encounter_id: EncounterId,
        to: PersonId,
    ) -> Result<bool, MergeError> {
        let pair = ws.pair;
        let from = pair.non_preferred;
        let Some(encounter) = ws
            .encounters
            .iter_mut()
            .find(|e| e.id == encounter_id && e.patient == from)
        else {
            return Ok(false);
        };
        encounter.patient = to;

        let roots: Vec<_> = ws
            .observations
            .roots()
            .filter(|o| o.encounter == Some(encounter_id))
            .map(|o| o.id)
            .collect();
        for root in roots {
            ObsTreeRelocator::relocate(&mut ws.observations, root, RelocationTarget::person(to))
                .map_err(|e| MergeError::Infrastructure {
                    pair,
                    kind: EntityKind::Visit,
                    message: e.to_string(),
                })?;
        }

        for order in ws
            .orders
            .iter_mut()
            .filter(|o| o.encounter == Some(encounter_id) && o.patient == from)
        {
            order.patient = to;
        }

        Ok(true)
    }
}

impl Migrator for VisitMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Visit
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        _ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let pair = ws.pair;
        let mut report = MigrationReport::default();
        let mut seen = HashSet::new();
        let mut queue: Vec<EncounterId> = Vec::new();

        for visit in ws
            .visits
            .iter_mut()
            .filter(|v| v.patient == pair.non_preferred)
        {
            visit.patient = pair.preferred;
            audit.moved_visits.push(visit.id);
            debug!(visit_id = %visit.id, "Moved visit");
            report.migrated += 1;
            queue.extend(visit.encounters.iter().copied().filter(|e| seen.insert(*e)));
        }

        queue.extend(
            ws.encounters
                .iter()
                .filter(|e| e.patient == pair.non_preferred)
                .map(|e| e.id)
                .filter(|id| seen.insert(*id)),
        );

        for encounter_id in queue {
            if Self::move_encounter(ws, encounter_id, pair.preferred)? {
                audit.moved_encounters.push(encounter_id);
                debug!(encounter_id = %encounter_id, "Moved encounter");
                report.migrated += 1;
            }
        }

        for order in ws
            .orders
            .iter_mut()
            .filter(|o| o.encounter.is_none() && o.patient == pair.non_preferred)
        {
            order.patient = pair.preferred;
            audit.moved_orders.push(order.id);
            debug!(order_id = %order.id, "Moved order without encounter");
            report.migrated += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clinical::{Encounter, Obs, ObsValue, Order, OrderType, Visit};
    use crate::domain::foundation::{ActingUser, ConceptId, VisitTypeId, VoidInfo, Voidable};
    use crate::domain::merge::migrators::test_support::{ctx, graphs, now, working_set};

    fn visit(patient: PersonId) -> Visit {
        Visit::new(patient, VisitTypeId::new(), now())
    }

    #[test]
    fn moves_voided_and_unvoided_visits() {
        let (mut p, mut np) = graphs();
        p.visits.extend([visit(p.id()), visit(p.id())]);
        np.visits.extend([visit(np.id()), visit(np.id()), visit(np.id())]);
        let mut voided = visit(np.id());
        voided.void(VoidInfo::new(ActingUser::new("admin").unwrap(), "error", now()));
        np.visits.push(voided);
        let expected: Vec<_> = np.visits.iter().map(|v| v.id).collect();
        let (mut ws, mut audit) = working_set(p, np);

        VisitMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(ws.visits.iter().filter(|v| v.patient == ws.pair.preferred).count(), 6);
        assert_eq!(audit.moved_visits, expected);
    }

    #[test]
    fn encounter_carries_obs_trees_and_orders() {
        let (p, mut np) = graphs();
        let np_id = np.id();
        let mut v = visit(np_id);
        let mut encounter = Encounter::new(np_id, now());
        encounter.visit = Some(v.id);
        v.encounters.push(encounter.id);

        let root = Obs::new(np_id, ConceptId::new(), ObsValue::Group, now()).in_encounter(encounter.id);
        let root_id = root.id;
        np.observations.insert(root);
        let member = Obs::new(np_id, ConceptId::new(), ObsValue::Numeric(37.5), now());
        assert!(np.observations.insert_member(root_id, member));

        let mut order = Order::new(np_id, ConceptId::new(), OrderType::new("Lab"), now());
        order.encounter = Some(encounter.id);
        let loose_order = Order::new(np_id, ConceptId::new(), OrderType::new("Drug"), now());
        let loose_id = loose_order.id;

        np.visits.push(v);
        np.encounters.push(encounter.clone());
        np.orders.extend([order, loose_order]);
        let (mut ws, mut audit) = working_set(p, np);

        VisitMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        let preferred = ws.pair.preferred;
        assert_eq!(audit.moved_encounters, vec![encounter.id]);
        assert!(ws.observations.iter().all(|o| o.person == preferred));
        assert!(ws.observations.iter().all(|o| o.encounter == Some(encounter.id)));
        assert!(ws.orders.iter().all(|o| o.patient == preferred));
        assert_eq!(audit.moved_orders, vec![loose_id]);
    }

    #[test]
    fn orders_without_encounter_move_even_when_inactive() {
        let (mut p, mut np) = graphs();
        let drug = OrderType::new("Drug Order");
        let kept = Order::new(p.id(), ConceptId::new(), drug.clone(), now());
        p.orders.push(kept.clone());
        let active = Order::new(np.id(), ConceptId::new(), drug.clone(), now());
        let mut voided = Order::new(np.id(), ConceptId::new(), drug, now());
        voided.void(VoidInfo::new(ActingUser::new("admin").unwrap(), "error", now()));
        let expected = vec![active.id, voided.id];
        np.orders.extend([active, voided]);
        let (mut ws, mut audit) = working_set(p, np);

        let report = VisitMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(report.migrated, 2);
        assert_eq!(audit.moved_orders, expected);
        assert!(ws.orders.iter().all(|o| o.patient == ws.pair.preferred));
        assert!(!audit.moved_orders.contains(&kept.id));
    }

    #[test]
    fn standalone_encounters_move_after_visit_encounters() {
        let (p, mut np) = graphs();
        let standalone = Encounter::new(np.id(), now());
        let mut v = visit(np.id());
        let in_visit = Encounter::new(np.id(), now());
        v.encounters.push(in_visit.id);
        np.encounters.extend([standalone.clone(), in_visit.clone()]);
        np.visits.push(v);
        let (mut ws, mut audit) = working_set(p, np);

        let report = VisitMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(audit.moved_encounters, vec![in_visit.id, standalone.id]);
        assert_eq!(report.migrated, 3);
    }

    #[test]
    fn preferred_visits_are_untouched() {
        let (mut p, np) = graphs();
        p.visits.push(visit(p.id()));
        let (mut ws, mut audit) = working_set(p, np);

        let report = VisitMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(report, MigrationReport::default());
        assert!(audit.moved_visits.is_empty());
        assert!(audit.moved_orders.is_empty());
    }
}
