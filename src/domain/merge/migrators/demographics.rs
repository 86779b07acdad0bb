//! Scalar demographics.
//!
//! The preferred identity keeps its own values; gaps (and estimated birth
//! dates where the other side is exact) are filled from the non-preferred
//! identity. Every overwrite snapshots the prior value into the audit.

use tracing::debug;

use crate::domain::foundation::OperationContext;
use crate::domain::merge::{EntityKind, MergeAuditBuilder, MergeError, MergeWorkingSet};

use super::{MigrationReport, Migrator};

pub struct DemographicsMigrator;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl Migrator for DemographicsMigrator {
    fn kind(&self) -> EntityKind {
        EntityKind::Person
    }

    fn migrate(
        &self,
        ws: &mut MergeWorkingSet,
        _ctx: &OperationContext,
        audit: &mut MergeAuditBuilder,
    ) -> Result<MigrationReport, MergeError> {
        let mut report = MigrationReport::default();
        let source = &ws.non_preferred;
        let target = &mut ws.preferred;

        if is_blank(&target.gender) && !is_blank(&source.gender) && target.gender != source.gender {
            audit.snapshot_gender(target.gender.clone());
            target.gender = source.gender.clone();
            debug!(gender = ?target.gender, "Filled gender");
            report.migrated += 1;
        }

        if let Some(birthdate) = source.birthdate {
            let fill = target.birthdate.is_none()
                || (target.birthdate_estimated && !source.birthdate_estimated);
            let changes = target.birthdate != Some(birthdate)
                || target.birthdate_estimated != source.birthdate_estimated;
            if fill && changes {
                audit.snapshot_date_of_birth(target.birthdate, target.birthdate_estimated);
                target.birthdate = Some(birthdate);
                target.birthdate_estimated = source.birthdate_estimated;
                debug!(%birthdate, "Filled birthdate");
                report.migrated += 1;
            }
        }

        let source_death_known = source.deathdate.is_some() || source.dead;
        if target.deathdate.is_none() && source_death_known {
            let changes = target.deathdate != source.deathdate || target.dead != source.dead;
            if changes {
                audit.snapshot_date_of_death(target.deathdate, target.deathdate_estimated);
                target.dead = true;
                target.deathdate = source.deathdate;
                target.deathdate_estimated = source.deathdate_estimated;
                debug!(deathdate = ?target.deathdate, "Filled death details");
                report.migrated += 1;
            }
        }

        if target.cause_of_death.is_none() && source.cause_of_death.is_some() {
            audit.snapshot_cause_of_death(target.cause_of_death);
            target.cause_of_death = source.cause_of_death;
            report.migrated += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ConceptId;
    use crate::domain::merge::migrators::test_support::{ctx, graphs, working_set};
    use crate::domain::merge::{Prior, PriorDate};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn preferred_values_win_and_leave_no_snapshot() {
        let (mut p, mut np) = graphs();
        p.person.gender = Some("F".to_string());
        p.person.birthdate = Some(date(1980, 1, 1));
        np.person.gender = Some("M".to_string());
        np.person.birthdate = Some(date(1981, 1, 1));
        let (mut ws, mut audit) = working_set(p, np);

        let report = DemographicsMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(report.migrated, 0);
        assert_eq!(ws.preferred.gender.as_deref(), Some("F"));
        assert!(audit.prior_gender.is_none());
        assert!(audit.prior_date_of_birth.is_none());
    }

    #[test]
    fn fills_gaps_and_snapshots_prior_values() {
        let cause = ConceptId::new();
        let (p, mut np) = graphs();
        np.person.gender = Some("M".to_string());
        np.person.birthdate = Some(date(1970, 5, 2));
        np.person.dead = true;
        np.person.deathdate = Some(date(2020, 1, 1));
        np.person.cause_of_death = Some(cause);
        let (mut ws, mut audit) = working_set(p, np);

        let report = DemographicsMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(report.migrated, 4);
        assert_eq!(ws.preferred.gender.as_deref(), Some("M"));
        assert!(ws.preferred.dead);
        assert_eq!(ws.preferred.cause_of_death, Some(cause));
        assert_eq!(audit.prior_gender, Some(Prior::of(None)));
        assert_eq!(audit.prior_date_of_birth, Some(PriorDate { date: None, estimated: false }));
        assert_eq!(audit.prior_date_of_death, Some(PriorDate { date: None, estimated: false }));
        assert_eq!(audit.prior_cause_of_death, Some(Prior::of(None)));
    }

    #[test]
    fn exact_birthdate_replaces_estimated_one() {
        let (mut p, mut np) = graphs();
        p.person.birthdate = Some(date(1980, 1, 1));
        p.person.birthdate_estimated = true;
        np.person.birthdate = Some(date(1980, 6, 15));
        let (mut ws, mut audit) = working_set(p, np);

        DemographicsMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(ws.preferred.birthdate, Some(date(1980, 6, 15)));
        assert!(!ws.preferred.birthdate_estimated);
        assert_eq!(
            audit.prior_date_of_birth,
            Some(PriorDate { date: Some(date(1980, 1, 1)), estimated: true })
        );
    }

    #[test]
    fn blank_gender_counts_as_missing() {
        let (mut p, mut np) = graphs();
        p.person.gender = Some("  ".to_string());
        np.person.gender = Some("F".to_string());
        let (mut ws, mut audit) = working_set(p, np);

        DemographicsMigrator.migrate(&mut ws, &ctx(), &mut audit).unwrap();

        assert_eq!(ws.preferred.gender.as_deref(), Some("F"));
        assert_eq!(audit.prior_gender, Some(Prior::of(Some("  ".to_string()))));
    }
}
