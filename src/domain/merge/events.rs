//! Merge domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, EventId, MergeId, PersonId, Timestamp};

use super::MergeAudit;

/// Published after a merge commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitiesMerged {
    pub event_id: EventId,
    pub merge_id: MergeId,
    pub preferred: PersonId,
    pub non_preferred: PersonId,
    pub merged_by: String,
    pub merged_at: Timestamp,
}

impl IdentitiesMerged {
    pub fn from_audit(audit: &MergeAudit) -> Self {
        Self {
            event_id: EventId::new(),
            merge_id: audit.id(),
            preferred: audit.preferred(),
            non_preferred: audit.non_preferred(),
            merged_by: audit.created_by().to_string(),
            merged_at: audit.date_created(),
        }
    }
}

impl DomainEvent for IdentitiesMerged {
    fn event_type(&self) -> &'static str {
        "identities.merged.v1"
    }

    fn aggregate_id(&self) -> String {
        self.preferred.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Person"
    }

    fn occurred_at(&self) -> Timestamp {
        self.merged_at
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ActingUser, EventEnvelope};
    use crate::domain::merge::{MergeAuditBuilder, MergePair};

    #[test]
    fn envelope_carries_version_and_pair() {
        let pair = MergePair::new(PersonId::new(), PersonId::new());
        let audit = MergeAuditBuilder::new(pair).seal(
            MergeId::new(),
            ActingUser::new("admin").unwrap(),
            Timestamp::from_unix_secs(5),
        );

        let envelope = EventEnvelope::from_event(&IdentitiesMerged::from_audit(&audit)).unwrap();

        assert_eq!(envelope.event_type, "identities.merged.v1");
        assert_eq!(envelope.schema_version, 1);
        assert_eq!(envelope.aggregate_id, pair.preferred.to_string());
        let payload: IdentitiesMerged = envelope.payload_as().unwrap();
        assert_eq!(payload.non_preferred, pair.non_preferred);
        assert_eq!(payload.merge_id, audit.id());
    }
}
