//! Person names.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActingUser, NameId, Timestamp, VoidInfo};

/// A name a person is known by.
///
/// Name parts are stored exactly as entered; no trimming or case folding is
/// applied, so "John  Smith" and "John Smith" are different names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub id: NameId,
    pub preferred: bool,
    pub prefix: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    pub family_name2: Option<String>,
    pub suffix: Option<String>,
    pub creator: Option<ActingUser>,
    pub date_created: Timestamp,
    pub void: Option<VoidInfo>,
}

impl PersonName {
    /// Creates a non-preferred name with only given and family parts.
    pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            id: NameId::new(),
            preferred: false,
            prefix: None,
            given_name: Some(given_name.into()),
            middle_name: None,
            family_name: Some(family_name.into()),
            family_name2: None,
            suffix: None,
            creator: None,
            date_created: Timestamp::now(),
            void: None,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    pub fn with_middle_name(mut self, middle_name: impl Into<String>) -> Self {
        self.middle_name = Some(middle_name.into());
        self
    }

    /// Populated parts joined by a single space, in display order.
    pub fn full_name(&self) -> String {
        [
            &self.prefix,
            &self.given_name,
            &self.middle_name,
            &self.family_name,
            &self.family_name2,
            &self.suffix,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Copies the name content into a fresh, non-preferred, non-voided record.
    pub fn copy_for_merge(&self, creator: &ActingUser, now: Timestamp) -> Self {
        Self {
            id: NameId::new(),
            preferred: false,
            creator: Some(creator.clone()),
            date_created: now,
            void: None,
            ..self.clone()
        }
    }
}

crate::impl_voidable!(PersonName);
