//! Person attributes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActingUser, AttributeId, AttributeTypeId, Timestamp, VoidInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttribute {
    pub id: AttributeId,
    pub attribute_type: AttributeTypeId,
    pub value: String,
    pub preferred: bool,
    pub creator: Option<ActingUser>,
    pub date_created: Timestamp,
    pub void: Option<VoidInfo>,
}

impl PersonAttribute {
    pub fn new(attribute_type: AttributeTypeId, value: impl Into<String>) -> Self {
        Self {
            id: AttributeId::new(),
            attribute_type,
            value: value.into(),
            preferred: false,
            creator: None,
            date_created: Timestamp::now(),
            void: None,
        }
    }

    pub fn same_content(&self, other: &PersonAttribute) -> bool {
        self.attribute_type == other.attribute_type && self.value == other.value
    }

    pub fn copy_for_merge(&self, creator: &ActingUser, now: Timestamp) -> Self {
        Self {
            id: AttributeId::new(),
            preferred: false,
            creator: Some(creator.clone()),
            date_created: now,
            void: None,
            ..self.clone()
        }
    }
}

crate::impl_voidable!(PersonAttribute);
