//! Person addresses.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActingUser, AddressId, Timestamp, VoidInfo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAddress {
    pub id: AddressId,
    pub preferred: bool,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city_village: Option<String>,
    pub county_district: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub creator: Option<ActingUser>,
    pub date_created: Timestamp,
    pub void: Option<VoidInfo>,
}

impl PersonAddress {
    pub fn new(address1: impl Into<String>, city_village: impl Into<String>) -> Self {
        Self {
            id: AddressId::new(),
            preferred: false,
            address1: Some(address1.into()),
            address2: None,
            city_village: Some(city_village.into()),
            county_district: None,
            state_province: None,
            postal_code: None,
            country: None,
            creator: None,
            date_created: Timestamp::now(),
            void: None,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Two addresses hold the same content when every address field matches,
    /// a field populated on only one side counting as a difference.
    pub fn same_content(&self, other: &PersonAddress) -> bool {
        self.address1 == other.address1
            && self.address2 == other.address2
            && self.city_village == other.city_village
            && self.county_district == other.county_district
            && self.state_province == other.state_province
            && self.postal_code == other.postal_code
            && self.country == other.country
    }

    pub fn copy_for_merge(&self, creator: &ActingUser, now: Timestamp) -> Self {
        Self {
            id: AddressId::new(),
            preferred: false,
            creator: Some(creator.clone()),
            date_created: now,
            void: None,
            ..self.clone()
        }
    }
}

crate::impl_voidable!(PersonAddress);
