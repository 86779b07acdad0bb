//! Clinical orders.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConceptId, EncounterId, OrderId, OrderTypeId, PersonId, Timestamp, VoidInfo, Voidable,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderType {
    pub id: OrderTypeId,
    pub name: String,
}

impl OrderType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OrderTypeId::new(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub patient: PersonId,
    pub encounter: Option<EncounterId>,
    pub concept: ConceptId,
    pub order_type: OrderType,
    pub date_activated: Timestamp,
    pub date_stopped: Option<Timestamp>,
    pub auto_expire_date: Option<Timestamp>,
    pub void: Option<VoidInfo>,
}

impl Order {
    pub fn new(patient: PersonId, concept: ConceptId, order_type: OrderType, date_activated: Timestamp) -> Self {
        Self {
            id: OrderId::new(),
            patient,
            encounter: None,
            concept,
            order_type,
            date_activated,
            date_stopped: None,
            auto_expire_date: None,
            void: None,
        }
    }

    /// Active at `now`: not voided, not stopped and not expired at or before `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        if self.is_voided() {
            return false;
        }
        let ended = |at: Option<Timestamp>| at.is_some_and(|t| !t.is_after(&now));
        !ended(self.date_stopped) && !ended(self.auto_expire_date)
    }
}

crate::impl_voidable!(Order);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ActingUser, VoidInfo};

    fn order(now: Timestamp) -> Order {
        Order::new(PersonId::new(), ConceptId::new(), OrderType::new("Drug"), now.add_days(-1))
    }

    #[test]
    fn fresh_order_is_active() {
        let now = Timestamp::from_unix_secs(1_000_000);
        assert!(order(now).is_active(now));
    }

    #[test]
    fn stopped_order_is_inactive() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let mut o = order(now);
        o.date_stopped = Some(now);
        assert!(!o.is_active(now));
    }

    #[test]
    fn future_stop_is_still_active() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let mut o = order(now);
        o.date_stopped = Some(now.add_days(3));
        assert!(o.is_active(now));
    }

    #[test]
    fn expired_order_is_inactive() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let mut o = order(now);
        o.auto_expire_date = Some(now.add_days(-1));
        assert!(!o.is_active(now));
    }

    #[test]
    fn voided_order_is_inactive() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let mut o = order(now);
        o.void(VoidInfo::new(ActingUser::new("admin").unwrap(), "entered in error", now));
        assert!(!o.is_active(now));
    }
}
