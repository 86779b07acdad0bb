//! User accounts attached to a person.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PersonId, UserAccountId, VoidInfo};

/// A login account; always attached to exactly one person.
///
/// Accounts are retired, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserAccountId,
    pub username: String,
    pub person: PersonId,
    pub retired: Option<VoidInfo>,
}

impl UserAccount {
    pub fn new(username: impl Into<String>, person: PersonId) -> Self {
        Self {
            id: UserAccountId::new(),
            username: username.into(),
            person,
            retired: None,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired.is_some()
    }

    /// Retires the account. Returns false if it was already retired.
    pub fn retire(&mut self, info: VoidInfo) -> bool {
        if self.is_retired() {
            return false;
        }
        self.retired = Some(info);
        true
    }
}
