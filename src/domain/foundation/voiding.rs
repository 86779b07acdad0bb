//! Soft-delete ("void") and retirement metadata.

use serde::{Deserialize, Serialize};

use super::{ActingUser, Timestamp};

/// Who voided (or retired) a record, when, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidInfo {
    pub voided_by: ActingUser,
    pub void_reason: String,
    pub date_voided: Timestamp,
}

impl VoidInfo {
    pub fn new(voided_by: ActingUser, void_reason: impl Into<String>, date_voided: Timestamp) -> Self {
        Self {
            voided_by,
            void_reason: void_reason.into(),
            date_voided,
        }
    }
}

/// A record that can be soft-deleted.
///
/// Voiding an already voided record keeps the original metadata.
pub trait Voidable {
    fn void_info(&self) -> Option<&VoidInfo>;

    fn set_void_info(&mut self, info: Option<VoidInfo>);

    fn is_voided(&self) -> bool {
        self.void_info().is_some()
    }

    /// Voids the record. Returns false if it was already voided.
    fn void(&mut self, info: VoidInfo) -> bool {
        if self.is_voided() {
            return false;
        }
        self.set_void_info(Some(info));
        true
    }
}

/// Implements [`Voidable`] for structs with a `void: Option<VoidInfo>` field.
#[macro_export]
macro_rules! impl_voidable {
    ($($name:ty),+ $(,)?) => {
        $(
            impl $crate::domain::foundation::Voidable for $name {
                fn void_info(&self) -> Option<&$crate::domain::foundation::VoidInfo> {
                    self.void.as_ref()
                }

                fn set_void_info(&mut self, info: Option<$crate::domain::foundation::VoidInfo>) {
                    self.void = info;
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Record {
        void: Option<VoidInfo>,
    }

    crate::impl_voidable!(Record);

    fn info(reason: &str) -> VoidInfo {
        VoidInfo::new(ActingUser::new("admin").unwrap(), reason, Timestamp::from_unix_secs(0))
    }

    #[test]
    fn void_sets_metadata_once() {
        let mut record = Record::default();
        assert!(!record.is_voided());

        assert!(record.void(info("first")));
        assert!(!record.void(info("second")));

        assert_eq!(record.void_info().unwrap().void_reason, "first");
    }
}
