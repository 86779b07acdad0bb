//! In-process identity locker.
//!
//! One async mutex per identity id. Only serialises callers inside this
//! process; a multi-node deployment needs a database-backed locker.
//!
//! # Panics
//!
//! Uses `.expect()` on the registry mutex, which panics if it is poisoned.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::domain::foundation::{DomainError, ErrorCode, PersonId};
use crate::ports::{IdentityLease, IdentityLocker};

pub struct KeyedIdentityLocker {
    locks: Mutex<HashMap<PersonId, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

impl KeyedIdentityLocker {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn slot(&self, id: PersonId) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .expect("KeyedIdentityLocker: registry lock poisoned");
        // Held and awaited slots have clones outstanding.
        locks.retain(|_, slot| Arc::strong_count(slot) > 1);
        locks.entry(id).or_default().clone()
    }
}

impl Default for KeyedIdentityLocker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl IdentityLocker for KeyedIdentityLocker {
    async fn lock(&self, ids: &[PersonId]) -> Result<IdentityLease, DomainError> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards: Vec<Box<dyn Send + Sync>> = Vec::with_capacity(ordered.len());
        for id in &ordered {
            let slot = self.slot(*id);
            match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
                Ok(guard) => {
                    debug!(person_id = %id, "Identity locked");
                    guards.push(Box::new(guard));
                }
                Err(_) => {
                    warn!(person_id = %id, timeout = ?self.timeout, "Timed out waiting for identity lock");
                    return Err(DomainError::new(
                        ErrorCode::LockUnavailable,
                        format!("Identity {} is locked by another operation", id),
                    )
                    .with_detail("person_id", id.to_string()));
                }
            }
        }

        Ok(IdentityLease::new(ordered, guards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lease_holds_ids_in_ascending_order() {
        let locker = KeyedIdentityLocker::default();
        let a = PersonId::new();
        let b = PersonId::new();

        let lease = locker.lock(&[a, b, a]).await.unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(lease.ids(), expected.as_slice());
    }

    #[tokio::test]
    async fn second_lock_times_out_while_first_is_held() {
        let locker = KeyedIdentityLocker::new(Duration::from_millis(20));
        let id = PersonId::new();
        let _held = locker.lock(&[id]).await.unwrap();

        let err = locker.lock(&[id]).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::LockUnavailable);
        assert_eq!(err.detail("person_id"), Some(id.to_string().as_str()));
    }

    #[tokio::test]
    async fn dropping_lease_releases_ids() {
        let locker = KeyedIdentityLocker::new(Duration::from_millis(20));
        let id = PersonId::new();

        drop(locker.lock(&[id]).await.unwrap());

        assert!(locker.lock(&[id]).await.is_ok());
    }

    #[tokio::test]
    async fn opposite_orders_do_not_deadlock() {
        let locker = Arc::new(KeyedIdentityLocker::new(Duration::from_secs(2)));
        let a = PersonId::new();
        let b = PersonId::new();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let locker = Arc::clone(&locker);
            let ids = if i % 2 == 0 { [a, b] } else { [b, a] };
            tasks.push(tokio::spawn(async move {
                let _lease = locker.lock(&ids).await?;
                tokio::task::yield_now().await;
                Ok::<_, DomainError>(())
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }
    }
}
