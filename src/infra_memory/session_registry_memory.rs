use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

pub struct MemorySessionRegistry {
    records: DashMap<TokenId, RefreshSessionRecord>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemorySessionRegistry {
            records: DashMap::new(),
            clock,
        }
    }

    /// Total records held, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionRegistry for MemorySessionRegistry {
    async fn add(&self, record: RefreshSessionRecord) -> Result<(), AuthError> {
        match self.records.entry(record.token_id) {
            Entry::Occupied(_) => Err(AuthError::Conflict(format!(
                "refresh token {} already recorded",
                record.token_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn exists(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        Ok(self
            .records
            .get(&binding.token_id)
            .is_some_and(|record| record.matches(binding)))
    }

    async fn consume(&self, binding: &SessionBinding<'_>) -> Result<bool, AuthError> {
        Ok(self
            .records
            .remove_if(&binding.token_id, |_, record| record.matches(binding))
            .is_some())
    }

    async fn delete(&self, token_id: TokenId) -> Result<(), AuthError> {
        self.records.remove(&token_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<(), AuthError> {
        self.records.retain(|_, record| record.user_id != user_id);
        Ok(())
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<usize, AuthError> {
        // Runs on every issuance, so expired records of every user go here.
        let now = self.clock.now();
        self.records.retain(|_, record| record.expires_at > now);
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .count())
    }
}
