use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

pub struct MemoryUserRepo {
    users: DashMap<UserId, User>,
    emails: DashMap<String, UserId>,
    clock: Arc<dyn Clock>,
}

impl MemoryUserRepo {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
            emails: DashMap::new(),
            clock,
        }
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get(&user_id)
            .map(|user| user.value().clone())
            .ok_or(AuthError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        let user_id = self
            .emails
            .get(email)
            .map(|id| *id.value())
            .ok_or(AuthError::NotFound)?;
        self.find_by_id(user_id).await
    }

    async fn add(&self, user: &User) -> Result<(), AuthError> {
        if self.users.contains_key(&user.id) {
            return Err(AuthError::Conflict(format!("user {} already exists", user.id)));
        }
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::Conflict("email already registered".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(())
            }
        }
    }

    async fn update_settings(
        &self,
        user_id: UserId,
        settings: UserSettings,
    ) -> Result<User, AuthError> {
        let mut user = self.users.get_mut(&user_id).ok_or(AuthError::NotFound)?;
        user.settings = settings;
        user.updated_at = self.clock.now();
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::SystemClock;
    use chrono::Utc;

    fn repo() -> MemoryUserRepo {
        MemoryUserRepo::new(Arc::new(SystemClock))
    }

    fn user(email: &str) -> User {
        User::new(
            email.to_string(),
            "Ann".to_string(),
            "$argon2id$stub".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn lookups_miss_with_not_found() {
        let repo = repo();
        assert!(matches!(
            repo.find_by_email("nobody@example.com").await,
            Err(AuthError::NotFound)
        ));
        assert!(matches!(
            repo.find_by_id(UserId::generate()).await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn email_is_unique() {
        let repo = repo();
        repo.add(&user("ann@example.com")).await.unwrap();
        assert!(matches!(
            repo.add(&user("ann@example.com")).await,
            Err(AuthError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_settings_round_trips() {
        let repo = repo();
        let ann = user("ann@example.com");
        repo.add(&ann).await.unwrap();

        let updated = repo
            .update_settings(
                ann.id,
                UserSettings {
                    currency: Currency::Usd,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.settings.currency, Currency::Usd);

        let found = repo.find_by_email("ann@example.com").await.unwrap();
        assert_eq!(found.id, ann.id);
        assert_eq!(found.settings.currency, Currency::Usd);
    }
}
