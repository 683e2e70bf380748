use std::sync::Arc;

use log::info;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Role, Session, UserProfile, USERS};
use crate::store::{get_as, to_fields, DocumentStore, Fields};

/// User profiles stored next to the identity provider's accounts.
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the profile on first sign-in; an existing profile is returned as is.
    pub async fn ensure_profile(&self, user_id: &str, email: &str, display_name: &str) -> Result<UserProfile> {
        if let Some(doc) = self.store.get(USERS, user_id).await? {
            return doc.decode();
        }

        let profile = UserProfile {
            id: user_id.to_string(),
            email: email.trim().to_string(),
            display_name: display_name.trim().to_string(),
            role: Role::User,
            liked_songs: Vec::new(),
        };
        self.store.set(USERS, user_id, to_fields(&profile)?).await?;
        info!("Created profile for {}", user_id);
        Ok(profile)
    }

    pub async fn get(&self, user_id: &str) -> Result<UserProfile> {
        get_as(self.store.as_ref(), USERS, user_id).await
    }

    /// Build the caller context from the stored role; unknown users are plain users.
    pub async fn session_for(&self, user_id: &str) -> Result<Session> {
        let role = match self.store.get(USERS, user_id).await? {
            Some(doc) => doc.decode::<UserProfile>()?.role,
            None => Role::User,
        };
        Ok(Session { user_id: user_id.to_string(), role })
    }

    pub async fn set_role(&self, session: &Session, user_id: &str, role: Role) -> Result<UserProfile> {
        require_admin(session)?;

        let mut fields = Fields::new();
        fields.insert("role".to_string(), serde_json::to_value(role)?);
        self.store.update(USERS, user_id, fields).await?;

        info!("{} set role of {} to {:?}", session.user_id, user_id, role);
        self.get(user_id).await
    }

    pub async fn rename(&self, session: &Session, display_name: &str) -> Result<UserProfile> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation("display name cannot be empty".to_string()));
        }

        let mut fields = Fields::new();
        fields.insert("displayName".to_string(), Value::from(display_name));
        self.store.update(USERS, &session.user_id, fields).await?;
        self.get(&session.user_id).await
    }
}

pub fn require_admin(session: &Session) -> Result<()> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!("{} is not an admin", session.user_id)))
    }
}
