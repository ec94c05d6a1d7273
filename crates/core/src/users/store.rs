//! User directory storage trait.

use thiserror::Error;

use super::{CreateProfileRequest, Profile, ProfileWithRoles, Role};

/// Error type for user directory operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for profile and role storage.
pub trait UserStore: Send + Sync {
    /// Register a new profile. Fails if the user id is taken.
    fn create_profile(&self, request: &CreateProfileRequest) -> Result<Profile, UserError>;

    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, UserError>;

    /// All profiles, newest first, each with its admin flag.
    fn list_profiles(&self) -> Result<Vec<ProfileWithRoles>, UserError>;

    /// Remove a profile together with all of its roles.
    fn delete_profile(&self, user_id: &str) -> Result<Profile, UserError>;

    /// Grant `role`. Returns false if the user already had it.
    fn grant_role(&self, user_id: &str, role: Role) -> Result<bool, UserError>;

    /// Revoke `role`. Returns false if the user did not have it.
    fn revoke_role(&self, user_id: &str, role: Role) -> Result<bool, UserError>;

    fn has_role(&self, user_id: &str, role: Role) -> Result<bool, UserError>;
}
