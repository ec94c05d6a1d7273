//! User directory: profiles and the roles that grant privileges.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteUserStore;
pub use store::{UserError, UserStore};
pub use types::{CreateProfileRequest, Profile, ProfileWithRoles, Role};
