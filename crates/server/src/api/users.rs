//! User directory handlers (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use queue_buddy_core::{
    AuditEvent, CreateProfileRequest, Profile, ProfileWithRoles, Role, UserError,
};
use serde::Serialize;
use std::sync::Arc;

use super::handlers::{api_error, ApiError};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Result of granting or revoking the admin role
#[derive(Debug, Serialize)]
pub struct RoleChangeResponse {
    pub user_id: String,
    pub is_admin: bool,
    /// False when the user already had the requested state.
    pub changed: bool,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProfileWithRoles>>, ApiError> {
    state
        .users()
        .list_profiles()
        .map(Json)
        .map_err(user_error)
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Json(body): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let request = CreateProfileRequest {
        user_id: body.user_id.trim().to_string(),
        email: body.email.trim().to_string(),
    };
    if request.user_id.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "user_id must not be empty"));
    }
    if !request.email.contains('@') {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid email address"));
    }

    let profile = state.users().create_profile(&request).map_err(user_error)?;

    state.audit().try_emit(AuditEvent::UserCreated {
        target_user_id: profile.user_id.clone(),
        email: profile.email.clone(),
        created_by: actor,
    });

    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    reject_self(&actor, &user_id)?;

    let profile = state.users().delete_profile(&user_id).map_err(user_error)?;

    state.audit().try_emit(AuditEvent::UserDeleted {
        target_user_id: user_id,
        deleted_by: actor,
    });

    Ok(Json(profile))
}

pub async fn grant_admin(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    let changed = state
        .users()
        .grant_role(&user_id, Role::Admin)
        .map_err(user_error)?;

    if changed {
        state.audit().try_emit(AuditEvent::AdminRoleGranted {
            target_user_id: user_id.clone(),
            granted_by: actor,
        });
    }

    Ok(Json(RoleChangeResponse {
        user_id,
        is_admin: true,
        changed,
    }))
}

pub async fn revoke_admin(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    reject_self(&actor, &user_id)?;

    if state
        .users()
        .get_profile(&user_id)
        .map_err(user_error)?
        .is_none()
    {
        return Err(user_error(UserError::NotFound(user_id)));
    }

    let changed = state
        .users()
        .revoke_role(&user_id, Role::Admin)
        .map_err(user_error)?;

    if changed {
        state.audit().try_emit(AuditEvent::AdminRoleRevoked {
            target_user_id: user_id.clone(),
            revoked_by: actor,
        });
    }

    Ok(Json(RoleChangeResponse {
        user_id,
        is_admin: false,
        changed,
    }))
}

/// Admins may not delete or demote themselves.
fn reject_self(actor: &str, target: &str) -> Result<(), ApiError> {
    if actor == target {
        return Err(api_error(
            StatusCode::CONFLICT,
            "Cannot change your own account",
        ));
    }
    Ok(())
}

fn user_error(e: UserError) -> ApiError {
    let status = match e {
        UserError::NotFound(_) => StatusCode::NOT_FOUND,
        UserError::AlreadyExists(_) => StatusCode::CONFLICT,
        UserError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}
