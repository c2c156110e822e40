//! Authorization rules as pure predicates over (caller, target).

use crate::{error::ApiError, users::repo_types::User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Read,
    Update,
    Delete,
}

impl UserAction {
    fn denial(self) -> &'static str {
        match self {
            UserAction::Read => "Not authorized to access this user's details",
            UserAction::Update => "Not authorized to update this user",
            UserAction::Delete => "Not authorized to delete this user",
        }
    }
}

/// Accounts are only managed by their owner.
pub fn can_manage(caller: &User, target_id: i64) -> bool {
    caller.id == target_id
}

/// Any authenticated user may list accounts.
// TODO: restrict to `caller.is_superuser` once an admin role is introduced.
pub fn can_list_users(_caller: &User) -> bool {
    true
}

pub fn ensure_can_manage(
    caller: &User,
    target_id: i64,
    action: UserAction,
) -> Result<(), ApiError> {
    if can_manage(caller, target_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(action.denial().into()))
    }
}
