use tracing::{debug, warn};

use crate::{
    auth::password::verify_password,
    error::StoreError,
    users::{repo::UserRepository, repo_types::User},
};

/// Returns the user iff the email exists and the password matches. Both
/// failure modes yield `None` so callers cannot tell them apart.
pub async fn authenticate(
    users: &UserRepository,
    email: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    let Some(user) = users.get_by_email(email).await? else {
        debug!("authenticate: unknown email");
        return Ok(None);
    };
    if !verify_password(password, &user.hashed_password) {
        warn!(user_id = user.id, "authenticate: password mismatch");
        return Ok(None);
    }
    Ok(Some(user))
}
