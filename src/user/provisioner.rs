//! Mirrors directory identities into the local user table.

use crate::error::{Result, ServerError};
use crate::user::{User, UserStore};

/// Create or refresh the local record for a directory identity.
///
/// Only the directory-mapped fields (`username`, `first_name`, keyed by
/// `email`) are written. Everything else on an existing record, roles
/// included, is left alone. Two concurrent first logins may both try to
/// insert; the loser falls back to the update path.
pub async fn upsert(
    store: &dyn UserStore,
    email: &str,
    first_name: &str,
    username: &str,
) -> Result<User> {
    if store.exists(email).await? {
        return update(store, email, first_name, username).await;
    }

    let user = User::provisioned(email, first_name, username);
    match store.create(&user).await {
        Ok(created) => Ok(created),
        Err(ServerError::AlreadyExists) => {
            tracing::debug!(%email, "lost insert race, updating instead");
            update(store, email, first_name, username).await
        },
        Err(err) => Err(err),
    }
}

async fn update(
    store: &dyn UserStore,
    email: &str,
    first_name: &str,
    username: &str,
) -> Result<User> {
    let Some(mut user) = store.get_by_email(email).await? else {
        return Err(ServerError::Internal {
            details: format!("user {email} vanished during provisioning"),
            source: None,
        });
    };

    user.first_name = first_name.to_owned();
    user.username = username.to_owned();
    store.save(&user).await?;

    Ok(user)
}
