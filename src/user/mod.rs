mod provisioner;
mod store;

pub use provisioner::upsert;
pub use store::{PgUserStore, UserStore};
#[cfg(test)]
pub(crate) use store::testing;

use serde::{Deserialize, Serialize};

/// Role granted to users provisioned from the directory.
pub const DEFAULT_ROLE: &str = "member";
/// Locale granted to users provisioned from the directory.
pub const DEFAULT_LOCALE: &str = "en";

/// User as saved on database.
/// `email` is the natural key; `first_name` and `username` are the only
/// fields the directory bridge ever writes back. Everything else belongs
/// to the host application.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub role: String,
    pub locale: String,
    pub created_at: chrono::NaiveDate,
}

impl User {
    /// Fresh record for a first-time directory login.
    pub fn provisioned(email: &str, first_name: &str, username: &str) -> Self {
        Self {
            email: email.to_owned(),
            username: username.to_owned(),
            first_name: first_name.to_owned(),
            role: DEFAULT_ROLE.to_owned(),
            locale: DEFAULT_LOCALE.to_owned(),
            created_at: chrono::Utc::now().date_naive(),
        }
    }
}
