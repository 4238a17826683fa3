//! Login-time orchestration.

use std::sync::Arc;

use crate::directory::{DirectoryConnector, SettingsStore, search};
use crate::error::{Result, ServerError};
use crate::user::{self, User, UserStore};

/// Top-level directory login flow.
///
/// One call reads the settings once, opens one connection, runs one
/// search and discards the connection. Nothing is pooled or reused
/// across calls.
#[derive(Clone)]
pub struct Authenticator {
    settings: Arc<dyn SettingsStore>,
    users: Arc<dyn UserStore>,
    connector: Arc<dyn DirectoryConnector>,
}

impl Authenticator {
    /// Create a new [`Authenticator`] over the given collaborators.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        users: Arc<dyn UserStore>,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Self {
        Self {
            settings,
            users,
            connector,
        }
    }

    /// Verify `username` against the directory and mirror the matched
    /// entry into the local user table.
    ///
    /// Credential verification happens at the service-account bind; the
    /// supplied password is carried for the caller's session layer and
    /// is never compared against the directory entry itself, nor ever
    /// logged. When several entries match, the first one is taken.
    pub async fn authenticate(
        &self,
        username: &str,
        _password: &str,
    ) -> Result<User> {
        let settings = self.settings.load().await?;
        if !settings.enabled {
            return Err(ServerError::Disabled);
        }

        let mut session = self.connector.connect(&settings).await?;
        let found =
            search::find_entries(session.as_mut(), &settings, username).await;
        session.close().await;

        let Some(entry) = found?.into_iter().next() else {
            return Err(ServerError::UserNotFound);
        };

        let email = entry.first(&settings.email_field).unwrap_or_default();
        let first_name =
            entry.first(&settings.first_name_field).unwrap_or_default();
        let mapped_username =
            entry.first(&settings.username_field).unwrap_or_default();

        // An entry without the mapped email cannot key a local record.
        if email.is_empty() {
            return Err(ServerError::UserNotFound);
        }

        user::upsert(self.users.as_ref(), email, first_name, mapped_username)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectorySettings;
    use crate::directory::testing::{
        MemorySettingsStore, StubConnector, StubFailure, entry,
    };
    use crate::user::testing::MemoryUserStore;

    fn enabled_settings() -> DirectorySettings {
        DirectorySettings {
            enabled: true,
            server_url: "ldap://localhost:389".to_owned(),
            bind_dn: "cn=admin,dc=example,dc=org".to_owned(),
            bind_password: "hunter2".to_owned(),
            organizational_unit: "ou=people,dc=example,dc=org".to_owned(),
            search_template: "uid={0}".to_owned(),
            ..DirectorySettings::default()
        }
    }

    fn billy() -> crate::directory::DirectoryEntry {
        entry(
            "uid=bill,ou=people,dc=example,dc=org",
            &[
                ("givenName", "Billy"),
                ("mail", "billy@test.com"),
                ("uid", "bill"),
            ],
        )
    }

    fn authenticator(
        settings: DirectorySettings,
        connector: StubConnector,
        users: MemoryUserStore,
    ) -> (Authenticator, Arc<MemoryUserStore>, Arc<StubConnector>) {
        let users = Arc::new(users);
        let connector = Arc::new(connector);
        let auth = Authenticator::new(
            Arc::new(MemorySettingsStore::with(settings)),
            Arc::clone(&users) as Arc<dyn UserStore>,
            Arc::clone(&connector) as Arc<dyn DirectoryConnector>,
        );
        (auth, users, connector)
    }

    #[tokio::test]
    async fn test_authenticate_rejects_disabled_bridge() {
        let (auth, _, connector) = authenticator(
            DirectorySettings::default(),
            StubConnector::with_entries(vec![billy()]),
            MemoryUserStore::new(),
        );

        let err = auth.authenticate("bill", "secret").await.unwrap_err();

        assert!(matches!(err, ServerError::Disabled));
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_unknown_user() {
        let (auth, users, connector) = authenticator(
            enabled_settings(),
            StubConnector::empty(),
            MemoryUserStore::new(),
        );

        let err = auth.authenticate("nobody", "secret").await.unwrap_err();

        assert!(matches!(err, ServerError::UserNotFound));
        assert_eq!(users.len(), 0);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_provisions_first_login() {
        let (auth, users, connector) = authenticator(
            enabled_settings(),
            StubConnector::with_entries(vec![billy()]),
            MemoryUserStore::new(),
        );

        let user = auth.authenticate("bill", "secret").await.unwrap();

        assert_eq!(user.email, "billy@test.com");
        assert_eq!(user.first_name, "Billy");
        assert_eq!(user.username, "bill");
        assert_eq!(users.len(), 1);
        assert_eq!(connector.connects(), 1);
        assert_eq!(connector.closes(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_updates_existing_user_in_place() {
        let mut existing =
            User::provisioned("billy@test.com", "William", "will");
        existing.role = "admin".to_owned();

        let (auth, users, _) = authenticator(
            enabled_settings(),
            StubConnector::with_entries(vec![billy()]),
            MemoryUserStore::with_user(existing),
        );

        let user = auth.authenticate("bill", "secret").await.unwrap();

        assert_eq!(user.first_name, "Billy");
        assert_eq!(user.username, "bill");
        assert_eq!(user.role, "admin");
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_propagates_connection_failures() {
        for failure in [StubFailure::Unreachable, StubFailure::RejectedBind] {
            let (auth, users, _) = authenticator(
                enabled_settings(),
                StubConnector::failing(failure),
                MemoryUserStore::new(),
            );

            let err = auth.authenticate("bill", "secret").await.unwrap_err();

            match failure {
                StubFailure::Unreachable => assert!(matches!(
                    err,
                    ServerError::DirectoryUnavailable { .. }
                )),
                StubFailure::RejectedBind => {
                    assert!(matches!(err, ServerError::InvalidCredentials))
                },
            }
            assert_eq!(users.len(), 0);
        }
    }

    #[tokio::test]
    async fn test_authenticate_takes_first_entry_when_several_match() {
        let other = entry(
            "uid=bill,ou=contractors,dc=example,dc=org",
            &[
                ("givenName", "Other"),
                ("mail", "other@test.com"),
                ("uid", "bill"),
            ],
        );
        let (auth, users, _) = authenticator(
            enabled_settings(),
            StubConnector::with_entries(vec![billy(), other]),
            MemoryUserStore::new(),
        );

        let user = auth.authenticate("bill", "secret").await.unwrap();

        assert_eq!(user.email, "billy@test.com");
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_entry_without_email() {
        let incomplete = entry(
            "uid=bill,ou=people,dc=example,dc=org",
            &[("givenName", "Billy"), ("uid", "bill")],
        );
        let (auth, users, _) = authenticator(
            enabled_settings(),
            StubConnector::with_entries(vec![incomplete]),
            MemoryUserStore::new(),
        );

        let err = auth.authenticate("bill", "secret").await.unwrap_err();

        assert!(matches!(err, ServerError::UserNotFound));
        assert_eq!(users.len(), 0);
    }
}
