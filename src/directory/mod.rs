//! Directory-backed authentication.
//!
//! Settings describe how to reach the LDAP server, the client opens and
//! binds connections, the searcher resolves login identifiers to entries
//! and [`Authenticator`] ties it all together.

mod auth;
mod client;
mod search;
mod settings;
mod store;

pub use auth::Authenticator;
pub use client::LdapConnector;
pub use settings::{CertificateValidation, DirectorySettings, TlsMode, persist};
pub use store::{PgSettingsStore, SettingsStore};

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// One entry returned by a directory search.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute values, keyed by attribute name.
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of `attribute`, if the entry carries one.
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Opens authenticated sessions against a directory server.
///
/// Implemented by [`LdapConnector`] in production and by stubs in tests.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connect to the server described by `settings` and bind with its
    /// service account.
    async fn connect(
        &self,
        settings: &DirectorySettings,
    ) -> Result<Box<dyn DirectorySession>>;
}

/// A bound directory connection.
#[async_trait]
pub trait DirectorySession: Send {
    /// Subtree search under `base`.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>>;

    /// Release the connection. Failures are logged, not surfaced.
    async fn close(&mut self);
}
