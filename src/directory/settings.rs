//! Directory connection settings and their save-time validation.

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

use crate::directory::{DirectoryConnector, SettingsStore};
use crate::error::{Result, ServerError};

/// Placeholder substituted with the login identifier.
pub(crate) const PLACEHOLDER: &str = "{0}";

/// How the connection is secured before binding.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "tls_mode", rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connection, no TLS upgrade.
    #[default]
    Off,
    /// Upgrade the connection to TLS before the bind.
    StartTls,
}

/// Whether the server certificate must chain to a trusted root.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "certificate_validation", rename_all = "lowercase")]
pub enum CertificateValidation {
    /// Reject untrusted certificates.
    #[default]
    Required,
    /// Accept any certificate. Certificate files are ignored.
    Ignored,
}

/// Administrator-managed configuration of the directory bridge.
///
/// One row per deployment. `bind_password` is the service-account
/// credential and is never exposed back to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct DirectorySettings {
    /// Whether directory logins are active.
    pub enabled: bool,
    /// Directory endpoint, e.g. `ldap://host:389`.
    pub server_url: String,
    /// Distinguished name the service account binds as.
    pub bind_dn: String,
    /// Service-account credential.
    pub bind_password: String,
    /// Search root for user lookups.
    pub organizational_unit: String,
    /// Filter pattern carrying one `{0}` placeholder at its end.
    pub search_template: String,
    /// Directory attribute mapped to the local email.
    pub email_field: String,
    /// Directory attribute mapped to the local username.
    pub username_field: String,
    /// Directory attribute mapped to the local first name.
    pub first_name_field: String,
    /// TLS upgrade mode.
    pub tls_mode: TlsMode,
    /// Server certificate trust policy.
    pub certificate_validation: CertificateValidation,
    /// Extra root certificates, PEM.
    pub ca_certs_file: Option<String>,
    /// Client certificate, PEM. Paired with `private_key_file`.
    pub server_cert_file: Option<String>,
    /// Client private key, PKCS#8 PEM. Paired with `server_cert_file`.
    pub private_key_file: Option<String>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            organizational_unit: String::new(),
            search_template: String::new(),
            email_field: "mail".to_owned(),
            username_field: "uid".to_owned(),
            first_name_field: "givenName".to_owned(),
            tls_mode: TlsMode::default(),
            certificate_validation: CertificateValidation::default(),
            ca_certs_file: None,
            server_cert_file: None,
            private_key_file: None,
        }
    }
}

impl DirectorySettings {
    /// Check the settings before they are persisted.
    ///
    /// A blank template is tolerated while the bridge stays disabled, so
    /// an administrator can reset the configuration without fighting the
    /// validator.
    pub fn validate(&self) -> Result<()> {
        let resetting = !self.enabled && self.search_template.is_empty();
        if !resetting && !has_single_trailing_placeholder(&self.search_template)
        {
            return Err(ServerError::InvalidSearchTemplate);
        }

        if self.enabled {
            for (name, value) in [
                ("email_field", &self.email_field),
                ("username_field", &self.username_field),
                ("first_name_field", &self.first_name_field),
            ] {
                if value.is_empty() {
                    return Err(missing_mapping(name).into());
                }
            }
        }

        Ok(())
    }

    /// Directory attributes a user search asks for, in mapping order.
    pub fn mapped_attributes(&self) -> Vec<String> {
        vec![
            self.first_name_field.clone(),
            self.email_field.clone(),
            self.username_field.clone(),
        ]
    }
}

fn has_single_trailing_placeholder(template: &str) -> bool {
    template.ends_with(PLACEHOLDER)
        && template.matches(PLACEHOLDER).count() == 1
}

fn missing_mapping(field: &'static str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        field,
        ValidationError::new("required")
            .with_message("Field mapping must name a directory attribute.".into()),
    );
    errors
}

/// Validate `settings`, probe the directory when enabling, then save.
///
/// The probe binds with the stored service account and whatever it
/// raises propagates unchanged, leaving the stored settings untouched.
/// A configuration that cannot reach its server can therefore never be
/// saved enabled.
pub async fn persist(
    connector: &dyn DirectoryConnector,
    store: &dyn SettingsStore,
    settings: DirectorySettings,
) -> Result<DirectorySettings> {
    settings.validate()?;

    if settings.enabled {
        let mut session = connector.connect(&settings).await?;
        session.close().await;
    }

    store.save(&settings).await?;
    Ok(settings)
}
