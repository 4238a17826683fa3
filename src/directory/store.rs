//! Directory settings persistence boundary.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::directory::DirectorySettings;
use crate::error::Result;

/// Port for reading and writing the single [`DirectorySettings`] row.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings. A deployment that never configured the bridge
    /// gets the disabled defaults.
    async fn load(&self) -> Result<DirectorySettings>;

    /// Replace the stored settings.
    async fn save(&self, settings: &DirectorySettings) -> Result<()>;
}

/// PostgreSQL implementation of [`SettingsStore`].
///
/// The table holds at most one row, keyed by a constant.
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    /// Create a new [`PgSettingsStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn load(&self) -> Result<DirectorySettings> {
        let settings = sqlx::query_as::<_, DirectorySettings>(
            r#"SELECT enabled, server_url, bind_dn, bind_password,
                    organizational_unit, search_template, email_field,
                    username_field, first_name_field, tls_mode,
                    certificate_validation, ca_certs_file, server_cert_file,
                    private_key_file
                FROM directory_settings"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    async fn save(&self, settings: &DirectorySettings) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO directory_settings (
                    id, enabled, server_url, bind_dn, bind_password,
                    organizational_unit, search_template, email_field,
                    username_field, first_name_field, tls_mode,
                    certificate_validation, ca_certs_file, server_cert_file,
                    private_key_file
                ) VALUES (
                    TRUE, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14
                )
                ON CONFLICT (id) DO UPDATE SET
                    enabled = EXCLUDED.enabled,
                    server_url = EXCLUDED.server_url,
                    bind_dn = EXCLUDED.bind_dn,
                    bind_password = EXCLUDED.bind_password,
                    organizational_unit = EXCLUDED.organizational_unit,
                    search_template = EXCLUDED.search_template,
                    email_field = EXCLUDED.email_field,
                    username_field = EXCLUDED.username_field,
                    first_name_field = EXCLUDED.first_name_field,
                    tls_mode = EXCLUDED.tls_mode,
                    certificate_validation = EXCLUDED.certificate_validation,
                    ca_certs_file = EXCLUDED.ca_certs_file,
                    server_cert_file = EXCLUDED.server_cert_file,
                    private_key_file = EXCLUDED.private_key_file"#,
        )
        .bind(settings.enabled)
        .bind(&settings.server_url)
        .bind(&settings.bind_dn)
        .bind(&settings.bind_password)
        .bind(&settings.organizational_unit)
        .bind(&settings.search_template)
        .bind(&settings.email_field)
        .bind(&settings.username_field)
        .bind(&settings.first_name_field)
        .bind(settings.tls_mode)
        .bind(settings.certificate_validation)
        .bind(&settings.ca_certs_file)
        .bind(&settings.server_cert_file)
        .bind(&settings.private_key_file)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
