//! LDAP connection construction.
//!
//! Compiled out when the `ldap` feature is disabled; the replacement
//! connector reports the missing capability instead of failing late at
//! bind time.

#[cfg(feature = "ldap")]
mod connector {
    use std::fs;
    use std::time::Duration;

    use async_trait::async_trait;
    use ldap3::{
        Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry,
    };
    use native_tls::{Certificate, Identity, TlsConnector};

    use crate::directory::{
        CertificateValidation, DirectoryConnector, DirectoryEntry,
        DirectorySession, DirectorySettings, TlsMode,
    };
    use crate::error::{Result, ServerError};

    /// invalidCredentials result code, RFC 4511.
    const RC_INVALID_CREDENTIALS: u32 = 49;

    /// Network timeout for the initial connection.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// [`DirectoryConnector`] backed by the `ldap3` client.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct LdapConnector;

    impl LdapConnector {
        /// Create a new [`LdapConnector`].
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl DirectoryConnector for LdapConnector {
        async fn connect(
            &self,
            settings: &DirectorySettings,
        ) -> Result<Box<dyn DirectorySession>> {
            let policy = build_transport_policy(settings)?;
            let conn_settings = LdapConnSettings::new()
                .set_conn_timeout(CONNECT_TIMEOUT)
                .set_starttls(policy.starttls)
                .set_connector(policy.tls);

            let (conn, mut ldap) = LdapConnAsync::with_settings(
                conn_settings,
                &settings.server_url,
            )
            .await
            .map_err(unavailable)?;
            ldap3::drive!(conn);

            ldap.simple_bind(&settings.bind_dn, &settings.bind_password)
                .await
                .map_err(bind_failure)?
                .success()
                .map_err(bind_failure)?;

            Ok(Box::new(LdapSession { ldap }))
        }
    }

    /// Transport decisions derived from the settings: whether to
    /// upgrade the connection with StartTLS before binding, and the
    /// trust policy for the TLS handshake.
    struct TransportPolicy {
        starttls: bool,
        tls: TlsConnector,
    }

    fn build_transport_policy(
        settings: &DirectorySettings,
    ) -> Result<TransportPolicy> {
        Ok(TransportPolicy {
            starttls: settings.tls_mode == TlsMode::StartTls,
            tls: build_tls_policy(settings)?,
        })
    }

    /// TLS policy for the configured trust mode.
    ///
    /// With validation required, the optional extra root and the client
    /// identity are loaded from the configured files; certificate and
    /// key only come as a pair. With validation ignored, any server
    /// certificate is accepted and the files play no part.
    fn build_tls_policy(settings: &DirectorySettings) -> Result<TlsConnector> {
        let mut builder = TlsConnector::builder();

        match settings.certificate_validation {
            CertificateValidation::Required => {
                if let Some(path) = &settings.ca_certs_file {
                    let cert = Certificate::from_pem(&read_pem(path)?)
                        .map_err(tls_failure)?;
                    builder.add_root_certificate(cert);
                }

                match (&settings.server_cert_file, &settings.private_key_file)
                {
                    (Some(cert), Some(key)) => {
                        let identity = Identity::from_pkcs8(
                            &read_pem(cert)?,
                            &read_pem(key)?,
                        )
                        .map_err(tls_failure)?;
                        builder.identity(identity);
                    },
                    (None, None) => {},
                    _ => {
                        return Err(ServerError::DirectoryUnavailable {
                            details: "server_cert_file and private_key_file \
                                      must be configured together"
                                .to_owned(),
                        });
                    },
                }
            },
            CertificateValidation::Ignored => {
                builder.danger_accept_invalid_certs(true);
            },
        }

        builder.build().map_err(tls_failure)
    }

    fn read_pem(path: &str) -> Result<Vec<u8>> {
        fs::read(path).map_err(|err| ServerError::DirectoryUnavailable {
            details: format!("cannot read {path}: {err}"),
        })
    }

    fn tls_failure(err: native_tls::Error) -> ServerError {
        ServerError::DirectoryUnavailable {
            details: err.to_string(),
        }
    }

    fn unavailable(err: LdapError) -> ServerError {
        ServerError::DirectoryUnavailable {
            details: err.to_string(),
        }
    }

    /// A rejected bind is an authentication failure; everything else
    /// means the server could not complete the handshake.
    fn bind_failure(err: LdapError) -> ServerError {
        match &err {
            LdapError::LdapResult { result }
                if result.rc == RC_INVALID_CREDENTIALS =>
            {
                ServerError::InvalidCredentials
            },
            _ => unavailable(err),
        }
    }

    struct LdapSession {
        ldap: Ldap,
    }

    #[async_trait]
    impl DirectorySession for LdapSession {
        async fn search(
            &mut self,
            base: &str,
            filter: &str,
            attributes: &[String],
        ) -> Result<Vec<DirectoryEntry>> {
            let (entries, _) = self
                .ldap
                .search(base, Scope::Subtree, filter, attributes.to_vec())
                .await
                .map_err(unavailable)?
                .success()
                .map_err(unavailable)?;

            Ok(entries
                .into_iter()
                .map(SearchEntry::construct)
                .map(|entry| DirectoryEntry {
                    dn: entry.dn,
                    attributes: entry.attrs,
                })
                .collect())
        }

        async fn close(&mut self) {
            if let Err(err) = self.ldap.unbind().await {
                tracing::debug!(%err, "failed to unbind ldap connection");
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn validating_settings() -> DirectorySettings {
            DirectorySettings {
                certificate_validation: CertificateValidation::Required,
                ..DirectorySettings::default()
            }
        }

        #[test]
        fn test_transport_policy_enables_starttls_when_configured() {
            let settings = DirectorySettings {
                tls_mode: TlsMode::StartTls,
                ..DirectorySettings::default()
            };
            assert!(build_transport_policy(&settings).unwrap().starttls);
        }

        #[test]
        fn test_transport_policy_skips_starttls_by_default() {
            let policy =
                build_transport_policy(&DirectorySettings::default()).unwrap();
            assert!(!policy.starttls);
        }

        #[test]
        fn test_tls_policy_builds_without_certificate_files() {
            assert!(build_tls_policy(&validating_settings()).is_ok());
        }

        #[test]
        fn test_tls_policy_ignores_files_when_validation_is_off() {
            let settings = DirectorySettings {
                certificate_validation: CertificateValidation::Ignored,
                ca_certs_file: Some("/nonexistent/ca.pem".to_owned()),
                server_cert_file: Some("/nonexistent/cert.pem".to_owned()),
                private_key_file: Some("/nonexistent/key.pem".to_owned()),
                ..DirectorySettings::default()
            };
            assert!(build_tls_policy(&settings).is_ok());
        }

        #[test]
        fn test_tls_policy_reports_unreadable_root_certificate() {
            let settings = DirectorySettings {
                ca_certs_file: Some("/nonexistent/ca.pem".to_owned()),
                ..validating_settings()
            };
            assert!(matches!(
                build_tls_policy(&settings),
                Err(ServerError::DirectoryUnavailable { .. })
            ));
        }

        #[test]
        fn test_tls_policy_loads_identity_pair_when_validating() {
            let settings = DirectorySettings {
                server_cert_file: Some("/nonexistent/cert.pem".to_owned()),
                private_key_file: Some("/nonexistent/key.pem".to_owned()),
                ..validating_settings()
            };

            // Reaching the certificate read proves the pair is honored.
            match build_tls_policy(&settings) {
                Err(ServerError::DirectoryUnavailable { details }) => {
                    assert!(details.contains("/nonexistent/cert.pem"));
                },
                _ => panic!("expected the identity files to be read"),
            }
        }

        #[test]
        fn test_tls_policy_rejects_lone_client_certificate() {
            for (cert, key) in [
                (Some("/nonexistent/cert.pem".to_owned()), None),
                (None, Some("/nonexistent/key.pem".to_owned())),
            ] {
                let settings = DirectorySettings {
                    server_cert_file: cert,
                    private_key_file: key,
                    ..validating_settings()
                };
                assert!(matches!(
                    build_tls_policy(&settings),
                    Err(ServerError::DirectoryUnavailable { .. })
                ));
            }
        }

        #[tokio::test]
        async fn test_connect_reports_unreachable_server() {
            let settings = DirectorySettings {
                server_url: "ldap://127.0.0.1:1".to_owned(),
                ..DirectorySettings::default()
            };

            let err = LdapConnector::new()
                .connect(&settings)
                .await
                .map(|_| ())
                .unwrap_err();

            assert!(matches!(
                err,
                ServerError::DirectoryUnavailable { .. }
            ));
        }
    }
}

#[cfg(not(feature = "ldap"))]
mod connector {
    use async_trait::async_trait;

    use crate::directory::{
        DirectoryConnector, DirectorySession, DirectorySettings,
    };
    use crate::error::{Result, ServerError};

    /// Stand-in connector for builds without LDAP support.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct LdapConnector;

    impl LdapConnector {
        /// Create a new [`LdapConnector`].
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl DirectoryConnector for LdapConnector {
        async fn connect(
            &self,
            _settings: &DirectorySettings,
        ) -> Result<Box<dyn DirectorySession>> {
            Err(ServerError::LibraryUnavailable)
        }
    }

}

pub use connector::LdapConnector;
