//! Encrypted transport: TCP dial, TLS handshake, and the certificate
//! trust policy.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use elx_protocol::{Error, Result};

/// Certificate trust policy for the server connection.
///
/// Most public Electrum servers present self-signed certificates, so the
/// default is [`TlsPolicy::TrustAll`]. Understand what that buys you: the
/// stream is encrypted, but the peer is **not authenticated**, so a
/// man-in-the-middle can impersonate the server. Use
/// [`TlsPolicy::Validate`] whenever the server has a CA-issued
/// certificate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Accept any certificate the server presents. Encryption without
    /// authentication.
    #[default]
    TrustAll,
    /// Validate the certificate chain against the webpki root store.
    Validate,
}

/// Establish the encrypted connection: DNS, TCP, then the TLS handshake.
/// Each stage maps its failure to [`Error::Connection`].
pub(crate) async fn connect(
    host: &str,
    port: u16,
    policy: TlsPolicy,
) -> Result<TlsStream<TcpStream>> {
    let config = match policy {
        TlsPolicy::TrustAll => rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::NoVerification))
            .with_no_client_auth(),
        TlsPolicy::Validate => {
            let roots = rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            };
            rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth()
        }
    };
    let connector = TlsConnector::from(Arc::new(config));
    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::Connection(format!("tcp connect to {host}:{port} failed: {e}")))?;
    let server_name = ServerName::try_from(host.to_owned())
        .map_err(|e| Error::Connection(format!("invalid server name {host:?}: {e}")))?;
    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| Error::Connection(format!("tls handshake with {host}:{port} failed: {e}")))
}

mod danger {
    use rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, SignatureScheme};

    /// Verifier that accepts every certificate chain and signature.
    #[derive(Debug)]
    pub(super) struct NoVerification;

    impl ServerCertVerifier for NoVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            vec![
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::ECDSA_NISTP384_SHA384,
                SignatureScheme::ED25519,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::RSA_PSS_SHA384,
                SignatureScheme::RSA_PSS_SHA512,
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::RSA_PKCS1_SHA512,
            ]
        }
    }
}
