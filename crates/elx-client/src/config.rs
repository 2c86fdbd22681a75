//! Client configuration.

use std::time::Duration;

use crate::tls::TlsPolicy;

/// Connection configuration: target endpoint, certificate trust policy,
/// and the optional per-call deadline.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP.
    pub host: String,
    /// Server SSL port, conventionally 50002.
    pub port: u16,
    /// Certificate trust policy; defaults to [`TlsPolicy::TrustAll`]
    /// because self-signed certificates are the norm for this server
    /// population.
    pub tls: TlsPolicy,
    /// Per-call deadline. `None` (the default) means a call blocks until
    /// the server answers or the connection closes; budget for that when
    /// running without a timeout.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: TlsPolicy::default(),
            timeout: None,
        }
    }

    /// Configuration for one of the well-known servers in
    /// [`elx_protocol::servers`].
    ///
    /// ```
    /// use elx_client::ClientConfig;
    /// let config = ClientConfig::for_server(elx_protocol::servers::BLOCKSTREAM);
    /// assert_eq!(config.port, 50002);
    /// ```
    pub fn for_server((host, port): (&str, u16)) -> Self {
        Self::new(host, port)
    }

    pub fn with_tls_policy(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
