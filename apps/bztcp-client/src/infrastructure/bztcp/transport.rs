//! Transport Adapters
//!
//! Opens the duplex byte stream a session runs over: plain TCP or TLS over
//! TCP, both bounded by the connect timeout.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use socket2::SockRef;
use tokio::io::DuplexStream;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::error::{ClientError, Result};
use crate::application::ports::Transport;

/// Type-erased transport returned by [`dial`].
pub type BoxedTransport = Box<dyn Transport>;

impl Transport for TcpStream {
    fn set_keepalive(&self, enabled: bool) -> io::Result<()> {
        SockRef::from(self).set_keepalive(enabled)
    }
}

impl Transport for TlsStream<TcpStream> {
    fn set_keepalive(&self, enabled: bool) -> io::Result<()> {
        self.get_ref().0.set_keepalive(enabled)
    }
}

impl Transport for DuplexStream {}

impl Transport for BoxedTransport {
    fn set_keepalive(&self, enabled: bool) -> io::Result<()> {
        (**self).set_keepalive(enabled)
    }
}

/// Open a connection to `addr` (`host:port`), optionally wrapped in TLS.
///
/// The timeout covers the TCP connect and, when enabled, the TLS handshake.
///
/// # Errors
///
/// Returns `ConnectTimeout` when the deadline passes, `Tls` for an invalid
/// server name or TLS setup failure, or the underlying I/O error.
pub async fn dial(addr: &str, tls: bool, timeout: Duration) -> Result<BoxedTransport> {
    tokio::time::timeout(timeout, open(addr, tls))
        .await
        .map_err(|_| ClientError::ConnectTimeout(timeout))?
}

async fn open(addr: &str, tls: bool) -> Result<BoxedTransport> {
    let tcp = TcpStream::connect(addr).await?;
    tcp.set_nodelay(true)?;
    tracing::debug!(addr, tls, "TCP connection established");

    if !tls {
        return Ok(Box::new(tcp));
    }

    let server_name = ServerName::try_from(host_of(addr).to_string())
        .map_err(|e| ClientError::Tls(format!("invalid server name: {e}")))?;
    let stream = tls_connector()?.connect(server_name, tcp).await?;
    tracing::debug!(addr, "TLS handshake complete");
    Ok(Box::new(stream))
}

fn tls_connector() -> Result<TlsConnector> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Host part of a `host:port` address, without IPv6 brackets.
#[must_use]
pub fn host_of(addr: &str) -> &str {
    let host = match addr.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => addr,
    };
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use tokio::net::TcpListener;

    #[test_case("tcp-v1.benzinga.io:11337" => "tcp-v1.benzinga.io"; "hostname")]
    #[test_case("127.0.0.1:443" => "127.0.0.1"; "ipv4")]
    #[test_case("[::1]:443" => "::1"; "ipv6")]
    #[test_case("example.com" => "example.com"; "no port")]
    fn host_extraction(addr: &str) -> &str {
        host_of(addr)
    }

    #[tokio::test]
    async fn dial_plain_tcp_and_toggle_keepalive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let transport = dial(&addr, false, Duration::from_secs(5)).await.unwrap();
        transport.set_keepalive(true).unwrap();
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn dial_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = dial(&addr, false, Duration::from_secs(5)).await.err().expect("dial should fail");
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
