/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wirehttp, a byte-exact HTTP client engine.
 *
 * Wirehttp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wirehttp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wirehttp.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Transport: the `Connector` seam, and the production TCP/TLS connector.
//!
//! A connection is plain or secure; when a proxy chain is configured the TCP connection goes
//! to the first hop and the chain negotiator tunnels through to the target before any TLS
//! handshake.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, RootCertStore, SupportedProtocolVersion};
use tokio_rustls::TlsConnector;

use crate::config::{ProxySpec, SslVersion};
use crate::error::ClientError;
use crate::protocol::http::proxy::{HttpConnectChain, ProxyChainNegotiator};

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub ssl_version: SslVersion,
    /// Ordered hops; the TCP connection goes to the first one.
    pub proxies: Vec<ProxySpec>,
    pub local_host: Option<String>,
    pub local_port: Option<u16>,
}

impl ConnectTarget {
    /// Host and port of the first TCP hop.
    pub fn dial_addr(&self) -> (&str, u16) {
        match self.proxies.first() {
            Some(p) => (&p.host, p.port),
            None => (&self.host, self.port),
        }
    }
}

/// Opens transport streams. Timeouts are applied by the caller.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `target`. Plain I/O failures come back as `ClientError::Io` so the caller
    /// can classify refusal and timeout.
    async fn connect(&self, target: &ConnectTarget) -> Result<Self::Stream, ClientError>;
}

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// TLS client config for HTTP/1.1 (ALPN `http/1.1`), pinned to the requested version.
pub fn tls_client_config(version: SslVersion) -> Arc<ClientConfig> {
    let versions: &[&'static SupportedProtocolVersion] = match version {
        SslVersion::Auto => rustls::DEFAULT_VERSIONS,
        SslVersion::Tls12 => &[&rustls::version::TLS12],
        SslVersion::Tls13 => &[&rustls::version::TLS13],
    };
    let mut config = ClientConfig::builder_with_protocol_versions(versions)
        .with_root_certificates(build_root_store())
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Arc::new(config)
}

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(TokioTlsStream<TcpStream>),
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Production connector: tokio TCP, optional local bind, proxy chain, rustls.
pub struct TcpConnector<N = HttpConnectChain> {
    negotiator: N,
}

impl TcpConnector<HttpConnectChain> {
    pub fn new() -> Self {
        Self {
            negotiator: HttpConnectChain,
        }
    }
}

impl Default for TcpConnector<HttpConnectChain> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: ProxyChainNegotiator> TcpConnector<N> {
    pub fn with_negotiator(negotiator: N) -> Self {
        Self { negotiator }
    }
}

/// TCP connect to (host, port), optionally from a fixed local address/port.
async fn connect_tcp(
    host: &str,
    port: u16,
    local_host: Option<&str>,
    local_port: Option<u16>,
) -> io::Result<TcpStream> {
    if local_host.is_none() && local_port.is_none() {
        return TcpStream::connect((host, port)).await;
    }
    let local_ip = match local_host {
        Some(h) => Some(h.parse::<IpAddr>().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "local host must be an IP address")
        })?),
        None => None,
    };
    let mut last_err = None;
    let mut family_mismatch = false;
    for addr in lookup_host((host, port)).await? {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        let ip = local_ip.unwrap_or(match addr {
            SocketAddr::V4(_) => IpAddr::from([0u8, 0, 0, 0]),
            SocketAddr::V6(_) => IpAddr::from([0u16; 8]),
        });
        if ip.is_ipv4() != addr.is_ipv4() {
            family_mismatch = true;
            continue;
        }
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::new(ip, local_port.unwrap_or(0)))?;
        match socket.connect(addr).await {
            Ok(s) => return Ok(s),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        if family_mismatch {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no address of {} matches the address family of the local bind", host),
            )
        } else {
            io::Error::new(io::ErrorKind::NotFound, format!("{} did not resolve", host))
        }
    }))
}

impl<N: ProxyChainNegotiator> Connector for TcpConnector<N> {
    type Stream = HttpStream;

    async fn connect(&self, target: &ConnectTarget) -> Result<HttpStream, ClientError> {
        let (dial_host, dial_port) = target.dial_addr();
        let mut tcp = connect_tcp(
            dial_host,
            dial_port,
            target.local_host.as_deref(),
            target.local_port,
        )
        .await?;
        if !target.proxies.is_empty() {
            self.negotiator
                .negotiate(&mut tcp, &target.proxies, &target.host, target.port)
                .await?;
        }
        if !target.ssl {
            return Ok(HttpStream::Plain(tcp));
        }
        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|_| ClientError::Tls(format!("invalid server name {:?}", target.host)))?;
        let connector = TlsConnector::from(tls_client_config(target.ssl_version));
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ClientError::Tls(e.to_string()))?;
        Ok(HttpStream::Tls(tls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ConnectTarget {
        ConnectTarget {
            host: "example.com".into(),
            port: 80,
            ssl: false,
            ssl_version: SslVersion::Auto,
            proxies: Vec::new(),
            local_host: None,
            local_port: None,
        }
    }

    #[test]
    fn dial_addr_prefers_first_proxy() {
        let mut t = target();
        assert_eq!(t.dial_addr(), ("example.com", 80));
        t.proxies = ProxySpec::parse_chain("http:10.1.1.1:3128,http:10.2.2.2:8080").unwrap();
        assert_eq!(t.dial_addr(), ("10.1.1.1", 3128));
    }

    #[tokio::test]
    async fn local_bind_family_mismatch_is_reported() {
        let err = connect_tcp("127.0.0.1", 9, Some("::1"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("address family"), "{err}");
    }

    #[tokio::test]
    async fn local_bind_requires_ip() {
        let err = connect_tcp("127.0.0.1", 9, Some("not-an-ip"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
