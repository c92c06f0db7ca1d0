/*
 * proxy.rs
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

//! Proxy chain negotiation over an already-connected stream.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{ProxyKind, ProxySpec};
use crate::error::ClientError;
use crate::protocol::http::h1::{H1ResponseHandler, ParseState, ResponseParser};

/// Tunnels a stream connected to `hops[0]` through the remaining hops to (host, port).
#[allow(async_fn_in_trait)]
pub trait ProxyChainNegotiator {
    async fn negotiate<S>(
        &self,
        stream: &mut S,
        hops: &[ProxySpec],
        host: &str,
        port: u16,
    ) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send;
}

/// HTTP `CONNECT` tunnelling, one request per hop. SOCKS hops are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnectChain;

/// Captures the status of a CONNECT reply.
#[derive(Default)]
struct ConnectReply {
    code: Option<u16>,
    reason: String,
}

impl H1ResponseHandler for ConnectReply {
    fn status(&mut self, _version: &str, code: u16, reason: &str) {
        self.code = Some(code);
        self.reason = reason.to_string();
    }
    fn header(&mut self, _name: &str, _value: &str) {}
    fn body_chunk(&mut self, _data: &[u8]) {}
    fn trailer(&mut self, _name: &str, _value: &str) {}
    fn complete(&mut self) {}
}

/// Build the CONNECT request for one hop.
pub fn build_connect_request(host: &str, port: u16) -> Vec<u8> {
    let authority = if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };
    format!(
        "CONNECT {a} HTTP/1.1\r\nHost: {a}\r\nProxy-Connection: Keep-Alive\r\n\r\n",
        a = authority
    )
    .into_bytes()
}

async fn connect_through<S>(
    stream: &mut S,
    proxy: &ProxySpec,
    host: &str,
    port: u16,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if proxy.kind != ProxyKind::Http {
        return Err(ClientError::Proxy(format!(
            "{} proxy {}:{} not supported",
            proxy.kind.name(),
            proxy.host,
            proxy.port
        )));
    }
    tracing::debug!("CONNECT {}:{} via {}:{}", host, port, proxy.host, proxy.port);
    stream.write_all(&build_connect_request(host, port)).await?;
    stream.flush().await?;

    let mut parser = ResponseParser::new();
    let mut reply = ConnectReply::default();
    let mut buf = BytesMut::with_capacity(1024);
    while parser.state() != ParseState::HeadersComplete {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(ClientError::Proxy(format!(
                "proxy {}:{} closed during CONNECT",
                proxy.host, proxy.port
            )));
        }
        parser.receive(&mut buf, &mut reply)?;
    }
    match reply.code {
        Some(code) if (200..300).contains(&code) => Ok(()),
        code => Err(ClientError::Proxy(format!(
            "proxy {}:{} answered CONNECT with {} {}",
            proxy.host,
            proxy.port,
            code.unwrap_or(0),
            reply.reason
        ))),
    }
}

impl ProxyChainNegotiator for HttpConnectChain {
    async fn negotiate<S>(
        &self,
        stream: &mut S,
        hops: &[ProxySpec],
        host: &str,
        port: u16,
    ) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        for (i, proxy) in hops.iter().enumerate() {
            let (next_host, next_port) = match hops.get(i + 1) {
                Some(next) => (next.host.as_str(), next.port),
                None => (host, port),
            };
            connect_through(stream, proxy, next_host, next_port).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn hop(kind: ProxyKind, host: &str, port: u16) -> ProxySpec {
        ProxySpec {
            kind,
            host: host.to_string(),
            port,
        }
    }

    #[test]
    fn connect_request_brackets_ipv6() {
        let req = String::from_utf8(build_connect_request("::1", 443)).unwrap();
        assert!(req.starts_with("CONNECT [::1]:443 HTTP/1.1\r\nHost: [::1]:443\r\n"));
    }

    #[tokio::test]
    async fn chains_connect_per_hop() {
        let (mut client, mut server) = duplex(4096);
        let hops = vec![hop(ProxyKind::Http, "p1", 3128), hop(ProxyKind::Http, "p2", 8080)];
        let server_task = tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..2 {
                let mut buf = vec![0u8; 1024];
                let n = server.read(&mut buf).await.unwrap();
                seen.push(String::from_utf8_lossy(&buf[..n]).into_owned());
                server
                    .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                    .await
                    .unwrap();
            }
            seen
        });
        HttpConnectChain
            .negotiate(&mut client, &hops, "target", 80)
            .await
            .unwrap();
        let seen = server_task.await.unwrap();
        assert!(seen[0].starts_with("CONNECT p2:8080 "));
        assert!(seen[1].starts_with("CONNECT target:80 "));
    }

    #[tokio::test]
    async fn refused_connect_is_proxy_error() {
        let (mut client, mut server) = duplex(4096);
        let hops = vec![hop(ProxyKind::Http, "p1", 3128)];
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let _ = server.read(&mut buf).await;
            let _ = server
                .write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n")
                .await;
        });
        let err = HttpConnectChain
            .negotiate(&mut client, &hops, "target", 80)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Proxy(ref m) if m.contains("403")));
    }

    #[tokio::test]
    async fn socks_hop_rejected() {
        let (mut client, _server) = duplex(64);
        let hops = vec![hop(ProxyKind::Socks5, "s", 1080)];
        let err = HttpConnectChain
            .negotiate(&mut client, &hops, "target", 80)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Proxy(_)));
    }
}
