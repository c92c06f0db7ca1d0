/*
 * connection.rs
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

//! Connection manager: owns at most one transport stream and moves whole requests and
//! responses over it.
//!
//! In lockstep mode (the default) a request is only written once the previous response has
//! been read; any unread response is drained first. With pipelining enabled requests may be
//! queued back to back and `read_response` returns responses in request order.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{ClientError, Result};
use crate::net::{ConnectTarget, Connector};
use crate::protocol::http::h1::{BodyMode, H1ResponseHandler, ParseState, ResponseParser};
use crate::protocol::http::request::Request;
use crate::protocol::http::response::Response;

/// Outstanding request whose response has not been read yet.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    bodyless: bool,
}

/// Accumulates parser callbacks into a `Response`.
#[derive(Default)]
struct ResponseCollector {
    version: String,
    code: u16,
    reason: String,
    headers: Vec<(String, String)>,
    body: BytesMut,
    done: bool,
}

impl H1ResponseHandler for ResponseCollector {
    fn status(&mut self, version: &str, code: u16, reason: &str) {
        self.version = version.to_string();
        self.code = code;
        self.reason = reason.to_string();
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn body_chunk(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn trailer(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn complete(&mut self) {
        self.done = true;
    }
}

impl ResponseCollector {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body delimitation for the response whose headers are in.
    fn body_mode(&self, bodyless: bool) -> Result<BodyMode> {
        if bodyless || (100..200).contains(&self.code) || self.code == 204 || self.code == 304 {
            return Ok(BodyMode::Empty);
        }
        let chunked = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("transfer-encoding"))
            .any(|(_, v)| v.to_ascii_lowercase().contains("chunked"));
        if chunked {
            return Ok(BodyMode::Chunked);
        }
        match self.header("content-length") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map(BodyMode::Length)
                .map_err(|_| ClientError::malformed(format!("bad Content-Length {:?}", v))),
            None => Ok(BodyMode::UntilClose),
        }
    }

    fn into_response(self) -> Response {
        Response {
            code: self.code,
            message: self.reason,
            version: self.version,
            headers: self.headers,
            body: self.body.freeze(),
        }
    }
}

/// Owns the transport for one (host, port) target.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    target: ConnectTarget,
    stream: Option<C::Stream>,
    pipeline: bool,
    read_buf: BytesMut,
    in_flight: VecDeque<InFlight>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, target: ConnectTarget) -> Self {
        Self {
            connector,
            target,
            stream: None,
            pipeline: false,
            read_buf: BytesMut::with_capacity(8192),
            in_flight: VecDeque::new(),
        }
    }

    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    pub fn set_pipeline(&mut self, enabled: bool) {
        self.pipeline = enabled;
    }

    /// Requests written whose responses have not been read.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Open the transport if not already open.
    pub async fn connect(&mut self, timeout: Duration) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let (host, port) = {
            let (h, p) = self.target.dial_addr();
            (h.to_string(), p)
        };
        tracing::debug!(
            "connecting to {}:{} via {}:{} (ssl={})",
            self.target.host,
            self.target.port,
            host,
            port,
            self.target.ssl
        );
        let stream = match tokio::time::timeout(timeout, self.connector.connect(&self.target)).await
        {
            Err(_) => {
                return Err(ClientError::ConnectionTimedOut {
                    host,
                    port,
                    timeout,
                })
            }
            Ok(Err(ClientError::Io(e))) => {
                return Err(ClientError::from_connect(e, &host, port, timeout))
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(s)) => s,
        };
        self.stream = Some(stream);
        self.read_buf.clear();
        self.in_flight.clear();
        Ok(())
    }

    /// Write a request. In lockstep mode any unread response is drained first.
    pub async fn send_request(&mut self, request: &Request, timeout: Duration) -> Result<()> {
        if !self.pipeline {
            self.drain(timeout).await?;
        }
        self.write_request(request).await
    }

    /// Write a request and read its response. Earlier unread responses are drained first.
    pub async fn exchange(&mut self, request: &Request, timeout: Duration) -> Result<Response> {
        self.drain(timeout).await?;
        self.write_request(request).await?;
        self.read_response(timeout).await
    }

    /// Read and discard unread responses. Reconnects when one of them closed the stream.
    async fn drain(&mut self, timeout: Duration) -> Result<()> {
        let mut drained = false;
        while !self.in_flight.is_empty() && self.stream.is_some() {
            let response = self.read_response(timeout).await?;
            tracing::warn!(
                "discarding unread {} response before next request",
                response.code
            );
            drained = true;
        }
        self.in_flight.clear();
        if drained && self.stream.is_none() {
            self.connect(timeout).await?;
        }
        Ok(())
    }

    async fn write_request(&mut self, request: &Request) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        tracing::debug!("> {} {} HTTP/{}", request.method.as_str(), request.uri, request.version);
        let bytes = request.to_bytes();
        tracing::trace!("writing {} bytes", bytes.len());
        let written = async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        }
        .await;
        if let Err(e) = written {
            self.close().await;
            return Err(e.into());
        }
        self.in_flight.push_back(InFlight {
            bodyless: request.expects_bodyless_response(),
        });
        Ok(())
    }

    /// Read the next response in request order.
    ///
    /// The connection is closed afterwards when the server asked for it or when the body was
    /// delimited by end of stream. A timeout or transport error also closes it, since the read
    /// position is then unknown.
    pub async fn read_response(&mut self, timeout: Duration) -> Result<Response> {
        if self.stream.is_none() {
            return Err(ClientError::NotConnected);
        }
        let bodyless = self
            .in_flight
            .pop_front()
            .map(|f| f.bodyless)
            .unwrap_or(false);
        let outcome = match tokio::time::timeout(timeout, self.read_one(bodyless)).await {
            Ok(r) => r,
            Err(_) => Err(ClientError::ReadTimedOut(timeout)),
        };
        match outcome {
            Ok((response, mode)) => {
                tracing::debug!("< {} {}", response.code, response.message);
                tracing::trace!("read {} body bytes", response.body.len());
                if mode == BodyMode::UntilClose || response.wants_close() {
                    self.close().await;
                }
                Ok(response)
            }
            Err(e) => {
                self.stop().await;
                Err(e)
            }
        }
    }

    async fn read_one(&mut self, bodyless: bool) -> Result<(Response, BodyMode)> {
        let mut parser = ResponseParser::new();
        let mut collector = ResponseCollector::default();
        loop {
            parser.receive(&mut self.read_buf, &mut collector)?;
            match parser.state() {
                ParseState::HeadersComplete => {
                    if (100..200).contains(&collector.code) && collector.code != 101 {
                        tracing::trace!("skipping interim {} response", collector.code);
                        parser.reset();
                        collector = ResponseCollector::default();
                        continue;
                    }
                    let mode = collector.body_mode(bodyless)?;
                    parser.set_body_mode(mode, &mut collector);
                    continue;
                }
                ParseState::Idle if collector.done => break,
                _ => {}
            }
            let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
            let n = stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                parser.end_of_stream(&mut collector)?;
                break;
            }
        }
        let mode = parser.body_mode();
        Ok((collector.into_response(), mode))
    }

    /// Release the transport. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::trace!("shutdown: {}", e);
            }
            tracing::debug!("closed connection to {}:{}", self.target.host, self.target.port);
        }
    }

    /// Close and forget any buffered or outstanding pipeline state. Idempotent.
    pub async fn stop(&mut self) {
        self.close().await;
        self.read_buf.clear();
        self.in_flight.clear();
    }
}
