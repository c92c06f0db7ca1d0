/*
 * client.rs
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

//! HTTP client facade: configuration, request building, one managed connection and
//! adaptive authentication.
//!
//! ```no_run
//! # async fn demo() -> wirehttp_core::Result<()> {
//! use std::time::Duration;
//! use wirehttp_core::config::{keys, ClientSettings, Options};
//! use wirehttp_core::HttpClient;
//!
//! let mut client = HttpClient::new("example.com", ClientSettings::default());
//! let request = client.request_cgi(&Options::new().with(keys::URI, "/index.html"));
//! let response = client.send_recv(&request, Duration::from_secs(10)).await?;
//! println!("{} {}", response.code, response.message);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{keys, ClientSettings, Options};
use crate::error::Result;
use crate::net::{ConnectTarget, Connector, TcpConnector};
use crate::protocol::http::auth::{AuthNegotiator, AuthState};
use crate::protocol::http::builder::RequestBuilder;
use crate::protocol::http::connection::ConnectionManager;
use crate::protocol::http::request::Request;
use crate::protocol::http::response::Response;
use crate::random::{RandomStringProvider, ThreadRngProvider};

/// HTTP client bound to one host. Connection and auth state are per instance.
pub struct HttpClient<C: Connector = TcpConnector> {
    hostname: String,
    port: u16,
    ssl: bool,
    config: Options,
    context: HashMap<String, String>,
    auth: AuthNegotiator,
    random: Arc<dyn RandomStringProvider>,
    conn: ConnectionManager<C>,
}

impl HttpClient<TcpConnector> {
    /// Client for `host` using tokio TCP and rustls.
    pub fn new(host: impl Into<String>, settings: ClientSettings) -> Self {
        Self::with_connector(host, settings, TcpConnector::new())
    }
}

impl<C: Connector> HttpClient<C> {
    pub fn with_connector(host: impl Into<String>, settings: ClientSettings, connector: C) -> Self {
        let hostname = host.into();
        let target = ConnectTarget {
            host: hostname.clone(),
            port: settings.port,
            ssl: settings.ssl,
            ssl_version: settings.ssl_version,
            proxies: settings.proxies,
            local_host: settings.local_host,
            local_port: settings.local_port,
        };
        let config = Options::new()
            .with(keys::METHOD, "GET")
            .with(keys::URI, "/")
            .with(keys::VERSION, "1.1")
            .with(keys::USERNAME, settings.username)
            .with(keys::PASSWORD, settings.password);
        Self {
            hostname,
            port: settings.port,
            ssl: settings.ssl,
            config,
            context: settings.context,
            auth: AuthNegotiator::new(),
            random: Arc::new(ThreadRngProvider),
            conn: ConnectionManager::new(connector, target),
        }
    }

    /// Merge `partial` into the configuration (partial wins) and return a copy of the result.
    pub fn set_config(&mut self, partial: &Options) -> Options {
        self.config.merge(partial);
        self.config.clone()
    }

    pub fn config(&self) -> &Options {
        &self.config
    }

    /// Application data carried with the client; never sent.
    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.context
    }

    /// Replace the source of multipart boundaries.
    pub fn set_random_provider(&mut self, random: Arc<dyn RandomStringProvider>) {
        self.random = random;
    }

    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.hostname, self.port, self.ssl, self.random.as_ref())
    }

    pub fn request_raw(&self, opts: &Options) -> Request {
        self.builder().raw(&self.config, opts)
    }

    pub fn request_cgi(&self, opts: &Options) -> Request {
        self.builder().cgi(&self.config, opts)
    }

    pub async fn connect(&mut self, timeout: Duration) -> Result<()> {
        self.conn.connect(timeout).await
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    pub fn set_pipeline(&mut self, enabled: bool) {
        self.conn.set_pipeline(enabled);
    }

    pub fn pipeline(&self) -> bool {
        self.conn.pipeline()
    }

    /// Send `request` and return its response, answering one Basic challenge if credentials
    /// are configured. `timeout` bounds the connect and each response read.
    pub async fn send_recv(&mut self, request: &Request, timeout: Duration) -> Result<Response> {
        let username = self.config.get_str(keys::USERNAME).unwrap_or_default();
        let password = self.config.get_str(keys::PASSWORD).unwrap_or_default();
        self.auth.begin(&username, &password);

        self.conn.connect(timeout).await?;
        let response = self.conn.exchange(request, timeout).await?;
        let Some(retry) = self.auth.on_response(request, &response) else {
            return Ok(response);
        };
        // The server may have closed after the 401.
        self.conn.connect(timeout).await?;
        let response = self.conn.exchange(&retry, timeout).await?;
        self.auth.on_retry_response(&response);
        Ok(response)
    }

    /// Build with `request_cgi` and send with `send_recv`.
    pub async fn request(&mut self, opts: &Options, timeout: Duration) -> Result<Response> {
        let request = self.request_cgi(opts);
        self.send_recv(&request, timeout).await
    }

    /// Write a request without reading its response. Connects if needed.
    pub async fn send_request(&mut self, request: &Request, timeout: Duration) -> Result<()> {
        self.conn.connect(timeout).await?;
        self.conn.send_request(request, timeout).await
    }

    /// Read the next outstanding response.
    pub async fn read_response(&mut self, timeout: Duration) -> Result<Response> {
        self.conn.read_response(timeout).await
    }

    /// Negotiation state of the last `send_recv`.
    pub fn auth_state(&self) -> &AuthState {
        self.auth.state()
    }

    pub async fn close(&mut self) {
        self.conn.close().await;
    }

    pub async fn stop(&mut self) {
        self.conn.stop().await;
    }
}
