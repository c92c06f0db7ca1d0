/*
 * builder.rs
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

//! Request assembly from an option mapping.
//!
//! `raw` sends what it is given; `cgi` fills in the usual browser-style headers, query
//! variables and form bodies. Neither does I/O and neither fails.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::{keys, OptValue, Options};
use crate::protocol::http::multipart::MultipartEncoder;
use crate::protocol::http::request::{Method, Request};
use crate::random::RandomStringProvider;

/// User-Agent sent when the `agent` option is absent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; Wirehttp/0.1)";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Unreserved characters (RFC 3986) stay as they are.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers `cgi` places itself; configured values for them are lifted into position.
const PLACED: [&str; 4] = ["Host", "User-Agent", "Content-Type", "Content-Length"];

/// Builds requests for one (host, port, ssl) target.
pub struct RequestBuilder<'a> {
    host: &'a str,
    port: u16,
    ssl: bool,
    random: &'a dyn RandomStringProvider,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(host: &'a str, port: u16, ssl: bool, random: &'a dyn RandomStringProvider) -> Self {
        Self {
            host,
            port,
            ssl,
            random,
        }
    }

    /// Host header value: `vhost` if set, else host with the port when it is not the default.
    pub fn host_value(&self, opts: &Options) -> String {
        if let Some(vhost) = opts.get_str(keys::VHOST).filter(|v| !v.is_empty()) {
            return vhost;
        }
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.to_string()
        };
        let default_port = if self.ssl { 443 } else { 80 };
        if self.port == default_port {
            host
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// Minimal request: given method, uri, headers, raw headers and data, plus the version on
    /// the request line and a Host header when none is supplied.
    ///
    /// Not strictly minimal: a non-empty body without a Content-Length header gets one
    /// appended, so the declared length always matches the body. Supply Content-Length
    /// explicitly to control the value sent.
    pub fn raw(&self, config: &Options, opts: &Options) -> Request {
        let mut scope = Options::new();
        for key in [keys::VERSION, keys::VHOST] {
            if let Some(v) = config.get(key) {
                scope.set(key, v.clone());
            }
        }
        scope.merge(opts);

        let uri = scope.get_str(keys::URI).unwrap_or_else(|| "/".into());
        let mut request = Request::new(method(&scope), uri);
        request.version = version(&scope);
        let headers = scope.get_pairs(keys::HEADERS);
        if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("Host")) {
            request.push_header("Host", self.host_value(&scope));
        }
        request.headers.extend(headers.iter().cloned());
        request.raw_headers = scope.get_str(keys::RAW_HEADERS).unwrap_or_default();
        request.body = scope.get_bytes(keys::DATA).unwrap_or_default();
        if !request.body.is_empty() && !request.has_header("Content-Length") {
            request.push_header("Content-Length", request.body.len().to_string());
        }
        request
    }

    /// Full request from the merged configuration.
    pub fn cgi(&self, config: &Options, opts: &Options) -> Request {
        let o = config.merged(opts);
        let mut uri = o.get_str(keys::URI).unwrap_or_else(|| "/".into());
        let query = query_string(&o);
        if !query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&query);
        }
        let mut request = Request::new(method(&o), uri);
        request.version = version(&o);

        let configured = o.get_pairs(keys::HEADERS);
        let find = |name: &str| {
            configured
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        };

        request.push_header("Host", find("Host").unwrap_or_else(|| self.host_value(&o)));

        let agent = match find("User-Agent") {
            Some(v) => Some(v),
            None => match o.get(keys::AGENT) {
                None => Some(DEFAULT_USER_AGENT.to_string()),
                Some(_) => o.get_str(keys::AGENT),
            },
        };
        if let Some(agent) = agent.filter(|a| !a.is_empty()) {
            request.push_header("User-Agent", agent);
        }

        let (body, content_type) = self.body(&o);
        let content_type = match o.get_form(keys::FORM_DATA) {
            Some(_) => content_type,
            None => find("Content-Type").or(content_type),
        };
        if let Some(ct) = content_type {
            request.push_header("Content-Type", ct);
        }
        let sends_length = !body.is_empty()
            || matches!(request.method, Method::Post | Method::Put | Method::Patch);
        if sends_length {
            request.push_header("Content-Length", body.len().to_string());
        }
        request.body = body;

        if let Some(cookie) = o.get_str(keys::COOKIE).filter(|c| !c.is_empty()) {
            request.push_header("Cookie", cookie);
        }
        if let Some(connection) = o.get_str(keys::CONNECTION).filter(|c| !c.is_empty()) {
            request.push_header("Connection", connection);
        }
        for (k, v) in configured {
            if !PLACED.iter().any(|p| k.eq_ignore_ascii_case(p)) {
                request.push_header(k.clone(), v.clone());
            }
        }
        if find("Authorization").is_none() {
            if let Some(auth) = o.get_str(keys::AUTHORIZATION).filter(|a| !a.is_empty()) {
                request.push_header("Authorization", auth);
            }
        }
        request.raw_headers = o.get_str(keys::RAW_HEADERS).unwrap_or_default();
        request
    }

    /// Body and its content type: form_data, then data, then vars_post.
    fn body(&self, o: &Options) -> (Vec<u8>, Option<String>) {
        if let Some(parts) = o.get_form(keys::FORM_DATA) {
            let multipart = MultipartEncoder::new(self.random).encode(parts);
            return (multipart.body, Some(multipart.content_type));
        }
        if let Some(data) = o.get_bytes(keys::DATA) {
            return (data, o.get_str(keys::CTYPE));
        }
        let vars = o.get_pairs(keys::VARS_POST);
        if !vars.is_empty() {
            let ctype = o.get_str(keys::CTYPE).unwrap_or_else(|| FORM_URLENCODED.into());
            return (encode_pairs(vars).into_bytes(), Some(ctype));
        }
        (Vec::new(), o.get_str(keys::CTYPE))
    }
}

fn method(o: &Options) -> Method {
    o.get_str(keys::METHOD)
        .map(|m| Method::from_token(&m))
        .unwrap_or(Method::Get)
}

fn version(o: &Options) -> String {
    match o.get(keys::VERSION) {
        Some(OptValue::Nil) | None => "1.1".to_string(),
        Some(_) => o.get_str(keys::VERSION).unwrap_or_else(|| "1.1".into()),
    }
}

/// Raw `query` followed by encoded `vars_get`.
fn query_string(o: &Options) -> String {
    let mut parts = Vec::new();
    if let Some(q) = o.get_str(keys::QUERY).filter(|q| !q.is_empty()) {
        parts.push(q);
    }
    let vars = o.get_pairs(keys::VARS_GET);
    if !vars.is_empty() {
        parts.push(encode_pairs(vars));
    }
    parts.join("&")
}

/// `k=v&k=v` with both sides percent-encoded.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, QUERY_VALUE),
                utf8_percent_encode(v, QUERY_VALUE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
