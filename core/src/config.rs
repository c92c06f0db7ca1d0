/*
 * config.rs
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

//! Client configuration.
//!
//! Two layers:
//! - `ClientSettings`: fixed at construction (port, TLS, proxies, credentials, local bind).
//!   Serde-enabled so an embedding application can load it from its own config file.
//! - `Options`: the request option mapping (method, uri, headers, form_data, ...). The client
//!   holds one and merges per-call options over it. Unrecognised keys are kept.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::protocol::http::multipart::FormPart;

/// Option keys understood by the request builder. Other keys are carried but ignored.
pub mod keys {
    pub const METHOD: &str = "method";
    pub const URI: &str = "uri";
    pub const QUERY: &str = "query";
    pub const VARS_GET: &str = "vars_get";
    pub const VARS_POST: &str = "vars_post";
    pub const DATA: &str = "data";
    pub const CTYPE: &str = "ctype";
    pub const HEADERS: &str = "headers";
    pub const RAW_HEADERS: &str = "raw_headers";
    pub const AGENT: &str = "agent";
    pub const AUTHORIZATION: &str = "authorization";
    pub const FORM_DATA: &str = "form_data";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const VERSION: &str = "version";
    pub const COOKIE: &str = "cookie";
    pub const CONNECTION: &str = "connection";
    pub const VHOST: &str = "vhost";
}

/// Value stored under an option key.
#[derive(Debug, Clone, PartialEq)]
pub enum OptValue {
    /// Key present with no value.
    Nil,
    Str(String),
    /// Raw bytes (request bodies that are not text).
    Bytes(Vec<u8>),
    Int(i64),
    Bool(bool),
    /// Insertion-ordered name/value pairs (headers, vars_get, vars_post).
    Pairs(Vec<(String, String)>),
    /// Ordered multipart part descriptors.
    Form(Vec<FormPart>),
}

impl From<&str> for OptValue {
    fn from(s: &str) -> Self {
        OptValue::Str(s.to_string())
    }
}

impl From<String> for OptValue {
    fn from(s: String) -> Self {
        OptValue::Str(s)
    }
}

impl From<Vec<u8>> for OptValue {
    fn from(b: Vec<u8>) -> Self {
        OptValue::Bytes(b)
    }
}

impl From<i64> for OptValue {
    fn from(n: i64) -> Self {
        OptValue::Int(n)
    }
}

impl From<bool> for OptValue {
    fn from(b: bool) -> Self {
        OptValue::Bool(b)
    }
}

impl From<Vec<(String, String)>> for OptValue {
    fn from(p: Vec<(String, String)>) -> Self {
        OptValue::Pairs(p)
    }
}

impl From<Vec<FormPart>> for OptValue {
    fn from(parts: Vec<FormPart>) -> Self {
        OptValue::Form(parts)
    }
}

/// Option mapping. Values are owned; `merge` clones from the other side so the two never alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: HashMap<String, OptValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<OptValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style insert of ordered pairs (headers, vars_get, vars_post).
    pub fn with_pairs<K, V>(mut self, key: &str, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Vec<_>>();
        self.set(key, OptValue::Pairs(pairs));
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<OptValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<OptValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&OptValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Textual value of a key. Integers and booleans are rendered; `Nil` and collections are None.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.entries.get(key)? {
            OptValue::Str(s) => Some(s.clone()),
            OptValue::Int(n) => Some(n.to_string()),
            OptValue::Bool(b) => Some(b.to_string()),
            OptValue::Nil | OptValue::Bytes(_) | OptValue::Pairs(_) | OptValue::Form(_) => None,
        }
    }

    /// Byte value of a key: raw bytes, or the UTF-8 of a textual value.
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.entries.get(key)? {
            OptValue::Bytes(b) => Some(b.clone()),
            _ => self.get_str(key).map(String::into_bytes),
        }
    }

    /// Ordered pairs under a key; empty when absent or not a pair list.
    pub fn get_pairs(&self, key: &str) -> &[(String, String)] {
        match self.entries.get(key) {
            Some(OptValue::Pairs(p)) => p,
            _ => &[],
        }
    }

    pub fn get_form(&self, key: &str) -> Option<&[FormPart]> {
        match self.entries.get(key) {
            Some(OptValue::Form(parts)) => Some(parts),
            _ => None,
        }
    }

    /// Merge `other` into self; `other` wins on conflicting keys.
    pub fn merge(&mut self, other: &Options) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Merged copy; neither side is modified.
    pub fn merged(&self, other: &Options) -> Options {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// TLS protocol version pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SslVersion {
    /// Let rustls negotiate (TLS 1.2 or 1.3).
    #[default]
    Auto,
    #[serde(rename = "TLS1.2")]
    Tls12,
    #[serde(rename = "TLS1.3")]
    Tls13,
}

impl SslVersion {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AUTO" | "SSL23" | "TLS" => Some(SslVersion::Auto),
            "TLS1.2" | "TLS1_2" | "TLS12" => Some(SslVersion::Tls12),
            "TLS1.3" | "TLS1_3" | "TLS13" => Some(SslVersion::Tls13),
            _ => None,
        }
    }
}

/// Proxy protocol of one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Http,
    Socks4,
    Socks5,
}

impl ProxyKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProxyKind::Http => "http",
            ProxyKind::Socks4 => "socks4",
            ProxyKind::Socks5 => "socks5",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" => Some(ProxyKind::Http),
            "socks4" => Some(ProxyKind::Socks4),
            "socks5" => Some(ProxyKind::Socks5),
            _ => None,
        }
    }
}

/// One hop of a proxy chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySpec {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
}

impl ProxySpec {
    /// Parse `kind:host:port[,kind:host:port...]`. Hops are kept in order; blank entries skipped.
    pub fn parse_chain(chain: &str) -> Result<Vec<ProxySpec>, ClientError> {
        let mut hops = Vec::new();
        for entry in chain.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (kind, rest) = entry
                .split_once(':')
                .ok_or_else(|| ClientError::Proxy(format!("missing proxy type in {:?}", entry)))?;
            let kind = ProxyKind::from_name(kind)
                .ok_or_else(|| ClientError::Proxy(format!("unknown proxy type {:?}", kind)))?;
            let (host, port) = rest
                .rsplit_once(':')
                .ok_or_else(|| ClientError::Proxy(format!("missing proxy port in {:?}", entry)))?;
            let port = port
                .parse::<u16>()
                .map_err(|_| ClientError::Proxy(format!("invalid proxy port in {:?}", entry)))?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            if host.is_empty() {
                return Err(ClientError::Proxy(format!("missing proxy host in {:?}", entry)));
            }
            hops.push(ProxySpec {
                kind,
                host: host.to_string(),
                port,
            });
        }
        Ok(hops)
    }
}

/// Construction-time settings. Not readable back from the client once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub port: u16,
    pub ssl: bool,
    pub ssl_version: SslVersion,
    pub proxies: Vec<ProxySpec>,
    pub username: String,
    pub password: String,
    pub context: HashMap<String, String>,
    pub local_host: Option<String>,
    pub local_port: Option<u16>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            port: 80,
            ssl: false,
            ssl_version: SslVersion::Auto,
            proxies: Vec::new(),
            username: String::new(),
            password: String::new(),
            context: HashMap::new(),
            local_host: None,
            local_port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_other_and_keeps_unknown_keys() {
        let mut base = Options::new().with("method", "GET").with("x-future", 7i64);
        let partial = Options::new().with("method", "POST");
        base.merge(&partial);
        assert_eq!(base.get_str("method").as_deref(), Some("POST"));
        assert_eq!(base.get_str("x-future").as_deref(), Some("7"));
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn pairs_keep_insertion_order() {
        let o = Options::new().with_pairs("headers", [("Zeta", "1"), ("Alpha", "2")]);
        let names: Vec<&str> = o.get_pairs("headers").iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["Zeta", "Alpha"]);
        assert!(o.get_pairs("missing").is_empty());
    }

    #[test]
    fn nil_has_no_text() {
        let o = Options::new().with("agent", OptValue::Nil);
        assert!(o.contains("agent"));
        assert_eq!(o.get_str("agent"), None);
    }

    #[test]
    fn parse_proxy_chain_in_order() {
        let hops = ProxySpec::parse_chain("http:10.0.0.1:8080, socks5:proxy.local:1080").unwrap();
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].kind, ProxyKind::Http);
        assert_eq!(hops[0].port, 8080);
        assert_eq!(hops[1].host, "proxy.local");
    }

    #[test]
    fn parse_proxy_chain_rejects_bad_port() {
        assert!(ProxySpec::parse_chain("http:host:notaport").is_err());
        assert!(ProxySpec::parse_chain("ftp:host:21").is_err());
    }

    #[test]
    fn settings_defaults() {
        let s = ClientSettings::default();
        assert_eq!(s.port, 80);
        assert!(!s.ssl);
        assert!(s.proxies.is_empty());
        assert_eq!(s.username, "");
        assert_eq!(s.password, "");
        assert!(s.context.is_empty());
    }

    #[test]
    fn settings_from_json_fill_defaults() {
        let s: ClientSettings =
            serde_json::from_str(r#"{"port": 8443, "ssl": true, "ssl_version": "TLS1.3"}"#).unwrap();
        assert_eq!(s.port, 8443);
        assert!(s.ssl);
        assert_eq!(s.ssl_version, SslVersion::Tls13);
        assert_eq!(s.username, "");
    }

    #[test]
    fn ssl_version_names() {
        assert_eq!(SslVersion::from_name("tls1.2"), Some(SslVersion::Tls12));
        assert_eq!(SslVersion::from_name("SSL23"), Some(SslVersion::Auto));
        assert_eq!(SslVersion::from_name("sslv2"), None);
    }
}
