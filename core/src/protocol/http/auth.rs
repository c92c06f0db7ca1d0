/*
 * auth.rs
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

//! Adaptive HTTP authentication.
//!
//! Credentials are withheld from the first request. A 401 carrying a challenge for a scheme
//! in the strategy table produces one resend with an Authorization header. Phases per send:
//! NoAuth -> Pending (challenge accepted, resend issued) -> Authenticated (resend not 401).
//!
//! A request that already carries Authorization (explicit override) bypasses the cycle.

use std::collections::HashMap;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use crate::error::ClientError;
use crate::protocol::http::request::Request;
use crate::protocol::http::response::Response;

/// Automatic resends allowed per send.
pub const MAX_AUTH_RETRIES: u8 = 1;

/// `Basic base64(user:pass)`, trailing whitespace trimmed.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let encoded = BASE64_STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded).trim_end().to_string()
}

/// One challenge from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: String,
    pub params: Vec<(String, String)>,
}

impl Challenge {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn realm(&self) -> Option<&str> {
        self.param("realm")
    }
}

/// Split a header value on commas that are not inside quotes.
fn split_unquoted(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

fn parse_param(segment: &str) -> Option<(String, String)> {
    let (k, v) = segment.split_once('=')?;
    let v = v.trim();
    let v = v
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|s| s.replace("\\\"", "\"").replace("\\\\", "\\"))
        .unwrap_or_else(|| v.to_string());
    Some((k.trim().to_string(), v))
}

/// Parse every challenge out of the given WWW-Authenticate values, in order.
pub fn parse_challenges<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<Challenge> {
    let mut out: Vec<Challenge> = Vec::new();
    for value in values {
        for segment in split_unquoted(value) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (first, rest) = match segment.split_once(char::is_whitespace) {
                Some((f, r)) => (f, r.trim()),
                None => (segment, ""),
            };
            if first.contains('=') {
                // auth-param of the current challenge
                if let (Some(current), Some(p)) = (out.last_mut(), parse_param(segment)) {
                    current.params.push(p);
                }
                continue;
            }
            let mut challenge = Challenge {
                scheme: first.to_string(),
                params: Vec::new(),
            };
            if let Some(p) = parse_param(rest) {
                challenge.params.push(p);
            }
            out.push(challenge);
        }
    }
    out
}

/// Credentials handed to a scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

/// Strategy for one challenge scheme.
pub trait AuthScheme: Send + Sync {
    /// Scheme token as sent by servers (matched case-insensitively).
    fn name(&self) -> &'static str;

    /// Authorization header value answering `challenge` for `request`.
    fn authorization(
        &self,
        credentials: &Credentials,
        challenge: &Challenge,
        request: &Request,
    ) -> Result<String, ClientError>;
}

/// RFC 7617 Basic.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicScheme;

impl AuthScheme for BasicScheme {
    fn name(&self) -> &'static str {
        "Basic"
    }

    fn authorization(
        &self,
        credentials: &Credentials,
        _challenge: &Challenge,
        _request: &Request,
    ) -> Result<String, ClientError> {
        Ok(basic_auth_header(&credentials.username, &credentials.password))
    }
}

/// Recognised scheme without an implementation.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedScheme(pub &'static str);

impl AuthScheme for UnsupportedScheme {
    fn name(&self) -> &'static str {
        self.0
    }

    fn authorization(
        &self,
        _credentials: &Credentials,
        _challenge: &Challenge,
        _request: &Request,
    ) -> Result<String, ClientError> {
        Err(ClientError::UnsupportedAuthScheme(self.0.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    NoAuth,
    Pending,
    Authenticated,
}

/// Negotiation state of the current send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub credentials: Credentials,
    /// Scheme and realm of the last accepted challenge.
    pub scheme: Option<String>,
    pub realm: Option<String>,
    pub retries: u8,
}

/// Tracks credentials and the last challenge; decides on the single automatic resend.
pub struct AuthNegotiator {
    schemes: HashMap<String, Box<dyn AuthScheme>>,
    state: AuthState,
}

impl AuthNegotiator {
    /// Table with Basic plus Digest, Negotiate and NTLM placeholders.
    pub fn new() -> Self {
        let mut n = Self {
            schemes: HashMap::new(),
            state: AuthState::default(),
        };
        n.register(Box::new(BasicScheme));
        n.register(Box::new(UnsupportedScheme("Digest")));
        n.register(Box::new(UnsupportedScheme("Negotiate")));
        n.register(Box::new(UnsupportedScheme("NTLM")));
        n
    }

    /// Add or replace the strategy for a scheme.
    pub fn register(&mut self, scheme: Box<dyn AuthScheme>) {
        self.schemes.insert(scheme.name().to_ascii_lowercase(), scheme);
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Start a new send with the given credentials.
    pub fn begin(&mut self, username: &str, password: &str) {
        self.state = AuthState {
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
            ..AuthState::default()
        };
    }

    /// Inspect the response to `request`. Returns the request to resend, if any.
    pub fn on_response(&mut self, request: &Request, response: &Response) -> Option<Request> {
        if response.code != 401 || self.state.retries >= MAX_AUTH_RETRIES {
            return None;
        }
        if request.has_header("Authorization") {
            tracing::debug!("401 with explicit Authorization; not negotiating");
            return None;
        }
        if self.state.credentials.is_empty() {
            return None;
        }
        for challenge in parse_challenges(response.header_values("WWW-Authenticate")) {
            let Some(scheme) = self.schemes.get(&challenge.scheme.to_ascii_lowercase()) else {
                tracing::debug!("ignoring unknown auth scheme {}", challenge.scheme);
                continue;
            };
            match scheme.authorization(&self.state.credentials, &challenge, request) {
                Ok(value) => {
                    tracing::debug!(
                        "answering {} challenge (realm {:?})",
                        scheme.name(),
                        challenge.realm()
                    );
                    self.state.phase = AuthPhase::Pending;
                    self.state.scheme = Some(scheme.name().to_string());
                    self.state.realm = challenge.realm().map(str::to_string);
                    self.state.retries += 1;
                    return Some(request.with_header("Authorization", &value));
                }
                Err(e) => tracing::debug!("{}", e),
            }
        }
        None
    }

    /// Record the outcome of the resend.
    pub fn on_retry_response(&mut self, response: &Response) {
        if self.state.phase == AuthPhase::Pending && response.code != 401 {
            self.state.phase = AuthPhase::Authenticated;
        }
    }
}

impl Default for AuthNegotiator {
    fn default() -> Self {
        Self::new()
    }
}
