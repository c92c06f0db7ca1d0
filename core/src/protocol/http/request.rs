/*
 * request.rs
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

//! HTTP request: method, resource, version, ordered headers, body.
//!
//! Built by `RequestBuilder`; serialised exactly as stored by `to_bytes`.

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(s) => s,
        }
    }

    /// Known methods match case-insensitively; anything else is sent as given.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => Method::Other(token.to_string()),
        }
    }
}

/// A fully built request. Header order is wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Resource path including any query string.
    pub uri: String,
    /// Protocol version without the `HTTP/` prefix, e.g. `1.1`.
    pub version: String,
    pub headers: Vec<(String, String)>,
    /// Pre-formatted header lines appended after `headers`, verbatim.
    pub raw_headers: String,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: "1.1".to_string(),
            headers: Vec::new(),
            raw_headers: String::new(),
            body: Vec::new(),
        }
    }

    /// First header value with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
            || raw_header_names(&self.raw_headers).any(|k| k.eq_ignore_ascii_case(name))
    }

    /// Append a header at the end of the list.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Copy of this request with one more header appended.
    pub fn with_header(&self, name: &str, value: &str) -> Request {
        let mut out = self.clone();
        out.push_header(name, value);
        out
    }

    /// Serialise: request line, headers, raw headers, blank line, body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(self.method.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.uri.as_bytes());
        out.extend_from_slice(b" HTTP/");
        out.extend_from_slice(self.version.as_bytes());
        out.extend_from_slice(b"\r\n");
        for (k, v) in &self.headers {
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(v.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        if !self.raw_headers.is_empty() {
            out.extend_from_slice(self.raw_headers.as_bytes());
            if !self.raw_headers.ends_with("\r\n") {
                out.extend_from_slice(b"\r\n");
            }
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    /// True when the response to this request carries no body whatever its headers say.
    pub fn expects_bodyless_response(&self) -> bool {
        self.method == Method::Head
    }
}

fn raw_header_names(raw: &str) -> impl Iterator<Item = &str> {
    raw.split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .map(|(k, _)| k.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_in_order() {
        let mut r = Request::new(Method::Post, "/x?y=1");
        r.push_header("Host", "example.com");
        r.push_header("Content-Length", "2");
        r.body = b"hi".to_vec();
        assert_eq!(
            r.to_bytes(),
            b"POST /x?y=1 HTTP/1.1\r\nHost: example.com\r\nContent-Length: 2\r\n\r\nhi".to_vec()
        );
    }

    #[test]
    fn raw_headers_gain_crlf() {
        let mut r = Request::new(Method::Get, "/");
        r.raw_headers = "X-One: 1\r\nX-Two: 2".to_string();
        let s = String::from_utf8(r.to_bytes()).unwrap();
        assert!(s.ends_with("X-One: 1\r\nX-Two: 2\r\n\r\n"));
        assert!(r.has_header("x-two"));
    }

    #[test]
    fn method_tokens() {
        assert_eq!(Method::from_token("post"), Method::Post);
        assert_eq!(Method::from_token("PROPFIND").as_str(), "PROPFIND");
    }

    #[test]
    fn with_header_leaves_original() {
        let r = Request::new(Method::Get, "/");
        let r2 = r.with_header("Authorization", "Basic x");
        assert!(r.header("authorization").is_none());
        assert_eq!(r2.header("Authorization"), Some("Basic x"));
    }
}
