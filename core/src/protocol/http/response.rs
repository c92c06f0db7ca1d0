/*
 * response.rs
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

//! Fully read HTTP response.

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    /// Reason phrase; empty when the status line had none.
    pub message: String,
    /// Version from the status line, e.g. `1.1`.
    pub version: String,
    /// Headers in received order; names repeat for multi-value headers.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            message: String::new(),
            version: "1.1".to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_reason(code: u16, reason: impl Into<String>) -> Self {
        Self {
            message: reason.into(),
            ..Self::new(code)
        }
    }

    /// First value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, in received order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// True when the server asked for the connection to be closed after this response.
    pub fn wants_close(&self) -> bool {
        let close_token = self
            .header_values("Connection")
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case("close"));
        close_token || (self.version == "1.0" && !self.keep_alive_token())
    }

    fn keep_alive_token(&self) -> bool {
        self.header_values("Connection")
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case("keep-alive"))
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
