/*
 * error.rs
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

//! Client errors.
//!
//! Transport failures are surfaced unmodified and never retried internally.
//! The request builder, the multipart encoder and `set_config` never fail.

use std::io;
use std::time::Duration;

/// Errors from connecting, exchanging or negotiating on an HTTP connection.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection to {host}:{port} refused")]
    ConnectionRefused { host: String, port: u16 },

    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectionTimedOut {
        host: String,
        port: u16,
        timeout: Duration,
    },

    #[error("no response within {0:?}")]
    ReadTimedOut(Duration),

    #[error("connection closed before the response was complete")]
    ConnectionClosed,

    #[error("not connected")]
    NotConnected,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Challenge scheme other than Basic. Only reported internally; the 401 is returned.
    #[error("unsupported authentication scheme: {0}")]
    UnsupportedAuthScheme(String),

    #[error("proxy negotiation failed: {0}")]
    Proxy(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ClientError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Map a transport-level connect error for (host, port) onto the taxonomy.
    pub fn from_connect(err: io::Error, host: &str, port: u16, timeout: Duration) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused {
                host: host.to_string(),
                port,
            },
            io::ErrorKind::TimedOut => Self::ConnectionTimedOut {
                host: host.to_string(),
                port,
                timeout,
            },
            _ => Self::Io(err),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimedOut { .. } | Self::ReadTimedOut(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_maps_to_connection_refused() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "nope");
        let mapped = ClientError::from_connect(err, "127.0.0.1", 1, Duration::from_secs(1));
        assert!(matches!(mapped, ClientError::ConnectionRefused { port: 1, .. }));
    }

    #[test]
    fn timed_out_is_distinct() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "slow");
        let mapped = ClientError::from_connect(err, "10.0.0.1", 80, Duration::from_millis(5));
        assert!(mapped.is_timeout());
        assert!(!matches!(mapped, ClientError::ConnectionRefused { .. }));
    }

    #[test]
    fn other_kinds_stay_io() {
        let err = io::Error::new(io::ErrorKind::AddrNotAvailable, "bind");
        let mapped = ClientError::from_connect(err, "h", 80, Duration::from_secs(1));
        assert!(matches!(mapped, ClientError::Io(_)));
    }
}
