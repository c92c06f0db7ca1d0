/*
 * lib.rs
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

//! Wirehttp core: byte-exact HTTP/1.1 requests, multipart form encoding, adaptive Basic
//! authentication and a single managed connection with optional pipelining.
//!
//! Entry point is [`HttpClient`]. The pieces it composes (request builder, multipart
//! encoder, auth negotiator, connection manager) are public for direct use.

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod random;

pub use config::{ClientSettings, Options, ProxySpec, SslVersion};
pub use error::{ClientError, Result};
pub use protocol::http::{HttpClient, Request, Response};
