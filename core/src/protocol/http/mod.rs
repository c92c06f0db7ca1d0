/*
 * mod.rs
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

//! HTTP/1.1 client.
//!
//! - `builder`: requests from option mappings, header order fixed.
//! - `multipart`: `multipart/form-data` bodies with injected boundaries.
//! - `auth`: withhold credentials, answer one Basic challenge.
//! - `connection`: one stream, lockstep or pipelined, push-parsed responses (`h1`).
//! - `proxy`: CONNECT tunnelling through a chain of HTTP proxies.
//! - `client`: the facade tying them together.

mod request;
mod response;

pub mod auth;
pub mod builder;
pub mod client;
pub mod connection;
pub mod h1;
pub mod multipart;
pub mod proxy;

pub use auth::{basic_auth_header, AuthNegotiator, AuthPhase, AuthState};
pub use builder::RequestBuilder;
pub use client::HttpClient;
pub use connection::ConnectionManager;
pub use h1::H1ResponseHandler;
pub use multipart::{FormPart, FormValue, MultipartBody, MultipartEncoder, Scalar, Slot, TransferEncoding};
pub use request::{Method, Request};
pub use response::Response;
