/*
 * parser.rs
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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked or
//! read-until-close).
//!
//! Bytes after a complete response are left in the buffer, which is what lets a pipelined
//! connection parse the next response from the same read.

use bytes::Buf;
use bytes::BytesMut;

use crate::error::ClientError;

/// Callback for HTTP/1.1 response events.
pub trait H1ResponseHandler {
    fn status(&mut self, version: &str, code: u16, reason: &str);
    fn header(&mut self, name: &str, value: &str);
    fn body_chunk(&mut self, data: &[u8]);
    fn trailer(&mut self, name: &str, value: &str);
    fn complete(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    StatusLine,
    Headers,
    /// Headers done; the connection must call `set_body_mode`.
    HeadersComplete,
    Body,
    ChunkSize,
    ChunkData,
    ChunkDataEnd,
    ChunkTrailer,
}

/// How the body of the current response is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// No body (HEAD, 1xx, 204, 304).
    Empty,
    Length(u64),
    Chunked,
    /// Body ends when the peer closes the connection.
    UntilClose,
}

/// Push parser for one HTTP/1.1 response at a time. Feed bytes via `receive`.
pub struct ResponseParser {
    state: ParseState,
    mode: BodyMode,
    remaining: u64,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            mode: BodyMode::Empty,
            remaining: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn body_mode(&self) -> BodyMode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.state = ParseState::StatusLine;
        self.mode = BodyMode::Empty;
        self.remaining = 0;
    }

    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    fn take_line(buf: &mut BytesMut) -> Option<BytesMut> {
        let end = Self::find_crlf(buf)?;
        let mut line = buf.split_to(end + 2);
        line.truncate(end);
        Some(line)
    }

    fn utf8<'a>(line: &'a [u8], what: &str) -> Result<&'a str, ClientError> {
        std::str::from_utf8(line).map_err(|_| ClientError::malformed(format!("invalid {} UTF-8", what)))
    }

    fn split_header(line: &str) -> Result<(&str, &str), ClientError> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ClientError::malformed(format!("header without colon: {:?}", line)))?;
        Ok((name.trim(), value.trim()))
    }

    /// Consume as much of `buf` as possible. Stops at `HeadersComplete` and at `Idle`.
    pub fn receive<H: H1ResponseHandler>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), ClientError> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let Some(line) = Self::take_line(buf) else {
                        return Ok(());
                    };
                    let line = Self::utf8(&line, "status line")?;
                    // HTTP/1.1 200 OK, or HTTP/1.1 200
                    let mut parts = line.splitn(3, ' ');
                    let version = parts
                        .next()
                        .and_then(|v| v.strip_prefix("HTTP/"))
                        .ok_or_else(|| ClientError::malformed(format!("bad status line: {:?}", line)))?;
                    let code = parts
                        .next()
                        .and_then(|c| c.parse::<u16>().ok())
                        .filter(|c| (100..1000).contains(c))
                        .ok_or_else(|| ClientError::malformed(format!("bad status code: {:?}", line)))?;
                    let reason = parts.next().unwrap_or("");
                    handler.status(version, code, reason);
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let Some(line) = Self::take_line(buf) else {
                        return Ok(());
                    };
                    if line.is_empty() {
                        self.state = ParseState::HeadersComplete;
                        return Ok(());
                    }
                    let line = Self::utf8(&line, "header")?;
                    let (name, value) = Self::split_header(line)?;
                    handler.header(name, value);
                }
                ParseState::HeadersComplete | ParseState::Idle => return Ok(()),
                ParseState::Body => {
                    if self.mode == BodyMode::UntilClose {
                        let chunk = buf.split_to(buf.len());
                        handler.body_chunk(&chunk);
                        return Ok(());
                    }
                    let n = (self.remaining.min(buf.len() as u64)) as usize;
                    let chunk = buf.split_to(n);
                    handler.body_chunk(&chunk);
                    self.remaining -= n as u64;
                    if self.remaining == 0 {
                        self.finish(handler);
                    }
                }
                ParseState::ChunkSize => {
                    let Some(line) = Self::take_line(buf) else {
                        return Ok(());
                    };
                    let line = Self::utf8(&line, "chunk size")?;
                    let hex = line.split(';').next().unwrap_or(line).trim();
                    self.remaining = u64::from_str_radix(hex, 16)
                        .map_err(|_| ClientError::malformed(format!("bad chunk size: {:?}", hex)))?;
                    self.state = if self.remaining == 0 {
                        ParseState::ChunkTrailer
                    } else {
                        ParseState::ChunkData
                    };
                }
                ParseState::ChunkData => {
                    let n = (self.remaining.min(buf.len() as u64)) as usize;
                    let chunk = buf.split_to(n);
                    handler.body_chunk(&chunk);
                    self.remaining -= n as u64;
                    if self.remaining == 0 {
                        self.state = ParseState::ChunkDataEnd;
                    }
                }
                ParseState::ChunkDataEnd => {
                    if buf.len() < 2 {
                        return Ok(());
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(ClientError::malformed("missing CRLF after chunk"));
                    }
                    buf.advance(2);
                    self.state = ParseState::ChunkSize;
                }
                ParseState::ChunkTrailer => {
                    let Some(line) = Self::take_line(buf) else {
                        return Ok(());
                    };
                    if line.is_empty() {
                        self.finish(handler);
                    } else {
                        let line = Self::utf8(&line, "trailer")?;
                        let (name, value) = Self::split_header(line)?;
                        handler.trailer(name, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Called once the headers are in (state `HeadersComplete`).
    pub fn set_body_mode<H: H1ResponseHandler>(&mut self, mode: BodyMode, handler: &mut H) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        self.mode = mode;
        match mode {
            BodyMode::Empty | BodyMode::Length(0) => self.finish(handler),
            BodyMode::Length(n) => {
                self.remaining = n;
                self.state = ParseState::Body;
            }
            BodyMode::Chunked => self.state = ParseState::ChunkSize,
            BodyMode::UntilClose => self.state = ParseState::Body,
        }
    }

    /// Peer closed the stream. Completes a read-until-close body; anything else is truncation.
    pub fn end_of_stream<H: H1ResponseHandler>(&mut self, handler: &mut H) -> Result<(), ClientError> {
        match (self.state, self.mode) {
            (ParseState::Idle, _) => Ok(()),
            (ParseState::Body, BodyMode::UntilClose) => {
                self.finish(handler);
                Ok(())
            }
            _ => Err(ClientError::ConnectionClosed),
        }
    }

    fn finish<H: H1ResponseHandler>(&mut self, handler: &mut H) {
        handler.complete();
        self.state = ParseState::Idle;
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
