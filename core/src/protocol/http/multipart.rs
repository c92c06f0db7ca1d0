/*
 * multipart.rs
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

//! multipart/form-data body encoder.
//!
//! Output for parts P1..Pn with boundary B:
//!
//! ```text
//! --B\r\n
//! Content-Disposition: form-data; name="..."; filename="..."\r\n
//! Content-Type: text/plain\r\n
//! Content-Transfer-Encoding: 8bit\r\n
//! \r\n
//! <data>\r\n
//! ...
//! --B--\r\n
//! ```
//!
//! The encoder never fails: every odd or missing field falls back to a fixed default.
//! Option resolution is three-valued (`Slot`): an absent key takes the default, a nil value
//! suppresses the header or attribute.

use std::io::Read;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::random::RandomStringProvider;

/// Literal dashes at the start of every boundary.
pub const BOUNDARY_DASHES: usize = 28;
/// Random alphanumerics after the dashes.
pub const BOUNDARY_RANDOM_LEN: usize = 30;

const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Characters escaped inside a quoted filename. Non-ASCII is always escaped.
const FILENAME: &AsciiSet = &CONTROLS.add(b'"').add(b'%').add(b'\\');

/// Three-valued option: key absent, key present with nil, key present with a value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot<T> {
    #[default]
    Absent,
    Nil,
    Value(T),
}

impl<T> Slot<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Slot::Absent)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    /// `Some` is a value, `None` an explicit nil.
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => Slot::Value(v),
            None => Slot::Nil,
        }
    }
}

/// Content-Transfer-Encoding label of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    #[default]
    EightBit,
    /// Payload bytes are emitted untouched (no line-ending normalisation).
    Binary,
    /// Only the header is set; the payload is not transformed.
    Base64,
}

impl TransferEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEncoding::EightBit => "8bit",
            TransferEncoding::Binary => "binary",
            TransferEncoding::Base64 => "base64",
        }
    }

    /// Unknown labels fall back to 8bit.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "binary" => TransferEncoding::Binary,
            "base64" => TransferEncoding::Base64,
            _ => TransferEncoding::EightBit,
        }
    }
}

/// Non-text values with one fixed textual rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<FormValue>),
    Map(Vec<(String, FormValue)>),
}

/// Part name or payload.
///
/// Rendering rule (`to_bytes`): nil is empty; text and bytes verbatim; integers in decimal;
/// floats and booleans as JSON scalars; lists and maps as compact JSON, with byte strings
/// decoded lossily as UTF-8 and map keys kept in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormValue {
    #[default]
    Nil,
    Text(String),
    Bytes(Vec<u8>),
    Scalar(Scalar),
}

impl FormValue {
    /// Read a stream to its end. A read error keeps whatever arrived before it.
    pub fn from_reader<R: Read>(mut reader: R) -> Self {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            tracing::debug!("form data read stopped after {} bytes: {}", buf.len(), e);
        }
        FormValue::Bytes(buf)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            FormValue::Nil => Vec::new(),
            FormValue::Text(s) => s.as_bytes().to_vec(),
            FormValue::Bytes(b) => b.clone(),
            FormValue::Scalar(Scalar::Int(n)) => n.to_string().into_bytes(),
            FormValue::Scalar(Scalar::Float(f)) => float_text(*f).into_bytes(),
            FormValue::Scalar(_) => self.json_text().into_bytes(),
        }
    }

    fn json_text(&self) -> String {
        use serde_json::Value;
        match self {
            FormValue::Nil => "null".to_string(),
            FormValue::Text(s) => Value::String(s.clone()).to_string(),
            FormValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()).to_string(),
            FormValue::Scalar(Scalar::Int(n)) => n.to_string(),
            FormValue::Scalar(Scalar::Float(f)) => match serde_json::Number::from_f64(*f) {
                Some(n) => n.to_string(),
                None => Value::String(f.to_string()).to_string(),
            },
            FormValue::Scalar(Scalar::Bool(b)) => b.to_string(),
            FormValue::Scalar(Scalar::List(items)) => {
                let items: Vec<String> = items.iter().map(FormValue::json_text).collect();
                format!("[{}]", items.join(","))
            }
            FormValue::Scalar(Scalar::Map(entries)) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v.json_text()))
                    .collect();
                format!("{{{}}}", entries.join(","))
            }
        }
    }
}

/// JSON number text when finite (`1.0`, `2.5`), Rust's rendering otherwise (`NaN`, `inf`).
fn float_text(f: f64) -> String {
    serde_json::Number::from_f64(f)
        .map(|n| n.to_string())
        .unwrap_or_else(|| f.to_string())
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<Vec<u8>> for FormValue {
    fn from(b: Vec<u8>) -> Self {
        FormValue::Bytes(b)
    }
}

impl From<&[u8]> for FormValue {
    fn from(b: &[u8]) -> Self {
        FormValue::Bytes(b.to_vec())
    }
}

impl From<i64> for FormValue {
    fn from(n: i64) -> Self {
        FormValue::Scalar(Scalar::Int(n))
    }
}

impl From<f64> for FormValue {
    fn from(f: f64) -> Self {
        FormValue::Scalar(Scalar::Float(f))
    }
}

impl From<bool> for FormValue {
    fn from(b: bool) -> Self {
        FormValue::Scalar(Scalar::Bool(b))
    }
}

impl<T: Into<FormValue>> From<Option<T>> for FormValue {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(FormValue::Nil)
    }
}

/// One multipart part descriptor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormPart {
    /// Only a text name produces `name="..."`.
    pub name: FormValue,
    pub data: FormValue,
    /// Absent: defaults to a text name. Nil: no filename attribute.
    pub filename: Slot<String>,
    /// Absent: text/plain. Nil: no Content-Type header.
    pub mime_type: Slot<String>,
    /// Absent: 8bit. Nil: no Content-Transfer-Encoding header.
    pub encoding: Slot<TransferEncoding>,
}

impl FormPart {
    pub fn new(name: impl Into<FormValue>, data: impl Into<FormValue>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn unnamed(data: impl Into<FormValue>) -> Self {
        Self::new(FormValue::Nil, data)
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Slot::Value(filename.into());
        self
    }

    pub fn no_filename(mut self) -> Self {
        self.filename = Slot::Nil;
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Slot::Value(mime_type.into());
        self
    }

    pub fn no_mime_type(mut self) -> Self {
        self.mime_type = Slot::Nil;
        self
    }

    pub fn encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = Slot::Value(encoding);
        self
    }

    pub fn no_encoding(mut self) -> Self {
        self.encoding = Slot::Nil;
        self
    }

    fn content_disposition(&self) -> String {
        let mut cd = String::from("form-data");
        let name = self
            .name
            .as_text()
            .map(|n| utf8_percent_encode(n, FILENAME).to_string());
        if let Some(name) = &name {
            cd.push_str("; name=\"");
            cd.push_str(name);
            cd.push('"');
        }
        let filename = match &self.filename {
            Slot::Value(f) => Some(utf8_percent_encode(f, FILENAME).to_string()),
            Slot::Absent => name,
            Slot::Nil => None,
        };
        if let Some(filename) = filename {
            cd.push_str("; filename=\"");
            cd.push_str(&filename);
            cd.push('"');
        }
        cd
    }

    fn content_type(&self) -> Option<&str> {
        match &self.mime_type {
            Slot::Absent => Some(DEFAULT_MIME_TYPE),
            Slot::Nil => None,
            Slot::Value(m) => Some(m),
        }
    }

    fn transfer_encoding(&self) -> Option<TransferEncoding> {
        match self.encoding {
            Slot::Absent => Some(TransferEncoding::EightBit),
            Slot::Nil => None,
            Slot::Value(e) => Some(e),
        }
    }

    fn payload(&self) -> Vec<u8> {
        let data = self.data.to_bytes();
        if self.encoding.as_value() == Some(&TransferEncoding::Binary) {
            data
        } else {
            normalize_line_endings(&data)
        }
    }
}

/// Drop every CR, then expand each LF to CRLF.
pub fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 16);
    for &b in data {
        match b {
            b'\r' => {}
            b'\n' => out.extend_from_slice(b"\r\n"),
            _ => out.push(b),
        }
    }
    out
}

/// Encoded body plus the header value that names its boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Encodes ordered form parts. One boundary per `encode` call.
pub struct MultipartEncoder<'a> {
    random: &'a dyn RandomStringProvider,
}

impl<'a> MultipartEncoder<'a> {
    pub fn new(random: &'a dyn RandomStringProvider) -> Self {
        Self { random }
    }

    /// 28 dashes followed by 30 random alphanumerics.
    pub fn boundary(&self) -> String {
        let mut b = "-".repeat(BOUNDARY_DASHES);
        b.push_str(&self.random.alnum(BOUNDARY_RANDOM_LEN));
        b
    }

    pub fn encode(&self, parts: &[FormPart]) -> MultipartBody {
        encode_with_boundary(self.boundary(), parts)
    }
}

/// Encode with a caller-chosen boundary.
pub fn encode_with_boundary(boundary: String, parts: &[FormPart]) -> MultipartBody {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(b"--");
        out.extend_from_slice(boundary.as_bytes());
        out.extend_from_slice(b"\r\n");
        append_header(&mut out, "Content-Disposition", &part.content_disposition());
        if let Some(ct) = part.content_type() {
            append_header(&mut out, "Content-Type", ct);
        }
        if let Some(enc) = part.transfer_encoding() {
            append_header(&mut out, "Content-Transfer-Encoding", enc.as_str());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.payload());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--\r\n");
    MultipartBody {
        content_type: format!("multipart/form-data; boundary={}", boundary),
        boundary,
        body: out,
    }
}

fn append_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedProvider;

    fn encode(parts: &[FormPart]) -> String {
        let random = FixedProvider("X".repeat(30));
        let body = MultipartEncoder::new(&random).encode(parts);
        String::from_utf8(body.body).unwrap()
    }

    fn boundary() -> String {
        format!("{}{}", "-".repeat(28), "X".repeat(30))
    }

    #[test]
    fn boundary_has_dashes_then_random() {
        let random = FixedProvider("abc".to_string());
        let b = MultipartEncoder::new(&random).boundary();
        assert_eq!(b, format!("{}abc", "-".repeat(28)));
    }

    #[test]
    fn single_named_part_defaults() {
        let out = encode(&[FormPart::new("field", "value")]);
        let b = boundary();
        let expected = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"field\"; filename=\"field\"\r\n\
             Content-Type: text/plain\r\nContent-Transfer-Encoding: 8bit\r\n\r\nvalue\r\n--{b}--\r\n"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn unnamed_parts_keep_order() {
        let out = encode(&[FormPart::new(FormValue::Nil, "123"), FormPart::unnamed("456")]);
        assert_eq!(out.matches("Content-Disposition: form-data\r\n").count(), 2);
        assert!(!out.contains("name="));
        assert!(out.find("123").unwrap() < out.find("456").unwrap());
    }

    #[test]
    fn non_text_names_are_unnamed() {
        let out = encode(&[
            FormPart::new(42i64, "a"),
            FormPart::new(true, "b"),
            FormPart::new(FormValue::Scalar(Scalar::List(vec![])), "c"),
        ]);
        assert!(!out.contains("name="));
        assert!(!out.contains("filename="));
    }

    #[test]
    fn explicit_filename_is_escaped() {
        let out = encode(&[FormPart::new("f", "x").filename("a \"b\"%.txt")]);
        assert!(out.contains("filename=\"a %22b%22%25.txt\""));
    }

    #[test]
    fn nil_filename_is_omitted() {
        let out = encode(&[FormPart::new("f", "x").no_filename()]);
        assert!(out.contains("Content-Disposition: form-data; name=\"f\"\r\n"));
    }

    #[test]
    fn filename_without_name() {
        let out = encode(&[FormPart::unnamed("x").filename("up.bin")]);
        assert!(out.contains("Content-Disposition: form-data; filename=\"up.bin\"\r\n"));
    }

    #[test]
    fn nil_mime_and_encoding_suppress_headers() {
        let out = encode(&[FormPart::new("f", "x").no_mime_type().no_encoding()]);
        assert!(!out.contains("Content-Type"));
        assert!(!out.contains("Content-Transfer-Encoding"));
    }

    #[test]
    fn explicit_mime_type() {
        let out = encode(&[FormPart::new("f", "x").mime_type("image/png")]);
        assert!(out.contains("Content-Type: image/png\r\n"));
    }

    #[test]
    fn text_line_endings_normalised() {
        let out = encode(&[FormPart::new("f", "a\nb\r\nc\rd")]);
        assert!(out.contains("\r\n\r\na\r\nb\r\ncd\r\n--"));
    }

    #[test]
    fn binary_bytes_untouched() {
        let data = vec![0u8, b'\n', 0xff, b'\r'];
        let random = FixedProvider("X".repeat(30));
        let body = MultipartEncoder::new(&random)
            .encode(&[FormPart::new("f", data.clone()).encoding(TransferEncoding::Binary)]);
        let window = body.body.windows(data.len()).any(|w| w == data.as_slice());
        assert!(window);
        assert!(String::from_utf8_lossy(&body.body).contains("Content-Transfer-Encoding: binary"));
    }

    #[test]
    fn quote_and_newline_in_name_are_escaped() {
        let out = encode(&[FormPart::new("a\"b\r\nX-Injected: 1", "v")]);
        assert!(out.contains(
            "Content-Disposition: form-data; name=\"a%22b%0D%0AX-Injected: 1\"; \
             filename=\"a%22b%0D%0AX-Injected: 1\"\r\n"
        ));
        assert!(!out.contains("\r\nX-Injected"));
    }

    #[test]
    fn base64_labels_without_encoding() {
        let out = encode(&[FormPart::new("f", "raw payload").encoding(TransferEncoding::Base64)]);
        assert!(out.contains("Content-Transfer-Encoding: base64\r\n\r\nraw payload\r\n"));
    }

    #[test]
    fn scalar_coercions() {
        assert_eq!(FormValue::Nil.to_bytes(), b"");
        assert_eq!(FormValue::from(42i64).to_bytes(), b"42");
        assert_eq!(FormValue::from(-7i64).to_bytes(), b"-7");
        assert_eq!(FormValue::from(true).to_bytes(), b"true");
        assert_eq!(FormValue::from(1.5f64).to_bytes(), b"1.5");
        let list = FormValue::Scalar(Scalar::List(vec![
            FormValue::from(1i64),
            FormValue::from("a"),
            FormValue::Nil,
        ]));
        assert_eq!(list.to_bytes(), br#"[1,"a",null]"#);
    }

    #[test]
    fn map_keeps_insertion_order() {
        let map = FormValue::Scalar(Scalar::Map(vec![
            ("z".to_string(), FormValue::from(1i64)),
            ("a".to_string(), FormValue::from(false)),
        ]));
        let text = String::from_utf8(map.to_bytes()).unwrap();
        assert!(text.starts_with('{'));
        assert!(text.find("\"z\"").unwrap() < text.find("\"a\"").unwrap());
    }

    #[test]
    fn reader_is_read_fully() {
        let v = FormValue::from_reader(std::io::Cursor::new(b"hello\nworld".to_vec()));
        assert_eq!(v.to_bytes(), b"hello\nworld");
    }

    #[test]
    fn content_length_matches_body() {
        let random = FixedProvider("Q".repeat(30));
        let body = MultipartEncoder::new(&random).encode(&[
            FormPart::new("a", "line1\nline2"),
            FormPart::new("b", vec![1u8, 2, 3]).encoding(TransferEncoding::Binary),
        ]);
        assert_eq!(body.content_length(), body.body.len());
        assert!(body.body.ends_with(format!("--{}--\r\n", body.boundary).as_bytes()));
        assert_eq!(
            body.content_type,
            format!("multipart/form-data; boundary={}", body.boundary)
        );
    }

    #[test]
    fn empty_parts_is_terminator_only() {
        assert_eq!(encode(&[]), format!("--{}--\r\n", boundary()));
    }
}
