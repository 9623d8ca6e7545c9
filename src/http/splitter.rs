//! Splits a byte buffer into back-to-back HTTP messages.
//!
//! # Framing Rules
//! - The head ends at the first `\r\n\r\n`; no delimiter means the buffer holds
//!   an incomplete message and nothing more is emitted
//! - `Content-Length: N` frames exactly `N` body bytes, then splitting resumes
//! - No `Content-Length` makes the message the last one in the buffer
//! - A non-integer `Content-Length` also ends the buffer (the message itself is kept)

use thiserror::Error;

use crate::http::message::{Headers, HttpMessage};

const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";
const LINE_DELIMITER: &str = "\r\n";

/// Errors raised while framing a buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The message head is not valid text.
    #[error("message head is not valid UTF-8")]
    Encoding,

    /// The request or status line does not have the expected fields.
    #[error("malformed start line: {0:?}")]
    StartLine(String),

    /// The status code of a response is not numeric.
    #[error("invalid status code: {0:?}")]
    StatusCode(String),

    /// A header line lacks the `: ` separator.
    #[error("malformed header line: {0:?}")]
    Header(String),
}

/// Split `raw` into every complete message it contains, in order.
pub fn split<M: HttpMessage>(raw: &[u8]) -> Result<Vec<M>, FramingError> {
    let mut messages = Vec::new();
    let mut remaining = raw;

    while !remaining.is_empty() {
        let Some(head_len) = find_subsequence(remaining, HEADER_DELIMITER) else {
            break;
        };

        let head = std::str::from_utf8(&remaining[..head_len]).map_err(|_| FramingError::Encoding)?;
        let mut lines = head.split(LINE_DELIMITER);
        let start_line = lines.next().unwrap_or_default();
        let headers = parse_headers(lines)?;

        let after_head = &remaining[head_len + HEADER_DELIMITER.len()..];
        let content_length = headers
            .get("content-length")
            .map(|value| value.trim().parse::<usize>());

        let (body, rest) = match content_length {
            Some(Ok(len)) => {
                let len = len.min(after_head.len());
                (&after_head[..len], Some(&after_head[len..]))
            }
            // Unbounded or unparsable body: take what is there and stop.
            Some(Err(_)) | None => (after_head, None),
        };

        messages.push(M::from_parts(
            start_line,
            headers,
            String::from_utf8_lossy(body).into_owned(),
        )?);

        match rest {
            Some(rest) => remaining = rest,
            None => break,
        }
    }

    Ok(messages)
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Headers, FramingError> {
    let mut headers = Headers::new();
    for line in lines {
        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| FramingError::Header(line.to_string()))?;
        headers.insert(key.to_ascii_lowercase(), value.to_string());
    }
    Ok(headers)
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
