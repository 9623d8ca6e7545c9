//! Parsed HTTP message records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::http::splitter::FramingError;

/// Header map with lower-cased keys. Repeated headers keep the last value.
pub type Headers = BTreeMap<String, String>;

/// A message type the splitter can build from a start line, headers and body.
pub trait HttpMessage: Sized {
    /// Build the message from its start line, parsed headers and body.
    fn from_parts(start_line: &str, headers: Headers, body: String) -> Result<Self, FramingError>;
}

/// A request reconstructed from the client-facing byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRequest {
    pub method: String,
    pub path: String,
    pub headers: Headers,
    /// Body bytes decoded lossily as UTF-8; empty when there is no body.
    pub body: String,
}

impl HttpMessage for ParsedRequest {
    fn from_parts(start_line: &str, headers: Headers, body: String) -> Result<Self, FramingError> {
        let mut parts = start_line.splitn(3, ' ');
        let (Some(method), Some(path), Some(_version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(FramingError::StartLine(start_line.to_string()));
        };

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            headers,
            body,
        })
    }
}

/// A response reconstructed from the backend-facing byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResponse {
    pub version: String,
    pub status_code: u16,
    pub reason_phrase: String,
    pub headers: Headers,
    pub body: String,
}

impl HttpMessage for ParsedResponse {
    fn from_parts(start_line: &str, headers: Headers, body: String) -> Result<Self, FramingError> {
        let mut parts = start_line.splitn(3, ' ');
        let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
            return Err(FramingError::StartLine(start_line.to_string()));
        };
        let status_code = code
            .parse::<u16>()
            .map_err(|_| FramingError::StatusCode(code.to_string()))?;

        Ok(Self {
            version: version.to_string(),
            status_code,
            reason_phrase: parts.next().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// One request paired with the response that answered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub request: ParsedRequest,
    pub response: ParsedResponse,
}

impl Exchange {
    /// One-line `METHOD PATH: STATUS REASON` summary used in logs.
    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} {}",
            self.request.method,
            self.request.path,
            self.response.status_code,
            self.response.reason_phrase
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_requires_three_fields() {
        let err = ParsedRequest::from_parts("GET /", Headers::new(), String::new()).unwrap_err();
        assert!(matches!(err, FramingError::StartLine(_)));
    }

    #[test]
    fn response_reason_may_contain_spaces() {
        let res =
            ParsedResponse::from_parts("HTTP/1.1 404 Not Found", Headers::new(), String::new())
                .unwrap();
        assert_eq!(res.status_code, 404);
        assert_eq!(res.reason_phrase, "Not Found");
    }

    #[test]
    fn response_without_reason_is_accepted() {
        let res = ParsedResponse::from_parts("HTTP/1.1 204", Headers::new(), String::new()).unwrap();
        assert_eq!(res.status_code, 204);
        assert_eq!(res.reason_phrase, "");
    }

    #[test]
    fn non_numeric_status_is_rejected() {
        let err = ParsedResponse::from_parts("HTTP/1.1 OK fine", Headers::new(), String::new())
            .unwrap_err();
        assert!(matches!(err, FramingError::StatusCode(code) if code == "OK"));
    }

    #[test]
    fn exchange_summary_format() {
        let exchange = Exchange {
            request: ParsedRequest::from_parts("PUT /a/b HTTP/1.1", Headers::new(), String::new())
                .unwrap(),
            response: ParsedResponse::from_parts(
                "HTTP/1.1 201 Created",
                Headers::new(),
                String::new(),
            )
            .unwrap(),
        };
        assert_eq!(exchange.summary(), "PUT /a/b: 201 Created");
    }
}
