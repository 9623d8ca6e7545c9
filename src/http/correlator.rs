//! Positional request/response correlation.
//!
//! Requests and responses are split independently and zipped in order. The
//! connection is assumed to alternate strictly between request and response,
//! so pipelined requests whose responses have not all arrived in the same
//! chunk surface as a [`CorrelationError::Mismatch`] rather than mismatched pairs.

use thiserror::Error;

use crate::http::message::{Exchange, ParsedRequest, ParsedResponse};
use crate::http::splitter::{split, FramingError};

/// Errors raised while correlating the two directions of a pair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    /// One of the streams could not be framed.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// The two streams yielded different message counts.
    #[error("number of requests ({requests}) does not match number of responses ({responses})")]
    Mismatch { requests: usize, responses: usize },
}

/// Pair every request in `request_bytes` with the response at the same position
/// in `response_bytes`.
pub fn correlate(
    response_bytes: &[u8],
    request_bytes: &[u8],
) -> Result<Vec<Exchange>, CorrelationError> {
    let requests: Vec<ParsedRequest> = split(request_bytes)?;
    let responses: Vec<ParsedResponse> = split(response_bytes)?;

    if requests.len() != responses.len() {
        return Err(CorrelationError::Mismatch {
            requests: requests.len(),
            responses: responses.len(),
        });
    }

    Ok(requests
        .into_iter()
        .zip(responses)
        .map(|(request, response)| Exchange { request, response })
        .collect())
}
