//! Minimal upload summary transform.

use serde_json::{json, Value};

use crate::http::Exchange;
use crate::transform::{is_blob_created, trimmed_path, without_query, Transform, TransformError};

/// Emits `{endpoint, container_name, path}` for every successful `PUT`.
#[derive(Debug, Clone, Default)]
pub struct SampleTransform;

impl Transform for SampleTransform {
    fn name(&self) -> &str {
        "sample"
    }

    fn transform(&self, exchanges: &[Exchange]) -> Result<Vec<Value>, TransformError> {
        exchanges
            .iter()
            .filter(|exchange| is_blob_created(exchange))
            .map(|exchange| {
                let path = &exchange.request.path;
                let mut segments = trimmed_path(path).split('/');
                let (Some(endpoint), Some(container)) = (segments.next(), segments.next()) else {
                    return Err(TransformError::PathSegments {
                        path: path.clone(),
                        expected: 2,
                    });
                };
                let rest = segments.collect::<Vec<_>>().join("/");

                Ok(json!({
                    "endpoint": endpoint,
                    "container_name": container,
                    "path": without_query(&rest),
                }))
            })
            .collect()
    }
}
