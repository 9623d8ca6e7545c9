//! Azure Event Grid `BlobCreated` events for blob uploads.

use chrono::Utc;
use serde_json::{json, Value};

use crate::http::Exchange;
use crate::transform::{is_blob_created, trimmed_path, without_query, Transform, TransformError};

pub const BLOB_CREATED: &str = "Microsoft.Storage.BlobCreated";

/// Emits one `Microsoft.Storage.BlobCreated` envelope per successful `PUT`.
///
/// Request paths are expected as `/{account}/{container}/{blob...}`; the event
/// URL points back at the proxy as `http://{account}.blob.local:{proxy_port}`.
#[derive(Debug, Clone)]
pub struct EventGridTransform {
    proxy_port: u16,
}

impl EventGridTransform {
    pub fn new(proxy_port: u16) -> Self {
        Self { proxy_port }
    }

    fn blob_url(&self, path: &str) -> Result<String, TransformError> {
        let mut segments = trimmed_path(path).splitn(3, '/');
        let (Some(account), Some(container), Some(blob)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(TransformError::PathSegments {
                path: path.to_string(),
                expected: 3,
            });
        };

        Ok(format!(
            "http://{account}.blob.local:{}/{container}/{}",
            self.proxy_port,
            without_query(blob)
        ))
    }

    fn event(&self, exchange: &Exchange) -> Result<Value, TransformError> {
        let url = self.blob_url(&exchange.request.path)?;
        let event_time = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string();

        Ok(json!({
            "topic": "",
            "subject": "",
            "eventType": BLOB_CREATED,
            "id": "",
            "data": {
                "api": "PutBlob",
                "requestId": "",
                "eTag": "",
                "contentType": "application/octet-stream",
                "contentLength": 16,
                "blobType": "BlockBlob",
                "accessTier": "Default",
                "url": url,
                "sequencer": "",
                "storageDiagnostics": { "batchId": "" },
            },
            "dataVersion": "",
            "metadataVersion": "1",
            "eventTime": event_time,
        }))
    }
}

impl Transform for EventGridTransform {
    fn name(&self) -> &str {
        "event-grid"
    }

    fn transform(&self, exchanges: &[Exchange]) -> Result<Vec<Value>, TransformError> {
        exchanges
            .iter()
            .filter(|exchange| is_blob_created(exchange))
            .map(|exchange| self.event(exchange))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::exchange;

    #[test]
    fn put_created_becomes_blob_created_event() {
        let transform = EventGridTransform::new(10000);
        let events = transform
            .transform(&[exchange("PUT", "/acct/container/blob.txt?x=1", 201)])
            .unwrap();

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event["eventType"], BLOB_CREATED);
        assert_eq!(event["metadataVersion"], "1");
        assert_eq!(event["data"]["blobType"], "BlockBlob");
        assert_eq!(
            event["data"]["url"],
            "http://acct.blob.local:10000/container/blob.txt"
        );
        assert!(event["eventTime"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn nested_blob_names_are_kept() {
        let transform = EventGridTransform::new(8080);
        let events = transform
            .transform(&[exchange("PUT", "/devstore/images/2024/cat.png", 201)])
            .unwrap();
        assert_eq!(
            events[0]["data"]["url"],
            "http://devstore.blob.local:8080/images/2024/cat.png"
        );
    }

    #[test]
    fn other_methods_and_statuses_are_filtered() {
        let transform = EventGridTransform::new(10000);
        let events = transform
            .transform(&[
                exchange("GET", "/acct/container/blob.txt", 200),
                exchange("PUT", "/acct/container/blob.txt", 200),
                exchange("POST", "/acct/container/blob.txt", 201),
                exchange("DELETE", "/acct/container/blob.txt", 202),
            ])
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn short_path_is_an_error() {
        let transform = EventGridTransform::new(10000);
        let err = transform
            .transform(&[exchange("PUT", "/acct/container", 201)])
            .unwrap_err();
        assert!(matches!(err, TransformError::PathSegments { expected: 3, .. }));
    }
}
