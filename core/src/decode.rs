//! Response decoding.
//!
//! The status check runs independently of JSON parsing: the API sends
//! structured `{"detail": ...}` bodies with error statuses, but a proxy in
//! between may answer with HTML. Either way a non-200 status is an `Api`
//! error, never a `Decode` error.

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::http::HttpResponse;

/// Parse the response body as JSON, failing on any status other than 200.
pub fn decode(response: &HttpResponse) -> Result<Value> {
    if response.status != 200 {
        let detail = serde_json::from_slice::<Value>(&response.body)
            .ok()
            .and_then(|body| error_detail(&body));
        warn!(status = response.status, detail = ?detail, "API returned an error status");
        return Err(Error::Api {
            status: response.status,
            detail,
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| Error::Decode {
        message: e.to_string(),
    })
}

/// Take `name` out of a JSON object envelope. Absent (or non-object
/// envelope) is an "Unexpected answer" `Api` error.
pub fn require_field(mut envelope: Value, name: &str, status: u16) -> Result<Value> {
    envelope
        .as_object_mut()
        .and_then(|obj| obj.remove(name))
        .ok_or_else(|| Error::unexpected_answer(status))
}

fn error_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
