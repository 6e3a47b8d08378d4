//! Default JSON codec.
//!
//! Output omits null object members and is pretty-printed; input is parsed
//! tolerantly (typed conversion through `serde` ignores unknown fields).
//! Encoder and decoder are separate capabilities: overriding one never
//! changes the other.

use serde_json::Value;

use crate::{DecodeError, EncodeError, Encoder, RequestTemplate, Response};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Output settings of [`JsonEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonEncoderOptions {
    /// Drop object members whose value is `null`, at any depth.
    pub omit_nulls: bool,
    /// Indent the output.
    pub pretty: bool,
}

impl Default for JsonEncoderOptions {
    fn default() -> Self {
        Self {
            omit_nulls: true,
            pretty: true,
        }
    }
}

/// JSON request-body encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder {
    options: JsonEncoderOptions,
}

impl JsonEncoder {
    pub fn new(options: JsonEncoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> JsonEncoderOptions {
        self.options
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, body: &Value, template: &mut RequestTemplate) -> Result<(), EncodeError> {
        let body = if self.options.omit_nulls {
            strip_nulls(body.clone())
        } else {
            body.clone()
        };
        let bytes = if self.options.pretty {
            serde_json::to_vec_pretty(&body)
        } else {
            serde_json::to_vec(&body)
        }
        .map_err(|e| EncodeError::new(e.to_string()))?;

        if !template.headers().contains(CONTENT_TYPE) {
            template.set_header(CONTENT_TYPE, APPLICATION_JSON);
        }
        template.set_body(bytes);
        Ok(())
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// JSON response decoder.
///
/// `204 No Content` and blank bodies decode to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl crate::Decoder for JsonDecoder {
    fn decode(&self, response: &Response) -> Result<Value, DecodeError> {
        if response.status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| DecodeError::new(e.to_string()))
    }
}
