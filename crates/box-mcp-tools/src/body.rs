//! Request body encodings.
//!
//! Arguments arrive as JSON, so binary content (upload parts, file parts) is carried as base64.

use crate::config::BodyEncoding;
use crate::error::{BoxToolsError, Result};
use crate::query::value_to_string;
use base64::Engine as _;
use mime::Mime;
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

/// Name of the parameter that carries the whole payload instead of one field.
pub(crate) const PAYLOAD_PARAM: &str = "body";

#[derive(Debug, Default)]
pub(crate) struct BodyArgs {
    pub payload: Option<Value>,
    pub fields: Map<String, Value>,
    pub files: Vec<(String, Value)>,
}

impl BodyArgs {
    fn is_empty(&self) -> bool {
        self.payload.is_none() && self.fields.is_empty() && self.files.is_empty()
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum RequestBody {
    Empty,
    Json(Value),
    JsonPatch(Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
    Binary(Vec<u8>),
}

#[derive(Debug, PartialEq)]
pub(crate) enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: Option<String>,
        data: Vec<u8>,
    },
}

pub(crate) fn encode_body(encoding: BodyEncoding, args: BodyArgs) -> Result<RequestBody> {
    if args.is_empty() {
        return Ok(RequestBody::Empty);
    }

    match encoding {
        BodyEncoding::Json => Ok(RequestBody::Json(
            args.payload.unwrap_or(Value::Object(args.fields)),
        )),
        BodyEncoding::JsonPatch => {
            let payload = args.payload.unwrap_or(Value::Object(args.fields));
            if !payload.is_array() {
                return Err(BoxToolsError::invalid_argument(
                    PAYLOAD_PARAM,
                    "a JSON patch body must be an array of operations",
                ));
            }
            Ok(RequestBody::JsonPatch(payload))
        }
        BodyEncoding::Form => Ok(RequestBody::Form(text_fields(args.payload, args.fields)?)),
        BodyEncoding::Multipart => {
            let mut parts: Vec<MultipartField> = text_fields(args.payload, args.fields)?
                .into_iter()
                .map(|(name, value)| MultipartField::Text { name, value })
                .collect();
            for (name, value) in &args.files {
                parts.push(decode_file_part(name, value)?);
            }
            Ok(RequestBody::Multipart(parts))
        }
        BodyEncoding::Binary => {
            let Some(payload) = args.payload else {
                return Err(BoxToolsError::MissingParameter(PAYLOAD_PARAM.to_string()));
            };
            let Some(encoded) = payload.as_str() else {
                return Err(BoxToolsError::invalid_argument(
                    PAYLOAD_PARAM,
                    "binary content must be a base64 string",
                ));
            };
            Ok(RequestBody::Binary(decode_base64(PAYLOAD_PARAM, encoded)?))
        }
    }
}

/// Flatten body fields into `(name, text)` pairs. Objects and arrays become JSON text, which is
/// what Box expects for e.g. the `attributes` part of an upload.
fn text_fields(payload: Option<Value>, fields: Map<String, Value>) -> Result<Vec<(String, String)>> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(fields.len());
    if let Some(payload) = payload {
        let Value::Object(map) = payload else {
            return Err(BoxToolsError::invalid_argument(
                PAYLOAD_PARAM,
                "a form body must be a JSON object",
            ));
        };
        out.extend(map.iter().map(|(k, v)| (k.clone(), value_to_string(v))));
    }
    out.extend(fields.iter().map(|(k, v)| (k.clone(), value_to_string(v))));
    Ok(out)
}

fn decode_file_part(name: &str, value: &Value) -> Result<MultipartField> {
    let (encoded, filename, content_type) = match value {
        Value::String(s) => (s.as_str(), None, None),
        Value::Object(obj) => {
            let Some(data) = obj.get("data").and_then(Value::as_str) else {
                return Err(BoxToolsError::invalid_argument(
                    name,
                    "file object requires a base64 'data' field",
                ));
            };
            (
                data,
                obj.get("filename").and_then(Value::as_str),
                obj.get("content_type").and_then(Value::as_str),
            )
        }
        _ => {
            return Err(BoxToolsError::invalid_argument(
                name,
                "expected a base64 string or {data, filename, content_type}",
            ));
        }
    };

    if let Some(ct) = content_type
        && ct.parse::<Mime>().is_err()
    {
        return Err(BoxToolsError::invalid_argument(
            name,
            format!("invalid content type '{ct}'"),
        ));
    }

    Ok(MultipartField::File {
        name: name.to_string(),
        filename: filename.unwrap_or(name).to_string(),
        content_type: content_type.map(str::to_string),
        data: decode_base64(name, encoded)?,
    })
}

fn decode_base64(name: &str, encoded: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| BoxToolsError::invalid_argument(name, format!("invalid base64: {e}")))
}

pub(crate) fn apply_body(request: RequestBuilder, body: RequestBody) -> Result<RequestBuilder> {
    let request = match body {
        RequestBody::Empty => request,
        RequestBody::Json(v) => request.json(&v),
        RequestBody::JsonPatch(v) => request
            .header(CONTENT_TYPE, BodyEncoding::JsonPatch.content_type())
            .body(v.to_string()),
        RequestBody::Form(pairs) => request.form(&pairs),
        RequestBody::Binary(bytes) => request
            .header(CONTENT_TYPE, BodyEncoding::Binary.content_type())
            .body(bytes),
        RequestBody::Multipart(fields) => {
            let mut form = Form::new();
            for field in fields {
                form = match field {
                    MultipartField::Text { name, value } => form.text(name, value),
                    MultipartField::File {
                        name,
                        filename,
                        content_type,
                        data,
                    } => {
                        let mut part = Part::bytes(data).file_name(filename);
                        if let Some(ct) = content_type {
                            part = part.mime_str(&ct)?;
                        }
                        form.part(name, part)
                    }
                };
            }
            request.multipart(form)
        }
    };
    Ok(request)
}
