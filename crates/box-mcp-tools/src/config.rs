//! Declarative configuration for the Box tool source.
//!
//! A [`BoxServerConfig`] carries the upstream base URLs, authentication, request defaults and the
//! endpoint catalogue. The catalogue maps an operation id to a [`BoxToolConfig`] describing the
//! HTTP method, path template, parameters and body encoding.
//!
//! Parameters accept a compact shorthand next to the full object form:
//!
//! ```yaml
//! params:
//!   file_id: path            # required path segment
//!   fields: query:array      # comma-joined query value
//!   parent: body:object      # JSON body field
//!   if_match: { in: header, name: if-match }
//! ```

use crate::error::{BoxToolsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_API_BASE: &str = "https://api.box.com/2.0";
pub const DEFAULT_UPLOAD_BASE: &str = "https://upload.box.com/api/2.0";
pub const DEFAULT_OAUTH_BASE: &str = "https://api.box.com";

/// Top-level configuration of a Box tool source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxServerConfig {
    /// Base URLs of the Box hosts.
    #[serde(default)]
    pub servers: ServerUrls,

    /// Authentication applied to every request.
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Defaults applied to every request.
    #[serde(default)]
    pub defaults: EndpointDefaults,

    /// Endpoint catalogue keyed by operation id.
    #[serde(default, deserialize_with = "deserialize_unique_tools")]
    pub tools: BTreeMap<String, BoxToolConfig>,
}

impl BoxServerConfig {
    /// Parse a configuration (or a bare catalogue) from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`BoxToolsError::Config`] if the document is not valid YAML for this model
    /// (including duplicate operation ids).
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source)
            .map_err(|e| BoxToolsError::Config(format!("invalid Box tool configuration: {e}")))
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`BoxToolsError::Config`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            BoxToolsError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_yaml_str(&source)
    }

    /// Replace the authentication with a bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(AuthConfig::Bearer {
            token: token.into(),
        });
        self
    }

    /// Merge another catalogue on top of this one. Entries with the same id are replaced.
    pub fn merge_tools(&mut self, other: BTreeMap<String, BoxToolConfig>) {
        self.tools.extend(other);
    }
}

/// Base URLs for the Box hosts an endpoint may target.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerUrls {
    #[serde(default = "default_api_base")]
    pub api: String,
    #[serde(default = "default_upload_base")]
    pub upload: String,
    #[serde(default = "default_oauth_base")]
    pub oauth: String,
}

impl Default for ServerUrls {
    fn default() -> Self {
        Self {
            api: default_api_base(),
            upload: default_upload_base(),
            oauth: default_oauth_base(),
        }
    }
}

impl ServerUrls {
    /// Point every host at the same base URL (useful against a local stub).
    #[must_use]
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            api: base_url.clone(),
            upload: base_url.clone(),
            oauth: base_url,
        }
    }

    #[must_use]
    pub fn url_for(&self, server: ServerKind) -> &str {
        match server {
            ServerKind::Api => &self.api,
            ServerKind::Upload => &self.upload,
            ServerKind::Oauth => &self.oauth,
        }
    }
}

fn deserialize_unique_tools<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, BoxToolConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct UniqueTools;

    impl<'de> serde::de::Visitor<'de> for UniqueTools {
        type Value = BTreeMap<String, BoxToolConfig>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of operation ids to endpoint descriptors")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut out = BTreeMap::new();
            while let Some((id, tool)) = map.next_entry::<String, BoxToolConfig>()? {
                if out.contains_key(&id) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate operation id '{id}'"
                    )));
                }
                out.insert(id, tool);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(UniqueTools)
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_upload_base() -> String {
    DEFAULT_UPLOAD_BASE.to_string()
}

fn default_oauth_base() -> String {
    DEFAULT_OAUTH_BASE.to_string()
}

/// Which Box host serves an endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    #[default]
    Api,
    Upload,
    Oauth,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    None,
    Bearer { token: String },
    Header { name: String, value: String },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDefaults {
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds. `None` or `0` leaves the transport default in place.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Descriptor of one Box operation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxToolConfig {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub server: ServerKind,
    #[serde(default)]
    pub body: BodyEncoding,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

/// How body and file parameters are put on the wire.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BodyEncoding {
    /// `application/json` object built from body fields (or the `body` payload as-is).
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`.
    Form,
    /// `multipart/form-data` with text fields followed by file parts.
    Multipart,
    /// `application/octet-stream`; the `body` argument is base64.
    Binary,
    /// `application/json-patch+json`; the `body` argument is an array of operations.
    JsonPatch,
}

impl BodyEncoding {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
            Self::Binary => "application/octet-stream",
            Self::JsonPatch => "application/json-patch+json",
        }
    }
}

/// A parameter declaration: shorthand string or full object.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Short(String),
    Full(HttpParamConfig),
}

impl ParamSpec {
    /// Expand the declaration into its full form.
    ///
    /// # Errors
    ///
    /// Returns an error message if a shorthand names an unknown location or type.
    pub fn resolve(&self) -> std::result::Result<HttpParamConfig, String> {
        match self {
            Self::Full(cfg) => Ok(cfg.clone()),
            Self::Short(s) => parse_shorthand(s),
        }
    }
}

/// Full parameter declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpParamConfig {
    #[serde(rename = "in")]
    pub location: HttpParamLocation,
    /// Wire name, when it differs from the argument name (e.g. `if-match`).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub style: Option<QueryStyleConfig>,
    #[serde(default)]
    pub explode: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HttpParamLocation {
    Path,
    Query,
    Header,
    Body,
    /// A file part of a multipart body.
    File,
}

impl FromStr for HttpParamLocation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "body" => Ok(Self::Body),
            "file" => Ok(Self::File),
            other => Err(format!("unknown parameter location '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QueryStyleConfig {
    Form,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

fn parse_shorthand(s: &str) -> std::result::Result<HttpParamConfig, String> {
    let (location, ty) = match s.trim().split_once(':') {
        Some((loc, ty)) => (loc.trim(), Some(ty.trim())),
        None => (s.trim(), None),
    };
    let location: HttpParamLocation = location.parse()?;

    let schema = match (location, ty) {
        (HttpParamLocation::File, None) => json!({
            "description": "Base64 file content, or {data, filename, content_type}",
            "anyOf": [{"type": "string"}, {"type": "object"}]
        }),
        (_, None | Some("string")) => json!({"type": "string"}),
        (_, Some("array")) => json!({"type": "array", "items": {"type": "string"}}),
        (_, Some(ty @ ("integer" | "number" | "boolean" | "object"))) => json!({"type": ty}),
        (_, Some(other)) => return Err(format!("unknown parameter type '{other}' in '{s}'")),
    };

    // Box expects multi-valued query parameters as a single comma-separated value.
    let explode = (location == HttpParamLocation::Query && ty == Some("array")).then_some(false);

    Ok(HttpParamConfig {
        location,
        name: None,
        required: None,
        default: None,
        schema: Some(schema),
        description: None,
        style: None,
        explode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_location_only_defaults_to_string() {
        let cfg = ParamSpec::Short("path".to_string()).resolve().expect("valid");
        assert_eq!(cfg.location, HttpParamLocation::Path);
        assert_eq!(cfg.schema, Some(json!({"type": "string"})));
        assert_eq!(cfg.explode, None);
    }

    #[test]
    fn shorthand_query_array_is_not_exploded() {
        let cfg = ParamSpec::Short("query:array".to_string())
            .resolve()
            .expect("valid");
        assert_eq!(cfg.location, HttpParamLocation::Query);
        assert_eq!(cfg.explode, Some(false));
        assert_eq!(cfg.schema.expect("schema")["type"], "array");
    }

    #[test]
    fn shorthand_rejects_unknown_location_and_type() {
        assert!(ParamSpec::Short("cookie".to_string()).resolve().is_err());
        assert!(ParamSpec::Short("body:date".to_string()).resolve().is_err());
    }

    #[test]
    fn parses_full_and_short_params_from_yaml() {
        let cfg = BoxServerConfig::from_yaml_str(
            r"
servers:
  api: http://127.0.0.1:9/2.0
auth:
  type: bearer
  token: t
tools:
  put_files_id:
    method: PUT
    path: /files/{file_id}
    params:
      file_id: path
      parent: body:object
      if_match: { in: header, name: if-match }
",
        )
        .expect("parse");

        assert_eq!(cfg.servers.api, "http://127.0.0.1:9/2.0");
        assert_eq!(cfg.servers.upload, DEFAULT_UPLOAD_BASE);
        assert!(matches!(cfg.auth, Some(AuthConfig::Bearer { .. })));

        let tool = cfg.tools.get("put_files_id").expect("tool");
        assert_eq!(tool.body, BodyEncoding::Json);
        assert_eq!(tool.server, ServerKind::Api);
        let if_match = tool.params["if_match"].resolve().expect("resolve");
        assert_eq!(if_match.location, HttpParamLocation::Header);
        assert_eq!(if_match.name.as_deref(), Some("if-match"));
    }

    #[test]
    fn duplicate_operation_ids_are_rejected() {
        let err = BoxServerConfig::from_yaml_str(
            r"
tools:
  get_collections_id:
    method: GET
    path: /collections/{collection_id}
  get_collections_id:
    method: GET
    path: /collections/{collection_id}/items
",
        )
        .unwrap_err();
        assert!(matches!(err, BoxToolsError::Config(_)));
    }
}
