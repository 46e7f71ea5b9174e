//! Runtime for the Box endpoint catalogue.
//!
//! Every Box operation is a descriptor in the catalogue; a single generic invoker turns a
//! descriptor plus caller arguments into exactly one HTTP request and normalizes the response:
//! - required parameters are checked before any network I/O
//! - null or absent optional arguments are omitted
//! - non-2xx responses surface as [`BoxToolsError::Http`]
//! - `204`, empty, whitespace-only or non-JSON success bodies become `None`

use crate::body::{BodyArgs, PAYLOAD_PARAM, RequestBody, apply_body, encode_body};
use crate::config::{
    AuthConfig, BodyEncoding, BoxServerConfig, BoxToolConfig, EndpointDefaults,
    HttpParamLocation, ServerKind,
};
use crate::error::{BoxToolsError, Result};
use crate::query::{
    QueryPair, QuerySerialization, encode_path_segment, encode_query, serialize_query_param,
    value_to_string,
};
use crate::redact::redact_url;
use reqwest::{Client, Method, StatusCode};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const MAX_TOOL_NAME_LEN: usize = 64;

#[derive(Debug, Clone)]
struct GeneratedTool {
    name: String,
    description: Option<String>,
    method: Method,
    server: ServerKind,
    path: String,
    body: BodyEncoding,
    parameters: Vec<ToolParameter>,
    input_schema: Value,
}

#[derive(Debug, Clone)]
struct ToolParameter {
    tool_name: String,
    http_name: String,
    location: HttpParamLocation,
    required: bool,
    default: Option<Value>,
    schema: Value,
    query: Option<QuerySerialization>,
}

#[derive(Debug)]
struct RequestParts {
    path: String,
    query_params: Vec<QueryPair>,
    headers: Vec<(String, String)>,
    body: RequestBody,
}

/// The Box operations exposed as callable tools.
///
/// Cheap to clone; the catalogue is compiled once and shared immutably.
#[derive(Clone)]
pub struct BoxToolSource {
    inner: Arc<BoxToolSourceInner>,
}

struct BoxToolSourceInner {
    config: BoxServerConfig,
    tools: Vec<GeneratedTool>,
    client: Client,
}

impl BoxToolSource {
    /// Compile and validate a catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`BoxToolsError::Config`] if a base URL is invalid or any descriptor is
    /// inconsistent (unknown method, path placeholders not matching path parameters, body
    /// encoding not matching the declared parameters).
    pub fn new(config: BoxServerConfig) -> Result<Self> {
        Self::with_client(config, Client::new())
    }

    /// Same as [`BoxToolSource::new`] with a caller-provided HTTP client.
    ///
    /// # Errors
    ///
    /// See [`BoxToolSource::new`].
    pub fn with_client(config: BoxServerConfig, client: Client) -> Result<Self> {
        for (server, base_url) in [
            ("api", &config.servers.api),
            ("upload", &config.servers.upload),
            ("oauth", &config.servers.oauth),
        ] {
            Url::parse(base_url).map_err(|e| {
                BoxToolsError::Config(format!("Invalid {server} base URL '{base_url}': {e}"))
            })?;
        }

        let tools = generate_tools(&config)?;
        debug!(tools = tools.len(), "compiled Box endpoint catalogue");

        Ok(Self {
            inner: Arc::new(BoxToolSourceInner {
                config,
                tools,
                client,
            }),
        })
    }

    /// Number of operations in the catalogue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.tools.is_empty()
    }

    /// Operation ids, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.inner.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// List every operation as an MCP `Tool`, sorted by operation id.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner.tools.iter().map(to_mcp_tool).collect()
    }

    /// Look up a single operation.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<Tool> {
        self.find(name).map(to_mcp_tool)
    }

    /// Invoke an operation and return the decoded JSON body, if any.
    ///
    /// `arguments` must be a JSON object (or `null` for no arguments).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the operation is unknown
    /// - a required parameter is missing or null (no request is sent)
    /// - an argument cannot be encoded (e.g. invalid base64 for a file part)
    /// - the request fails in transport or Box answers with a non-2xx status
    pub async fn invoke(&self, tool_name: &str, arguments: &Value) -> Result<Option<Value>> {
        let tool = self
            .find(tool_name)
            .ok_or_else(|| BoxToolsError::UnknownTool(tool_name.to_string()))?;
        execute_request(&self.inner, tool, arguments).await
    }

    /// Invoke an operation on behalf of an MCP host.
    ///
    /// JSON results are returned as text content; an empty result yields no content.
    ///
    /// # Errors
    ///
    /// See [`BoxToolSource::invoke`].
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        let content = match self.invoke(tool_name, &arguments).await? {
            Some(Value::String(s)) => vec![Content::text(s)],
            Some(body) => vec![Content::text(body.to_string())],
            None => Vec::new(),
        };
        Ok(CallToolResult::success(content))
    }

    fn find(&self, name: &str) -> Option<&GeneratedTool> {
        self.inner
            .tools
            .binary_search_by(|t| t.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.inner.tools[i])
    }
}

fn to_mcp_tool(t: &GeneratedTool) -> Tool {
    let schema_obj = t
        .input_schema
        .as_object()
        .cloned()
        .unwrap_or_else(JsonObject::new);
    let mut tool = Tool::new(
        t.name.clone(),
        t.description.clone().unwrap_or_default(),
        Arc::new(schema_obj),
    );
    tool.annotations = Some(crate::semantics::annotations_for(&t.name, &t.method));
    tool
}

fn generate_tools(config: &BoxServerConfig) -> Result<Vec<GeneratedTool>> {
    // `config.tools` is a BTreeMap, so the output is sorted by name (relied on by `find`).
    let mut out = Vec::with_capacity(config.tools.len());
    for (tool_name, tool_cfg) in &config.tools {
        validate_tool_name(tool_name)?;
        let method = parse_http_method(tool_name, &tool_cfg.method)?;
        let parameters = collect_tool_parameters(tool_name, tool_cfg)?;
        validate_path_template(tool_name, &tool_cfg.path, &parameters)?;
        validate_body_encoding(tool_name, tool_cfg.body, &parameters)?;
        let input_schema = build_input_schema(&parameters);

        out.push(GeneratedTool {
            name: tool_name.clone(),
            description: tool_cfg.description.clone(),
            method,
            server: tool_cfg.server,
            path: tool_cfg.path.clone(),
            body: tool_cfg.body,
            parameters,
            input_schema,
        });
    }
    Ok(out)
}

fn validate_tool_name(tool_name: &str) -> Result<()> {
    let valid_chars = tool_name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if tool_name.is_empty() || tool_name.len() > MAX_TOOL_NAME_LEN || !valid_chars {
        return Err(BoxToolsError::Config(format!(
            "Invalid operation id '{tool_name}': expected 1-{MAX_TOOL_NAME_LEN} characters of [A-Za-z0-9_-]"
        )));
    }
    Ok(())
}

fn parse_http_method(tool_name: &str, method: &str) -> Result<Method> {
    let method_str = method.trim();
    method_str.to_uppercase().parse().map_err(|_| {
        BoxToolsError::Config(format!(
            "Invalid HTTP method '{method_str}' in tool '{tool_name}'"
        ))
    })
}

fn collect_tool_parameters(tool_name: &str, tool_cfg: &BoxToolConfig) -> Result<Vec<ToolParameter>> {
    let mut parameters = Vec::with_capacity(tool_cfg.params.len());
    let mut wire_names: HashSet<(HttpParamLocation, String)> = HashSet::new();

    for (arg_name, spec) in &tool_cfg.params {
        let p = spec.resolve().map_err(|e| {
            BoxToolsError::Config(format!("Invalid param '{arg_name}' in tool '{tool_name}': {e}"))
        })?;

        let http_name = p.name.clone().unwrap_or_else(|| arg_name.clone());
        if !wire_names.insert((p.location, http_name.clone())) {
            return Err(BoxToolsError::Config(format!(
                "Duplicate wire name '{http_name}' in tool '{tool_name}'"
            )));
        }

        let is_path = p.location == HttpParamLocation::Path;
        if is_path && p.required == Some(false) {
            return Err(BoxToolsError::Config(format!(
                "Path param '{arg_name}' in tool '{tool_name}' cannot be optional"
            )));
        }

        let mut schema = p.schema.unwrap_or_else(|| json!({"type": "string"}));
        if let Some(desc) = &p.description
            && let Some(obj) = schema.as_object_mut()
        {
            obj.insert("description".to_string(), Value::String(desc.clone()));
        }

        let query = (p.location == HttpParamLocation::Query)
            .then(|| QuerySerialization::new(p.style, p.explode));

        parameters.push(ToolParameter {
            tool_name: arg_name.clone(),
            http_name,
            location: p.location,
            required: p.required.unwrap_or(is_path),
            default: p.default,
            schema,
            query,
        });
    }

    Ok(parameters)
}

/// Placeholders in the path template must match the declared path parameters one-to-one.
fn validate_path_template(tool_name: &str, path: &str, parameters: &[ToolParameter]) -> Result<()> {
    if !path.starts_with('/') {
        return Err(BoxToolsError::Config(format!(
            "Path '{path}' in tool '{tool_name}' must start with '/'"
        )));
    }

    let mut placeholders: HashSet<&str> = HashSet::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            return Err(BoxToolsError::Config(format!(
                "Unterminated placeholder in path '{path}' of tool '{tool_name}'"
            )));
        };
        placeholders.insert(&after[..end]);
        rest = &after[end + 1..];
    }

    let declared: HashSet<&str> = parameters
        .iter()
        .filter(|p| p.location == HttpParamLocation::Path)
        .map(|p| p.http_name.as_str())
        .collect();

    if let Some(missing) = placeholders.difference(&declared).next() {
        return Err(BoxToolsError::Config(format!(
            "Placeholder '{{{missing}}}' in tool '{tool_name}' has no path param"
        )));
    }
    if let Some(unused) = declared.difference(&placeholders).next() {
        return Err(BoxToolsError::Config(format!(
            "Path param '{unused}' in tool '{tool_name}' does not appear in '{path}'"
        )));
    }
    Ok(())
}

fn validate_body_encoding(
    tool_name: &str,
    encoding: BodyEncoding,
    parameters: &[ToolParameter],
) -> Result<()> {
    let has_files = parameters
        .iter()
        .any(|p| p.location == HttpParamLocation::File);
    if has_files && encoding != BodyEncoding::Multipart {
        return Err(BoxToolsError::Config(format!(
            "Tool '{tool_name}' declares file params but its body encoding is not multipart"
        )));
    }

    let has_payload = parameters
        .iter()
        .any(|p| p.location == HttpParamLocation::Body && p.http_name == PAYLOAD_PARAM);
    if matches!(encoding, BodyEncoding::Binary | BodyEncoding::JsonPatch) && !has_payload {
        return Err(BoxToolsError::Config(format!(
            "Tool '{tool_name}' uses {} but declares no '{PAYLOAD_PARAM}' param",
            encoding.content_type()
        )));
    }
    Ok(())
}

async fn execute_request(
    inner: &BoxToolSourceInner,
    tool: &GeneratedTool,
    arguments: &Value,
) -> Result<Option<Value>> {
    let parts = build_request_parts(tool, arguments)?;
    let base_url = inner.config.servers.url_for(tool.server);
    let url = build_url(base_url, &parts.path, &parts.query_params)?;

    debug!(
        tool = %tool.name,
        method = %tool.method,
        url = %redact_url(&url),
        "dispatching Box API request"
    );

    let mut request = inner.client.request(tool.method.clone(), url);
    request = apply_auth(inner.config.auth.as_ref(), request);
    request = apply_headers(&inner.config.defaults, request, parts.headers);
    request = apply_body(request, parts.body)?;
    request = apply_timeout(&inner.config.defaults, request);

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        debug!(tool = %tool.name, status = status.as_u16(), "Box API returned an error status");
        return Err(BoxToolsError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    Ok(decode_success_body(&tool.name, status, &bytes))
}

/// `204`, blank and non-JSON bodies (e.g. file downloads) decode to `None`.
fn decode_success_body(tool_name: &str, status: StatusCode, bytes: &[u8]) -> Option<Value> {
    if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Null) => None,
        Ok(v) => Some(v),
        Err(e) => {
            debug!(tool = %tool_name, error = %e, len = bytes.len(), "response body is not JSON");
            None
        }
    }
}

fn build_request_parts(tool: &GeneratedTool, arguments: &Value) -> Result<RequestParts> {
    let args = match arguments {
        Value::Object(map) => Some(map),
        Value::Null => None,
        _ => {
            return Err(BoxToolsError::invalid_argument(
                "arguments",
                "expected a JSON object",
            ));
        }
    };

    let mut path = tool.path.clone();
    let mut query_params: Vec<QueryPair> = Vec::new();
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut body_args = BodyArgs::default();

    for param in &tool.parameters {
        let value = args
            .and_then(|a| a.get(&param.tool_name))
            .filter(|v| !v.is_null())
            .or(param.default.as_ref());

        let Some(val) = value else {
            if param.required {
                return Err(BoxToolsError::MissingParameter(param.tool_name.clone()));
            }
            continue;
        };

        match param.location {
            HttpParamLocation::Path => {
                let segment = encode_path_segment(&value_to_string(val));
                path = path.replace(&format!("{{{}}}", param.http_name), &segment);
            }
            HttpParamLocation::Query => {
                let ser = param
                    .query
                    .unwrap_or_else(|| QuerySerialization::new(None, None));
                query_params.extend(serialize_query_param(&param.http_name, val, ser));
            }
            HttpParamLocation::Header => {
                headers.push((param.http_name.clone(), value_to_string(val)));
            }
            HttpParamLocation::Body => {
                if param.http_name == PAYLOAD_PARAM {
                    body_args.payload = Some(val.clone());
                } else {
                    body_args
                        .fields
                        .insert(param.http_name.clone(), val.clone());
                }
            }
            HttpParamLocation::File => {
                body_args.files.push((param.http_name.clone(), val.clone()));
            }
        }
    }

    if let Some(args) = args {
        for key in args.keys() {
            if !tool.parameters.iter().any(|p| &p.tool_name == key) {
                debug!(tool = %tool.name, argument = %key, "ignoring undeclared argument");
            }
        }
    }

    Ok(RequestParts {
        path,
        query_params,
        headers,
        body: encode_body(tool.body, body_args)?,
    })
}

fn build_url(base_url: &str, path: &str, query_params: &[QueryPair]) -> Result<Url> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url =
        Url::parse(&url).map_err(|e| BoxToolsError::Config(format!("Invalid URL: {e}")))?;
    if !query_params.is_empty() {
        url.set_query(Some(&encode_query(query_params)));
    }
    Ok(url)
}

fn apply_auth(
    auth: Option<&AuthConfig>,
    request: reqwest::RequestBuilder,
) -> reqwest::RequestBuilder {
    match auth {
        Some(AuthConfig::Bearer { token }) => request.bearer_auth(token),
        Some(AuthConfig::Header { name, value }) => request.header(name, value),
        Some(AuthConfig::None) | None => request,
    }
}

fn apply_headers(
    defaults: &EndpointDefaults,
    mut request: reqwest::RequestBuilder,
    headers: Vec<(String, String)>,
) -> reqwest::RequestBuilder {
    for (key, value) in &defaults.headers {
        request = request.header(key, value);
    }
    for (key, value) in headers {
        request = request.header(&key, &value);
    }
    request
}

fn apply_timeout(
    defaults: &EndpointDefaults,
    request: reqwest::RequestBuilder,
) -> reqwest::RequestBuilder {
    match defaults.timeout {
        Some(secs) if secs > 0 => request.timeout(Duration::from_secs(secs)),
        _ => request,
    }
}

fn build_input_schema(parameters: &[ToolParameter]) -> Value {
    let mut properties = json!({});
    let mut required: Vec<String> = Vec::new();

    for param in parameters {
        let mut prop_schema = param.schema.clone();
        if let Some(default) = &param.default {
            prop_schema["default"] = default.clone();
        }

        properties[&param.tool_name] = prop_schema;

        if param.required && param.default.is_none() {
            required.push(param.tool_name.clone());
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });

    if !required.is_empty() {
        schema["required"] = json!(required);
    }

    schema
}
