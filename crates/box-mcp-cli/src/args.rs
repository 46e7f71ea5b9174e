//! Assembling tool arguments from the command line.
//!
//! `--args` takes a JSON object (or `@path` to read one from a file). Each `--arg` adds one
//! field on top: `key=value` sets a string, `key:=value` sets raw JSON.

use anyhow::{Context as _, bail};
use serde_json::{Map, Value};

pub fn build_arguments(args: Option<&str>, pairs: &[String]) -> anyhow::Result<Value> {
    let mut out = match args {
        Some(raw) => parse_object(raw)?,
        None => Map::new(),
    };

    for pair in pairs {
        let (key, value) = parse_pair(pair)?;
        out.insert(key, value);
    }

    Ok(Value::Object(out))
}

fn parse_object(raw: &str) -> anyhow::Result<Map<String, Value>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read arguments from {path}"))?
        }
        None => raw.to_string(),
    };
    match serde_json::from_str::<Value>(&text).context("parse --args as JSON")? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

fn parse_pair(pair: &str) -> anyhow::Result<(String, Value)> {
    if let Some((key, raw)) = pair.split_once(":=")
        && !key.contains('=')
    {
        let value = serde_json::from_str(raw)
            .with_context(|| format!("parse JSON value of --arg {key}"))?;
        return Ok((non_empty_key(key)?, value));
    }
    let Some((key, value)) = pair.split_once('=') else {
        bail!("expected key=value or key:=json, got '{pair}'");
    };
    Ok((non_empty_key(key)?, Value::String(value.to_string())))
}

fn non_empty_key(key: &str) -> anyhow::Result<String> {
    let key = key.trim();
    if key.is_empty() {
        bail!("argument name must not be empty");
    }
    Ok(key.to_string())
}
