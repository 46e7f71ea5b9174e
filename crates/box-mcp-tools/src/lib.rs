//! Box REST API exposed as a catalogue of callable tools.
//!
//! The crate is data-driven: each Box endpoint is one descriptor in an embedded YAML catalogue
//! (see [`catalog`]), and one generic invoker ([`runtime::BoxToolSource`]) turns a descriptor plus
//! JSON arguments into a single HTTP request.
//!
//! It intentionally contains **no** credential storage and **no** MCP server wiring; hosts call
//! [`runtime::BoxToolSource::list_tools`] and [`runtime::BoxToolSource::call_tool`].

mod body;
pub mod catalog;
pub mod config;
pub mod error;
mod query;
pub mod redact;
pub mod runtime;
pub mod semantics;

pub use config::{AuthConfig, BoxServerConfig, ServerUrls};
pub use error::{BoxToolsError, Result};
pub use runtime::BoxToolSource;
