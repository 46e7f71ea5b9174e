//! The built-in Box endpoint catalogue.
//!
//! `catalog/box.yaml` holds one descriptor per Box operation, keyed by a disambiguated operation
//! id (`get_collections_id` vs `get_collections_id_items`, one id per shared-link variant, a
//! `_v2025_0` suffix for endpoints that require the `box-version: 2025.0` header).

use crate::config::BoxServerConfig;
use crate::error::Result;

/// Raw YAML of the built-in catalogue.
pub const EMBEDDED_CATALOG: &str = include_str!("../catalog/box.yaml");

impl BoxServerConfig {
    /// Default configuration: public Box hosts, no authentication, built-in catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BoxToolsError::Config`] if the embedded catalogue fails to parse.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml_str(EMBEDDED_CATALOG)
    }
}
