//! Settings deserialized from `knit.toml`.

use knit_extract::ExtractOptions;
use knit_hier::WireOptions;
use serde::{Deserialize, Serialize};

/// The top-level settings parsed from `knit.toml`.
///
/// Every section is optional; a missing file section takes its defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnitConfig {
    /// How punched ports are named.
    pub naming: WireOptions,
    /// How connections are extracted.
    pub extract: ExtractOptions,
}
