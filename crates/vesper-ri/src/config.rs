// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renderer configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;

/// When a procedural's render callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProceduralExpansion {
    /// Expand inline, during the `procedural` call.
    #[default]
    Immediate,
    /// Queue the procedural and expand it at `world_end`.
    Deferred,
}

/// What happens to `set_option` calls made inside a world block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorldOptionPolicy {
    /// Drop the option with a warning.
    #[default]
    Ignore,
    /// Fail the call with a protocol error.
    Reject,
}

/// Configuration of a [`Renderer`](crate::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Namespace prefix addressing this renderer.
    pub native_prefix: Cow<'static, str>,
    /// Namespace prefix for caller-defined attributes and options.
    pub user_prefix: Cow<'static, str>,
    /// When procedurals are expanded.
    pub procedural_expansion: ProceduralExpansion,
    /// Handling of options set after `world_begin`.
    pub world_option_policy: WorldOptionPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererConfig {
    /// Creates a configuration with default values.
    pub const fn new() -> Self {
        Self {
            native_prefix: Cow::Borrowed("ri"),
            user_prefix: Cow::Borrowed("user"),
            procedural_expansion: ProceduralExpansion::Immediate,
            world_option_policy: WorldOptionPolicy::Ignore,
        }
    }

    /// Creates a configuration that defers procedurals to `world_end` and
    /// rejects late options.
    pub const fn deferred() -> Self {
        Self {
            native_prefix: Cow::Borrowed("ri"),
            user_prefix: Cow::Borrowed("user"),
            procedural_expansion: ProceduralExpansion::Deferred,
            world_option_policy: WorldOptionPolicy::Reject,
        }
    }

    /// Creates a configuration that treats late options as errors.
    pub const fn strict() -> Self {
        Self {
            native_prefix: Cow::Borrowed("ri"),
            user_prefix: Cow::Borrowed("user"),
            procedural_expansion: ProceduralExpansion::Immediate,
            world_option_policy: WorldOptionPolicy::Reject,
        }
    }

    /// Returns this configuration with a different native prefix.
    pub fn with_native_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.native_prefix = prefix.into();
        self
    }

    /// Returns this configuration with a different expansion mode.
    pub fn with_procedural_expansion(mut self, expansion: ProceduralExpansion) -> Self {
        self.procedural_expansion = expansion;
        self
    }

    /// Parses a configuration from RON text. Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Reads and parses a RON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_ron(&text)?;
        log::debug!("loaded renderer config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Serializes this configuration as pretty-printed RON.
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }
}

/// An error raised while loading a [`RendererConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read renderer config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration text is not valid RON for [`RendererConfig`].
    #[error("failed to parse renderer config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The configuration could not be serialized.
    #[error("failed to serialize renderer config: {0}")]
    Serialize(#[from] ron::Error),
}
