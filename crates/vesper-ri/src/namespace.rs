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

//! Classifies namespaced attribute, option and command keys.
//!
//! The namespace of a key is the segment before its first `:` or `.`:
//!
//! - the **native** prefix (`ri` by default) addresses this renderer; known
//!   names are type-checked against a fixed schema,
//! - the **user** prefix (`user` by default) is stored and emitted verbatim,
//! - keys with **no** prefix are renderer-agnostic and have their own small schema,
//! - any **other** prefix targets a different renderer and is ignored.

use crate::error::{RendererError, RendererResult};
use vesper_core::math::{Color3, Vec2};
use vesper_core::{Data, DataKind};

/// The namespaces a key can resolve into once foreign keys are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Keys addressed to this renderer.
    Native,
    /// Keys that belong to the caller and are passed through untouched.
    User,
    /// Renderer-agnostic keys without a prefix.
    Generic,
}

/// A key stripped of its namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedKey {
    /// The namespace the key was resolved into.
    pub namespace: Namespace,
    /// The key without its prefix, e.g. `shadingRate` or `cull:hidden`.
    pub name: String,
}

impl ResolvedKey {
    /// Creates a resolved key.
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Splits the name at its first separator into `(group, parameter)`.
    ///
    /// `cull:hidden` yields `("cull", Some("hidden"))`; `shadingRate` yields
    /// `("shadingRate", None)`.
    pub fn split(&self) -> (&str, Option<&str>) {
        split_prefix(&self.name)
    }
}

/// What kind of call a key was passed to; each has its own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTarget {
    /// `set_attribute` / `get_attribute`.
    Attribute,
    /// `set_option` / `get_option`.
    Option,
    /// `command`.
    Command,
}

/// The fixed type and default of a schema key.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    /// The only kind of value the key accepts.
    pub kind: DataKind,
    /// Value reported by getters before the key is ever set.
    pub default: Option<Data>,
}

impl SchemaEntry {
    fn new(kind: DataKind, default: impl Into<Data>) -> Self {
        Self {
            kind,
            default: Some(default.into()),
        }
    }

    fn without_default(kind: DataKind) -> Self {
        Self {
            kind,
            default: None,
        }
    }
}

/// The outcome of resolving one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A schema key: values must be of `entry.kind`.
    Typed {
        /// The resolved key.
        key: ResolvedKey,
        /// The schema entry the key matched.
        entry: SchemaEntry,
    },
    /// A key stored and emitted without interpretation.
    Untyped(ResolvedKey),
    /// A native or generic key this renderer does not know. Ignored with a warning.
    Unknown(ResolvedKey),
    /// A key addressed to another renderer. Ignored silently.
    Foreign {
        /// The foreign namespace prefix.
        prefix: String,
    },
}

impl Resolution {
    /// Checks `value` against the schema, if the key has one.
    pub fn validate(&self, full_key: &str, value: &Data) -> RendererResult<()> {
        match self {
            Resolution::Typed { entry, .. } if entry.kind != value.kind() => {
                Err(RendererError::TypeMismatch {
                    key: full_key.to_owned(),
                    expected: entry.kind,
                    found: value.kind(),
                })
            }
            _ => Ok(()),
        }
    }

    /// The resolved key, unless the key was foreign.
    pub fn key(&self) -> Option<&ResolvedKey> {
        match self {
            Resolution::Typed { key, .. } | Resolution::Untyped(key) | Resolution::Unknown(key) => {
                Some(key)
            }
            Resolution::Foreign { .. } => None,
        }
    }
}

/// Resolves keys against the configured native and user prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceResolver {
    native_prefix: String,
    user_prefix: String,
}

impl NamespaceResolver {
    /// Creates a resolver for the given native and user prefixes.
    pub fn new(native_prefix: impl Into<String>, user_prefix: impl Into<String>) -> Self {
        Self {
            native_prefix: native_prefix.into(),
            user_prefix: user_prefix.into(),
        }
    }

    /// The prefix reserved for this renderer.
    pub fn native_prefix(&self) -> &str {
        &self.native_prefix
    }

    /// The spelling a resolved key is stored under, so that `ri:sides` and
    /// `ri.sides` address the same slot.
    pub fn canonical(&self, key: &ResolvedKey) -> String {
        match key.namespace {
            Namespace::Native => format!("{}:{}", self.native_prefix, key.name),
            Namespace::User => format!("{}:{}", self.user_prefix, key.name),
            Namespace::Generic => key.name.clone(),
        }
    }

    /// Resolves `key` for the given kind of call.
    pub fn resolve(&self, target: KeyTarget, key: &str) -> Resolution {
        let (prefix, rest) = split_prefix(key);
        let Some(rest) = rest else {
            let resolved = ResolvedKey::new(Namespace::Generic, key);
            return match generic_schema(target, key) {
                Some(entry) => Resolution::Typed {
                    key: resolved,
                    entry,
                },
                None => Resolution::Unknown(resolved),
            };
        };

        if prefix == self.native_prefix {
            let resolved = ResolvedKey::new(Namespace::Native, rest);
            match native_schema(target, rest) {
                Some(entry) => Resolution::Typed {
                    key: resolved,
                    entry,
                },
                // Shader slots are only bound through `shader`.
                None if target == KeyTarget::Attribute && split_prefix(rest).0 == "shader" => {
                    Resolution::Unknown(resolved)
                }
                // `group:parameter` names map onto the protocol's generic
                // attribute/option statements, so they need no schema entry.
                None if target != KeyTarget::Command && split_prefix(rest).1.is_some() => {
                    Resolution::Untyped(resolved)
                }
                None => Resolution::Unknown(resolved),
            }
        } else if prefix == self.user_prefix {
            Resolution::Untyped(ResolvedKey::new(Namespace::User, rest))
        } else {
            Resolution::Foreign {
                prefix: prefix.to_owned(),
            }
        }
    }
}

fn split_prefix(key: &str) -> (&str, Option<&str>) {
    match key.find([':', '.']) {
        Some(index) if index > 0 => (&key[..index], Some(&key[index + 1..])),
        _ => (key, None),
    }
}

fn native_schema(target: KeyTarget, name: &str) -> Option<SchemaEntry> {
    let entry = match (target, name) {
        (KeyTarget::Attribute, "shadingRate") => SchemaEntry::new(DataKind::Float, 1.0_f32),
        (KeyTarget::Attribute, "matte") => SchemaEntry::new(DataKind::Bool, false),
        (KeyTarget::Attribute, "color") => SchemaEntry::new(DataKind::Color3f, Color3::WHITE),
        (KeyTarget::Attribute, "opacity") => SchemaEntry::new(DataKind::Color3f, Color3::WHITE),
        (KeyTarget::Attribute, "sides") => SchemaEntry::new(DataKind::Int, 2),
        (KeyTarget::Attribute, "geometricApproximation:motionFactor")
        | (KeyTarget::Attribute, "geometricApproximation:focusFactor")
        | (KeyTarget::Attribute, "displacementBound:sphere") => {
            SchemaEntry::new(DataKind::Float, 0.0_f32)
        }
        (KeyTarget::Attribute, "cull:hidden") | (KeyTarget::Attribute, "cull:backfacing") => {
            SchemaEntry::new(DataKind::Int, 1)
        }
        (KeyTarget::Attribute, "identifier:name") => SchemaEntry::new(DataKind::String, ""),
        (KeyTarget::Option, "searchpath:shader")
        | (KeyTarget::Option, "searchpath:texture")
        | (KeyTarget::Option, "searchpath:procedural") => {
            SchemaEntry::without_default(DataKind::String)
        }
        (KeyTarget::Option, "render:bucketorder") => {
            SchemaEntry::new(DataKind::String, "horizontal")
        }
        (KeyTarget::Option, "hider") => SchemaEntry::new(DataKind::String, "hidden"),
        (KeyTarget::Command, "readArchive") => SchemaEntry::without_default(DataKind::String),
        _ => return None,
    };
    Some(entry)
}

fn generic_schema(target: KeyTarget, name: &str) -> Option<SchemaEntry> {
    let entry = match (target, name) {
        (KeyTarget::Option, "shutter") => SchemaEntry::new(DataKind::V2f, Vec2::ZERO),
        (KeyTarget::Attribute, "name") => SchemaEntry::new(DataKind::String, ""),
        (KeyTarget::Attribute, "doubleSided") => SchemaEntry::new(DataKind::Bool, true),
        _ => return None,
    };
    Some(entry)
}
