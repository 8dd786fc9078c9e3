// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 gpt2md contributors

//! JSON parsing for ChatGPT conversation exports.
//!
//! This module handles deserialization of the JSON format produced by
//! ChatGPT's data-export feature. Each export file holds one conversation
//! as a tree of message nodes: edits and regenerations create branches,
//! and a `current_node` pointer marks the leaf of the branch the
//! conversation actually followed.
//!
//! # Format Overview
//!
//! A conversation export contains:
//! - Metadata (title, creation/update times, model slug, conversation id)
//! - A `mapping` from node id to node, each with `parent`/`children` links
//!   and an optional message payload
//! - A `current_node` id selecting the active leaf
//!
//! Parsing is two-staged: [`parse_conversation`] deserializes the tree,
//! then [`ConversationExport::active_branch`] linearizes it into the
//! root-to-leaf message sequence that the renderer consumes.
//!
//! # Example
//!
//! ```
//! use gpt2md::parser::parse_conversation;
//!
//! let json = r#"{
//!     "title": "Trip Planning",
//!     "mapping": {
//!         "root": { "parent": null, "children": [] }
//!     },
//!     "current_node": "root"
//! }"#;
//!
//! let export = parse_conversation(json).unwrap();
//! assert_eq!(export.title.as_deref(), Some("Trip Planning"));
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use snafu::prelude::*;

/// Error type for parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// The JSON parsed but does not form a usable conversation tree.
    #[snafu(display("malformed conversation export: {reason}"))]
    MalformedExport {
        /// What about the node structure was broken.
        reason: String,
    },
}

/// The root structure of a ChatGPT conversation export.
///
/// One export file describes one conversation. The message tree is held
/// as an id-addressed arena ([`mapping`](Self::mapping)) rather than as
/// nested nodes; a `BTreeMap` keeps every traversal deterministic.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ConversationExport {
    /// The conversation title, as shown in the ChatGPT sidebar.
    #[serde(default)]
    pub title: Option<String>,

    /// Unix timestamp in seconds when the conversation was created.
    #[serde(default)]
    pub create_time: Option<f64>,

    /// Unix timestamp in seconds of the last update.
    #[serde(default)]
    pub update_time: Option<f64>,

    /// The conversation's identifier.
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// The model slug the conversation defaulted to (e.g., "gpt-4o").
    #[serde(default)]
    pub default_model_slug: Option<String>,

    /// The id of the leaf node on the active branch.
    ///
    /// May be absent or dangling in older or truncated exports, in which
    /// case [`active_branch`](Self::active_branch) falls back to walking
    /// down from the root.
    #[serde(default)]
    pub current_node: Option<String>,

    /// All message nodes, addressed by id.
    #[serde(default)]
    pub mapping: BTreeMap<String, MappingNode>,
}

/// One node in the conversation tree.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MappingNode {
    /// The message payload. Structural nodes (the synthetic root, some
    /// bookkeeping nodes) carry none.
    #[serde(default)]
    pub message: Option<MessageNode>,

    /// Id of the parent node; `None` for the root.
    #[serde(default)]
    pub parent: Option<String>,

    /// Ids of child nodes, in creation order. More than one child marks a
    /// branch point (an edit or regeneration).
    #[serde(default)]
    pub children: Vec<String>,
}

/// The message payload of a tree node.
///
/// The export nests these fields under `author`, `content`, and
/// `metadata` objects; they are flattened here to the parts the
/// converter consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageNode {
    /// Who authored the message.
    pub role: Role,

    /// Unix timestamp in seconds when the message was created.
    pub create_time: Option<f64>,

    /// The model that produced the message, from `metadata.model_slug`
    /// (falling back to `metadata.resolved_model_slug`).
    pub model_slug: Option<String>,

    /// Whether the export marks this message as hidden from the
    /// conversation view (`metadata.is_visually_hidden_from_conversation`).
    pub hidden: bool,

    /// The message content.
    pub content: Content,
}

/// The author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A human turn.
    User,
    /// A model reply.
    Assistant,
    /// A system prompt or bookkeeping message.
    System,
    /// A tool (plugin, code interpreter) turn.
    Tool,
    /// Any role this converter does not recognize.
    Other,
}

impl Role {
    fn from_export(role: &str) -> Self {
        match role {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            // "developer" superseded "system" in newer exports
            "system" | "developer" => Self::System,
            "tool" => Self::Tool,
            _ => Self::Other,
        }
    }
}

/// Message content, dispatched on the export's `content_type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Ordinary text content.
    Text {
        /// The content parts, usually plain strings.
        parts: Vec<ContentPart>,
    },

    /// Code sent to a tool (e.g., the code interpreter).
    Code {
        /// The language tag, when recorded.
        language: Option<String>,
        /// The raw code text.
        text: String,
    },

    /// Output captured from a tool execution.
    ExecutionOutput {
        /// The raw output text.
        text: String,
    },

    /// Mixed text and non-text parts (images, attachments).
    MultimodalText {
        /// The content parts.
        parts: Vec<ContentPart>,
    },

    /// The user's custom-instructions payload. Never rendered.
    UserEditableContext,

    /// A summary of the model's reasoning. Never rendered.
    ReasoningRecap,

    /// An unrecognized content type.
    ///
    /// Any string-shaped `parts` it carries are preserved so that future
    /// content types degrade to their text instead of disappearing.
    Unknown {
        /// Whatever parts could be extracted.
        parts: Vec<ContentPart>,
    },
}

/// One element of a content `parts` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    /// A plain text part.
    Text(String),

    /// An image reference.
    Image {
        /// The export-internal pointer to the image asset.
        asset_pointer: String,
    },

    /// Any other non-text payload. Rendered as a placeholder notice
    /// rather than dropped, so turns keep their content.
    Other(serde_json::Value),
}

impl<'de> Deserialize<'de> for MessageNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let role = get_str(&value, &["author", "role"]).map_or(Role::Other, Role::from_export);

        let create_time = value
            .get("create_time")
            .and_then(serde_json::Value::as_f64);

        let model_slug = get_string(&value, &["metadata", "model_slug"])
            .or_else(|| get_string(&value, &["metadata", "resolved_model_slug"]));

        let hidden = value
            .get("metadata")
            .and_then(|meta| meta.get("is_visually_hidden_from_conversation"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let content = value
            .get("content")
            .and_then(|content| serde_json::from_value(content.clone()).ok())
            .unwrap_or(Content::Unknown { parts: Vec::new() });

        Ok(Self {
            role,
            create_time,
            model_slug,
            hidden,
            content,
        })
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        Ok(match get_str(&value, &["content_type"]).unwrap_or_default() {
            "text" => Self::Text {
                parts: extract_parts(&value),
            },
            "code" => Self::Code {
                language: get_string(&value, &["language"]),
                text: get_str(&value, &["text"]).unwrap_or_default().to_owned(),
            },
            "execution_output" => Self::ExecutionOutput {
                text: get_str(&value, &["text"]).unwrap_or_default().to_owned(),
            },
            "multimodal_text" => Self::MultimodalText {
                parts: extract_parts(&value),
            },
            "user_editable_context" => Self::UserEditableContext,
            "reasoning_recap" => Self::ReasoningRecap,
            _ => Self::Unknown {
                parts: extract_parts(&value),
            },
        })
    }
}

impl ConversationExport {
    /// Resolves the active branch and returns its message payloads in
    /// chronological (root-to-leaf) order.
    ///
    /// When [`current_node`](Self::current_node) names a node in the
    /// mapping, the branch is the parent chain from that leaf to the
    /// root. Otherwise the walk starts at the root and descends to the
    /// most-recently-created child at each level, so the newest
    /// regeneration wins.
    ///
    /// Nodes without a message payload are passed over; they link the
    /// chain but contribute nothing to it.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedExport`] when the structure
    /// prevents producing a chain: an empty mapping, a parent or child
    /// link that leaves the mapping, a cycle, or (in fallback mode) no
    /// parentless root.
    pub fn active_branch(&self) -> Result<Vec<&MessageNode>, ParseError> {
        ensure!(
            !self.mapping.is_empty(),
            MalformedExportSnafu {
                reason: "export has no message mapping",
            }
        );

        let leaf = self
            .current_node
            .as_deref()
            .filter(|id| self.mapping.contains_key(*id));

        let ids = match leaf {
            Some(leaf) => self.path_from_leaf(leaf)?,
            None => self.path_from_root()?,
        };

        Ok(ids
            .into_iter()
            .filter_map(|id| self.mapping.get(id)?.message.as_ref())
            .collect())
    }

    /// Walks parent links from `leaf` to the root, returning the node ids
    /// in root-to-leaf order.
    fn path_from_leaf<'a>(&'a self, leaf: &'a str) -> Result<Vec<&'a str>, ParseError> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(leaf);

        while let Some(id) = current {
            ensure!(
                visited.insert(id),
                MalformedExportSnafu {
                    reason: format!("cycle in parent links at node {id}"),
                }
            );
            let node = self.mapping.get(id).with_context(|| MalformedExportSnafu {
                reason: format!("parent link points to unknown node {id}"),
            })?;
            path.push(id);
            current = node.parent.as_deref();
        }

        path.reverse();
        Ok(path)
    }

    /// Descends from the root along the most-recently-created child at
    /// each level, returning the node ids in root-to-leaf order.
    fn path_from_root(&self) -> Result<Vec<&str>, ParseError> {
        let root = self
            .mapping
            .iter()
            .find(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id.as_str())
            .context(MalformedExportSnafu {
                reason: "no root node in mapping",
            })?;

        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(root);

        while let Some(id) = current {
            ensure!(
                visited.insert(id),
                MalformedExportSnafu {
                    reason: format!("cycle in child links at node {id}"),
                }
            );
            let node = self.mapping.get(id).with_context(|| MalformedExportSnafu {
                reason: format!("child link points to unknown node {id}"),
            })?;
            path.push(id);
            current = self.newest_child(node);
        }

        Ok(path)
    }

    /// Picks the most-recently-created child of `node`.
    ///
    /// Children without a message timestamp rank below any timestamped
    /// sibling; among untimestamped siblings the last listed child wins,
    /// since the export appends regenerations.
    fn newest_child<'a>(&self, node: &'a MappingNode) -> Option<&'a str> {
        node.children
            .iter()
            .map(String::as_str)
            .max_by(|a, b| self.child_create_time(a).total_cmp(&self.child_create_time(b)))
    }

    fn child_create_time(&self, id: &str) -> f64 {
        self.mapping
            .get(id)
            .and_then(|node| node.message.as_ref())
            .and_then(|message| message.create_time)
            .unwrap_or(f64::NEG_INFINITY)
    }
}

/// Navigates a JSON path and returns the string value at the end.
fn get_str<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &serde_json::Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Extracts the `parts` array of a content object, keeping non-text
/// elements as opaque parts.
fn extract_parts(value: &serde_json::Value) -> Vec<ContentPart> {
    value
        .get("parts")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| serde_json::from_value(part.clone()).ok())
        .collect()
}

/// Parses a JSON string into a [`ConversationExport`].
///
/// This is the main entry point for parsing ChatGPT conversation
/// exports. Unknown fields are ignored and missing ones default, so
/// exports from different product eras parse uniformly; structural
/// problems surface later, from [`ConversationExport::active_branch`].
///
/// # Errors
///
/// Returns [`ParseError::Json`] if the input is not valid JSON or does
/// not have an object at the top level.
///
/// # Example
///
/// ```
/// use gpt2md::parser::parse_conversation;
///
/// let export = parse_conversation(r#"{"title": "Hi", "mapping": {}}"#).unwrap();
/// assert_eq!(export.title.as_deref(), Some("Hi"));
/// ```
pub fn parse_conversation(json_str: &str) -> Result<ConversationExport, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}
