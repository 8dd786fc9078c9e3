// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 gpt2md contributors

//! Markdown rendering for parsed ChatGPT conversation exports.
//!
//! This module transforms a [`ConversationExport`] and its resolved
//! active branch into a readable Markdown document. The output format is
//! designed to be clean and readable while preserving the conversation's
//! reading order.
//!
//! # Output Format
//!
//! The rendered Markdown includes:
//! - A top-level heading with the conversation title
//! - A metadata bullet list (creation/update times, model, conversation
//!   id, message count)
//! - `## User` and `## Assistant` sections for each turn, with optional
//!   timestamp/model annotations
//! - `---` horizontal rules between turns
//!
//! # Example
//!
//! ```
//! use gpt2md::parser::parse_conversation;
//! use gpt2md::renderer::{RenderOptions, render_conversation};
//!
//! let json = r#"{
//!     "title": "Greetings",
//!     "mapping": {
//!         "root": { "parent": null, "children": ["u1"] },
//!         "u1": {
//!             "parent": "root",
//!             "children": [],
//!             "message": {
//!                 "author": { "role": "user" },
//!                 "content": { "content_type": "text", "parts": ["Hello!"] }
//!             }
//!         }
//!     },
//!     "current_node": "u1"
//! }"#;
//!
//! let export = parse_conversation(json).unwrap();
//! let messages = export.active_branch().unwrap();
//! let markdown = render_conversation(&export, &messages, &RenderOptions::default());
//!
//! assert!(markdown.starts_with("# Greetings"));
//! assert!(markdown.contains("## User"));
//! ```

use crate::parser::{Content, ContentPart, ConversationExport, MessageNode, Role};
use chrono::DateTime;
use std::fmt::Write;

/// Configuration options for Markdown rendering.
///
/// Controls which roles and which optional metadata are included in the
/// rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether to include system messages.
    ///
    /// ChatGPT exports carry system prompts and bookkeeping turns that
    /// are normally invisible in the conversation view.
    pub show_system: bool,

    /// Whether to include tool messages (code interpreter output,
    /// plugin results).
    pub show_tools: bool,

    /// Whether to include timestamps in the document header and on each
    /// turn.
    pub show_timestamps: bool,

    /// Whether to include model slugs (e.g., "gpt-4o") in the document
    /// header and on assistant turns.
    pub show_model: bool,

    /// Number of heading levels to shift (0-5).
    ///
    /// A value of 0 produces H1/H2 headings (default).
    /// A value of 1 produces H2/H3 headings, useful for embedding.
    pub heading_offset: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_system: false,
            show_tools: false,
            show_timestamps: true,
            show_model: true,
            heading_offset: 0,
        }
    }
}

/// Returns a markdown heading prefix with the given level and offset.
///
/// The heading level is clamped to a maximum of 6 (H6).
fn heading(level: u8, offset: u8) -> String {
    let actual = (level + offset).min(6);
    "#".repeat(actual as usize)
}

/// Renders a conversation export and its active branch as Markdown.
///
/// This is the main entry point for rendering. `messages` is the
/// root-to-leaf sequence produced by
/// [`ConversationExport::active_branch`]; turns that the options exclude
/// (hidden messages, system/tool roles, blank bodies) are filtered here.
///
/// The output is deterministic: rendering the same export twice yields
/// byte-identical Markdown.
#[must_use]
pub fn render_conversation(
    export: &ConversationExport,
    messages: &[&MessageNode],
    opts: &RenderOptions,
) -> String {
    let turns: Vec<&MessageNode> = messages
        .iter()
        .copied()
        .filter(|message| should_render(message, opts))
        .collect();

    let mut blocks = Vec::with_capacity(turns.len() + 1);
    blocks.push(header_block(export, turns.len(), opts));
    for message in turns {
        blocks.push(message_block(message, opts));
    }

    let mut out = blocks.join("---\n\n");
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// Decides whether a message becomes a rendered block.
fn should_render(message: &MessageNode, opts: &RenderOptions) -> bool {
    if message.hidden {
        return false;
    }
    match message.role {
        Role::User | Role::Assistant => {}
        Role::System if opts.show_system => {}
        Role::Tool if opts.show_tools => {}
        _ => return false,
    }
    match message.content {
        // Custom instructions and reasoning summaries never render.
        Content::UserEditableContext | Content::ReasoningRecap => return false,
        _ => {}
    }
    !content_body(&message.content).trim().is_empty()
}

fn header_block(export: &ConversationExport, message_count: usize, opts: &RenderOptions) -> String {
    let mut out = String::new();

    let title = export
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or("Untitled Conversation");
    writeln!(out, "{} {title}\n", heading(1, opts.heading_offset)).unwrap();

    if opts.show_timestamps {
        if let Some(ts) = export.create_time.and_then(format_timestamp) {
            writeln!(out, "- **Created**: {ts}").unwrap();
        }
        if let Some(ts) = export.update_time.and_then(format_timestamp) {
            writeln!(out, "- **Updated**: {ts}").unwrap();
        }
    }
    if opts.show_model
        && let Some(model) = export.default_model_slug.as_deref()
    {
        writeln!(out, "- **Model**: {model}").unwrap();
    }
    if let Some(id) = export.conversation_id.as_deref() {
        writeln!(out, "- **Conversation ID**: `{id}`").unwrap();
    }
    writeln!(out, "- **Messages**: {message_count}\n").unwrap();

    out
}

fn message_block(message: &MessageNode, opts: &RenderOptions) -> String {
    let mut out = String::new();

    writeln!(
        out,
        "{} {}\n",
        heading(2, opts.heading_offset),
        role_label(message.role)
    )
    .unwrap();

    let timestamp = if opts.show_timestamps {
        message.create_time.and_then(format_timestamp)
    } else {
        None
    };
    let model = if opts.show_model && message.role == Role::Assistant {
        message.model_slug.as_deref()
    } else {
        None
    };
    let annotation = match (timestamp, model) {
        (Some(ts), Some(model)) => format!("*{ts} · {model}*"),
        (Some(ts), None) => format!("*{ts}*"),
        (None, Some(model)) => format!("*{model}*"),
        (None, None) => String::new(),
    };
    if !annotation.is_empty() {
        writeln!(out, "{annotation}\n").unwrap();
    }

    writeln!(out, "{}\n", content_body(&message.content).trim()).unwrap();
    out
}

const fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
        Role::Tool => "Tool",
        Role::Other => "Other",
    }
}

/// Assembles the text body of a message.
fn content_body(content: &Content) -> String {
    match content {
        Content::Text { parts } | Content::MultimodalText { parts } | Content::Unknown { parts } => {
            render_parts(parts)
        }
        Content::Code { text, .. } | Content::ExecutionOutput { text } => text.clone(),
        Content::UserEditableContext | Content::ReasoningRecap => String::new(),
    }
}

/// Joins content parts with paragraph breaks.
///
/// Non-text parts become an image link or a placeholder notice rather
/// than being dropped, so turns keep their content.
fn render_parts(parts: &[ContentPart]) -> String {
    let mut rendered = Vec::new();
    for part in parts {
        match part {
            ContentPart::Text(text) => {
                if !text.trim().is_empty() {
                    rendered.push(text.trim().to_owned());
                }
            }
            ContentPart::Image { asset_pointer } => {
                rendered.push(format!("![image]({asset_pointer})"));
            }
            ContentPart::Other(_) => rendered.push("*[unsupported content]*".to_owned()),
        }
    }
    rendered.join("\n\n")
}

/// Formats a Unix-seconds timestamp as a UTC date-time string.
#[allow(clippy::cast_possible_truncation)]
fn format_timestamp(seconds: f64) -> Option<String> {
    let millis = (seconds * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}
