// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 gpt2md contributors

//! Convert ChatGPT conversation exports to Markdown.
//!
//! This crate provides parsing and rendering functionality for
//! transforming ChatGPT's JSON conversation-export format into readable
//! Markdown documents.
//!
//! # Overview
//!
//! ChatGPT's data export stores each conversation as a tree of message
//! nodes: editing a message or regenerating a reply creates a branch,
//! and a `current_node` pointer marks the branch the conversation
//! actually followed. This crate:
//!
//! 1. Parses the JSON structure into typed Rust representations
//! 2. Resolves the active branch into a linear message sequence
//! 3. Renders the sequence as clean Markdown with configurable output
//!
//! # Example
//!
//! ```
//! use gpt2md::{parser, renderer};
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
//! let export = parser::parse_conversation(json).unwrap();
//! let messages = export.active_branch().unwrap();
//!
//! let opts = renderer::RenderOptions::default();
//! let markdown = renderer::render_conversation(&export, &messages, &opts);
//!
//! assert!(markdown.starts_with("# Greetings"));
//! assert!(markdown.contains("Hello!"));
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and active-branch resolution for ChatGPT
//!   conversation exports
//! - [`renderer`]: Markdown generation with configurable output options

#![deny(missing_docs)]

pub mod parser;
pub mod renderer;
