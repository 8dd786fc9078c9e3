// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 gpt2md contributors

//! Integration tests for gpt2md parsing and rendering.

use gpt2md::{parser, renderer};

/// A 3-node linear conversation: user -> assistant -> user.
const TRIP_PLANNING: &str = r#"{
    "title": "Trip Planning",
    "create_time": 1733356800.0,
    "conversation_id": "conv-1",
    "mapping": {
        "root": { "parent": null, "children": ["u1"] },
        "u1": {
            "parent": "root",
            "children": ["a1"],
            "message": {
                "author": { "role": "user" },
                "create_time": 1733356810.0,
                "content": { "content_type": "text", "parts": ["Where should we go in May?"] },
                "metadata": {}
            }
        },
        "a1": {
            "parent": "u1",
            "children": ["u2"],
            "message": {
                "author": { "role": "assistant" },
                "create_time": 1733356820.0,
                "content": { "content_type": "text", "parts": ["Lisbon is lovely in May."] },
                "metadata": { "model_slug": "gpt-4o" }
            }
        },
        "u2": {
            "parent": "a1",
            "children": [],
            "message": {
                "author": { "role": "user" },
                "create_time": 1733356830.0,
                "content": { "content_type": "text", "parts": ["Book it."] },
                "metadata": {}
            }
        }
    },
    "current_node": "u2"
}"#;

#[test]
fn renders_linear_conversation() {
    let export = parser::parse_conversation(TRIP_PLANNING).unwrap();
    let messages = export.active_branch().unwrap();
    let markdown =
        renderer::render_conversation(&export, &messages, &renderer::RenderOptions::default());

    assert!(markdown.starts_with("# Trip Planning"));
    assert_eq!(markdown.matches("## User").count(), 2);
    assert_eq!(markdown.matches("## Assistant").count(), 1);
    assert!(markdown.contains("- **Messages**: 3"));

    // Role order follows the root-to-leaf walk.
    let first_user = markdown.find("Where should we go in May?").unwrap();
    let assistant = markdown.find("Lisbon is lovely in May.").unwrap();
    let second_user = markdown.find("Book it.").unwrap();
    assert!(first_user < assistant);
    assert!(assistant < second_user);
}

#[test]
fn rendering_is_idempotent() {
    let export = parser::parse_conversation(TRIP_PLANNING).unwrap();
    let opts = renderer::RenderOptions::default();

    let first = renderer::render_conversation(&export, &export.active_branch().unwrap(), &opts);
    let second = renderer::render_conversation(&export, &export.active_branch().unwrap(), &opts);

    assert_eq!(first, second);
}

#[test]
fn regenerated_reply_renders_only_active_branch() {
    let json = r#"{
        "title": "Jokes",
        "mapping": {
            "root": { "parent": null, "children": ["u1"] },
            "u1": {
                "parent": "root",
                "children": ["a1", "a2"],
                "message": {
                    "author": { "role": "user" },
                    "create_time": 1.0,
                    "content": { "content_type": "text", "parts": ["Tell me a joke"] },
                    "metadata": {}
                }
            },
            "a1": {
                "parent": "u1",
                "children": [],
                "message": {
                    "author": { "role": "assistant" },
                    "create_time": 2.0,
                    "content": { "content_type": "text", "parts": ["First attempt"] },
                    "metadata": {}
                }
            },
            "a2": {
                "parent": "u1",
                "children": [],
                "message": {
                    "author": { "role": "assistant" },
                    "create_time": 3.0,
                    "content": { "content_type": "text", "parts": ["Second attempt"] },
                    "metadata": {}
                }
            }
        },
        "current_node": "a2"
    }"#;

    let export = parser::parse_conversation(json).unwrap();
    let messages = export.active_branch().unwrap();
    let markdown =
        renderer::render_conversation(&export, &messages, &renderer::RenderOptions::default());

    assert!(markdown.contains("Second attempt"));
    assert!(!markdown.contains("First attempt"));
    assert!(markdown.contains("- **Messages**: 2"));
}

#[test]
fn hidden_and_system_messages_are_filtered() {
    let json = r#"{
        "title": "With System",
        "mapping": {
            "root": { "parent": null, "children": ["s1"] },
            "s1": {
                "parent": "root",
                "children": ["u1"],
                "message": {
                    "author": { "role": "system" },
                    "content": { "content_type": "text", "parts": ["You are helpful."] },
                    "metadata": { "is_visually_hidden_from_conversation": true }
                }
            },
            "u1": {
                "parent": "s1",
                "children": [],
                "message": {
                    "author": { "role": "user" },
                    "create_time": 1.0,
                    "content": { "content_type": "text", "parts": ["Hi"] },
                    "metadata": {}
                }
            }
        },
        "current_node": "u1"
    }"#;

    let export = parser::parse_conversation(json).unwrap();
    let messages = export.active_branch().unwrap();

    // Hidden system prompts stay hidden even with show_system on.
    let opts = renderer::RenderOptions {
        show_system: true,
        ..Default::default()
    };
    let markdown = renderer::render_conversation(&export, &messages, &opts);

    assert!(!markdown.contains("You are helpful."));
    assert!(markdown.contains("- **Messages**: 1"));
}

#[test]
fn malformed_export_reports_structure_error() {
    let json = r#"{
        "title": "Broken",
        "mapping": {
            "a": { "parent": "missing", "children": [], "message": null }
        },
        "current_node": "a"
    }"#;

    let export = parser::parse_conversation(json).unwrap();
    let err = export.active_branch().unwrap_err();

    assert!(matches!(err, parser::ParseError::MalformedExport { .. }));
    assert!(err.to_string().contains("malformed conversation export"));
}
