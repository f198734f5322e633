// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! File tailing for mcplog: per-file incremental readers, directory tree
//! watching, the format parser registry, and the periodic path validator.

pub mod file_event;
pub mod parsers;
pub mod publish;
pub mod registry;
pub mod tailer;
pub mod tree;
pub mod validator;

pub use file_event::{FileEvent, FileEventSource};
pub use parsers::{LineParser, ParseContext, ParserRegistry};
pub use publish::EntryPublisher;
pub use registry::{WatchStatus, WatcherRegistry};
pub use tailer::TailerOptions;
pub use tree::TreeWatcher;
pub use validator::PathValidator;
