//! Logging and debugging facilities for Strata.
//!
//! This module provides:
//! - Target names so each subsystem can be filtered independently
//! - A tree pretty-printer for diagnosing mirror trees
//! - Performance tracing hooks for profiling
//!
//! # Tracing Integration
//!
//! Strata uses the `tracing` crate for instrumentation. To see logs, install a
//! subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("strata::index=debug,strata::reparent=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Implement [`DebugTree`] for any tree-shaped structure and format it with
//! [`TreeFormatter`]:
//!
//! ```
//! use strata_core::logging::{DebugTree, TreeFormatter, TreeFormatOptions, TreeStyle};
//!
//! struct Nested(Vec<(&'static str, Vec<usize>)>);
//!
//! impl DebugTree for Nested {
//!     type Node = usize;
//!     fn debug_roots(&self) -> Vec<usize> { vec![0] }
//!     fn debug_label(&self, node: usize) -> String { self.0[node].0.to_string() }
//!     fn debug_children(&self, node: usize) -> Vec<usize> { self.0[node].1.clone() }
//! }
//!
//! let tree = Nested(vec![("Root", vec![1, 2]), ("Patient", vec![]), ("Study", vec![])]);
//! let text = TreeFormatter::with_options(TreeFormatOptions {
//!     style: TreeStyle::Ascii,
//!     ..Default::default()
//! })
//! .format(&tree);
//! assert!(text.contains("Patient"));
//! ```

use std::fmt::Write as FmtWrite;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "strata_core::signal";
    /// Hierarchy store target.
    pub const STORE: &str = "strata::store";
    /// Tree index (mirror tree) target.
    pub const INDEX: &str = "strata::index";
    /// Owner handler registry target.
    pub const HANDLER: &str = "strata::handler";
    /// Reparent resolver target.
    pub const REPARENT: &str = "strata::reparent";
    /// Store-to-index event adapter target.
    pub const ADAPTER: &str = "strata::adapter";
    /// Filter view target.
    pub const FILTER: &str = "strata::filter";
    /// Performance spans.
    pub const PERF: &str = "strata::perf";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line markers.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            max_depth: None,
            indent_size: 2,
        }
    }
}

/// A tree that can describe itself to [`TreeFormatter`].
pub trait DebugTree {
    /// Handle used to address a node.
    type Node: Copy;

    /// Top-level nodes, in display order.
    fn debug_roots(&self) -> Vec<Self::Node>;

    /// One-line label for a node.
    fn debug_label(&self, node: Self::Node) -> String;

    /// Children of a node, in display order.
    fn debug_children(&self, node: Self::Node) -> Vec<Self::Node>;
}

/// Formats a [`DebugTree`] as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeFormatter {
    options: TreeFormatOptions,
}

impl TreeFormatter {
    /// Create a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree.
    pub fn format<T: DebugTree + ?Sized>(&self, tree: &T) -> String {
        let mut output = String::new();
        let roots = tree.debug_roots();
        if roots.is_empty() {
            output.push_str("(empty)\n");
            return output;
        }
        let count = roots.len();
        for (i, root) in roots.into_iter().enumerate() {
            self.format_into(tree, root, 0, i + 1 == count, &mut output);
        }
        output
    }

    fn format_into<T: DebugTree + ?Sized>(
        &self,
        tree: &T,
        node: T::Node,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return;
            }
        }

        output.push_str(&self.build_prefix(depth, is_last));
        // Writing into a String cannot fail.
        let _ = writeln!(output, "{}", tree.debug_label(node));

        let children = tree.debug_children(node);
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_into(tree, child, depth + 1, i + 1 == child_count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => (
                "\u{2502}",
                "\u{251c}\u{2500}\u{2500}",
                "\u{2514}\u{2500}\u{2500}",
            ),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of operations such as full rebuilds.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
