//! Placeholder token allocation
//!
//! Every queued operation gets a placeholder, the literal text callers embed
//! in dependent payloads, and an alias, the short key the server uses to
//! report results. Placeholders carry the issuing batcher's instance id so
//! tokens from two batchers can never collide.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use batchwire_domain::constants::{
    ALIAS_PREFIX, PLACEHOLDER_INDEX_WIDTH, PLACEHOLDER_PREFIX, PLACEHOLDER_SUFFIX,
};
use once_cell::sync::Lazy;
use regex::Regex;

static NEXT_BATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Lexical shape of any placeholder, allocated by this process or not.
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"{}\d+_\d{{{},}}{}",
        regex::escape(PLACEHOLDER_PREFIX),
        PLACEHOLDER_INDEX_WIDTH,
        regex::escape(PLACEHOLDER_SUFFIX)
    );
    Regex::new(&pattern).expect("PLACEHOLDER_PATTERN should compile - this is a bug")
});

/// Process-unique batcher instance id
pub(crate) fn next_batcher_id() -> u64 {
    NEXT_BATCHER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Render the placeholder for operation `index` of batcher `batcher_id`.
pub fn format_placeholder(batcher_id: u64, index: u64) -> String {
    format!(
        "{PLACEHOLDER_PREFIX}{batcher_id}_{index:0width$}{PLACEHOLDER_SUFFIX}",
        width = PLACEHOLDER_INDEX_WIDTH
    )
}

/// Render the alias for operation `index`.
pub fn format_alias(index: u64) -> String {
    format!("{ALIAS_PREFIX}{index}")
}

/// Every substring of `text` shaped like a placeholder, in order.
pub fn find_placeholders(text: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER_PATTERN.find_iter(text).map(|m| m.as_str())
}

/// A freshly allocated (placeholder, alias) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub placeholder: String,
    pub alias: String,
}

/// Counter-based allocator owned by one batcher
#[derive(Debug)]
pub struct PlaceholderAllocator {
    batcher_id: u64,
    next_index: u64,
    registry: HashMap<String, String>,
}

impl PlaceholderAllocator {
    pub fn new(batcher_id: u64) -> Self {
        Self { batcher_id, next_index: 0, registry: HashMap::new() }
    }

    /// Allocate the next pair and register placeholder → alias.
    pub fn allocate(&mut self) -> Allocation {
        let placeholder = format_placeholder(self.batcher_id, self.next_index);
        let alias = format_alias(self.next_index);
        self.registry.insert(placeholder.clone(), alias.clone());
        self.next_index += 1;
        Allocation { placeholder, alias }
    }

    /// Alias registered for an exact placeholder token, if this allocator
    /// issued it.
    pub fn alias_for(&self, placeholder: &str) -> Option<&str> {
        self.registry.get(placeholder).map(String::as_str)
    }

    pub fn allocated(&self) -> u64 {
        self.next_index
    }

    pub fn batcher_id(&self) -> u64 {
        self.batcher_id
    }
}
