//! Dependency inference by placeholder scanning
//!
//! The scan is textual: any substring shaped like a placeholder is looked up
//! in the batcher's registry. Tokens the registry does not know (stale,
//! foreign, or issued by another batcher) are left in the payload verbatim
//! and produce no dependency.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::placeholder::{find_placeholders, PlaceholderAllocator};

/// Dependencies discovered in one operation's payload
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Aliases of upstream operations
    pub dependencies: BTreeSet<String>,
    /// Exact placeholder occurrence → upstream alias
    pub placeholders: BTreeMap<String, String>,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Scan every text that will be sent for an operation.
///
/// `own_alias` is excluded so a record never depends on itself.
pub fn scan<'a, I>(allocator: &PlaceholderAllocator, texts: I, own_alias: &str) -> ScanOutcome
where
    I: IntoIterator<Item = &'a str>,
{
    let mut outcome = ScanOutcome::default();

    for text in texts {
        for token in find_placeholders(text) {
            match allocator.alias_for(token) {
                Some(alias) if alias != own_alias => {
                    outcome.dependencies.insert(alias.to_string());
                    outcome.placeholders.insert(token.to_string(), alias.to_string());
                }
                Some(_) => {}
                None => debug!(token, "ignoring placeholder not issued by this batcher"),
            }
        }
    }

    outcome
}
