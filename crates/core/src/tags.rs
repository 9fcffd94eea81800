//! Resolves configured tag names against the remote tag catalog.

use providers::Tag;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagResolution {
    pub ids: Vec<i64>,
    pub missing: Vec<String>,
}

/// Maps `wanted` names to catalog ids. Unknown names are dropped with a warning.
pub fn resolve(catalog: &[Tag], wanted: &[String]) -> TagResolution {
    let by_name: HashMap<&str, i64> = catalog.iter().map(|t| (t.name.as_str(), t.id)).collect();
    let mut resolution = TagResolution::default();
    for name in wanted {
        match by_name.get(name.as_str()) {
            Some(id) => {
                if !resolution.ids.contains(id) {
                    resolution.ids.push(*id);
                }
            }
            None => {
                warn!(tag = %name, "tag not found in Paperless and will be ignored");
                resolution.missing.push(name.clone());
            }
        }
    }
    resolution
}
