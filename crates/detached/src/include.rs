//! Include-path resolution.
//!
//! Computes the navigation paths a root query must eager-load so the
//! fetched graph is a complete aggregate: owned chains compose into one
//! path, associated navigations are included one level and terminate their
//! branch.

use detached_core::error::Result;
use detached_core::schema::{EntityType, Schema};
use std::collections::HashSet;
use std::fmt;

/// An ordered sequence of navigation names from a root to a leaf.
///
/// Equality is path equality; the display form is the dot-joined segment
/// list (`"invoice.lines.product"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludePath {
    segments: Vec<&'static str>,
}

impl IncludePath {
    /// Create an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this path extended by one navigation.
    #[must_use]
    pub fn extended(&self, navigation: &'static str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(navigation);
        Self { segments }
    }

    /// The navigation names from root to leaf.
    #[must_use]
    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }

    /// Number of navigations in this path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Resolve the include paths required to load a complete aggregate rooted
/// at `root`.
///
/// Depth-first walk over the schema graph. At each entity type the
/// qualifying navigations are those whose target differs from the
/// immediate parent type — the guard that stops bidirectional owned
/// relationships from recursing forever. It is deliberately one hop deep:
/// longer schema cycles are not guarded, and a full visited-set would drop
/// legitimate diamond-shaped owned graphs. Owned navigations recurse with
/// the path extended; associated navigations emit the extended path and
/// stop. A root with no qualifying navigations yields an empty set.
pub fn resolve_paths(schema: &Schema, root: &EntityType) -> Result<Vec<IncludePath>> {
    let mut results = Vec::new();
    walk(schema, None, root, &IncludePath::new(), &mut results)?;

    // The same leaf can be reached through converging owned branches.
    let mut seen = HashSet::new();
    results.retain(|path| seen.insert(path.to_string()));

    tracing::trace!(
        root = root.name,
        paths = results.len(),
        "resolved include paths"
    );
    Ok(results)
}

/// Resolve include paths in their string form, ready for the store.
pub fn resolve_path_strings(schema: &Schema, root: &EntityType) -> Result<Vec<String>> {
    Ok(resolve_paths(schema, root)?
        .iter()
        .map(ToString::to_string)
        .collect())
}

fn walk(
    schema: &Schema,
    parent: Option<&EntityType>,
    ty: &EntityType,
    path: &IncludePath,
    results: &mut Vec<IncludePath>,
) -> Result<()> {
    let navs: Vec<_> = ty
        .navigations
        .iter()
        .filter(|nav| parent.is_none_or(|p| nav.target != p.name))
        .collect();

    if navs.is_empty() {
        if !path.is_empty() {
            results.push(path.clone());
        }
        return Ok(());
    }

    for nav in navs {
        let extended = path.extended(nav.name);
        if nav.is_owned() {
            let target = schema.require(nav.target)?;
            walk(schema, Some(ty), target, &extended, results)?;
        } else {
            results.push(extended);
        }
    }

    Ok(())
}
