use grove_core::NodeId;
use std::collections::{BTreeSet, HashMap};

/// A name-keyed table for resolving cross-file references during a build.
///
/// Several nodes may share a name (a `save` method on every model); the
/// table keeps all of them and picks one deterministically on lookup.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    by_name: HashMap<String, BTreeSet<NodeId>>,
    /// File each registered symbol was defined in.
    files: HashMap<NodeId, Option<String>>,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: NodeId,
    /// More than one candidate shared the name.
    pub ambiguous: bool,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol under its short name.
    pub fn insert(&mut self, name: &str, id: NodeId, file: Option<&str>) {
        self.by_name
            .entry(name.to_string())
            .or_default()
            .insert(id.clone());
        self.files.insert(id, file.map(str::to_string));
    }

    /// Resolves `name` as seen from `from_file`.
    ///
    /// A candidate defined in the same file wins; otherwise the lowest id.
    pub fn resolve(&self, name: &str, from_file: Option<&str>) -> Option<Resolved> {
        let candidates = self.by_name.get(name)?;
        let same_file = candidates.iter().find(|id| {
            from_file.is_some()
                && self
                    .files
                    .get(*id)
                    .is_some_and(|file| file.as_deref() == from_file)
        });
        let id = same_file.or_else(|| candidates.iter().next())?;
        Some(Resolved {
            id: id.clone(),
            ambiguous: candidates.len() > 1,
        })
    }

    /// Like [`resolve`](Self::resolve), falling back to the last segment of a
    /// dotted or `::` path (`self.repo.save` -> `save`).
    pub fn resolve_reference(&self, reference: &str, from_file: Option<&str>) -> Option<Resolved> {
        self.resolve(reference, from_file).or_else(|| {
            let last = last_segment(reference);
            if last == reference {
                None
            } else {
                self.resolve(last, from_file)
            }
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The final component of a dotted or `::`-separated path.
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit(['.', ':'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}
