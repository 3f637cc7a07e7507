//! N-gram index for case-insensitive substring search over node names.
//!
//! Names are broken into overlapping 2..=4 character grams. A query is
//! answered by intersecting the posting sets of its own grams and then
//! confirming the substring against the stored name, since gram overlap
//! alone admits false positives.

use grove_core::NodeId;
use std::collections::{BTreeSet, HashMap};

const MIN_NGRAM_LEN: usize = 2;
const MAX_NGRAM_LEN: usize = 4;

#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    /// Lowercased name per node, used to confirm candidates.
    names: HashMap<NodeId, String>,
    grams: HashMap<String, BTreeSet<NodeId>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, id: &NodeId) {
        let lower = name.to_lowercase();
        for gram in ngrams(&lower) {
            self.grams.entry(gram).or_default().insert(id.clone());
        }
        self.names.insert(id.clone(), lower);
    }

    /// Ids of nodes whose name contains `query`, sorted.
    pub fn search(&self, query: &str) -> Vec<NodeId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        // Too short to have grams: scan every name.
        if needle.chars().count() < MIN_NGRAM_LEN {
            let mut hits: Vec<NodeId> = self
                .names
                .iter()
                .filter(|(_, name)| name.contains(&needle))
                .map(|(id, _)| id.clone())
                .collect();
            hits.sort();
            return hits;
        }

        let mut candidates: Option<BTreeSet<NodeId>> = None;
        for gram in ngrams(&needle) {
            let Some(posting) = self.grams.get(&gram) else {
                return Vec::new();
            };
            candidates = Some(match candidates {
                None => posting.clone(),
                Some(current) => current.intersection(posting).cloned().collect(),
            });
            if candidates.as_ref().is_some_and(BTreeSet::is_empty) {
                return Vec::new();
            }
        }

        candidates
            .unwrap_or_default()
            .into_iter()
            .filter(|id| {
                self.names
                    .get(id)
                    .is_some_and(|name| name.contains(&needle))
            })
            .collect()
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn ngrams(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    for n in MIN_NGRAM_LEN..=MAX_NGRAM_LEN {
        if chars.len() < n {
            break;
        }
        for window in chars.windows(n) {
            out.push(window.iter().collect());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::NodeKind;

    fn id(name: &str) -> NodeId {
        NodeId::derive(name, NodeKind::Function, None)
    }

    fn index(names: &[&str]) -> SearchIndex {
        let mut index = SearchIndex::new();
        for name in names {
            index.insert(name, &id(name));
        }
        index
    }

    #[test]
    fn test_substring_hits() {
        let index = index(&["validate_user", "validate_email", "send_email"]);
        let hits = index.search("validate");
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&id("validate_user")));
        assert!(!hits.contains(&id("send_email")));

        assert_eq!(index.search("_user"), vec![id("validate_user")]);
    }

    #[test]
    fn test_case_insensitive() {
        let index = index(&["ValidateUser"]);
        assert_eq!(index.search("VALIDATEuser"), vec![id("ValidateUser")]);
    }

    #[test]
    fn test_gram_overlap_is_confirmed() {
        // Every 2..=4 gram of "abcdef" occurs in the name, the substring does not.
        let index = index(&["abcde_bcdef"]);
        assert!(index.search("abcdef").is_empty());
        assert_eq!(index.search("bcdef"), vec![id("abcde_bcdef")]);
    }

    #[test]
    fn test_single_char_matches_anywhere() {
        let index = index(&["ab", "abc", "xyz", "Cab"]);
        let hits = index.search("a");
        assert_eq!(hits.len(), 3);
        assert!(hits.contains(&id("Cab")));
        assert!(!hits.contains(&id("xyz")));

        assert_eq!(index.search("Z"), vec![id("xyz")]);
    }

    #[test]
    fn test_empty_and_missing() {
        let index = index(&["hello"]);
        assert!(index.search("").is_empty());
        assert!(index.search("world").is_empty());
        assert_eq!(index.len(), 1);
    }
}
