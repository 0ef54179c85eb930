//! The quad index.
//!
//! Quads are stored as four `u64` dictionary ids with no duplicates
//! (multiset semantics are explicitly rejected by spec.md §3). Three
//! orderings are maintained, each keyed by graph first so that a bound graph
//! position and up to two bound subject/predicate/object positions resolve
//! to a single contiguous B-tree range scan — this is the "six indexes if
//! the default graph is stored separately" of spec.md §4.2, folded into
//! three graph-prefixed `BTreeSet`s rather than six separate maps, since a
//! leading key in a sorted set already partitions by graph the same way a
//! separate per-graph map would.
//!
//! | bound positions (graph always considered separately) | ordering used |
//! |---|---|
//! | none | GSPO (graph prefix only) |
//! | S | GSPO |
//! | P | GPOS |
//! | O | GOSP |
//! | S,P | GSPO |
//! | P,O | GPOS |
//! | S,O | GOSP |
//! | S,P,O | GSPO (exact) |
//!
//! When the graph position itself is a wildcard, [`QuadIndex::scan`] falls
//! back to iterating [`QuadIndex::all_graphs`] (plus the default graph) and
//! unioning per-graph scans; since graphs partition the quad set this is
//! still an exactly-once enumeration, and it is also precisely what
//! spec.md §4.6 rule 6 asks for when binding `?g` in `GRAPH ?g { ... }`.

use crate::model::DEFAULT_GRAPH_ID;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::RwLock;

/// A single (subject, predicate, object, graph) id quad.
pub type EncodedQuad = (u64, u64, u64, u64);

/// A pattern over id-space: each position is either a concrete id to match
/// or a wildcard.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pattern {
    pub subject: Option<u64>,
    pub predicate: Option<u64>,
    pub object: Option<u64>,
    pub graph: Option<u64>,
}

impl Pattern {
    pub fn new(
        subject: Option<u64>,
        predicate: Option<u64>,
        object: Option<u64>,
        graph: Option<u64>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }
}

#[derive(Default)]
struct Inner {
    /// (graph, subject, predicate, object)
    gspo: BTreeSet<EncodedQuad>,
    /// (graph, predicate, object, subject)
    gpos: BTreeSet<EncodedQuad>,
    /// (graph, object, subject, predicate)
    gosp: BTreeSet<EncodedQuad>,
    /// quad counts per graph id, including the default graph
    graph_counts: FxHashMap<u64, u64>,
    /// quad counts per predicate id, across all graphs
    predicate_counts: FxHashMap<u64, u64>,
    total: u64,
}

/// The quad index. One writer, many readers: every mutating
/// method takes `&self` and serializes internally on a single `RwLock`, so a
/// reader that started before a write completed observes either the whole
/// write or none of it.
#[derive(Default)]
pub struct QuadIndex {
    inner: RwLock<Inner>,
}

impl QuadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a quad. Returns `false` without error if it was already
    /// present.
    pub fn insert_quad(&self, s: u64, p: u64, o: u64, g: u64) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.gspo.contains(&(g, s, p, o)) {
            return false;
        }
        inner.gspo.insert((g, s, p, o));
        inner.gpos.insert((g, p, o, s));
        inner.gosp.insert((g, o, s, p));
        *inner.graph_counts.entry(g).or_insert(0) += 1;
        *inner.predicate_counts.entry(p).or_insert(0) += 1;
        inner.total += 1;
        true
    }

    pub fn contains(&self, s: u64, p: u64, o: u64, g: u64) -> bool {
        self.inner.read().unwrap().gspo.contains(&(g, s, p, o))
    }

    /// Total number of quads in the store.
    pub fn len(&self) -> u64 {
        self.inner.read().unwrap().total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_graph(&self, g: u64) -> u64 {
        self.inner
            .read()
            .unwrap()
            .graph_counts
            .get(&g)
            .copied()
            .unwrap_or(0)
    }

    pub fn count_predicate(&self, p: u64) -> u64 {
        self.inner
            .read()
            .unwrap()
            .predicate_counts
            .get(&p)
            .copied()
            .unwrap_or(0)
    }

    /// Every graph id that has at least one quad, not including the default
    /// graph sentinel (spec.md §4.2 `all_graphs`, which is defined over
    /// named graphs).
    pub fn all_graphs(&self) -> Vec<u64> {
        self.inner
            .read()
            .unwrap()
            .graph_counts
            .keys()
            .copied()
            .filter(|&g| g != DEFAULT_GRAPH_ID)
            .collect()
    }

    /// Removes every quad in `g`. A no-op if `g` has no quads (spec.md §4.2
    /// "Failure model").
    pub fn clear_graph(&self, g: u64) {
        let mut inner = self.inner.write().unwrap();
        let removed: Vec<EncodedQuad> = inner
            .gspo
            .range((g, u64::MIN, u64::MIN, u64::MIN)..=(g, u64::MAX, u64::MAX, u64::MAX))
            .copied()
            .collect();
        for (g, s, p, o) in removed {
            inner.gspo.remove(&(g, s, p, o));
            inner.gpos.remove(&(g, p, o, s));
            inner.gosp.remove(&(g, o, s, p));
            if let Some(c) = inner.predicate_counts.get_mut(&p) {
                *c -= 1;
            }
            inner.total -= 1;
        }
        inner.graph_counts.remove(&g);
    }

    /// Removes every quad from every graph.
    pub fn clear_all(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
    }

    /// Yields every quad matching `pattern` exactly once. Iteration order is
    /// unspecified except that within a single graph partition it follows
    /// the ordering chosen for that pattern shape (see module docs).
    pub fn scan(&self, pattern: Pattern) -> Vec<EncodedQuad> {
        let inner = self.inner.read().unwrap();
        match pattern.graph {
            Some(g) => Self::scan_graph(&inner, pattern, g),
            None => {
                let mut graphs: Vec<u64> = inner.graph_counts.keys().copied().collect();
                graphs.sort_unstable();
                graphs
                    .into_iter()
                    .flat_map(|g| Self::scan_graph(&inner, pattern, g))
                    .collect()
            }
        }
    }

    fn scan_graph(inner: &Inner, pattern: Pattern, g: u64) -> Vec<EncodedQuad> {
        let (s, p, o) = (pattern.subject, pattern.predicate, pattern.object);
        match (s, p, o) {
            (Some(s), Some(p), Some(o)) => {
                if inner.gspo.contains(&(g, s, p, o)) {
                    vec![(s, p, o, g)]
                } else {
                    vec![]
                }
            }
            (Some(s), Some(p), None) => Self::range(&inner.gspo, (g, s, p, u64::MIN)..=(g, s, p, u64::MAX))
                .map(|&(g, s, p, o)| (s, p, o, g))
                .collect(),
            (None, Some(p), Some(o)) => Self::range(&inner.gpos, (g, p, o, u64::MIN)..=(g, p, o, u64::MAX))
                .map(|&(g, p, o, s)| (s, p, o, g))
                .collect(),
            (Some(s), None, Some(o)) => Self::range(&inner.gosp, (g, o, s, u64::MIN)..=(g, o, s, u64::MAX))
                .map(|&(g, o, s, p)| (s, p, o, g))
                .collect(),
            (Some(s), None, None) => Self::range(
                &inner.gspo,
                (g, s, u64::MIN, u64::MIN)..=(g, s, u64::MAX, u64::MAX),
            )
            .map(|&(g, s, p, o)| (s, p, o, g))
            .collect(),
            (None, Some(p), None) => Self::range(
                &inner.gpos,
                (g, p, u64::MIN, u64::MIN)..=(g, p, u64::MAX, u64::MAX),
            )
            .map(|&(g, p, o, s)| (s, p, o, g))
            .collect(),
            (None, None, Some(o)) => Self::range(
                &inner.gosp,
                (g, o, u64::MIN, u64::MIN)..=(g, o, u64::MAX, u64::MAX),
            )
            .map(|&(g, o, s, p)| (s, p, o, g))
            .collect(),
            (None, None, None) => Self::range(
                &inner.gspo,
                (g, u64::MIN, u64::MIN, u64::MIN)..=(g, u64::MAX, u64::MAX, u64::MAX),
            )
            .map(|&(g, s, p, o)| (s, p, o, g))
            .collect(),
        }
    }

    fn range(
        set: &BTreeSet<EncodedQuad>,
        bounds: std::ops::RangeInclusive<EncodedQuad>,
    ) -> impl Iterator<Item = &EncodedQuad> {
        set.range(bounds)
    }

    /// The distinct object ids reachable from `(s, p)` via a bound-s,
    /// bound-p scan — used by the WCOJ planner's per-predicate extension
    /// size estimate without materializing full
    /// quads.
    pub fn extension_size(&self, p: u64, g: Option<u64>) -> u64 {
        self.count_predicate_in_graph(p, g)
    }

    fn count_predicate_in_graph(&self, p: u64, g: Option<u64>) -> u64 {
        match g {
            Some(g) => self
                .scan(Pattern::new(None, Some(p), None, Some(g)))
                .len() as u64,
            None => self.count_predicate(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_returns_false_and_does_not_grow() {
        let idx = QuadIndex::new();
        assert!(idx.insert_quad(1, 2, 3, DEFAULT_GRAPH_ID));
        assert!(!idx.insert_quad(1, 2, 3, DEFAULT_GRAPH_ID));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn scan_every_wildcard_combination() {
        let idx = QuadIndex::new();
        idx.insert_quad(1, 2, 3, DEFAULT_GRAPH_ID);
        idx.insert_quad(1, 2, 4, DEFAULT_GRAPH_ID);
        idx.insert_quad(5, 2, 3, DEFAULT_GRAPH_ID);

        assert_eq!(idx.scan(Pattern::new(Some(1), Some(2), None, None)).len(), 2);
        assert_eq!(idx.scan(Pattern::new(None, Some(2), Some(3), None)).len(), 2);
        assert_eq!(idx.scan(Pattern::new(Some(1), None, Some(3), None)).len(), 1);
        assert_eq!(idx.scan(Pattern::new(None, None, None, None)).len(), 3);
    }

    #[test]
    fn clear_unknown_graph_is_noop() {
        let idx = QuadIndex::new();
        idx.insert_quad(1, 2, 3, DEFAULT_GRAPH_ID);
        idx.clear_graph(999);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn clear_graph_removes_only_that_graph() {
        let idx = QuadIndex::new();
        idx.insert_quad(1, 2, 3, DEFAULT_GRAPH_ID);
        idx.insert_quad(1, 2, 3, 42);
        idx.clear_graph(42);
        assert_eq!(idx.len(), 1);
        assert!(idx.all_graphs().is_empty());
    }
}
