//! The quad store facade: wires the [`Dictionary`] and
//! [`QuadIndex`] together behind the operations external callers actually
//! use — bulk load, assertion, pattern scan, export, and statistics.

use crate::dictionary::Dictionary;
use crate::error::{InvalidId, ParseError};
use crate::index::{EncodedQuad, Pattern, QuadIndex};
use crate::model::{GraphName, GraphNameRef, NamedNode, Quad, Term};
use crate::parser::{self, GraphSelector, RdfFormat};
use rustc_hash::FxHashMap;

/// Snapshot of the incrementally-maintained quad/dictionary counters.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub total_quads: u64,
    pub per_graph: FxHashMap<NamedNode, u64>,
    pub default_graph: u64,
    pub dictionary_size: u64,
}

/// The quad store: a [`Dictionary`] plus a [`QuadIndex`], one writer, many
/// readers.
#[derive(Default)]
pub struct Store {
    dictionary: Dictionary,
    index: QuadIndex,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn index(&self) -> &QuadIndex {
        &self.index
    }

    /// Bulk-loads `text` under `format` into `target_graph`. Atomic per
    /// document: on parse failure the store is unchanged.
    pub fn load(
        &self,
        text: &[u8],
        format: RdfFormat,
        target_graph: GraphNameRef<'_>,
    ) -> Result<u64, ParseError> {
        tracing::debug!(?format, "bulk load starting");
        let inserted = parser::load(&self.dictionary, &self.index, text, format, target_graph)?;
        tracing::info!(inserted, "bulk load complete");
        Ok(inserted)
    }

    /// Asserts a single quad, as the reasoner does when re-materializing
    /// derived facts.
    pub fn insert(&self, quad: &Quad) -> bool {
        let s = self.dictionary.intern(&quad.subject.clone().into());
        let p = self.dictionary.intern(&Term::NamedNode(quad.predicate.clone()));
        let o = self.dictionary.intern(&quad.object);
        let g = self.dictionary.intern_graph_name(quad.graph_name.as_ref());
        self.index.insert_quad(s, p, o, g)
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        let Some(s) = self.dictionary.get(&quad.subject.clone().into()) else {
            return false;
        };
        let Some(p) = self.dictionary.get(&Term::NamedNode(quad.predicate.clone())) else {
            return false;
        };
        let Some(o) = self.dictionary.get(&quad.object) else {
            return false;
        };
        let g = self.dictionary.intern_graph_name(quad.graph_name.as_ref());
        self.index.contains(s, p, o, g)
    }

    pub fn clear_graph(&self, graph: GraphNameRef<'_>) {
        let g = self.dictionary.intern_graph_name(graph);
        self.index.clear_graph(g);
    }

    pub fn clear_all(&self) {
        self.index.clear_all();
    }

    pub fn len(&self) -> u64 {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Every named graph IRI present as the fourth column of some quad.
    pub fn all_graphs(&self) -> Result<Vec<NamedNode>, InvalidId> {
        self.index
            .all_graphs()
            .into_iter()
            .map(|id| match self.dictionary.resolve_graph_name(id)? {
                GraphName::NamedNode(n) => Ok(n),
                _ => Err(InvalidId(id)),
            })
            .collect()
    }

    pub fn statistics(&self) -> Result<Statistics, InvalidId> {
        let mut per_graph = FxHashMap::default();
        for g in self.index.all_graphs() {
            let count = self.index.count_graph(g);
            if let GraphName::NamedNode(n) = self.dictionary.resolve_graph_name(g)? {
                per_graph.insert(n, count);
            }
        }
        Ok(Statistics {
            total_quads: self.index.len(),
            default_graph: self.index.count_graph(crate::model::DEFAULT_GRAPH_ID),
            per_graph,
            dictionary_size: self.dictionary.size(),
        })
    }

    /// Resolves an [`EncodedQuad`] back to a [`Quad`] of [`Term`]s.
    pub fn decode(&self, (s, p, o, g): EncodedQuad) -> Result<Quad, InvalidId> {
        let subject: crate::model::Subject = match self.dictionary.resolve(s)? {
            Term::NamedNode(n) => n.into(),
            Term::BlankNode(b) => b.into(),
            Term::Literal(_) => return Err(InvalidId(s)),
        };
        let predicate = match self.dictionary.resolve(p)? {
            Term::NamedNode(n) => n,
            _ => return Err(InvalidId(p)),
        };
        let object = self.dictionary.resolve(o)?;
        let graph_name = self.dictionary.resolve_graph_name(g)?;
        Ok(Quad::new(subject, predicate, object, graph_name))
    }

    /// Scans every quad matching a term-level pattern (`None` = wildcard).
    pub fn scan(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<GraphNameRef<'_>>,
    ) -> Vec<Quad> {
        let lookup = |t: Option<&Term>| -> Option<Option<u64>> {
            match t {
                None => Some(None),
                Some(t) => self.dictionary.get(t).map(Some),
            }
        };
        let (Some(s), Some(p), Some(o)) = (lookup(subject), lookup(predicate), lookup(object))
        else {
            return Vec::new();
        };
        // A read-only scan must never allocate a dictionary id: a graph
        // filter naming a graph that was never interned simply matches no
        // quads, rather than growing `dictionary_size` as a side effect of
        // a query.
        let g = match graph {
            None => None,
            Some(g) => match self.dictionary.get_graph_name(g) {
                Some(id) => Some(id),
                None => return Vec::new(),
            },
        };
        let pattern = Pattern::new(s, p, o, g);
        self.index
            .scan(pattern)
            .into_iter()
            .filter_map(|q| self.decode(q).ok())
            .collect()
    }

    pub fn export(&self, format: RdfFormat, selector: &GraphSelector) -> Result<Vec<u8>, InvalidId> {
        parser::export(&self.dictionary, &self.index, format, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NamedNodeRef;

    #[test]
    fn insert_then_contains() {
        let store = Store::new();
        let a = NamedNodeRef::new("http://x/a").unwrap();
        let p = NamedNodeRef::new("http://x/p").unwrap();
        let quad = Quad::new(a, p, a, GraphName::DefaultGraph);
        assert!(store.insert(&quad));
        assert!(store.contains(&quad));
        assert!(!store.insert(&quad));
    }

    #[test]
    fn statistics_track_totals_and_dictionary_size() {
        let store = Store::new();
        let a = NamedNodeRef::new("http://x/a").unwrap();
        let p = NamedNodeRef::new("http://x/p").unwrap();
        store.insert(&Quad::new(a, p, a, GraphName::DefaultGraph));
        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_quads, 1);
        assert_eq!(stats.dictionary_size, 2);
    }

    #[test]
    fn scan_for_unknown_graph_does_not_grow_the_dictionary() {
        let store = Store::new();
        let a = NamedNodeRef::new("http://x/a").unwrap();
        let p = NamedNodeRef::new("http://x/p").unwrap();
        store.insert(&Quad::new(a, p, a, GraphName::DefaultGraph));
        let before = store.statistics().unwrap().dictionary_size;

        let never_seen = NamedNodeRef::new("http://x/never-seen-graph").unwrap();
        let results = store.scan(None, None, None, Some(GraphNameRef::NamedNode(never_seen)));
        assert!(results.is_empty());

        let after = store.statistics().unwrap().dictionary_size;
        assert_eq!(before, after, "a read-only scan must not intern a new graph id");
    }
}
