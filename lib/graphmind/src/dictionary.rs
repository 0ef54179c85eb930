//! The term dictionary.
//!
//! Interns [`Term`]s to dense `u64` ids. `intern` is idempotent: the same
//! term always maps back to the same id for the life of the store, ids are
//! assigned monotonically and never reused, and id `0` is reserved for the
//! default-graph sentinel and is never handed out by [`Dictionary::intern`].
//!
//! Representation follows spec.md's design note: a hash map from term to id
//! backs lookups, an indexable vector backs reverse resolution. Both are
//! guarded by a single `RwLock` — the dictionary and the quad index
//! are the only shared mutable state in the store, and this is
//! the one-writer/many-readers boundary for it.

use crate::error::InvalidId;
use crate::model::{GraphName, GraphNameRef, Term, TermRef};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

/// Bidirectional `Term <-> u64` mapping, as specified in spec.md §4.1.
pub struct Dictionary {
    inner: RwLock<Inner>,
}

struct Inner {
    term_to_id: FxHashMap<Term, u64>,
    // Index 0 is a placeholder never resolved through `resolve`; real terms
    // start at id 1 so that 0 stays exclusively the default-graph sentinel.
    id_to_term: Vec<Option<Term>>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                term_to_id: FxHashMap::default(),
                id_to_term: vec![None],
            }),
        }
    }

    /// Interns `term`, returning its id. Idempotent: interning an
    /// already-known term returns the id it was first assigned.
    pub fn intern(&self, term: &Term) -> u64 {
        if let Some(id) = self.inner.read().unwrap().term_to_id.get(term) {
            return *id;
        }
        let mut inner = self.inner.write().unwrap();
        // Another writer may have interned the same term between the read
        // lock being dropped and this write lock being taken.
        if let Some(id) = inner.term_to_id.get(term) {
            return *id;
        }
        let id = inner.id_to_term.len() as u64;
        inner.id_to_term.push(Some(term.clone()));
        inner.term_to_id.insert(term.clone(), id);
        id
    }

    /// Interns a graph name, mapping the default graph to
    /// [`crate::model::DEFAULT_GRAPH_ID`] without allocating a dictionary
    /// entry for it.
    pub fn intern_graph_name(&self, graph_name: GraphNameRef<'_>) -> u64 {
        match graph_name {
            GraphNameRef::DefaultGraph => crate::model::DEFAULT_GRAPH_ID,
            GraphNameRef::NamedNode(n) => self.intern(&Term::NamedNode(n.into_owned())),
            GraphNameRef::BlankNode(b) => self.intern(&Term::BlankNode(b.into_owned())),
        }
    }

    /// Resolves an id back to its term. Fails with [`InvalidId`] if the id
    /// was never assigned.
    pub fn resolve(&self, id: u64) -> Result<Term, InvalidId> {
        let inner = self.inner.read().unwrap();
        inner
            .id_to_term
            .get(id as usize)
            .and_then(|slot| slot.clone())
            .ok_or(InvalidId(id))
    }

    /// Resolves a graph id back to a [`GraphName`], handling the default
    /// graph sentinel.
    pub fn resolve_graph_name(&self, id: u64) -> Result<GraphName, InvalidId> {
        if id == crate::model::DEFAULT_GRAPH_ID {
            return Ok(GraphName::DefaultGraph);
        }
        match self.resolve(id)? {
            Term::NamedNode(n) => Ok(GraphName::NamedNode(n)),
            Term::BlankNode(b) => Ok(GraphName::BlankNode(b)),
            Term::Literal(_) => Err(InvalidId(id)),
        }
    }

    /// Looks up an already-interned term's id without inserting it.
    pub fn get(&self, term: &Term) -> Option<u64> {
        self.inner.read().unwrap().term_to_id.get(term).copied()
    }

    /// Looks up an already-interned graph name's id without inserting it,
    /// handling the default graph sentinel. Returns `None` for a named
    /// graph that has never been interned — callers scanning for a graph
    /// that doesn't exist should treat this as "no match", not allocate a
    /// fresh id for it.
    pub fn get_graph_name(&self, graph_name: GraphNameRef<'_>) -> Option<u64> {
        match graph_name {
            GraphNameRef::DefaultGraph => Some(crate::model::DEFAULT_GRAPH_ID),
            GraphNameRef::NamedNode(n) => self.get(&Term::NamedNode(n.into_owned())),
            GraphNameRef::BlankNode(b) => self.get(&Term::BlankNode(b.into_owned())),
        }
    }

    /// The number of distinct terms interned so far (not counting the
    /// reserved default-graph sentinel).
    pub fn size(&self) -> u64 {
        self.inner.read().unwrap().term_to_id.len() as u64
    }
}

/// Borrowed-term convenience wrapper, avoiding a clone when the caller
/// already owns a `TermRef`.
impl Dictionary {
    pub fn intern_ref(&self, term: TermRef<'_>) -> u64 {
        self.intern(&term.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NamedNode;

    #[test]
    fn intern_is_idempotent() {
        let dict = Dictionary::new();
        let a = Term::NamedNode(NamedNode::new("http://example.com/a").unwrap());
        let id1 = dict.intern(&a);
        let id2 = dict.intern(&a);
        assert_eq!(id1, id2);
        assert_ne!(id1, 0);
    }

    #[test]
    fn distinct_terms_get_distinct_ids() {
        let dict = Dictionary::new();
        let a = Term::NamedNode(NamedNode::new("http://example.com/a").unwrap());
        let b = Term::NamedNode(NamedNode::new("http://example.com/b").unwrap());
        assert_ne!(dict.intern(&a), dict.intern(&b));
    }

    #[test]
    fn resolve_unknown_id_fails() {
        let dict = Dictionary::new();
        assert!(dict.resolve(9999).is_err());
    }

    #[test]
    fn default_graph_is_id_zero_and_never_interned() {
        let dict = Dictionary::new();
        assert_eq!(
            dict.intern_graph_name(GraphNameRef::DefaultGraph),
            crate::model::DEFAULT_GRAPH_ID
        );
        assert_eq!(dict.size(), 0);
    }

    #[test]
    fn monotonic_and_never_reused() {
        let dict = Dictionary::new();
        let a = Term::NamedNode(NamedNode::new("http://example.com/a").unwrap());
        let b = Term::NamedNode(NamedNode::new("http://example.com/b").unwrap());
        let id_a = dict.intern(&a);
        let id_b = dict.intern(&b);
        assert!(id_b > id_a);
    }
}
