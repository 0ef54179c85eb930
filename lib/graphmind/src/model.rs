//! The RDF term/value model: terms, triples and quads.
//!
//! `graphmind` does not reinvent `NamedNode`/`BlankNode`/`Literal`/`Triple`/
//! `Quad`: it reuses [OxRDF](https://crates.io/crates/oxrdf). Equality there
//! is already structural and already respects datatype/language tag, and
//! `GraphName::DefaultGraph` is already the distinguished sentinel a quad
//! store needs for its default graph.
//!
//! ```
//! use graphmind::model::*;
//!
//! let ex = NamedNodeRef::new("http://example.com/s").unwrap();
//! let quad = Quad::new(ex, ex, ex, GraphName::DefaultGraph);
//! assert_eq!(quad.graph_name, GraphName::DefaultGraph);
//! ```

pub use oxrdf::*;

/// The reserved dictionary id for the default-graph sentinel. Never reused
/// for any other term.
pub const DEFAULT_GRAPH_ID: u64 = 0;
