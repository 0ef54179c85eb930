//! `graphmind`: an in-process RDF quad store with a SPARQL 1.1 query engine,
//! a semi-naive Datalog evaluator driving OWL-lite reasoning with
//! proof-carrying derivations, and a graph-analytics layer.
//!
//! It covers the quad store (dictionary, indexes, Turtle/N-Triples/N-Quads I/O), the
//! SPARQL execution engine (parsing, planning, evaluation), the reasoning
//! core (Datalog, OWL rule lifting, proof chains), and graph analytics
//! (PageRank, connected components, shortest paths, triangle count, label
//! propagation, Pregel BSP). It is meant to be embedded in a host process,
//! not run as a network service.
//!
//! ```
//! use graphmind::model::{GraphName, NamedNodeRef};
//! use graphmind::parser::RdfFormat;
//! use graphmind::store::Store;
//!
//! let store = Store::new();
//! store
//!     .load(
//!         b"<http://x/a> <http://x/p> <http://x/b> .",
//!         RdfFormat::NTriples,
//!         GraphName::DefaultGraph.as_ref(),
//!     )
//!     .unwrap();
//! assert_eq!(store.len(), 1);
//! ```

pub mod analytics;
pub mod cancel;
pub mod datalog;
pub mod dictionary;
pub mod error;
pub mod index;
pub mod json;
pub mod model;
pub mod parser;
pub mod reasoner;
pub mod sparql;
pub mod store;
pub mod value;
