//! Parser/Serializer: Turtle, N-Triples and N-Quads,
//! read and written with [`oxttl`] — the same parser/serializer crate the
//! teacher store uses for these exact formats.
//!
//! `load` is atomic per document:
//! triples are parsed into a buffer first, and only inserted into the
//! dictionary/index once the whole document has parsed without error. A
//! malformed document therefore leaves the store completely unchanged.

use crate::dictionary::Dictionary;
use crate::error::ParseError;
use crate::index::QuadIndex;
use crate::model::{GraphName, GraphNameRef, NamedNode, NamedNodeRef, Quad, Term};
use oxttl::{NQuadsParser, NTriplesParser, TurtleParser};
use std::io::Write;

/// The three bit-exact-to-W3C formats spec.md §4.3/§6 requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    Turtle,
    NTriples,
    NQuads,
}

/// Which graphs an `export` call should cover.
#[derive(Debug, Clone)]
pub enum GraphSelector {
    Default,
    Named(NamedNode),
    All,
}

/// Parses `text` under `format` and inserts the resulting quads into
/// `dictionary`/`index`.
///
/// Triples read from Turtle or N-Triples are placed in `target_graph`;
/// N-Quads carries its own per-quad graph component, and `target_graph` is
/// used only for quads that omit one (the default graph).
///
/// Returns the count of quads actually inserted (duplicates, per spec.md
/// §4.2's "Failure model", do not increment this count). On malformed input,
/// returns [`ParseError`] and leaves `dictionary`/`index` exactly as they
/// were (no partial insert).
pub fn load(
    dictionary: &Dictionary,
    index: &QuadIndex,
    text: &[u8],
    format: RdfFormat,
    target_graph: GraphNameRef<'_>,
) -> Result<u64, ParseError> {
    let quads = parse_to_quads(text, format, target_graph)?;
    let mut inserted = 0;
    for quad in &quads {
        let s = dictionary.intern(&quad.subject.clone().into());
        let p = dictionary.intern(&Term::NamedNode(quad.predicate.clone()));
        let o = dictionary.intern(&quad.object);
        let g = dictionary.intern_graph_name(quad.graph_name.as_ref());
        if index.insert_quad(s, p, o, g) {
            inserted += 1;
        }
    }
    Ok(inserted)
}

fn parse_to_quads(
    text: &[u8],
    format: RdfFormat,
    target_graph: GraphNameRef<'_>,
) -> Result<Vec<Quad>, ParseError> {
    match format {
        RdfFormat::Turtle => {
            let mut quads = Vec::new();
            for triple in TurtleParser::new().for_slice(text) {
                let triple = triple.map_err(convert_syntax_error)?;
                quads.push(Quad::new(
                    triple.subject,
                    triple.predicate,
                    triple.object,
                    target_graph.into_owned(),
                ));
            }
            Ok(quads)
        }
        RdfFormat::NTriples => {
            let mut quads = Vec::new();
            for triple in NTriplesParser::new().for_slice(text) {
                let triple = triple.map_err(convert_syntax_error)?;
                quads.push(Quad::new(
                    triple.subject,
                    triple.predicate,
                    triple.object,
                    target_graph.into_owned(),
                ));
            }
            Ok(quads)
        }
        RdfFormat::NQuads => {
            let mut quads = Vec::new();
            for quad in NQuadsParser::new().for_slice(text) {
                quads.push(quad.map_err(convert_syntax_error)?);
            }
            Ok(quads)
        }
    }
}

fn convert_syntax_error(err: oxttl::TurtleSyntaxError) -> ParseError {
    let location = err.location();
    ParseError::new(
        location.start.line as usize + 1,
        location.start.column as usize + 1,
        err.message().to_string(),
    )
}

/// Serializes the quads reachable through `selector` as `format`, such that
/// `load(export(...))` round-trips to an isomorphic quad set under
/// blank-node relabeling.
pub fn export(
    dictionary: &Dictionary,
    index: &QuadIndex,
    format: RdfFormat,
    selector: &GraphSelector,
) -> Result<Vec<u8>, crate::error::InvalidId> {
    let graphs: Vec<Option<u64>> = match selector {
        GraphSelector::Default => vec![Some(crate::model::DEFAULT_GRAPH_ID)],
        GraphSelector::Named(n) => {
            let id = dictionary.get(&Term::NamedNode(n.clone()));
            id.map(Some).into_iter().collect()
        }
        GraphSelector::All => {
            let mut ids = vec![crate::model::DEFAULT_GRAPH_ID];
            ids.extend(index.all_graphs());
            ids.into_iter().map(Some).collect()
        }
    };

    let mut quads = Vec::new();
    for g in graphs.into_iter().flatten() {
        let pattern = crate::index::Pattern::new(None, None, None, Some(g));
        for (s, p, o, g) in index.scan(pattern) {
            let subject = dictionary.resolve(s)?;
            let predicate = dictionary.resolve(p)?;
            let object = dictionary.resolve(o)?;
            let graph_name = dictionary.resolve_graph_name(g)?;
            let subject: crate::model::Subject = match subject {
                Term::NamedNode(n) => n.into(),
                Term::BlankNode(b) => b.into(),
                Term::Literal(_) => unreachable!("spec.md §3: subject is never a literal"),
            };
            let predicate = match predicate {
                Term::NamedNode(n) => n,
                _ => unreachable!("spec.md §3: predicate is always an IRI"),
            };
            quads.push(Quad::new(subject, predicate, object, graph_name));
        }
    }

    let mut out = Vec::new();
    match format {
        RdfFormat::Turtle => {
            let mut w = oxttl::TurtleSerializer::new().for_writer(&mut out);
            for q in &quads {
                w.serialize_triple(q.as_ref()).expect("write to Vec never fails");
            }
            w.finish().expect("write to Vec never fails");
        }
        RdfFormat::NTriples => {
            let mut w = oxttl::NTriplesSerializer::new().for_writer(&mut out);
            for q in &quads {
                w.serialize_triple(q.as_ref()).expect("write to Vec never fails");
            }
            w.finish();
        }
        RdfFormat::NQuads => {
            let mut w = oxttl::NQuadsSerializer::new().for_writer(&mut out);
            for q in &quads {
                w.serialize_quad(q.as_ref()).expect("write to Vec never fails");
            }
            w.finish();
        }
    }
    let _ = out.flush();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphNameRef;

    const TURTLE: &str = r#"
        @prefix x: <http://x/> .
        x:a x:p "1" .
        x:a x:p 2 .
        x:b x:q ( x:a x:b ) .
    "#;

    #[test]
    fn load_turtle_inserts_quads_into_default_graph() {
        let dict = Dictionary::new();
        let idx = QuadIndex::new();
        let n = load(
            &dict,
            &idx,
            TURTLE.as_bytes(),
            RdfFormat::Turtle,
            GraphNameRef::DefaultGraph,
        )
        .unwrap();
        assert!(n >= 3);
        assert_eq!(idx.len(), n);
    }

    #[test]
    fn load_malformed_turtle_leaves_store_unchanged() {
        let dict = Dictionary::new();
        let idx = QuadIndex::new();
        load(
            &dict,
            &idx,
            TURTLE.as_bytes(),
            RdfFormat::Turtle,
            GraphNameRef::DefaultGraph,
        )
        .unwrap();
        let before = idx.len();
        let bad = b"@prefix x: <http://x/> . x:a x:p \"unterminated ;";
        let result = load(&dict, &idx, bad, RdfFormat::Turtle, GraphNameRef::DefaultGraph);
        assert!(result.is_err());
        assert_eq!(idx.len(), before);
    }

    #[test]
    fn load_nquads_respects_per_quad_graph() {
        let dict = Dictionary::new();
        let idx = QuadIndex::new();
        let text = b"<http://x/a> <http://x/p> <http://x/o> <http://x/g> .\n";
        load(&dict, &idx, text, RdfFormat::NQuads, GraphNameRef::DefaultGraph).unwrap();
        assert_eq!(idx.all_graphs().len(), 1);
    }

    #[test]
    fn export_ntriples_round_trips() {
        let dict = Dictionary::new();
        let idx = QuadIndex::new();
        load(
            &dict,
            &idx,
            TURTLE.as_bytes(),
            RdfFormat::Turtle,
            GraphNameRef::DefaultGraph,
        )
        .unwrap();
        let bytes = export(&dict, &idx, RdfFormat::NTriples, &GraphSelector::Default).unwrap();

        let dict2 = Dictionary::new();
        let idx2 = QuadIndex::new();
        load(&dict2, &idx2, &bytes, RdfFormat::NTriples, GraphNameRef::DefaultGraph).unwrap();
        assert_eq!(idx.len(), idx2.len());
    }
}
