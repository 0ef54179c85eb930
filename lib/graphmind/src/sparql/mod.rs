//! SPARQL 1.1 query engine: parsing via `spargebra`,
//! planning and evaluation in [`eval`], and property path BFS in [`paths`].

pub mod eval;
pub mod paths;
pub mod results;

use crate::cancel::CancellationToken;
use crate::error::{CardinalityLimit, Cancelled, UnsupportedFeature};
use crate::model::{GraphName, NamedNode, Quad, Term, Variable};
use crate::store::Store;
use eval::{Bindings, Evaluator};
use rustc_hash::FxHashMap;
use spargebra::algebra::GraphPattern;
use spargebra::term::TriplePattern;
use spargebra::Query;
use thiserror::Error;

/// Per-query tuning knobs.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub default_base_iri: Option<String>,
    /// Caps the number of solution rows a `Slice`/top-level result may
    /// produce; `None` means unbounded.
    pub max_rows: Option<usize>,
    /// Caps BFS depth for `*`/`+` property paths; `None` means unbounded.
    pub path_depth_limit: Option<usize>,
    /// Whether star-shaped BGPs use the worst-case-optimal join planner
    /// instead of always falling back to left-deep.
    pub enable_wcoj: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_base_iri: None,
            max_rows: None,
            path_depth_limit: Some(10_000),
            enable_wcoj: true,
        }
    }
}

/// One row of a `SELECT` result: a partial function from [`Variable`] to
/// [`Term`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySolution {
    values: Vec<(Variable, Term)>,
}

impl QuerySolution {
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.values.iter().find(|(v, _)| v.as_str() == variable).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Variable, Term)> {
        self.values.iter()
    }

    fn from_bindings(variables: &[Variable], bindings: &Bindings) -> Self {
        Self {
            values: variables
                .iter()
                .filter_map(|v| bindings.get(v).map(|t| (v.clone(), t.clone())))
                .collect(),
        }
    }
}

/// The outcome of [`query`], shaped per spec.md §4.6's four result forms.
#[derive(Debug, Clone)]
pub enum QueryResults {
    Solutions {
        variables: Vec<Variable>,
        solutions: Vec<QuerySolution>,
    },
    Boolean(bool),
    Graph(Vec<Quad>),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    UnsupportedFeature(#[from] UnsupportedFeature),
    #[error(transparent)]
    CardinalityLimit(#[from] CardinalityLimit),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    InvalidId(#[from] crate::error::InvalidId),
    #[error(transparent)]
    Invariant(#[from] crate::error::InvariantViolation),
}

impl From<spargebra::ParseError> for QueryError {
    fn from(e: spargebra::ParseError) -> Self {
        QueryError::Parse(e.to_string())
    }
}

/// Parses and evaluates `query_str` against `store`.
pub fn query(
    store: &Store,
    query_str: &str,
    options: &QueryOptions,
    cancellation: CancellationToken,
) -> Result<QueryResults, QueryError> {
    let parsed = Query::parse(query_str, options.default_base_iri.as_deref())?;
    let evaluator = Evaluator::new(store, options, cancellation);
    let empty: Bindings = FxHashMap::default();

    match parsed {
        Query::Select { pattern, .. } => {
            let variables = projected_variables(&pattern);
            let rows = evaluator.eval(&pattern, &empty)?;
            let solutions = rows.iter().map(|b| QuerySolution::from_bindings(&variables, b)).collect();
            Ok(QueryResults::Solutions { variables, solutions })
        }
        Query::Ask { pattern, .. } => {
            let rows = evaluator.eval(&pattern, &empty)?;
            Ok(QueryResults::Boolean(!rows.is_empty()))
        }
        Query::Construct { template, pattern, .. } => {
            let rows = evaluator.eval(&pattern, &empty)?;
            let mut quads = Vec::new();
            for row in &rows {
                for t in &template {
                    if let Some(quad) = instantiate_template(t, row) {
                        quads.push(quad);
                    }
                }
            }
            Ok(QueryResults::Graph(dedup_quads(quads)))
        }
        Query::Describe { pattern, .. } => {
            let rows = evaluator.eval(&pattern, &empty)?;
            let mut seed_terms = Vec::new();
            for row in &rows {
                for (_, term) in row {
                    if !matches!(term, Term::Literal(_)) && !seed_terms.contains(term) {
                        seed_terms.push(term.clone());
                    }
                }
            }
            let quads = concise_bounded_description(store, &seed_terms);
            Ok(QueryResults::Graph(quads))
        }
    }
}

/// Variables projected by a top-level `GraphPattern`, looking through the
/// `Project`/`Distinct`/`Reduced`/`Slice`/`OrderBy` wrappers `spargebra`
/// puts around a `SELECT` body.
fn projected_variables(pattern: &GraphPattern) -> Vec<Variable> {
    match pattern {
        GraphPattern::Project { variables, .. } => variables.clone(),
        GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::OrderBy { inner, .. } => projected_variables(inner),
        GraphPattern::Group { variables, aggregates, .. } => {
            let mut vars = variables.clone();
            vars.extend(aggregates.iter().map(|(v, _)| v.clone()));
            vars
        }
        _ => Vec::new(),
    }
}

fn instantiate_template(pattern: &TriplePattern, bindings: &Bindings) -> Option<Quad> {
    let subject = instantiate_term_pattern(&pattern.subject, bindings)?;
    let predicate = match &pattern.predicate {
        spargebra::term::NamedNodePattern::NamedNode(n) => n.clone(),
        spargebra::term::NamedNodePattern::Variable(v) => match bindings.get(v)? {
            Term::NamedNode(n) => n.clone(),
            _ => return None,
        },
    };
    let object = instantiate_term_pattern(&pattern.object, bindings)?;
    let subject: crate::model::Subject = match subject {
        Term::NamedNode(n) => n.into(),
        Term::BlankNode(b) => b.into(),
        Term::Literal(_) => return None,
    };
    Some(Quad::new(subject, predicate, object, GraphName::DefaultGraph))
}

fn instantiate_term_pattern(
    pattern: &spargebra::term::TermPattern,
    bindings: &Bindings,
) -> Option<Term> {
    use spargebra::term::TermPattern;
    match pattern {
        TermPattern::NamedNode(n) => Some(Term::NamedNode(n.clone())),
        TermPattern::Literal(l) => Some(Term::Literal(l.clone())),
        TermPattern::BlankNode(b) => Some(Term::BlankNode(b.clone())),
        TermPattern::Variable(v) => bindings.get(v).cloned(),
    }
}

fn dedup_quads(quads: Vec<Quad>) -> Vec<Quad> {
    let mut out: Vec<Quad> = Vec::new();
    for q in quads {
        if !out.contains(&q) {
            out.push(q);
        }
    }
    out
}

/// Concise Bounded Description: every quad
/// with one of `seeds` as subject, one level deep, no recursion into blank
/// node objects — this crate intentionally stays at CBD's simplest
/// definition rather than the symmetric or recursive variants other engines
/// offer as an option, since nothing in this crate's surface lets a caller
/// pick a different DESCRIBE mode.
fn concise_bounded_description(store: &Store, seeds: &[Term]) -> Vec<Quad> {
    let mut quads = Vec::new();
    for seed in seeds {
        for q in store.scan(Some(seed), None, None, None) {
            quads.push(q);
        }
    }
    dedup_quads(quads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RdfFormat;

    fn store_with_data() -> Store {
        let store = Store::new();
        store
            .load(
                br#"@prefix : <http://x/> .
                    :alice :knows :bob .
                    :bob :knows :carol .
                    :alice :age 30 ."#,
                RdfFormat::Turtle,
                GraphName::DefaultGraph.as_ref(),
            )
            .unwrap();
        store
    }

    #[test]
    fn select_returns_expected_rows() {
        let store = store_with_data();
        let result = query(
            &store,
            "SELECT ?s ?o WHERE { ?s <http://x/knows> ?o }",
            &QueryOptions::default(),
            CancellationToken::default(),
        )
        .unwrap();
        match result {
            QueryResults::Solutions { solutions, .. } => assert_eq!(solutions.len(), 2),
            _ => panic!("expected solutions"),
        }
    }

    #[test]
    fn ask_true_when_pattern_matches() {
        let store = store_with_data();
        let result = query(
            &store,
            "ASK { <http://x/alice> <http://x/age> 30 }",
            &QueryOptions::default(),
            CancellationToken::default(),
        )
        .unwrap();
        assert!(matches!(result, QueryResults::Boolean(true)));
    }

    #[test]
    fn construct_builds_new_triples() {
        let store = store_with_data();
        let result = query(
            &store,
            "CONSTRUCT { ?s <http://x/friend> ?o } WHERE { ?s <http://x/knows> ?o }",
            &QueryOptions::default(),
            CancellationToken::default(),
        )
        .unwrap();
        match result {
            QueryResults::Graph(quads) => assert_eq!(quads.len(), 2),
            _ => panic!("expected graph"),
        }
    }

    #[test]
    fn filter_restricts_rows() {
        let store = store_with_data();
        let result = query(
            &store,
            "SELECT ?s WHERE { ?s <http://x/age> ?age . FILTER(?age > 18) }",
            &QueryOptions::default(),
            CancellationToken::default(),
        )
        .unwrap();
        match result {
            QueryResults::Solutions { solutions, .. } => assert_eq!(solutions.len(), 1),
            _ => panic!("expected solutions"),
        }
    }

    /// A 3-hop chain shares no single variable across all three patterns,
    /// so it must not be misrouted to the star planner (which would
    /// intersect against a pattern that doesn't mention the shared
    /// variable and collapse to zero rows).
    #[test]
    fn three_hop_chain_is_not_misrouted_to_star_planner() {
        let store = Store::new();
        store
            .load(
                br#"@prefix : <http://x/> . :a :p :b . :b :q :c . :c :r :d ."#,
                RdfFormat::Turtle,
                GraphName::DefaultGraph.as_ref(),
            )
            .unwrap();
        let result = query(
            &store,
            "SELECT ?a ?b ?c ?d WHERE { ?a <http://x/p> ?b . ?b <http://x/q> ?c . ?c <http://x/r> ?d }",
            &QueryOptions::default(),
            CancellationToken::default(),
        )
        .unwrap();
        match result {
            QueryResults::Solutions { solutions, .. } => assert_eq!(solutions.len(), 1),
            _ => panic!("expected solutions"),
        }
    }
}
