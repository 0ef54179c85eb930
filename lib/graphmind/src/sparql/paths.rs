//! Property path evaluation.
//!
//! `p*`/`p+` are evaluated by BFS from each starting endpoint with a
//! seen-set to prevent revisits, as spec.md prescribes rather than naive
//! unbounded recursion. `p*` includes the zero-length reflexive pair for
//! every term that appears as an endpoint.

use crate::error::CardinalityLimit;
use crate::model::{NamedNode, Term};
use crate::store::Store;
use rustc_hash::FxHashSet;
use spargebra::algebra::PropertyPathExpression;

/// Evaluates `path` starting from `start` (if bound) against `store`,
/// returning the set of reachable terms. If `start` is `None`, evaluates
/// from every term that appears in subject or object position of the base
/// predicates of `path` (used when neither endpoint of the path pattern is
/// bound).
pub fn evaluate(
    store: &Store,
    path: &PropertyPathExpression,
    start: Option<&Term>,
    depth_limit: Option<usize>,
) -> Result<Vec<(Term, Term)>, CardinalityLimit> {
    let starts: Vec<Term> = match start {
        Some(t) => vec![t.clone()],
        None => collect_endpoints(store, path),
    };
    let mut pairs = Vec::new();
    for s in starts {
        for t in evaluate_from(store, path, &s, depth_limit)? {
            pairs.push((s.clone(), t));
        }
    }
    Ok(pairs)
}

fn collect_endpoints(store: &Store, path: &PropertyPathExpression) -> Vec<Term> {
    let mut preds = Vec::new();
    collect_named_nodes(path, &mut preds);
    let mut seen: FxHashSet<Term> = FxHashSet::default();
    let mut endpoints = Vec::new();
    for p in preds {
        for quad in store.scan(None, Some(&Term::NamedNode(p.clone())), None, None) {
            let subject = Term::from(quad.subject);
            if seen.insert(subject.clone()) {
                endpoints.push(subject);
            }
            let object = quad.object;
            if seen.insert(object.clone()) {
                endpoints.push(object);
            }
        }
    }
    endpoints
}

fn collect_named_nodes(path: &PropertyPathExpression, out: &mut Vec<NamedNode>) {
    match path {
        PropertyPathExpression::NamedNode(n) => out.push(n.clone()),
        PropertyPathExpression::Reverse(p)
        | PropertyPathExpression::ZeroOrMore(p)
        | PropertyPathExpression::OneOrMore(p)
        | PropertyPathExpression::ZeroOrOne(p) => collect_named_nodes(p, out),
        PropertyPathExpression::Sequence(a, b) | PropertyPathExpression::Alternative(a, b) => {
            collect_named_nodes(a, out);
            collect_named_nodes(b, out);
        }
        PropertyPathExpression::NegatedPropertySet(ps) => out.extend(ps.iter().cloned()),
    }
}

/// One hop of path evaluation from a single bound `Term`, expressed as the
/// set of terms reachable by exactly this path expression (not its
/// transitive closure — that's layered on top by `ZeroOrMore`/`OneOrMore`).
fn one_hop(store: &Store, path: &PropertyPathExpression, from: &Term) -> Vec<Term> {
    match path {
        PropertyPathExpression::NamedNode(p) => store
            .scan(Some(from), Some(&Term::NamedNode(p.clone())), None, None)
            .into_iter()
            .map(|q| q.object)
            .collect(),
        PropertyPathExpression::Reverse(p) => reverse_one_hop(store, p, from),
        PropertyPathExpression::Sequence(a, b) => {
            let mut out = Vec::new();
            for mid in one_hop(store, a, from) {
                out.extend(one_hop(store, b, &mid));
            }
            out
        }
        PropertyPathExpression::Alternative(a, b) => {
            let mut out = one_hop(store, a, from);
            out.extend(one_hop(store, b, from));
            out
        }
        PropertyPathExpression::ZeroOrOne(p) => {
            let mut out = vec![from.clone()];
            out.extend(one_hop(store, p, from));
            out
        }
        PropertyPathExpression::ZeroOrMore(_) | PropertyPathExpression::OneOrMore(_) => {
            unreachable!("handled by evaluate_from's BFS, not one_hop")
        }
        PropertyPathExpression::NegatedPropertySet(excluded) => store
            .scan(Some(from), None, None, None)
            .into_iter()
            .filter(|q| !excluded.contains(&q.predicate))
            .map(|q| q.object)
            .collect(),
    }
}

fn reverse_one_hop(store: &Store, path: &PropertyPathExpression, from: &Term) -> Vec<Term> {
    match path {
        PropertyPathExpression::NamedNode(p) => store
            .scan(None, Some(&Term::NamedNode(p.clone())), Some(from), None)
            .into_iter()
            .map(|q| Term::from(q.subject))
            .collect(),
        PropertyPathExpression::Reverse(p) => one_hop(store, p, from),
        PropertyPathExpression::Sequence(a, b) => {
            let mut out = Vec::new();
            for mid in reverse_one_hop(store, b, from) {
                out.extend(reverse_one_hop(store, a, &mid));
            }
            out
        }
        PropertyPathExpression::Alternative(a, b) => {
            let mut out = reverse_one_hop(store, a, from);
            out.extend(reverse_one_hop(store, b, from));
            out
        }
        PropertyPathExpression::ZeroOrOne(p) => {
            let mut out = vec![from.clone()];
            out.extend(reverse_one_hop(store, p, from));
            out
        }
        PropertyPathExpression::ZeroOrMore(_) | PropertyPathExpression::OneOrMore(_) => {
            unreachable!("handled by evaluate_from's BFS, not one_hop")
        }
        PropertyPathExpression::NegatedPropertySet(excluded) => store
            .scan(None, None, Some(from), None)
            .into_iter()
            .filter(|q| !excluded.contains(&q.predicate))
            .map(|q| Term::from(q.subject))
            .collect(),
    }
}

fn evaluate_from(
    store: &Store,
    path: &PropertyPathExpression,
    start: &Term,
    depth_limit: Option<usize>,
) -> Result<Vec<Term>, CardinalityLimit> {
    match path {
        PropertyPathExpression::ZeroOrMore(inner) => bfs_closure(store, inner, start, true, depth_limit),
        PropertyPathExpression::OneOrMore(inner) => bfs_closure(store, inner, start, false, depth_limit),
        _ => Ok(one_hop(store, path, start)),
    }
}

/// BFS with a seen-set over `inner`'s one-hop relation, starting from
/// `start`. `include_zero_length` adds `start` itself to the result (the
/// `p*` reflexive pair).
fn bfs_closure(
    store: &Store,
    inner: &PropertyPathExpression,
    start: &Term,
    include_zero_length: bool,
    depth_limit: Option<usize>,
) -> Result<Vec<Term>, CardinalityLimit> {
    let mut seen: FxHashSet<Term> = FxHashSet::default();
    let mut frontier = vec![start.clone()];
    let mut result = Vec::new();
    if include_zero_length {
        seen.insert(start.clone());
        result.push(start.clone());
    }
    let mut depth = 0usize;
    while !frontier.is_empty() {
        if let Some(limit) = depth_limit {
            if depth > limit {
                return Err(CardinalityLimit(format!(
                    "property path BFS exceeded path_depth_limit of {limit}"
                )));
            }
        }
        let mut next = Vec::new();
        for node in &frontier {
            for reached in one_hop(store, inner, node) {
                if seen.insert(reached.clone()) {
                    result.push(reached.clone());
                    next.push(reached);
                }
            }
        }
        frontier = next;
        depth += 1;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphName;
    use crate::parser::RdfFormat;

    fn chain_store() -> Store {
        let store = Store::new();
        store
            .load(
                b"@prefix : <http://x/> . :a :r :b . :b :r :c . :c :r :d .",
                RdfFormat::Turtle,
                GraphName::DefaultGraph.as_ref(),
            )
            .unwrap();
        store
    }

    #[test]
    fn one_or_more_excludes_start() {
        let store = chain_store();
        let r = NamedNode::new("http://x/r").unwrap();
        let a = Term::NamedNode(NamedNode::new("http://x/a").unwrap());
        let path = PropertyPathExpression::OneOrMore(Box::new(PropertyPathExpression::NamedNode(r)));
        let pairs = evaluate(&store, &path, Some(&a), None).unwrap();
        let mut objs: Vec<String> = pairs.into_iter().map(|(_, o)| o.to_string()).collect();
        objs.sort();
        assert_eq!(objs, vec!["<http://x/b>", "<http://x/c>", "<http://x/d>"]);
    }

    #[test]
    fn zero_or_more_includes_start() {
        let store = chain_store();
        let r = NamedNode::new("http://x/r").unwrap();
        let a = Term::NamedNode(NamedNode::new("http://x/a").unwrap());
        let path = PropertyPathExpression::ZeroOrMore(Box::new(PropertyPathExpression::NamedNode(r)));
        let pairs = evaluate(&store, &path, Some(&a), None).unwrap();
        let mut objs: Vec<String> = pairs.into_iter().map(|(_, o)| o.to_string()).collect();
        objs.sort();
        assert_eq!(
            objs,
            vec!["<http://x/a>", "<http://x/b>", "<http://x/c>", "<http://x/d>"]
        );
    }

    /// With neither endpoint bound, `p*` must include the zero-length
    /// reflexive pair for every node in the path's base relation, including
    /// a sink that only ever appears as an object (`:d` here never appears
    /// as a subject).
    #[test]
    fn zero_or_more_unbound_includes_sink_reflexive_pair() {
        let store = chain_store();
        let r = NamedNode::new("http://x/r").unwrap();
        let path = PropertyPathExpression::ZeroOrMore(Box::new(PropertyPathExpression::NamedNode(r)));
        let pairs = evaluate(&store, &path, None, None).unwrap();
        let d = Term::NamedNode(NamedNode::new("http://x/d").unwrap());
        assert!(
            pairs.iter().any(|(s, o)| *s == d && *o == d),
            "expected reflexive pair (:d,:d) for the sink node: {pairs:?}"
        );
    }
}
