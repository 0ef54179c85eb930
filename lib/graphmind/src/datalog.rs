//! The Datalog engine: a program of extensional facts and
//! range-restricted rules, evaluated to a fixpoint by semi-naive evaluation.
//!
//! Semi-naive evaluation avoids recomputing previously-known derivations by
//! joining each rule's body against the delta of facts derived in the
//! previous round rather than the full relation, repeating until a round
//! derives nothing new. Negation is
//! out of scope; termination is guaranteed because there are no function
//! symbols, so the Herbrand universe is finite.

use crate::cancel::CancellationToken;
use crate::error::{Cancelled, RuleShapeError};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// A term in a rule literal: bound to a constant or left as an unbound
/// variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(String),
    Const(String),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Self::Const(value.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(v) => write!(f, "{v}"),
            Self::Const(c) => write!(f, "{c}"),
        }
    }
}

/// A literal `predicate(t1, ..., tk)`, used in a rule head or body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub predicate: String,
    pub terms: Vec<Term>,
}

impl Literal {
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms,
        }
    }

    fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|t| match t {
            Term::Var(v) => Some(v.as_str()),
            Term::Const(_) => None,
        })
    }
}

/// A ground fact `predicate(c1, ..., ck)`: every argument a constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub predicate: String,
    pub args: Vec<String>,
}

impl Fact {
    pub fn new(predicate: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }
}

/// `H :- B1, ..., Bn`. `name` identifies the rule for `source_rule`/
/// proof-chain purposes; it has no evaluation meaning.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub head: Literal,
    pub body: Vec<Literal>,
}

impl Rule {
    pub fn new(name: impl Into<String>, head: Literal, body: Vec<Literal>) -> Self {
        Self {
            name: name.into(),
            head,
            body,
        }
    }

    /// Range restriction: every
    /// variable in the head must occur in some body literal.
    fn validate(&self) -> Result<(), RuleShapeError> {
        let body_vars: FxHashSet<&str> = self.body.iter().flat_map(Literal::variables).collect();
        for var in self.head.variables() {
            if !body_vars.contains(var) {
                return Err(RuleShapeError(format!(
                    "rule {:?} head variable ?{var} is not range-restricted by the body",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A Datalog program: extensional facts plus rules.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub facts: Vec<Fact>,
    pub rules: Vec<Rule>,
}

impl Program {
    pub fn validate(&self) -> Result<(), RuleShapeError> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatalogError {
    #[error(transparent)]
    RuleShape(#[from] RuleShapeError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

type Relation = FxHashSet<Vec<String>>;
type Relations = FxHashMap<String, Relation>;
type FactKey = (String, Vec<String>);
type Bindings = FxHashMap<String, String>;

/// Which rule derived a fact, and which ground tuple satisfied each of the
/// rule's body literals (in body order) — the raw material for a proof
/// chain.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub rule_name: String,
    pub premises: Vec<FactKey>,
}

/// The outcome of [`evaluate`]: the fixpoint relation set, plus the
/// provenance of every derived (non-extensional) fact in derivation order.
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    relations: Relations,
    pub derivations: Vec<(FactKey, Derivation)>,
    pub rounds: usize,
}

impl EvalResult {
    /// All facts known for `predicate` after the most recent [`evaluate`]
    /// call.
    pub fn facts(&self, predicate: &str) -> Vec<Fact> {
        self.relations
            .get(predicate)
            .map(|tuples| {
                tuples
                    .iter()
                    .map(|args| Fact::new(predicate, args.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, predicate: &str, args: &[String]) -> bool {
        self.relations
            .get(predicate)
            .is_some_and(|rel| rel.contains(args))
    }

    /// Every fact in the fixpoint relation set, across all predicates.
    pub fn all_facts(&self) -> Vec<Fact> {
        self.relations
            .iter()
            .flat_map(|(predicate, tuples)| tuples.iter().map(move |args| Fact::new(predicate.clone(), args.clone())))
            .collect()
    }
}

/// All facts for `predicate` after the most recent [`evaluate`] call.
pub fn query(result: &EvalResult, predicate: &str) -> Vec<Fact> {
    result.facts(predicate)
}

/// Evaluates `program` to a fixpoint by semi-naive evaluation.
/// Deterministic given the same facts and rules; the derived relation set
/// carries no ordering guarantee, though [`EvalResult`] does record
/// derivation order for the reasoner's proof chain.
pub fn evaluate(
    program: &Program,
    cancellation: &CancellationToken,
) -> Result<EvalResult, DatalogError> {
    program.validate()?;

    let mut total: Relations = FxHashMap::default();
    for fact in &program.facts {
        total
            .entry(fact.predicate.clone())
            .or_default()
            .insert(fact.args.clone());
    }
    let mut delta = total.clone();
    let mut derivations = Vec::new();
    let mut rounds = 0usize;

    loop {
        cancellation.check()?;
        if delta.values().all(FxHashSet::is_empty) {
            break;
        }
        rounds += 1;
        tracing::debug!(round = rounds, "datalog semi-naive round starting");

        let mut next_delta: Relations = FxHashMap::default();
        for rule in &program.rules {
            for anchor in 0..rule.body.len() {
                let Some(anchor_delta) = delta.get(&rule.body[anchor].predicate) else {
                    continue;
                };
                if anchor_delta.is_empty() {
                    continue;
                }
                for (bindings, premises) in eval_body(&rule.body, anchor, &delta, &total) {
                    let Some(head_args) = instantiate(&rule.head, &bindings) else {
                        continue;
                    };
                    let already_known = total
                        .get(&rule.head.predicate)
                        .is_some_and(|rel| rel.contains(&head_args));
                    if already_known {
                        continue;
                    }
                    let inserted = next_delta
                        .entry(rule.head.predicate.clone())
                        .or_default()
                        .insert(head_args.clone());
                    if inserted {
                        let key = (rule.head.predicate.clone(), head_args);
                        derivations.push((
                            key,
                            Derivation {
                                rule_name: rule.name.clone(),
                                premises,
                            },
                        ));
                    }
                }
            }
        }

        let mut real_next_delta: Relations = FxHashMap::default();
        for (predicate, tuples) in next_delta {
            let total_rel = total.entry(predicate.clone()).or_default();
            for tuple in tuples {
                if total_rel.insert(tuple.clone()) {
                    real_next_delta.entry(predicate.clone()).or_default().insert(tuple);
                }
            }
        }
        delta = real_next_delta;
    }

    tracing::info!(rounds, derived = derivations.len(), "datalog fixpoint reached");
    Ok(EvalResult {
        relations: total,
        derivations,
        rounds,
    })
}

/// Joins `body` left to right, requiring the literal at `anchor` to be
/// matched against `delta` and every other literal against `total` —
/// ensuring at least one body literal is matched against the delta, as
/// semi-naive evaluation requires. Returns, for every satisfying
/// assignment, the variable bindings and the ground tuple that matched
/// each body literal in order.
fn eval_body(
    body: &[Literal],
    anchor: usize,
    delta: &Relations,
    total: &Relations,
) -> Vec<(Bindings, Vec<FactKey>)> {
    let mut solutions: Vec<(Bindings, Vec<FactKey>)> = vec![(FxHashMap::default(), Vec::new())];
    for (idx, literal) in body.iter().enumerate() {
        let source = if idx == anchor { delta } else { total };
        let Some(relation) = source.get(&literal.predicate) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        for (bindings, premises) in &solutions {
            for tuple in relation {
                if let Some(extended) = unify(literal, tuple, bindings) {
                    let mut premises = premises.clone();
                    premises.push((literal.predicate.clone(), tuple.clone()));
                    next.push((extended, premises));
                }
            }
        }
        solutions = next;
        if solutions.is_empty() {
            return solutions;
        }
    }
    solutions
}

fn unify(literal: &Literal, tuple: &[String], bindings: &Bindings) -> Option<Bindings> {
    if literal.terms.len() != tuple.len() {
        return None;
    }
    let mut out = bindings.clone();
    for (term, value) in literal.terms.iter().zip(tuple) {
        match term {
            Term::Const(c) => {
                if c != value {
                    return None;
                }
            }
            Term::Var(v) => match out.get(v) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    out.insert(v.clone(), value.clone());
                }
            },
        }
    }
    Some(out)
}

fn instantiate(head: &Literal, bindings: &Bindings) -> Option<Vec<String>> {
    head.terms
        .iter()
        .map(|t| match t {
            Term::Const(c) => Some(c.clone()),
            Term::Var(v) => bindings.get(v).cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(predicate: &str, args: &[&str]) -> Fact {
        Fact::new(predicate, args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn transitive_reachability_scenario_b() {
        // edge(a,b) edge(b,c) edge(c,d); path(X,Y):-edge(X,Y). path(X,Z):-edge(X,Y),path(Y,Z).
        let program = Program {
            facts: vec![
                fact("edge", &["a", "b"]),
                fact("edge", &["b", "c"]),
                fact("edge", &["c", "d"]),
            ],
            rules: vec![
                Rule::new(
                    "base",
                    Literal::new("path", vec![Term::var("X"), Term::var("Y")]),
                    vec![Literal::new("edge", vec![Term::var("X"), Term::var("Y")])],
                ),
                Rule::new(
                    "step",
                    Literal::new("path", vec![Term::var("X"), Term::var("Z")]),
                    vec![
                        Literal::new("edge", vec![Term::var("X"), Term::var("Y")]),
                        Literal::new("path", vec![Term::var("Y"), Term::var("Z")]),
                    ],
                ),
            ],
        };
        let result = evaluate(&program, &CancellationToken::default()).unwrap();
        let mut pairs: Vec<Vec<String>> = result
            .facts("path")
            .into_iter()
            .map(|f| f.args)
            .collect();
        pairs.sort();
        let expected: Vec<Vec<String>> = [
            ["a", "b"],
            ["a", "c"],
            ["a", "d"],
            ["b", "c"],
            ["b", "d"],
            ["c", "d"],
        ]
        .into_iter()
        .map(|p| p.map(String::from).to_vec())
        .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn evaluate_is_a_fixpoint() {
        let program = Program {
            facts: vec![fact("edge", &["a", "b"])],
            rules: vec![Rule::new(
                "base",
                Literal::new("path", vec![Term::var("X"), Term::var("Y")]),
                vec![Literal::new("edge", vec![Term::var("X"), Term::var("Y")])],
            )],
        };
        let first = evaluate(&program, &CancellationToken::default()).unwrap();
        let second_program = Program {
            facts: program
                .facts
                .iter()
                .cloned()
                .chain(first.facts("path").into_iter())
                .collect(),
            rules: program.rules.clone(),
        };
        let second = evaluate(&second_program, &CancellationToken::default()).unwrap();
        assert_eq!(second.derivations.len(), 0, "re-evaluating derives no new facts");
    }

    #[test]
    fn circular_transfers_scenario_c() {
        let program = Program {
            facts: vec![
                fact("transfers", &["alice", "bob"]),
                fact("transfers", &["bob", "carol"]),
                fact("transfers", &["carol", "alice"]),
            ],
            rules: vec![Rule::new(
                "owl:TransitiveProperty(transfers)",
                Literal::new("transfers", vec![Term::var("X"), Term::var("Z")]),
                vec![
                    Literal::new("transfers", vec![Term::var("X"), Term::var("Y")]),
                    Literal::new("transfers", vec![Term::var("Y"), Term::var("Z")]),
                ],
            )],
        };
        let result = evaluate(&program, &CancellationToken::default()).unwrap();
        assert!(result.contains("transfers", &["alice".to_string(), "alice".to_string()]));
    }

    #[test]
    fn non_range_restricted_rule_is_rejected() {
        let program = Program {
            facts: vec![],
            rules: vec![Rule::new(
                "bad",
                Literal::new("p", vec![Term::var("X"), Term::var("Y")]),
                vec![Literal::new("q", vec![Term::var("X")])],
            )],
        };
        assert!(evaluate(&program, &CancellationToken::default()).is_err());
    }

    #[test]
    fn cancellation_is_observed() {
        let token = CancellationToken::new();
        token.cancel();
        let program = Program {
            facts: vec![fact("p", &["a"])],
            rules: vec![],
        };
        assert!(matches!(
            evaluate(&program, &token),
            Err(DatalogError::Cancelled(_))
        ));
    }
}
