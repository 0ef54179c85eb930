//! The reasoner: lifts OWL/RDFS vocabulary found in a store
//! into Datalog rules, ingests quads and caller-supplied hypotheses as
//! facts, runs the [`crate::datalog`] fixpoint, and records every inference
//! as a node in a [`ThinkingGraph`] with a deterministic, content-hashed
//! proof id.
//!
//! Materialization policy: this reasoner *materializes* `owl:SymmetricProperty`
//! and `owl:TransitiveProperty` expansion as ordinary derived Datalog facts, so
//! they are counted like any other derivation and show up in
//! `deduce().derived_facts` — see DESIGN.md.

use crate::cancel::CancellationToken;
use crate::datalog::{self, DatalogError, Fact, Literal, Program, Rule, Term as DlTerm};
use crate::model::{NamedNodeRef, Quad, Subject, Term};
use crate::store::Store;
use rustc_hash::{FxHashMap, FxHashSet};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const OWL_TRANSITIVE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#TransitiveProperty";
const OWL_SYMMETRIC_PROPERTY: &str = "http://www.w3.org/2002/07/owl#SymmetricProperty";
const OWL_INVERSE_OF: &str = "http://www.w3.org/2002/07/owl#inverseOf";
const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
const RDFS_SUBPROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";

/// The Datalog predicate name `rdf:type` quads are ingested under (used by
/// the `rdfs:subClassOf` rule: `type(x, B) :- type(x, A)`).
pub const TYPE_PREDICATE: &str = "type";

fn node(iri: &str) -> NamedNodeRef<'_> {
    NamedNodeRef::new(iri).expect("vocabulary IRIs are well-formed constants")
}

/// Renders a [`Term`] to a stable opaque string usable as a Datalog
/// constant. Uses the term's own `Display` (Turtle-like syntax), which is
/// already bijective enough for the vocabulary this reasoner deals with.
fn term_to_const(term: &Term) -> String {
    term.to_string()
}

fn subject_iri(subject: &Subject) -> Option<String> {
    match subject {
        Subject::NamedNode(n) => Some(n.as_str().to_string()),
        _ => None,
    }
}

fn object_iri(term: &Term) -> Option<String> {
    match term {
        Term::NamedNode(n) => Some(n.as_str().to_string()),
        _ => None,
    }
}

/// Inspects `store` for `owl:`/`rdfs:` vocabulary and emits the Datalog
/// rules each construct entails.
pub fn lift_owl_rules(store: &Store) -> Vec<Rule> {
    let mut rules = Vec::new();

    for quad in store.scan(
        None,
        Some(&Term::NamedNode(node(RDF_TYPE).into_owned())),
        Some(&Term::NamedNode(node(OWL_TRANSITIVE_PROPERTY).into_owned())),
        None,
    ) {
        let Some(p) = subject_iri(&quad.subject) else { continue };
        rules.push(Rule::new(
            format!("owl:TransitiveProperty({p})"),
            Literal::new(p.clone(), vec![DlTerm::var("X"), DlTerm::var("Z")]),
            vec![
                Literal::new(p.clone(), vec![DlTerm::var("X"), DlTerm::var("Y")]),
                Literal::new(p, vec![DlTerm::var("Y"), DlTerm::var("Z")]),
            ],
        ));
    }

    for quad in store.scan(
        None,
        Some(&Term::NamedNode(node(RDF_TYPE).into_owned())),
        Some(&Term::NamedNode(node(OWL_SYMMETRIC_PROPERTY).into_owned())),
        None,
    ) {
        let Some(p) = subject_iri(&quad.subject) else { continue };
        rules.push(Rule::new(
            format!("owl:SymmetricProperty({p})"),
            Literal::new(p.clone(), vec![DlTerm::var("Y"), DlTerm::var("X")]),
            vec![Literal::new(p, vec![DlTerm::var("X"), DlTerm::var("Y")])],
        ));
    }

    for quad in store.scan(None, Some(&Term::NamedNode(node(OWL_INVERSE_OF).into_owned())), None, None) {
        let (Some(p), Some(q)) = (subject_iri(&quad.subject), object_iri(&quad.object)) else {
            continue;
        };
        rules.push(Rule::new(
            format!("owl:inverseOf({p},{q})"),
            Literal::new(q.clone(), vec![DlTerm::var("Y"), DlTerm::var("X")]),
            vec![Literal::new(p.clone(), vec![DlTerm::var("X"), DlTerm::var("Y")])],
        ));
        rules.push(Rule::new(
            format!("owl:inverseOf({q},{p})"),
            Literal::new(p, vec![DlTerm::var("Y"), DlTerm::var("X")]),
            vec![Literal::new(q, vec![DlTerm::var("X"), DlTerm::var("Y")])],
        ));
    }

    for quad in store.scan(None, Some(&Term::NamedNode(node(RDFS_SUBCLASS_OF).into_owned())), None, None) {
        let (Some(a), Some(b)) = (subject_iri(&quad.subject), object_iri(&quad.object)) else {
            continue;
        };
        rules.push(Rule::new(
            format!("rdfs:subClassOf({a},{b})"),
            Literal::new(TYPE_PREDICATE, vec![DlTerm::var("X"), DlTerm::constant(b)]),
            vec![Literal::new(TYPE_PREDICATE, vec![DlTerm::var("X"), DlTerm::constant(a)])],
        ));
    }

    for quad in store.scan(
        None,
        Some(&Term::NamedNode(node(RDFS_SUBPROPERTY_OF).into_owned())),
        None,
        None,
    ) {
        let (Some(p), Some(q)) = (subject_iri(&quad.subject), object_iri(&quad.object)) else {
            continue;
        };
        rules.push(Rule::new(
            format!("rdfs:subPropertyOf({p},{q})"),
            Literal::new(q, vec![DlTerm::var("X"), DlTerm::var("Y")]),
            vec![Literal::new(p, vec![DlTerm::var("X"), DlTerm::var("Y")])],
        ));
    }

    rules
}

/// Translates every quad in `store` into a ground Datalog fact: `rdf:type`
/// quads become `type(subject, class)`, everything else becomes
/// `predicate(subject, object)` keyed by the predicate IRI.
pub fn facts_from_store(store: &Store) -> Vec<Fact> {
    store
        .scan(None, None, None, None)
        .iter()
        .map(fact_from_quad)
        .collect()
}

fn fact_from_quad(quad: &Quad) -> Fact {
    let subject = term_to_const(&Term::from(quad.subject.clone()));
    let object = term_to_const(&quad.object);
    let predicate = if quad.predicate.as_str() == RDF_TYPE {
        TYPE_PREDICATE.to_string()
    } else {
        quad.predicate.as_str().to_string()
    };
    Fact::new(predicate, vec![subject, object])
}

/// `sha256(canonical_bytes(predicate, args, rule_name, sorted(premise_ids)))`
///: every field is
/// length-prefixed before hashing so no field-boundary ambiguity can make
/// two distinct derivations collide, and premise ids are sorted so the same
/// derivation always hashes the same regardless of evaluation order.
pub fn content_hash(predicate: &str, args: &[String], rule_name: &str, premises: &[String]) -> String {
    use sha2::{Digest, Sha256};

    let mut sorted_premises = premises.to_vec();
    sorted_premises.sort_unstable();

    let mut hasher = Sha256::new();
    let mut write_field = |bytes: &[u8]| {
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(bytes);
    };
    write_field(predicate.as_bytes());
    for arg in args {
        write_field(arg.as_bytes());
    }
    write_field(rule_name.as_bytes());
    for premise in &sorted_premises {
        write_field(premise.as_bytes());
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// The kind of a [`ThinkingNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Observation,
    Hypothesis,
    Inference,
}

/// One node of the [`ThinkingGraph`] DAG.
#[derive(Debug, Clone)]
pub struct ThinkingNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub confidence: f64,
}

/// One step of the topological derivation chain, as exported in the
/// ThinkingGraph JSON interchange format.
#[derive(Debug, Clone)]
pub struct DerivationStep {
    pub step: usize,
    pub rule: String,
    pub conclusion: String,
    pub premises: Vec<String>,
}

/// A DAG of [`ThinkingNode`]s connected by premise -> conclusion edges, plus
/// the topological derivation chain.
#[derive(Debug, Clone, Default)]
pub struct ThinkingGraph {
    pub nodes: Vec<ThinkingNode>,
    pub edges: Vec<(String, String)>,
    pub chain: Vec<DerivationStep>,
}

#[derive(Debug, Clone)]
struct ProofRecord {
    predicate: String,
    args: Vec<String>,
    rule_name: String,
    premises: Vec<String>,
}

/// The outcome of one [`Reasoner::deduce`] call.
#[derive(Debug, Clone)]
pub struct DeduceSummary {
    pub rules_fired: usize,
    pub iterations: usize,
    pub derived_facts: usize,
    pub proofs: Vec<String>,
}

/// Private reasoning state: derived facts and proofs are owned by one
/// `Reasoner` instance, which only reads the shared quad index.
#[derive(Default)]
pub struct Reasoner {
    rules: Vec<Rule>,
    base_facts: Vec<Fact>,
    confidence: FxHashMap<(String, Vec<String>), f64>,
    fact_ids: FxHashMap<(String, Vec<String>), String>,
    graph: ThinkingGraph,
    proofs: FxHashMap<String, ProofRecord>,
}

impl Reasoner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifts OWL/RDFS rules from `store` and ingests every quad as an
    /// Observation. Returns the number of facts ingested.
    pub fn load_from_store(&mut self, store: &Store, source: &str, session: &str) -> usize {
        self.rules.extend(lift_owl_rules(store));
        let facts = facts_from_store(store);
        let count = facts.len();
        for fact in facts {
            self.append_event(NodeKind::Observation, &fact.predicate, &fact.args, source, session);
        }
        count
    }

    /// Adds a standalone rule (e.g. from the Datalog JSON interchange)
    /// to the reasoner's program.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Records an event of `kind` as a [`ThinkingNode`]. Only `Observation`
    /// events are added to the extensional fact base — `Hypothesis` events
    /// go through [`Self::hypothesize`], and `Inference` events are
    /// produced internally by [`Self::deduce`].
    pub fn append_event(
        &mut self,
        kind: NodeKind,
        predicate: &str,
        args: &[String],
        source: &str,
        session: &str,
    ) -> String {
        let id = content_hash(predicate, args, "", &[]);
        let label = format!("{predicate}({})", args.join(", "));
        tracing::debug!(%source, %session, %id, ?kind, "thinking graph event appended");
        if !self.graph.nodes.iter().any(|n| n.id == id) {
            self.graph.nodes.push(ThinkingNode {
                id: id.clone(),
                kind,
                label,
                confidence: 1.0,
            });
        }
        if kind == NodeKind::Observation {
            let key = (predicate.to_string(), args.to_vec());
            self.base_facts.push(Fact::new(predicate, args.to_vec()));
            self.confidence.insert(key.clone(), 1.0);
            self.fact_ids.insert(key, id.clone());
            self.proofs.insert(
                id.clone(),
                ProofRecord {
                    predicate: predicate.to_string(),
                    args: args.to_vec(),
                    rule_name: String::new(),
                    premises: vec![],
                },
            );
        }
        id
    }

    /// Adds a hypothesis `(s, p, o)` with `confidence < 1.0`: it is included
    /// in evaluation, and its derived descendants inherit the minimum
    /// premise confidence.
    pub fn hypothesize(
        &mut self,
        subject: &str,
        predicate: &str,
        object: &str,
        confidence: f64,
        premises: Vec<String>,
    ) -> String {
        let args = vec![subject.to_string(), object.to_string()];
        let id = content_hash(predicate, &args, "hypothesis", &premises);
        let label = format!("{predicate}({subject}, {object})");
        self.graph.nodes.push(ThinkingNode {
            id: id.clone(),
            kind: NodeKind::Hypothesis,
            label,
            confidence,
        });
        for premise in &premises {
            self.graph.edges.push((premise.clone(), id.clone()));
        }
        let key = (predicate.to_string(), args.clone());
        self.base_facts.push(Fact::new(predicate, args.clone()));
        self.confidence.insert(key.clone(), confidence);
        self.fact_ids.insert(key, id.clone());
        self.proofs.insert(
            id.clone(),
            ProofRecord {
                predicate: predicate.to_string(),
                args,
                rule_name: "hypothesis".to_string(),
                premises,
            },
        );
        id
    }

    fn fact_id(&self, predicate: &str, args: &[String]) -> String {
        self.fact_ids
            .get(&(predicate.to_string(), args.to_vec()))
            .cloned()
            .unwrap_or_else(|| content_hash(predicate, args, "", &[]))
    }

    /// Runs the Datalog fixpoint over the accumulated facts and rules,
    /// recording every newly-derived fact as an `Inference` node with a
    /// content-hashed proof id.
    pub fn deduce(&mut self, cancellation: CancellationToken) -> Result<DeduceSummary, DatalogError> {
        let program = Program {
            facts: self.base_facts.clone(),
            rules: self.rules.clone(),
        };
        let result = datalog::evaluate(&program, &cancellation)?;

        let mut new_ids = Vec::new();
        let mut rules_used = FxHashSet::default();
        let mut step = self.graph.chain.len();

        for ((predicate, args), derivation) in &result.derivations {
            let premise_confidences: Vec<f64> = derivation
                .premises
                .iter()
                .map(|(p, a)| *self.confidence.get(&(p.clone(), a.clone())).unwrap_or(&1.0))
                .collect();
            let confidence = premise_confidences.into_iter().fold(1.0_f64, f64::min);
            let premise_ids: Vec<String> = derivation
                .premises
                .iter()
                .map(|(p, a)| self.fact_id(p, a))
                .collect();

            step += 1;
            let id = content_hash(predicate, args, &derivation.rule_name, &premise_ids);
            let key = (predicate.clone(), args.clone());
            self.fact_ids.insert(key.clone(), id.clone());
            self.confidence.insert(key, confidence);
            self.proofs.insert(
                id.clone(),
                ProofRecord {
                    predicate: predicate.clone(),
                    args: args.clone(),
                    rule_name: derivation.rule_name.clone(),
                    premises: premise_ids.clone(),
                },
            );
            for premise_id in &premise_ids {
                self.graph.edges.push((premise_id.clone(), id.clone()));
            }
            self.graph.nodes.push(ThinkingNode {
                id: id.clone(),
                kind: NodeKind::Inference,
                label: format!("{predicate}({})", args.join(", ")),
                confidence,
            });
            self.graph.chain.push(DerivationStep {
                step,
                rule: derivation.rule_name.clone(),
                conclusion: id.clone(),
                premises: premise_ids,
            });
            rules_used.insert(derivation.rule_name.clone());
            new_ids.push(id);
        }

        tracing::info!(
            rounds = result.rounds,
            derived = new_ids.len(),
            "reasoner deduction pass complete"
        );
        Ok(DeduceSummary {
            rules_fired: rules_used.len(),
            iterations: result.rounds,
            derived_facts: new_ids.len(),
            proofs: new_ids,
        })
    }

    pub fn get_thinking_graph(&self) -> &ThinkingGraph {
        &self.graph
    }

    /// Recomputes `id`'s content hash from its stored premises and rule and
    /// compares.
    pub fn validate_proof(&self, id: &str) -> bool {
        match self.proofs.get(id) {
            Some(record) => content_hash(&record.predicate, &record.args, &record.rule_name, &record.premises) == id,
            None => false,
        }
    }

    /// The topological derivation chain ending at `fact_id`, read backward
    /// from `self.graph.chain` (already in dependency order, since a fact
    /// can only be derived once its premises exist) and filtered down to
    /// exactly the steps `fact_id` transitively depends on.
    pub fn proof_chain(&self, fact_id: &str) -> Vec<DerivationStep> {
        let mut needed: FxHashSet<String> = FxHashSet::default();
        needed.insert(fact_id.to_string());
        let mut out = Vec::new();
        for step in self.graph.chain.iter().rev() {
            if needed.contains(&step.conclusion) {
                out.push(step.clone());
                for premise in &step.premises {
                    needed.insert(premise.clone());
                }
            }
        }
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphName;
    use crate::parser::RdfFormat;

    fn store_with(turtle: &str) -> Store {
        let store = Store::new();
        store
            .load(turtle.as_bytes(), RdfFormat::Turtle, GraphName::DefaultGraph.as_ref())
            .unwrap();
        store
    }

    #[test]
    fn symmetric_adjacency_scenario_a() {
        let store = store_with(
            r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
               @prefix x: <http://x/> .
               x:adjacentTo a owl:SymmetricProperty .
               x:A x:adjacentTo x:B .
               x:B x:adjacentTo x:C ."#,
        );
        let mut reasoner = Reasoner::new();
        reasoner.load_from_store(&store, "test", "s1");
        let summary = reasoner.deduce(CancellationToken::default()).unwrap();
        assert_eq!(summary.derived_facts, 2);

        let result = datalog::evaluate(
            &Program {
                facts: reasoner.base_facts.clone(),
                rules: reasoner.rules.clone(),
            },
            &CancellationToken::default(),
        )
        .unwrap();
        let b_edges: FxHashSet<String> = result
            .facts("http://x/adjacentTo")
            .into_iter()
            .filter(|f| f.args[0] == "<http://x/B>")
            .map(|f| f.args[1].clone())
            .collect();
        assert!(b_edges.contains("<http://x/A>"));
        assert!(b_edges.contains("<http://x/C>"));
    }

    #[test]
    fn proof_cites_all_premises_for_circular_transfer() {
        let mut reasoner = Reasoner::new();
        reasoner.append_event(NodeKind::Observation, "transfers", &["alice".into(), "bob".into()], "t", "s");
        reasoner.append_event(NodeKind::Observation, "transfers", &["bob".into(), "carol".into()], "t", "s");
        reasoner.append_event(NodeKind::Observation, "transfers", &["carol".into(), "alice".into()], "t", "s");
        reasoner.add_rule(Rule::new(
            "owl:TransitiveProperty(transfers)",
            Literal::new("transfers", vec![DlTerm::var("X"), DlTerm::var("Z")]),
            vec![
                Literal::new("transfers", vec![DlTerm::var("X"), DlTerm::var("Y")]),
                Literal::new("transfers", vec![DlTerm::var("Y"), DlTerm::var("Z")]),
            ],
        ));
        reasoner.deduce(CancellationToken::default()).unwrap();

        let found = reasoner
            .proofs
            .iter()
            .find(|(_, record)| record.predicate == "transfers" && record.args == ["alice", "alice"]);
        assert!(found.is_some(), "transfers(alice,alice) must be derived");
        let (id, record) = found.unwrap();
        assert!(reasoner.validate_proof(id));
        for premise in &record.premises {
            assert!(reasoner.proofs.contains_key(premise));
        }
        let chain = reasoner.proof_chain(id);
        assert!(!chain.is_empty());
    }

    #[test]
    fn validate_proof_rejects_unknown_id() {
        let reasoner = Reasoner::new();
        assert!(!reasoner.validate_proof("not-a-real-id"));
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash("p", &["x".into(), "y".into()], "r", &["id2".into(), "id1".into()]);
        let b = content_hash("p", &["x".into(), "y".into()], "r", &["id1".into(), "id2".into()]);
        assert_eq!(a, b, "premise order must not affect the hash");
    }
}
