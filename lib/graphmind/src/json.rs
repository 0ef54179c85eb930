//! The language-neutral JSON interchange formats of spec.md §6: the Datalog
//! fact/rule interchange used to feed a [`crate::datalog::Program`] from
//! outside this crate, and the `ThinkingGraph` JSON export of a
//! [`crate::reasoner::Reasoner`]'s derivation state.
//!
//! Variables in the Datalog JSON interchange are strings beginning with `?`
//! or an uppercase letter; everything else is a constant.

use crate::datalog::{Fact, Literal, Rule, Term};
use crate::reasoner::{DerivationStep, NodeKind, ThinkingGraph};
use serde::{Deserialize, Serialize};

fn is_variable(term: &str) -> bool {
    term.starts_with('?') || term.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn to_datalog_term(raw: &str) -> Term {
    if is_variable(raw) {
        Term::var(raw.trim_start_matches('?'))
    } else {
        Term::constant(raw)
    }
}

fn from_datalog_term(term: &Term) -> String {
    match term {
        Term::Var(v) => format!("?{v}"),
        Term::Const(c) => c.clone(),
    }
}

/// `{"predicate": string, "terms": [string, ...]}` (spec.md §6 "Datalog
/// JSON interchange").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactJson {
    pub predicate: String,
    pub terms: Vec<String>,
}

impl FactJson {
    /// Converts to a ground [`Fact`]. Every term must be a constant (spec.md
    /// §3 "extensional facts"); a term written as a variable is rejected.
    pub fn to_fact(&self) -> Result<Fact, String> {
        let args: Result<Vec<String>, String> = self
            .terms
            .iter()
            .map(|t| {
                if is_variable(t) {
                    Err(format!("fact {:?} has non-constant term {t:?}", self.predicate))
                } else {
                    Ok(t.clone())
                }
            })
            .collect();
        Ok(Fact::new(self.predicate.clone(), args?))
    }

    /// Converts to a [`Literal`], allowed to carry variables (used inside a
    /// [`RuleJson`]'s head/body).
    fn to_literal(&self) -> Literal {
        Literal::new(self.predicate.clone(), self.terms.iter().map(|t| to_datalog_term(t)).collect())
    }

    fn from_fact(fact: &Fact) -> Self {
        Self {
            predicate: fact.predicate.clone(),
            terms: fact.args.clone(),
        }
    }

    fn from_literal(literal: &Literal) -> Self {
        Self {
            predicate: literal.predicate.clone(),
            terms: literal.terms.iter().map(from_datalog_term).collect(),
        }
    }
}

/// `{"head": Fact, "body": [Fact, ...]}`, where `Fact` here
/// means [`FactJson`] used with variable terms rather than ground ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleJson {
    pub head: FactJson,
    pub body: Vec<FactJson>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RuleJson {
    pub fn to_rule(&self) -> Rule {
        let name = self.name.clone().unwrap_or_else(|| self.head.predicate.clone());
        Rule::new(name, self.head.to_literal(), self.body.iter().map(FactJson::to_literal).collect())
    }

    fn from_rule(rule: &Rule) -> Self {
        Self {
            head: FactJson::from_literal(&rule.head),
            body: rule.body.iter().map(FactJson::from_literal).collect(),
            name: Some(rule.name.clone()),
        }
    }
}

/// Parses a JSON array of [`FactJson`] into ground [`Fact`]s.
pub fn parse_facts(json: &str) -> Result<Vec<Fact>, String> {
    let facts: Vec<FactJson> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    facts.iter().map(FactJson::to_fact).collect()
}

/// Serializes ground facts to the spec.md §6 fact interchange shape.
pub fn facts_to_json(facts: &[Fact]) -> Result<String, String> {
    let wire: Vec<FactJson> = facts.iter().map(FactJson::from_fact).collect();
    serde_json::to_string(&wire).map_err(|e| e.to_string())
}

/// Parses a JSON array of [`RuleJson`] into [`Rule`]s.
pub fn parse_rules(json: &str) -> Result<Vec<Rule>, String> {
    let rules: Vec<RuleJson> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    Ok(rules.iter().map(RuleJson::to_rule).collect())
}

/// Serializes rules to the spec.md §6 rule interchange shape.
pub fn rules_to_json(rules: &[Rule]) -> Result<String, String> {
    let wire: Vec<RuleJson> = rules.iter().map(RuleJson::from_rule).collect();
    serde_json::to_string(&wire).map_err(|e| e.to_string())
}

/// `{"id", "type": "OBSERVATION"|"HYPOTHESIS"|"INFERENCE", "label",
/// "confidence"}`.
#[derive(Debug, Clone, Serialize)]
pub struct ThinkingNodeJson {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    pub confidence: f64,
}

fn kind_tag(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Observation => "OBSERVATION",
        NodeKind::Hypothesis => "HYPOTHESIS",
        NodeKind::Inference => "INFERENCE",
    }
}

/// `{"step": int, "rule": string, "conclusion": string, "premises": [id,
/// ...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct DerivationStepJson {
    pub step: usize,
    pub rule: String,
    pub conclusion: String,
    pub premises: Vec<String>,
}

impl From<&DerivationStep> for DerivationStepJson {
    fn from(step: &DerivationStep) -> Self {
        Self {
            step: step.step,
            rule: step.rule.clone(),
            conclusion: step.conclusion.clone(),
            premises: step.premises.clone(),
        }
    }
}

/// The full wire shape of a [`ThinkingGraph`]: nodes plus the
/// topological derivation chain.
#[derive(Debug, Clone, Serialize)]
pub struct ThinkingGraphJson {
    pub nodes: Vec<ThinkingNodeJson>,
    pub chain: Vec<DerivationStepJson>,
}

/// Serializes a [`ThinkingGraph`] to the spec.md §6 JSON shape.
pub fn thinking_graph_to_json(graph: &ThinkingGraph) -> Result<String, String> {
    let wire = ThinkingGraphJson {
        nodes: graph
            .nodes
            .iter()
            .map(|n| ThinkingNodeJson {
                id: n.id.clone(),
                kind: kind_tag(n.kind),
                label: n.label.clone(),
                confidence: n.confidence,
            })
            .collect(),
        chain: graph.chain.iter().map(DerivationStepJson::from).collect(),
    };
    serde_json::to_string_pretty(&wire).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::datalog::Program;
    use crate::reasoner::Reasoner;

    #[test]
    fn variable_detection_follows_spec_rule() {
        assert!(is_variable("?x"));
        assert!(is_variable("X"));
        assert!(!is_variable("x"));
        assert!(!is_variable("alice"));
    }

    #[test]
    fn facts_round_trip_through_json() {
        let facts = vec![Fact::new("edge", vec!["a".into(), "b".into()])];
        let json = facts_to_json(&facts).unwrap();
        let parsed = parse_facts(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].predicate, "edge");
        assert_eq!(parsed[0].args, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rules_round_trip_and_evaluate() {
        let rules_json = r#"[{
            "head": {"predicate": "path", "terms": ["?X", "?Y"]},
            "body": [{"predicate": "edge", "terms": ["?X", "?Y"]}]
        }]"#;
        let rules = parse_rules(rules_json).unwrap();
        let program = Program {
            facts: vec![Fact::new("edge", vec!["a".into(), "b".into()])],
            rules,
        };
        let result = crate::datalog::evaluate(&program, &CancellationToken::default()).unwrap();
        assert!(result.contains("path", &["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn ground_fact_with_variable_term_is_rejected() {
        let json = r#"{"predicate": "edge", "terms": ["?X", "b"]}"#;
        let fact_json: FactJson = serde_json::from_str(json).unwrap();
        assert!(fact_json.to_fact().is_err());
    }

    #[test]
    fn thinking_graph_exports_node_types_and_chain() {
        let mut reasoner = Reasoner::new();
        reasoner.append_event(NodeKind::Observation, "edge", &["a".into(), "b".into()], "test", "s1");
        let json = thinking_graph_to_json(reasoner.get_thinking_graph()).unwrap();
        assert!(json.contains("\"OBSERVATION\""));
        assert!(json.contains("\"edge(a, b)\""));
    }
}
