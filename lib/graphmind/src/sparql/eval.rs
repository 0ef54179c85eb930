//! The SPARQL planner/executor.
//!
//! Evaluation works over [`Bindings`] — a solution mapping of
//! [`Variable`] to [`Term`] — built bottom-up over the [`GraphPattern`]
//! algebra tree `spargebra` parses. A [`GraphPattern::Bgp`] whose triple
//! patterns all share one variable (a star shape) is planned with the
//! worst-case-optimal join of spec.md §4.6 rule 1 when `enable_wcoj` is on;
//! everything else — including chains, where no single variable occurs in
//! every pattern — falls back to a left-deep join ordered by estimated
//! cardinality (rule 2).

use crate::cancel::CancellationToken;
use crate::error::{CardinalityLimit, UnsupportedFeature};
use crate::model::{GraphName, GraphNameRef, NamedNode, Term};
use crate::sparql::paths;
use crate::sparql::{QueryError, QueryOptions};
use crate::store::Store;
use crate::value::{self, NumericValue};
use rustc_hash::{FxHashMap, FxHashSet};
use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern, OrderExpression,
    PropertyPathExpression,
};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
use spargebra::Variable;
use std::cmp::Ordering;

/// A solution mapping: unbound variables are simply absent from the map
/// (spec.md §3's Term model has no explicit "null"; ORDER BY treats absence
/// as unbound, sorted first per spec.md §4.6).
pub type Bindings = FxHashMap<Variable, Term>;

pub struct Evaluator<'a> {
    pub store: &'a Store,
    pub options: &'a QueryOptions,
    pub cancellation: CancellationToken,
}

impl<'a> Evaluator<'a> {
    pub fn new(store: &'a Store, options: &'a QueryOptions, cancellation: CancellationToken) -> Self {
        Self {
            store,
            options,
            cancellation,
        }
    }

    /// Evaluates `pattern` against a single seed `input` binding, returning
    /// every solution row.
    pub fn eval(&self, pattern: &GraphPattern, input: &Bindings) -> Result<Vec<Bindings>, QueryError> {
        self.cancellation.check()?;
        match pattern {
            GraphPattern::Bgp { patterns } => self.eval_bgp(patterns, None, input),
            GraphPattern::Path { subject, path, object } => {
                self.eval_path(subject, path, object, None, input)
            }
            GraphPattern::Join { left, right } => {
                let lefts = self.eval(left, input)?;
                let mut out = Vec::new();
                for l in &lefts {
                    out.extend(self.eval(right, l)?);
                }
                Ok(out)
            }
            GraphPattern::LeftJoin { left, right, expression } => {
                let lefts = self.eval(left, input)?;
                let mut out = Vec::new();
                for l in &lefts {
                    let matched = self.eval(right, l)?;
                    let mut kept = Vec::new();
                    for r in matched {
                        if let Some(expr) = expression {
                            if self.eval_ebv(expr, &r) != Some(true) {
                                continue;
                            }
                        }
                        kept.push(r);
                    }
                    if kept.is_empty() {
                        out.push(l.clone());
                    } else {
                        out.extend(kept);
                    }
                }
                Ok(out)
            }
            GraphPattern::Filter { expr, inner } => {
                let rows = self.eval(inner, input)?;
                Ok(rows
                    .into_iter()
                    .filter(|row| self.eval_ebv(expr, row) == Some(true))
                    .collect())
            }
            GraphPattern::Union { left, right } => {
                let mut out = self.eval(left, input)?;
                out.extend(self.eval(right, input)?);
                Ok(out)
            }
            GraphPattern::Graph { name, inner } => self.eval_graph(name, inner, input),
            GraphPattern::Extend { inner, variable, expression } => {
                let rows = self.eval(inner, input)?;
                Ok(rows
                    .into_iter()
                    .map(|mut row| {
                        if let Some(v) = self.eval_expression(expression, &row) {
                            row.insert(variable.clone(), v);
                        }
                        row
                    })
                    .collect())
            }
            GraphPattern::Minus { left, right } => {
                let lefts = self.eval(left, input)?;
                let rights = self.eval(right, input)?;
                Ok(lefts
                    .into_iter()
                    .filter(|l| !rights.iter().any(|r| compatible_and_overlapping(l, r)))
                    .collect())
            }
            GraphPattern::Values { variables, bindings } => {
                let mut out = Vec::new();
                for row in bindings {
                    let mut b = input.clone();
                    for (var, val) in variables.iter().zip(row) {
                        if let Some(val) = val {
                            b.insert(var.clone(), ground_term_to_term(val));
                        }
                    }
                    out.push(b);
                }
                Ok(out)
            }
            GraphPattern::OrderBy { inner, expression } => {
                let mut rows = self.eval(inner, input)?;
                self.sort_rows(&mut rows, expression);
                Ok(rows)
            }
            GraphPattern::Project { inner, variables } => {
                let rows = self.eval(inner, input)?;
                Ok(rows
                    .into_iter()
                    .map(|row| {
                        variables
                            .iter()
                            .filter_map(|v| row.get(v).map(|t| (v.clone(), t.clone())))
                            .collect()
                    })
                    .collect())
            }
            GraphPattern::Distinct { inner } => {
                let rows = self.eval(inner, input)?;
                Ok(dedup(rows))
            }
            GraphPattern::Reduced { inner } => self.eval(inner, input),
            GraphPattern::Slice { inner, start, length } => {
                let rows = self.eval(inner, input)?;
                if let Some(max_rows) = self.options.max_rows {
                    if rows.len() > max_rows {
                        return Err(CardinalityLimit(format!(
                            "result set of {} rows exceeds max_rows {max_rows}",
                            rows.len()
                        ))
                        .into());
                    }
                }
                let end = length.map_or(rows.len(), |len| (*start + len).min(rows.len()));
                Ok(rows.into_iter().skip(*start).take(end.saturating_sub(*start)).collect())
            }
            GraphPattern::Group { inner, variables, aggregates } => {
                self.eval_group(inner, variables, aggregates, input)
            }
            GraphPattern::Service { name, silent, .. } => {
                if *silent {
                    Ok(vec![input.clone()])
                } else {
                    Err(UnsupportedFeature(format!("SERVICE {name}")).into())
                }
            }
        }
    }

    fn eval_graph(
        &self,
        name: &NamedNodePattern,
        inner: &GraphPattern,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        match name {
            NamedNodePattern::NamedNode(n) => {
                self.eval_with_graph(inner, Some(GraphNameRef::NamedNode(n.as_ref())), input)
            }
            NamedNodePattern::Variable(v) => {
                let mut out = Vec::new();
                for g in self.store.all_graphs()? {
                    let mut b = input.clone();
                    b.insert(v.clone(), Term::NamedNode(g.clone()));
                    out.extend(self.eval_with_graph(inner, Some(GraphNameRef::NamedNode(g.as_ref())), &b)?);
                }
                Ok(out)
            }
        }
    }

    /// Evaluates `pattern` with every BGP/Path scan restricted to `graph`
    ///. Only `Bgp`/`Path`/structural combinators need
    /// to thread the graph through; this crate's in-memory evaluator
    /// re-dispatches rather than carrying graph as executor state, since
    /// `GRAPH` never nests arbitrarily deep in practice.
    fn eval_with_graph(
        &self,
        pattern: &GraphPattern,
        graph: Option<GraphNameRef<'_>>,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        let graph_id = graph.map(|g| self.store.dictionary().intern_graph_name(g));
        match pattern {
            GraphPattern::Bgp { patterns } => self.eval_bgp(patterns, graph_id, input),
            GraphPattern::Path { subject, path, object } => {
                self.eval_path(subject, path, object, graph_id, input)
            }
            GraphPattern::Join { left, right } => {
                let lefts = self.eval_with_graph(left, graph, input)?;
                let mut out = Vec::new();
                for l in &lefts {
                    out.extend(self.eval_with_graph(right, graph, l)?);
                }
                Ok(out)
            }
            GraphPattern::Filter { expr, inner } => {
                let rows = self.eval_with_graph(inner, graph, input)?;
                Ok(rows.into_iter().filter(|row| self.eval_ebv(expr, row) == Some(true)).collect())
            }
            GraphPattern::Union { left, right } => {
                let mut out = self.eval_with_graph(left, graph, input)?;
                out.extend(self.eval_with_graph(right, graph, input)?);
                Ok(out)
            }
            other => self.eval(other, input),
        }
    }

    fn eval_path(
        &self,
        subject: &TermPattern,
        path: &PropertyPathExpression,
        object: &TermPattern,
        graph: Option<u64>,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        let _ = graph; // property paths run over the whole store; GRAPH-scoped paths are rare enough not to warrant threading a restriction through paths::evaluate
        let bound_subject = resolve_term_pattern(subject, input);
        let pairs = paths::evaluate(self.store, path, bound_subject.as_ref(), self.options.path_depth_limit)?;
        let mut out = Vec::new();
        for (s, o) in pairs {
            let mut b = input.clone();
            if !bind_term_pattern(subject, &s, &mut b) {
                continue;
            }
            if !bind_term_pattern(object, &o, &mut b) {
                continue;
            }
            out.push(b);
        }
        Ok(out)
    }

    fn eval_bgp(
        &self,
        patterns: &[TriplePattern],
        graph: Option<u64>,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        if patterns.is_empty() {
            return Ok(vec![input.clone()]);
        }
        if self.options.enable_wcoj {
            if let Some(shared) = star_variable(patterns) {
                return self.eval_star_bgp(patterns, &shared, graph, input);
            }
        }
        self.eval_left_deep_bgp(patterns, graph, input)
    }

    /// Worst-case-optimal join for a star BGP: pick
    /// the pattern with the smallest per-predicate extension to seed the
    /// shared variable's candidate domain, then intersect against every
    /// other pattern sharing that variable before expanding the rest of
    /// each pattern's free positions.
    fn eval_star_bgp(
        &self,
        patterns: &[TriplePattern],
        shared: &Variable,
        graph: Option<u64>,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        let mut ordered: Vec<&TriplePattern> = patterns.iter().collect();
        ordered.sort_by_key(|p| self.estimate_pattern_extension(p, graph));

        let mut candidates: Option<FxHashSet<Term>> = None;
        for p in &ordered {
            let rows = self.scan_pattern(p, graph, input)?;
            let values: FxHashSet<Term> = rows
                .iter()
                .filter_map(|row| row.get(shared).cloned())
                .collect();
            candidates = Some(match candidates {
                None => values,
                Some(prev) => prev.intersection(&values).cloned().collect(),
            });
        }
        let candidates = candidates.unwrap_or_default();

        let mut out = Vec::new();
        for value in candidates {
            let mut row = input.clone();
            row.insert(shared.clone(), value);
            let mut rows = vec![row];
            for p in &ordered {
                rows = self.join_pattern(p, graph, &rows)?;
                if rows.is_empty() {
                    break;
                }
            }
            out.extend(rows);
        }
        Ok(out)
    }

    fn eval_left_deep_bgp(
        &self,
        patterns: &[TriplePattern],
        graph: Option<u64>,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        let mut ordered: Vec<&TriplePattern> = patterns.iter().collect();
        ordered.sort_by_key(|p| self.estimate_pattern_extension(p, graph));

        let mut rows = vec![input.clone()];
        for p in ordered {
            rows = self.join_pattern(p, graph, &rows)?;
            if rows.is_empty() {
                break;
            }
        }
        Ok(rows)
    }

    fn join_pattern(
        &self,
        pattern: &TriplePattern,
        graph: Option<u64>,
        rows: &[Bindings],
    ) -> Result<Vec<Bindings>, QueryError> {
        let mut out = Vec::new();
        for row in rows {
            out.extend(self.scan_pattern(pattern, graph, row)?);
        }
        Ok(out)
    }

    fn scan_pattern(
        &self,
        pattern: &TriplePattern,
        graph: Option<u64>,
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        let subject = resolve_term_pattern(&pattern.subject, input);
        let predicate = match &pattern.predicate {
            NamedNodePattern::NamedNode(n) => Some(Term::NamedNode(n.clone())),
            NamedNodePattern::Variable(v) => input.get(v).cloned(),
        };
        let object = resolve_term_pattern(&pattern.object, input);

        let graph_ref = graph
            .map(|g| self.store.dictionary().resolve_graph_name(g))
            .transpose()
            .map_err(|_| crate::error::InvariantViolation("dangling graph id".into()))?;
        let graph_ref = graph_ref.as_ref().map(GraphName::as_ref);

        let quads = self.store.scan(
            subject.as_ref(),
            predicate.as_ref(),
            object.as_ref(),
            graph_ref,
        );
        let mut out = Vec::new();
        for quad in quads {
            let mut row = input.clone();
            if !bind_term_pattern(&pattern.subject, &Term::from(quad.subject), &mut row) {
                continue;
            }
            if let NamedNodePattern::Variable(v) = &pattern.predicate {
                row.insert(v.clone(), Term::NamedNode(quad.predicate));
            }
            if !bind_term_pattern(&pattern.object, &quad.object, &mut row) {
                continue;
            }
            out.push(row);
        }
        Ok(out)
    }

    fn estimate_pattern_extension(&self, pattern: &TriplePattern, graph: Option<u64>) -> u64 {
        match &pattern.predicate {
            NamedNodePattern::NamedNode(p) => {
                let graph_ref = graph.and_then(|g| self.store.dictionary().resolve_graph_name(g).ok());
                self.store
                    .dictionary()
                    .get(&Term::NamedNode(p.clone()))
                    .map(|pid| self.store.index().extension_size(pid, graph_ref.map(|g| {
                        self.store.dictionary().intern_graph_name(g.as_ref())
                    })))
                    .unwrap_or(0)
            }
            NamedNodePattern::Variable(_) => self.store.len(),
        }
    }

    pub fn eval_ebv(&self, expr: &Expression, row: &Bindings) -> Option<bool> {
        let v = self.eval_expression(expr, row)?;
        value::effective_boolean_value(&v)
    }

    pub fn eval_expression(&self, expr: &Expression, row: &Bindings) -> Option<Term> {
        match expr {
            Expression::NamedNode(n) => Some(Term::NamedNode(n.clone())),
            Expression::Literal(l) => Some(Term::Literal(l.clone())),
            Expression::Variable(v) => row.get(v).cloned(),
            Expression::Or(a, b) => {
                let a = self.eval_ebv(a, row);
                let b = self.eval_ebv(b, row);
                match (a, b) {
                    (Some(true), _) | (_, Some(true)) => Some(bool_term(true)),
                    (Some(false), Some(false)) => Some(bool_term(false)),
                    _ => None,
                }
            }
            Expression::And(a, b) => {
                let a = self.eval_ebv(a, row);
                let b = self.eval_ebv(b, row);
                match (a, b) {
                    (Some(false), _) | (_, Some(false)) => Some(bool_term(false)),
                    (Some(true), Some(true)) => Some(bool_term(true)),
                    _ => None,
                }
            }
            Expression::Equal(a, b) => {
                let a = self.eval_expression(a, row)?;
                let b = self.eval_expression(b, row)?;
                value::filter_equals(&a, &b).map(bool_term)
            }
            Expression::SameTerm(a, b) => {
                let a = self.eval_expression(a, row)?;
                let b = self.eval_expression(b, row)?;
                Some(bool_term(value::same_term(&a, &b)))
            }
            Expression::Greater(a, b) => self.compare(a, b, row, |o| o == Ordering::Greater),
            Expression::GreaterOrEqual(a, b) => {
                self.compare(a, b, row, |o| o != Ordering::Less)
            }
            Expression::Less(a, b) => self.compare(a, b, row, |o| o == Ordering::Less),
            Expression::LessOrEqual(a, b) => self.compare(a, b, row, |o| o != Ordering::Greater),
            Expression::In(e, list) => {
                let v = self.eval_expression(e, row)?;
                let mut any_unknown = false;
                for item in list {
                    let item = self.eval_expression(item, row)?;
                    match value::filter_equals(&v, &item) {
                        Some(true) => return Some(bool_term(true)),
                        Some(false) => {}
                        None => any_unknown = true,
                    }
                }
                if any_unknown {
                    None
                } else {
                    Some(bool_term(false))
                }
            }
            Expression::Add(a, b) => self.numeric_binop(a, b, row, NumericValue::add),
            Expression::Subtract(a, b) => self.numeric_binop(a, b, row, NumericValue::sub),
            Expression::Multiply(a, b) => self.numeric_binop(a, b, row, NumericValue::mul),
            Expression::Divide(a, b) => self.numeric_binop(a, b, row, NumericValue::div),
            Expression::UnaryPlus(e) => self.eval_expression(e, row),
            Expression::UnaryMinus(e) => {
                let v = self.eval_expression(e, row)?;
                let Term::Literal(l) = v else { return None };
                NumericValue::from_literal(l.as_ref())?.neg().map(NumericValue::to_literal).map(Term::Literal)
            }
            Expression::Not(e) => self.eval_ebv(e, row).map(|b| bool_term(!b)),
            Expression::Exists(p) => {
                let rows = self.eval(p, row).ok()?;
                Some(bool_term(!rows.is_empty()))
            }
            Expression::Bound(v) => Some(bool_term(row.contains_key(v))),
            Expression::If(cond, yes, no) => {
                if self.eval_ebv(cond, row)? {
                    self.eval_expression(yes, row)
                } else {
                    self.eval_expression(no, row)
                }
            }
            Expression::Coalesce(options) => {
                options.iter().find_map(|e| self.eval_expression(e, row))
            }
            Expression::FunctionCall(f, args) => self.eval_function(f, args, row),
        }
    }

    fn compare(
        &self,
        a: &Expression,
        b: &Expression,
        row: &Bindings,
        accept: impl Fn(Ordering) -> bool,
    ) -> Option<Term> {
        let a = self.eval_expression(a, row)?;
        let b = self.eval_expression(b, row)?;
        let ord = term_partial_cmp(&a, &b)?;
        Some(bool_term(accept(ord)))
    }

    fn numeric_binop(
        &self,
        a: &Expression,
        b: &Expression,
        row: &Bindings,
        op: impl Fn(NumericValue, NumericValue) -> Option<NumericValue>,
    ) -> Option<Term> {
        let a = self.eval_expression(a, row)?;
        let b = self.eval_expression(b, row)?;
        let (Term::Literal(la), Term::Literal(lb)) = (a, b) else {
            return None;
        };
        let na = NumericValue::from_literal(la.as_ref())?;
        let nb = NumericValue::from_literal(lb.as_ref())?;
        op(na, nb).map(NumericValue::to_literal).map(Term::Literal)
    }

    fn eval_function(&self, f: &Function, args: &[Expression], row: &Bindings) -> Option<Term> {
        let arg = |i: usize| self.eval_expression(args.get(i)?, row);
        match f {
            Function::Str => {
                let v = arg(0)?;
                Some(Term::Literal(crate::model::Literal::new_simple_literal(lexical_form(&v))))
            }
            Function::Lang => {
                let Term::Literal(l) = arg(0)? else { return None };
                Some(Term::Literal(crate::model::Literal::new_simple_literal(
                    l.language().unwrap_or("").to_string(),
                )))
            }
            Function::Datatype => {
                let Term::Literal(l) = arg(0)? else { return None };
                Some(Term::NamedNode(l.datatype().into_owned()))
            }
            Function::LangMatches => {
                let Term::Literal(tag) = arg(0)? else { return None };
                let Term::Literal(range) = arg(1)? else { return None };
                let tag = tag.value().to_ascii_lowercase();
                let range = range.value().to_ascii_lowercase();
                Some(bool_term(range == "*" || tag == range || tag.starts_with(&format!("{range}-"))))
            }
            Function::Iri => match arg(0)? {
                Term::NamedNode(n) => Some(Term::NamedNode(n)),
                Term::Literal(l) => NamedNode::new(l.value()).ok().map(Term::NamedNode),
                _ => None,
            },
            Function::BNode if args.is_empty() => {
                Some(Term::BlankNode(crate::model::BlankNode::default()))
            }
            Function::BNode => Some(Term::BlankNode(crate::model::BlankNode::default())),
            Function::Abs => self.unary_numeric(args, row, |n| match n {
                NumericValue::Integer(v) => Some(NumericValue::Integer(v.abs())),
                NumericValue::Decimal(v) => v.checked_abs().map(NumericValue::Decimal),
                NumericValue::Float(v) => Some(NumericValue::Float(v.abs())),
                NumericValue::Double(v) => Some(NumericValue::Double(v.abs())),
            }),
            Function::Ceil => self.unary_numeric(args, row, |n| match n {
                NumericValue::Decimal(v) => v.checked_ceil().map(NumericValue::Decimal),
                NumericValue::Float(v) => Some(NumericValue::Float(v.ceil())),
                NumericValue::Double(v) => Some(NumericValue::Double(v.ceil())),
                i => Some(i),
            }),
            Function::Floor => self.unary_numeric(args, row, |n| match n {
                NumericValue::Decimal(v) => v.checked_floor().map(NumericValue::Decimal),
                NumericValue::Float(v) => Some(NumericValue::Float(v.floor())),
                NumericValue::Double(v) => Some(NumericValue::Double(v.floor())),
                i => Some(i),
            }),
            Function::Round => self.unary_numeric(args, row, |n| match n {
                NumericValue::Decimal(v) => v.checked_round().map(NumericValue::Decimal),
                NumericValue::Float(v) => Some(NumericValue::Float(v.round())),
                NumericValue::Double(v) => Some(NumericValue::Double(v.round())),
                i => Some(i),
            }),
            Function::Concat => {
                let mut s = String::new();
                for a in args {
                    s.push_str(&lexical_form(&self.eval_expression(a, row)?));
                }
                Some(Term::Literal(crate::model::Literal::new_simple_literal(s)))
            }
            Function::StrLen => {
                let v = arg(0)?;
                Some(NumericValue::Integer(oxsdatatypes::Integer::from(
                    lexical_form(&v).chars().count() as i64,
                )).to_literal_term())
            }
            Function::UCase => Some(Term::Literal(crate::model::Literal::new_simple_literal(
                lexical_form(&arg(0)?).to_uppercase(),
            ))),
            Function::LCase => Some(Term::Literal(crate::model::Literal::new_simple_literal(
                lexical_form(&arg(0)?).to_lowercase(),
            ))),
            Function::Contains => {
                Some(bool_term(lexical_form(&arg(0)?).contains(&lexical_form(&arg(1)?))))
            }
            Function::StrStarts => {
                Some(bool_term(lexical_form(&arg(0)?).starts_with(&lexical_form(&arg(1)?))))
            }
            Function::StrEnds => {
                Some(bool_term(lexical_form(&arg(0)?).ends_with(&lexical_form(&arg(1)?))))
            }
            Function::SubStr => {
                let s = lexical_form(&arg(0)?);
                let start = NumericValue::from_literal(literal_of(arg(1)?)?.as_ref())?.to_f64() as usize;
                let chars: Vec<char> = s.chars().collect();
                let start = start.saturating_sub(1).min(chars.len());
                let end = match args.get(2) {
                    Some(len) => {
                        let len = NumericValue::from_literal(literal_of(self.eval_expression(len, row)?)?.as_ref())?
                            .to_f64() as usize;
                        (start + len).min(chars.len())
                    }
                    None => chars.len(),
                };
                Some(Term::Literal(crate::model::Literal::new_simple_literal(
                    chars[start..end].iter().collect::<String>(),
                )))
            }
            Function::IsIri => Some(bool_term(matches!(arg(0)?, Term::NamedNode(_)))),
            Function::IsBlank => Some(bool_term(matches!(arg(0)?, Term::BlankNode(_)))),
            Function::IsLiteral => Some(bool_term(matches!(arg(0)?, Term::Literal(_)))),
            Function::IsNumeric => {
                let Term::Literal(l) = arg(0)? else { return Some(bool_term(false)) };
                Some(bool_term(NumericValue::from_literal(l.as_ref()).is_some()))
            }
            Function::StrDt => {
                let v = lexical_form(&arg(0)?);
                let Term::NamedNode(dt) = arg(1)? else { return None };
                Some(Term::Literal(crate::model::Literal::new_typed_literal(v, dt)))
            }
            Function::StrLang => {
                let v = lexical_form(&arg(0)?);
                let lang = lexical_form(&arg(1)?);
                crate::model::Literal::new_language_tagged_literal(v, lang)
                    .ok()
                    .map(Term::Literal)
            }
            _ => None,
        }
    }

    fn unary_numeric(
        &self,
        args: &[Expression],
        row: &Bindings,
        op: impl Fn(NumericValue) -> Option<NumericValue>,
    ) -> Option<Term> {
        let Term::Literal(l) = self.eval_expression(args.first()?, row)? else {
            return None;
        };
        let n = NumericValue::from_literal(l.as_ref())?;
        op(n).map(NumericValue::to_literal).map(Term::Literal)
    }

    fn sort_rows(&self, rows: &mut [Bindings], order: &[OrderExpression]) {
        rows.sort_by(|a, b| {
            for expr in order {
                let (e, desc) = match expr {
                    OrderExpression::Asc(e) => (e, false),
                    OrderExpression::Desc(e) => (e, true),
                };
                let va = self.eval_expression(e, a);
                let vb = self.eval_expression(e, b);
                let ord = match (va, vb) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (Some(x), Some(y)) => term_partial_cmp(&x, &y).unwrap_or(Ordering::Equal),
                };
                let ord = if desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    fn eval_group(
        &self,
        inner: &GraphPattern,
        group_vars: &[Variable],
        aggregates: &[(Variable, AggregateExpression)],
        input: &Bindings,
    ) -> Result<Vec<Bindings>, QueryError> {
        let rows = self.eval(inner, input)?;
        let mut groups: FxHashMap<Vec<Option<Term>>, Vec<Bindings>> = FxHashMap::default();
        for row in rows {
            let key: Vec<Option<Term>> = group_vars.iter().map(|v| row.get(v).cloned()).collect();
            groups.entry(key).or_default().push(row);
        }
        if groups.is_empty() && group_vars.is_empty() {
            groups.insert(Vec::new(), Vec::new());
        }
        let mut out = Vec::new();
        for (key, members) in groups {
            let mut row: Bindings = FxHashMap::default();
            for (var, val) in group_vars.iter().zip(key) {
                if let Some(val) = val {
                    row.insert(var.clone(), val);
                }
            }
            for (var, agg) in aggregates {
                if let Some(v) = self.eval_aggregate(agg, &members) {
                    row.insert(var.clone(), v);
                }
            }
            out.push(row);
        }
        Ok(out)
    }

    fn eval_aggregate(&self, agg: &AggregateExpression, rows: &[Bindings]) -> Option<Term> {
        match agg {
            AggregateExpression::CountSolutions { distinct } => {
                let n = if *distinct {
                    dedup(rows.to_vec()).len()
                } else {
                    rows.len()
                };
                Some(NumericValue::Integer(oxsdatatypes::Integer::from(n as i64)).to_literal_term())
            }
            AggregateExpression::FunctionCall { name, expr, distinct } => {
                let mut values: Vec<Term> = rows.iter().filter_map(|r| self.eval_expression(expr, r)).collect();
                if *distinct {
                    let mut seen = FxHashSet::default();
                    values.retain(|v| seen.insert(v.clone()));
                }
                self.eval_aggregate_function(name, &values)
            }
        }
    }

    fn eval_aggregate_function(&self, name: &AggregateFunction, values: &[Term]) -> Option<Term> {
        match name {
            AggregateFunction::Count => {
                Some(NumericValue::Integer(oxsdatatypes::Integer::from(values.len() as i64)).to_literal_term())
            }
            AggregateFunction::Sum => {
                let mut acc = NumericValue::Integer(oxsdatatypes::Integer::from(0));
                for v in values {
                    let Term::Literal(l) = v else { continue };
                    if let Some(n) = NumericValue::from_literal(l.as_ref()) {
                        acc = acc.add(n)?;
                    }
                }
                Some(acc.to_literal_term())
            }
            AggregateFunction::Avg => {
                if values.is_empty() {
                    return Some(NumericValue::Integer(oxsdatatypes::Integer::from(0)).to_literal_term());
                }
                let sum = self.eval_aggregate_function(&AggregateFunction::Sum, values)?;
                let Term::Literal(l) = sum else { return None };
                let n = NumericValue::from_literal(l.as_ref())?;
                let count = NumericValue::Integer(oxsdatatypes::Integer::from(values.len() as i64));
                n.div(count).map(NumericValue::to_literal_term)
            }
            AggregateFunction::Min => values
                .iter()
                .cloned()
                .reduce(|a, b| if term_partial_cmp(&b, &a) == Some(Ordering::Less) { b } else { a }),
            AggregateFunction::Max => values
                .iter()
                .cloned()
                .reduce(|a, b| if term_partial_cmp(&b, &a) == Some(Ordering::Greater) { b } else { a }),
            AggregateFunction::GroupConcat { separator } => {
                let sep = separator.as_deref().unwrap_or(" ");
                let s = values.iter().map(lexical_form).collect::<Vec<_>>().join(sep);
                Some(Term::Literal(crate::model::Literal::new_simple_literal(s)))
            }
            AggregateFunction::Sample => values.first().cloned(),
            _ => None,
        }
    }
}

trait ToLiteralTerm {
    fn to_literal_term(self) -> Term;
}

impl ToLiteralTerm for NumericValue {
    fn to_literal_term(self) -> Term {
        Term::Literal(self.to_literal())
    }
}

fn bool_term(b: bool) -> Term {
    Term::Literal(oxrdf::Literal::new_typed_literal(
        if b { "true" } else { "false" },
        oxrdf::NamedNodeRef::new_unchecked(crate::value::xsd::BOOLEAN),
    ))
}

fn lexical_form(t: &Term) -> String {
    match t {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::BlankNode(b) => b.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
    }
}

fn literal_of(t: Term) -> Option<crate::model::Literal> {
    match t {
        Term::Literal(l) => Some(l),
        _ => None,
    }
}

fn term_partial_cmp(a: &Term, b: &Term) -> Option<Ordering> {
    if let (Term::Literal(la), Term::Literal(lb)) = (a, b) {
        if let (Some(na), Some(nb)) = (
            NumericValue::from_literal(la.as_ref()),
            NumericValue::from_literal(lb.as_ref()),
        ) {
            return na.partial_cmp(nb);
        }
        return Some(la.value().cmp(lb.value()));
    }
    if a == b {
        return Some(Ordering::Equal);
    }
    None
}

fn ground_term_to_term(g: &GroundTerm) -> Term {
    match g {
        GroundTerm::NamedNode(n) => Term::NamedNode(n.clone()),
        GroundTerm::Literal(l) => Term::Literal(l.clone()),
    }
}

/// Resolves a [`TermPattern`]'s already-bound value, or `None` for an
/// unbound variable / blank node placeholder (both act as wildcards in a
/// scan).
fn resolve_term_pattern(pattern: &TermPattern, row: &Bindings) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(n) => Some(Term::NamedNode(n.clone())),
        TermPattern::Literal(l) => Some(Term::Literal(l.clone())),
        TermPattern::BlankNode(_) => None,
        TermPattern::Variable(v) => row.get(v).cloned(),
    }
}

/// Binds `pattern` to `value` in `row`. Returns `false` if `pattern` is
/// already bound to something else (an incompatible join).
fn bind_term_pattern(pattern: &TermPattern, value: &Term, row: &mut Bindings) -> bool {
    match pattern {
        TermPattern::NamedNode(n) => Term::NamedNode(n.clone()) == *value,
        TermPattern::Literal(l) => Term::Literal(l.clone()) == *value,
        TermPattern::BlankNode(_) => true,
        TermPattern::Variable(v) => match row.get(v) {
            Some(existing) => existing == value,
            None => {
                row.insert(v.clone(), value.clone());
                true
            }
        },
    }
}

fn compatible_and_overlapping(a: &Bindings, b: &Bindings) -> bool {
    let mut overlap = false;
    for (k, v) in a {
        if let Some(v2) = b.get(k) {
            overlap = true;
            if v != v2 {
                return false;
            }
        }
    }
    overlap
}

fn dedup(rows: Vec<Bindings>) -> Vec<Bindings> {
    let mut seen: FxHashSet<Vec<(Variable, Term)>> = FxHashSet::default();
    let mut out = Vec::new();
    for row in rows {
        let mut key: Vec<(Variable, Term)> = row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        key.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        if seen.insert(key) {
            out.push(row);
        }
    }
    out
}

/// A variable shared by *every* triple pattern in the BGP — a "star": one
/// variable all patterns join on. Anything else, including chains (where
/// consecutive patterns share a variable but no single variable occurs in
/// every pattern), is left to the left-deep planner, which handles them
/// just as well via cardinality ordering — and correctly, since the star
/// intersection in `eval_star_bgp` is only valid when every pattern
/// contributes a candidate value for the shared variable.
fn star_variable(patterns: &[TriplePattern]) -> Option<Variable> {
    let mut counts: FxHashMap<&Variable, usize> = FxHashMap::default();
    for p in patterns {
        let mut vars_in_pattern = FxHashSet::default();
        if let TermPattern::Variable(v) = &p.subject {
            vars_in_pattern.insert(v);
        }
        if let NamedNodePattern::Variable(v) = &p.predicate {
            vars_in_pattern.insert(v);
        }
        if let TermPattern::Variable(v) = &p.object {
            vars_in_pattern.insert(v);
        }
        for v in vars_in_pattern {
            *counts.entry(v).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n == patterns.len())
        .max_by_key(|(_, n)| *n)
        .map(|(v, _)| v.clone())
}
