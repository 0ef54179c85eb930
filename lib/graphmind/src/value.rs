//! The term/value layer: xsd coercion for FILTER arithmetic and ORDER BY,
//! built on [`oxsdatatypes`] for exact-precision numeric handling.
//!
//! Numeric promotion follows SPARQL: `integer -> decimal -> float -> double`.
//! A cast that cannot succeed produces [`None`] rather than panicking; call
//! sites turn that into a dropped FILTER row or an unbound BIND target
//!, never into a fatal error.

use crate::model::{Literal, LiteralRef, NamedNodeRef, Term};
use oxsdatatypes::{Boolean, Date, DateTime, Decimal, Double, Float, Integer};
use std::cmp::Ordering;

pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

/// A dynamically-typed numeric value, promoted to the widest of its two
/// operands per SPARQL's `integer -> decimal -> float -> double` ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
}

impl NumericValue {
    /// Parses a literal's lexical form under its datatype as a numeric
    /// value. Returns `None` for non-numeric datatypes or malformed lexical
    /// forms — a `TypeError` at the call site.
    pub fn from_literal(literal: LiteralRef<'_>) -> Option<Self> {
        let lex = literal.value();
        match literal.datatype().as_str() {
            xsd::INTEGER => lex.parse::<Integer>().ok().map(Self::Integer),
            xsd::DECIMAL => lex.parse::<Decimal>().ok().map(Self::Decimal),
            xsd::FLOAT => lex.parse::<Float>().ok().map(Self::Float),
            xsd::DOUBLE => lex.parse::<Double>().ok().map(Self::Double),
            _ => None,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::Integer(v) => f64::from(Double::from(v)),
            Self::Decimal(v) => f64::from(Double::from(v)),
            Self::Float(v) => f64::from(Double::from(v)),
            Self::Double(v) => f64::from(v),
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Decimal(_) => 1,
            Self::Float(_) => 2,
            Self::Double(_) => 3,
        }
    }

    /// Promotes `(self, other)` to a common type per the SPARQL numeric
    /// promotion ladder, widening the narrower operand.
    pub fn promote(self, other: Self) -> (Self, Self) {
        let target = self.rank().max(other.rank());
        (self.widen_to(target), other.widen_to(target))
    }

    fn widen_to(self, rank: u8) -> Self {
        match (self, rank) {
            (v, r) if v.rank() == r => v,
            (Self::Integer(v), 1) => Self::Decimal(Decimal::from(v)),
            (Self::Integer(v), 2) => Self::Float(Float::from(v)),
            (Self::Integer(v), 3) => Self::Double(Double::from(v)),
            (Self::Decimal(v), 2) => Self::Float(Float::from(Double::from(v))),
            (Self::Decimal(v), 3) => Self::Double(Double::from(v)),
            (Self::Float(v), 3) => Self::Double(Double::from(v)),
            (v, _) => v,
        }
    }

    pub fn add(self, other: Self) -> Option<Self> {
        let (a, b) = self.promote(other);
        Some(match (a, b) {
            (Self::Integer(x), Self::Integer(y)) => Self::Integer(x.checked_add(y)?),
            (Self::Decimal(x), Self::Decimal(y)) => Self::Decimal(x.checked_add(y)?),
            (Self::Float(x), Self::Float(y)) => Self::Float(x + y),
            (Self::Double(x), Self::Double(y)) => Self::Double(x + y),
            _ => unreachable!("promote equalizes ranks"),
        })
    }

    pub fn sub(self, other: Self) -> Option<Self> {
        let (a, b) = self.promote(other);
        Some(match (a, b) {
            (Self::Integer(x), Self::Integer(y)) => Self::Integer(x.checked_sub(y)?),
            (Self::Decimal(x), Self::Decimal(y)) => Self::Decimal(x.checked_sub(y)?),
            (Self::Float(x), Self::Float(y)) => Self::Float(x - y),
            (Self::Double(x), Self::Double(y)) => Self::Double(x - y),
            _ => unreachable!("promote equalizes ranks"),
        })
    }

    pub fn mul(self, other: Self) -> Option<Self> {
        let (a, b) = self.promote(other);
        Some(match (a, b) {
            (Self::Integer(x), Self::Integer(y)) => Self::Integer(x.checked_mul(y)?),
            (Self::Decimal(x), Self::Decimal(y)) => Self::Decimal(x.checked_mul(y)?),
            (Self::Float(x), Self::Float(y)) => Self::Float(x * y),
            (Self::Double(x), Self::Double(y)) => Self::Double(x * y),
            _ => unreachable!("promote equalizes ranks"),
        })
    }

    /// Division. `None` on division by zero for integer/decimal (a
    /// type-error in FILTER/BIND); float/double division by zero follows
    /// IEEE 754 (±inf/NaN), which SPARQL accepts as a value, not an error.
    pub fn div(self, other: Self) -> Option<Self> {
        let (a, b) = self.promote(other);
        Some(match (a, b) {
            (Self::Integer(x), Self::Integer(y)) => {
                Self::Decimal(Decimal::from(x).checked_div(Decimal::from(y))?)
            }
            (Self::Decimal(x), Self::Decimal(y)) => Self::Decimal(x.checked_div(y)?),
            (Self::Float(x), Self::Float(y)) => Self::Float(x / y),
            (Self::Double(x), Self::Double(y)) => Self::Double(x / y),
            _ => unreachable!("promote equalizes ranks"),
        })
    }

    pub fn neg(self) -> Option<Self> {
        Some(match self {
            Self::Integer(v) => Self::Integer(v.checked_neg()?),
            Self::Decimal(v) => Self::Decimal(v.checked_neg()?),
            Self::Float(v) => Self::Float(-v),
            Self::Double(v) => Self::Double(-v),
        })
    }

    pub fn partial_cmp(self, other: Self) -> Option<Ordering> {
        let (a, b) = self.promote(other);
        match (a, b) {
            (Self::Integer(x), Self::Integer(y)) => Some(x.cmp(&y)),
            (Self::Decimal(x), Self::Decimal(y)) => x.partial_cmp(&y),
            (Self::Float(x), Self::Float(y)) => x.partial_cmp(&y),
            (Self::Double(x), Self::Double(y)) => x.partial_cmp(&y),
            _ => unreachable!("promote equalizes ranks"),
        }
    }

    pub fn to_literal(self) -> Literal {
        match self {
            Self::Integer(v) => Literal::new_typed_literal(v.to_string(), nn(xsd::INTEGER)),
            Self::Decimal(v) => Literal::new_typed_literal(v.to_string(), nn(xsd::DECIMAL)),
            Self::Float(v) => Literal::new_typed_literal(v.to_string(), nn(xsd::FLOAT)),
            Self::Double(v) => Literal::new_typed_literal(v.to_string(), nn(xsd::DOUBLE)),
        }
    }
}

fn nn(iri: &str) -> NamedNodeRef<'_> {
    NamedNodeRef::new_unchecked(iri)
}

/// Attempts to coerce `term` to an `xsd:boolean` effective boolean value, per
/// SPARQL's EBV rules: booleans by value, numerics by non-zero/non-NaN,
/// strings by non-empty lexical form. Other term shapes (IRIs, blank nodes,
/// typed literals outside these families) have no EBV (`None`).
pub fn effective_boolean_value(term: &Term) -> Option<bool> {
    let Term::Literal(lit) = term else {
        return None;
    };
    match lit.datatype().as_str() {
        xsd::BOOLEAN => lit.value().parse::<Boolean>().ok().map(bool::from),
        xsd::STRING => Some(!lit.value().is_empty()),
        _ if lit.is_plain() => Some(!lit.value().is_empty()),
        _ => NumericValue::from_literal(lit.as_ref()).map(|n| match n {
            NumericValue::Integer(v) => v != Integer::from(0),
            NumericValue::Decimal(v) => v != Decimal::from(0),
            NumericValue::Float(v) => f64::from(Double::from(v)) != 0.0 && !v.is_nan(),
            NumericValue::Double(v) => f64::from(v) != 0.0 && !v.is_nan(),
        }),
    }
}

/// Parses an `xsd:dateTime` or `xsd:date` literal for ORDER BY / comparison
/// purposes.
pub fn as_date_time(literal: LiteralRef<'_>) -> Option<DateTime> {
    match literal.datatype().as_str() {
        xsd::DATE_TIME => literal.value().parse().ok(),
        _ => None,
    }
}

pub fn as_date(literal: LiteralRef<'_>) -> Option<Date> {
    match literal.datatype().as_str() {
        xsd::DATE => literal.value().parse().ok(),
        _ => None,
    }
}

/// SPARQL `sameTerm`-style equality: structural, respecting datatype and
/// (case-insensitively per BCP47) language tag — never numeric value
/// equality.
pub fn same_term(a: &Term, b: &Term) -> bool {
    a == b
}

/// SPARQL `=`-style equality for FILTER: numeric literals compare by value;
/// plain/lang-tagged/string literals compare lexically (with language tags
/// folded case-insensitively); everything else falls back to `sameTerm`.
/// `None` when the comparison is a type error (e.g. two literals whose
/// datatypes are incomparable).
pub fn filter_equals(a: &Term, b: &Term) -> Option<bool> {
    if let (Term::Literal(la), Term::Literal(lb)) = (a, b) {
        if let (Some(na), Some(nb)) = (
            NumericValue::from_literal(la.as_ref()),
            NumericValue::from_literal(lb.as_ref()),
        ) {
            return na.partial_cmp(nb).map(|o| o == Ordering::Equal);
        }
        let lang_eq = match (la.language(), lb.language()) {
            (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
            (None, None) => true,
            _ => false,
        };
        return Some(la.datatype() == lb.datatype() && lang_eq && la.value() == lb.value());
    }
    Some(same_term(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Literal;

    #[test]
    fn numeric_promotion_widens_integer_to_double() {
        let i = NumericValue::Integer(Integer::from(2));
        let d = NumericValue::Double(Double::from(1.5));
        let sum = i.add(d).unwrap();
        assert!(matches!(sum, NumericValue::Double(_)));
        assert_eq!(sum.to_f64(), 3.5);
    }

    #[test]
    fn integer_division_by_zero_is_none() {
        let a = NumericValue::Integer(Integer::from(1));
        let z = NumericValue::Integer(Integer::from(0));
        assert!(a.div(z).is_none());
    }

    #[test]
    fn ebv_numeric_zero_is_false() {
        let zero = Term::Literal(Literal::new_typed_literal("0", nn(xsd::INTEGER)));
        assert_eq!(effective_boolean_value(&zero), Some(false));
    }

    #[test]
    fn ebv_nonempty_string_is_true() {
        let s = Term::Literal(Literal::new_simple_literal("x"));
        assert_eq!(effective_boolean_value(&s), Some(true));
    }

    #[test]
    fn filter_equals_is_numeric_for_numerics_but_lexical_for_strings() {
        let one_int = Term::Literal(Literal::new_typed_literal("1", nn(xsd::INTEGER)));
        let one_dec = Term::Literal(Literal::new_typed_literal("1.0", nn(xsd::DECIMAL)));
        assert_eq!(filter_equals(&one_int, &one_dec), Some(true));
        assert_ne!(one_int, one_dec);
    }
}
