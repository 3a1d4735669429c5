//! Row-wise evaluation.
//!
//! Null propagates through arithmetic, comparisons and string functions.
//! `and`/`or` follow three-valued logic, so `false and null` is `false`.

use std::cmp::Ordering;

use tlf_core::{Dataset, Value};

use super::parser::{BinaryOp, Expr, Func};
use crate::error::DerivationError;

pub struct Evaluator<'a> {
    pub dataset: &'a Dataset,
    pub source: &'a str,
}

impl Evaluator<'_> {
    fn overflow(&self) -> DerivationError {
        DerivationError::Overflow {
            expr: self.source.to_string(),
        }
    }

    pub fn eval(&self, expr: &Expr, row: usize) -> Result<Value, DerivationError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Column(name) => self
                .dataset
                .column(name)
                .map(|c| c.get(row).clone())
                .ok_or_else(|| DerivationError::UnknownColumn {
                    column: name.clone(),
                }),
            Expr::Neg(inner) => match self.eval(inner, row)? {
                Value::Int(v) => v.checked_neg().map(Value::Int).ok_or_else(|| self.overflow()),
                Value::Float(v) => Ok(Value::Float(-v)),
                _ => Ok(Value::Null),
            },
            Expr::Not(inner) => Ok(match self.eval(inner, row)? {
                Value::Bool(b) => Value::Bool(!b),
                _ => Value::Null,
            }),
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => self.logical(left, right, row, false),
                BinaryOp::Or => self.logical(left, right, row, true),
                op => {
                    let l = self.eval(left, row)?;
                    let r = self.eval(right, row)?;
                    if l.is_null() || r.is_null() {
                        return Ok(Value::Null);
                    }
                    if op.is_comparison() {
                        Ok(Value::Bool(compare(*op, l.cmp(&r))))
                    } else {
                        self.arithmetic(*op, l, r)
                    }
                }
            },
            Expr::In {
                expr,
                list,
                negated,
            } => {
                let needle = self.eval(expr, row)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for item in list {
                    let candidate = self.eval(item, row)?;
                    if candidate.is_null() {
                        saw_null = true;
                    } else if candidate == needle {
                        return Ok(Value::Bool(!negated));
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Bool(*negated)
                })
            }
            Expr::Call { func, args } => self.call(*func, args, row),
        }
    }

    /// `and` when `short` is false, `or` when it is true: `short` on either
    /// side decides the result regardless of nulls.
    fn logical(
        &self,
        left: &Expr,
        right: &Expr,
        row: usize,
        short: bool,
    ) -> Result<Value, DerivationError> {
        let l = self.eval(left, row)?.as_bool();
        if l == Some(short) {
            return Ok(Value::Bool(short));
        }
        let r = self.eval(right, row)?.as_bool();
        Ok(match (l, r) {
            (_, Some(b)) if b == short => Value::Bool(short),
            (Some(_), Some(_)) => Value::Bool(!short),
            _ => Value::Null,
        })
    }

    fn arithmetic(&self, op: BinaryOp, l: Value, r: Value) -> Result<Value, DerivationError> {
        match (op, l, r) {
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (BinaryOp::Div, l, r) => match (l.as_f64(), r.as_f64()) {
                (Some(_), Some(d)) if d == 0.0 => Ok(Value::Null),
                (Some(n), Some(d)) => Ok(Value::Float(n / d)),
                _ => Ok(Value::Null),
            },
            (op, Value::Int(a), Value::Int(b)) => {
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    _ => None,
                };
                result.map(Value::Int).ok_or_else(|| self.overflow())
            }
            (op, l, r) => {
                let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                    return Ok(Value::Null);
                };
                Ok(Value::Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    _ => a * b,
                }))
            }
        }
    }

    fn call(&self, func: Func, args: &[Expr], row: usize) -> Result<Value, DerivationError> {
        let first = match args.first() {
            Some(arg) => self.eval(arg, row)?,
            None => Value::Null,
        };
        Ok(match func {
            Func::Upper => map_str(first, str::to_uppercase),
            Func::Lower => map_str(first, str::to_lowercase),
            Func::Titlecase => map_str(first, titlecase),
            Func::IsNull => Value::Bool(first.is_null()),
            Func::Coalesce => {
                if !first.is_null() {
                    return Ok(first);
                }
                for arg in args.iter().skip(1) {
                    let value = self.eval(arg, row)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Value::Null
            }
            Func::Abs => match first {
                Value::Int(v) => v.checked_abs().map(Value::Int).ok_or_else(|| self.overflow())?,
                Value::Float(v) => Value::Float(v.abs()),
                _ => Value::Null,
            },
            Func::Round => {
                let digits = match args.get(1) {
                    Some(Expr::Literal(Value::Int(d))) => i32::try_from(*d).unwrap_or(0),
                    _ => 0,
                };
                first
                    .as_f64()
                    .map_or(Value::Null, |v| Value::Float(round_half_away(v, digits)))
            }
        })
    }
}

const fn compare(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering.is_eq(),
        BinaryOp::NotEq => ordering.is_ne(),
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Str(s) => Value::Str(f(&s)),
        _ => Value::Null,
    }
}

/// Decimal places beyond which a value is returned unrounded.
const MAX_ROUND_DIGITS: usize = 20;

/// Round to `digits` decimals, halves away from zero.
///
/// Ties are decided on the shortest decimal form of `value`, so `2.675`
/// rounds to `2.68` even though its binary value sits just below the tie.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn round_half_away(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let Ok(places) = usize::try_from(digits) else {
        // Powers of ten are exact, so an integer tie like 25 / 10 stays a tie.
        let scale = 10f64.powi(-digits);
        return (value / scale).round() * scale;
    };

    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((&text, ""));
    if fraction.len() <= places {
        return value;
    }
    if places > MAX_ROUND_DIGITS || whole.len() > 15 {
        let scale = 10f64.powi(digits);
        return (value * scale).round() / scale;
    }

    let Ok(mut mantissa) = format!("{whole}{}", &fraction[..places]).parse::<u128>() else {
        return value;
    };
    if fraction.as_bytes()[places] >= b'5' {
        mantissa += 1;
    }
    if mantissa == 0 {
        return 0.0;
    }
    let rounded = mantissa as f64 / 10f64.powi(digits);
    rounded.copysign(value)
}

/// Capitalise the first letter of every word and lowercase the rest.
///
/// A word starts at any letter not preceded by a letter, so
/// `"NERVOUS SYSTEM DISORDERS"` becomes `"Nervous System Disorders"` and
/// `"mild-moderate"` becomes `"Mild-Moderate"`.
#[must_use]
pub fn titlecase(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tlf_core::{Column, DataType, DatasetId};

    use super::*;
    use crate::expr::parser::parse;

    fn row() -> Dataset {
        Dataset::new(
            DatasetId::new("adae", "0"),
            vec![
                Column::new("AGE", DataType::Int, vec![Value::Int(70)]).expect("col"),
                Column::new("AESER", DataType::Str, vec![Value::Null]).expect("col"),
                Column::new("AEDECOD", DataType::Str, vec!["HEADACHE".into()]).expect("col"),
                Column::new("BIG", DataType::Int, vec![Value::Int(i64::MAX)]).expect("col"),
            ],
        )
        .expect("dataset")
    }

    fn eval(source: &str) -> Result<Value, DerivationError> {
        let dataset = row();
        let evaluator = Evaluator {
            dataset: &dataset,
            source,
        };
        evaluator.eval(&parse(source)?, 0)
    }

    #[rstest]
    #[case("AGE + 5", Value::Int(75))]
    #[case("AGE / 4", Value::Float(17.5))]
    #[case("AGE / 0", Value::Null)]
    #[case("AGE >= 65", Value::Bool(true))]
    #[case("AGE == 70.0", Value::Bool(true))]
    #[case("AESER == 'Y'", Value::Null)]
    #[case("AESER == 'Y' and AGE < 18", Value::Bool(false))]
    #[case("AESER == 'Y' or AGE > 18", Value::Bool(true))]
    #[case("AESER == 'Y' or AGE < 18", Value::Null)]
    #[case("not (AGE < 18)", Value::Bool(true))]
    #[case("AEDECOD in ('NAUSEA', 'HEADACHE')", Value::Bool(true))]
    #[case("AEDECOD not in ('NAUSEA')", Value::Bool(true))]
    #[case("AGE in (1, null)", Value::Null)]
    #[case("is_null(AESER)", Value::Bool(true))]
    #[case("coalesce(AESER, 'N')", Value::Str("N".into()))]
    #[case("titlecase(AEDECOD)", Value::Str("Headache".into()))]
    #[case("lower(AESER)", Value::Null)]
    #[case("round(AGE / 3, 2)", Value::Float(23.33))]
    #[case("abs(-AGE)", Value::Int(70))]
    fn evaluates(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(eval(source).expect("eval"), expected);
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert!(matches!(eval("BIG + 1"), Err(DerivationError::Overflow { .. })));
    }

    #[rstest]
    #[case(2.25, 1, 2.3)]
    #[case(-2.25, 1, -2.3)]
    #[case(0.05, 1, 0.1)]
    #[case(12.5, 0, 13.0)]
    #[case(2.675, 2, 2.68)]
    #[case(-1.005, 2, -1.01)]
    #[case(1.0049, 2, 1.0)]
    #[case(66.666_666_666_666_67, 1, 66.7)]
    #[case(25.0, -1, 30.0)]
    #[case(3.0, 2, 3.0)]
    fn rounds_half_away_from_zero(#[case] value: f64, #[case] digits: i32, #[case] expected: f64) {
        assert!((round_half_away(value, digits) - expected).abs() < 1e-12);
    }

    #[test]
    fn titlecase_words() {
        assert_eq!(titlecase("NERVOUS SYSTEM DISORDERS"), "Nervous System Disorders");
        assert_eq!(titlecase("skin and subcutaneous"), "Skin And Subcutaneous");
        assert_eq!(titlecase("mild-moderate"), "Mild-Moderate");
    }
}
