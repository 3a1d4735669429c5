//! Static type inference.
//!
//! Runs once per step against the input dataset's schema, so unknown columns
//! and type errors surface before any row is evaluated. `None` stands for
//! the type of a bare `null`, which is compatible with everything.

use tlf_core::{DataType, Dataset, Value};

use super::parser::{BinaryOp, Expr, Func};
use crate::error::DerivationError;

pub struct Checker<'a> {
    pub dataset: &'a Dataset,
    pub source: &'a str,
}

type Inferred = Option<DataType>;

impl Checker<'_> {
    fn mismatch(&self, message: impl Into<String>) -> DerivationError {
        DerivationError::TypeMismatch {
            expr: self.source.to_string(),
            message: message.into(),
        }
    }

    pub fn infer(&self, expr: &Expr) -> Result<Inferred, DerivationError> {
        match expr {
            Expr::Literal(value) => Ok(value.data_type()),
            Expr::Column(name) => self
                .dataset
                .column(name)
                .map(|c| Some(c.dtype()))
                .ok_or_else(|| DerivationError::UnknownColumn {
                    column: name.clone(),
                }),
            Expr::Neg(inner) => {
                let t = self.infer(inner)?;
                self.numeric(t, "unary '-'")?;
                Ok(t)
            }
            Expr::Not(inner) => {
                let t = self.infer(inner)?;
                self.boolean(t, "'not'")?;
                Ok(Some(DataType::Bool))
            }
            Expr::Binary { op, left, right } => {
                let l = self.infer(left)?;
                let r = self.infer(right)?;
                self.binary(*op, l, r)
            }
            Expr::In { expr, list, .. } => {
                let t = self.infer(expr)?;
                for item in list {
                    let item_t = self.infer(item)?;
                    if !comparable(t, item_t) {
                        return Err(self.mismatch(format!(
                            "'in' list mixes {} with {}",
                            describe(t),
                            describe(item_t)
                        )));
                    }
                }
                Ok(Some(DataType::Bool))
            }
            Expr::Call { func, args } => self.call(*func, args),
        }
    }

    fn numeric(&self, t: Inferred, context: &str) -> Result<(), DerivationError> {
        match t {
            None => Ok(()),
            Some(t) if t.is_numeric() => Ok(()),
            Some(t) => Err(self.mismatch(format!("{context} needs a number, found {t}"))),
        }
    }

    fn boolean(&self, t: Inferred, context: &str) -> Result<(), DerivationError> {
        match t {
            None | Some(DataType::Bool) => Ok(()),
            Some(t) => Err(self.mismatch(format!("{context} needs a bool, found {t}"))),
        }
    }

    fn binary(&self, op: BinaryOp, l: Inferred, r: Inferred) -> Result<Inferred, DerivationError> {
        let symbol = op.symbol();
        if op.is_comparison() {
            if !comparable(l, r) {
                return Err(self.mismatch(format!(
                    "cannot compare {} {symbol} {}",
                    describe(l),
                    describe(r)
                )));
            }
            return Ok(Some(DataType::Bool));
        }
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            self.boolean(l, &format!("'{symbol}'"))?;
            self.boolean(r, &format!("'{symbol}'"))?;
            return Ok(Some(DataType::Bool));
        }

        // Arithmetic. String concatenation is the one non-numeric case.
        if op == BinaryOp::Add
            && matches!(l, None | Some(DataType::Str))
            && matches!(r, None | Some(DataType::Str))
            && (l.is_some() || r.is_some())
        {
            return Ok(Some(DataType::Str));
        }
        self.numeric(l, &format!("'{symbol}'"))?;
        self.numeric(r, &format!("'{symbol}'"))?;
        Ok(match (l, r) {
            (None, None) => None,
            _ if op == BinaryOp::Div => Some(DataType::Float),
            (Some(DataType::Float), _) | (_, Some(DataType::Float)) => Some(DataType::Float),
            _ => Some(DataType::Int),
        })
    }

    fn arity(
        &self,
        func: Func,
        args: &[Expr],
        range: (usize, usize),
    ) -> Result<(), DerivationError> {
        let (min, max) = range;
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else if max == usize::MAX {
                format!("at least {min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(self.mismatch(format!(
                "{}() takes {expected} argument(s), got {}",
                func.name(),
                args.len()
            )));
        }
        Ok(())
    }

    fn call(&self, func: Func, args: &[Expr]) -> Result<Inferred, DerivationError> {
        let name = func.name();
        match func {
            Func::Upper | Func::Lower | Func::Titlecase => {
                self.arity(func, args, (1, 1))?;
                match self.infer(&args[0])? {
                    None | Some(DataType::Str) => Ok(Some(DataType::Str)),
                    Some(t) => Err(self.mismatch(format!("{name}() needs a str, found {t}"))),
                }
            }
            Func::IsNull => {
                self.arity(func, args, (1, 1))?;
                self.infer(&args[0])?;
                Ok(Some(DataType::Bool))
            }
            Func::Coalesce => {
                self.arity(func, args, (1, usize::MAX))?;
                let mut result: Inferred = None;
                for arg in args {
                    let t = self.infer(arg)?;
                    if !comparable(result, t) {
                        return Err(self.mismatch(format!(
                            "coalesce() mixes {} with {}",
                            describe(result),
                            describe(t)
                        )));
                    }
                    result = match (result, t) {
                        (None, t) => t,
                        (Some(DataType::Int), Some(DataType::Float)) => Some(DataType::Float),
                        (r, _) => r,
                    };
                }
                Ok(result)
            }
            Func::Abs => {
                self.arity(func, args, (1, 1))?;
                let t = self.infer(&args[0])?;
                self.numeric(t, "abs()")?;
                Ok(t)
            }
            Func::Round => {
                self.arity(func, args, (1, 2))?;
                let t = self.infer(&args[0])?;
                self.numeric(t, "round()")?;
                if let Some(digits) = args.get(1)
                    && !matches!(digits, Expr::Literal(Value::Int(0..=15)))
                {
                    return Err(self.mismatch("round() digits must be an integer literal 0-15"));
                }
                Ok(Some(DataType::Float))
            }
        }
    }
}

/// Whether values of the two types can be compared for equality and order.
fn comparable(a: Inferred, b: Inferred) -> bool {
    match (a, b) {
        (None, _) | (_, None) => true,
        (Some(a), Some(b)) => a == b || (a.is_numeric() && b.is_numeric()),
    }
}

fn describe(t: Inferred) -> &'static str {
    t.map_or("null", DataType::as_str)
}
