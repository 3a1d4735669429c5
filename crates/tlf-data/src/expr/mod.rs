//! Derivation expression language.
//!
//! A small, total language over one row of a dataset:
//!
//! - literals: `42`, `1.5`, `'text'`, `true`, `false`, `null`
//! - columns: `AGE`, or `"COLUMN NAME"` when the name needs quoting
//! - arithmetic `+ - * /` (`+` also concatenates strings; `/` yields float,
//!   division by zero yields null)
//! - comparison `== != < <= > >=`, membership `x in (..)` / `x not in (..)`
//! - logic `and or not` with three-valued null semantics
//! - functions `upper lower titlecase is_null coalesce abs round`
//!
//! Expressions are parsed and type-checked against the input schema before
//! any row is touched.

mod check;
mod eval;
mod lexer;
mod parser;

pub use eval::{round_half_away, titlecase};

use tlf_core::{DataType, Dataset, Value};

use crate::error::DerivationError;
use check::Checker;
use eval::Evaluator;
use parser::Expr;

/// Parse `source` without a schema, reporting syntax errors only.
///
/// # Errors
///
/// [`DerivationError::Parse`].
pub fn check_syntax(source: &str) -> Result<(), DerivationError> {
    parser::parse(source).map(|_| ())
}

/// An expression parsed and checked against a dataset schema.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    ast: Expr,
    dtype: Option<DataType>,
}

impl CompiledExpr {
    /// Parse `source` and infer its type from the columns of `dataset`.
    ///
    /// # Errors
    ///
    /// [`DerivationError::Parse`], [`DerivationError::UnknownColumn`],
    /// [`DerivationError::UnknownFunction`] or [`DerivationError::TypeMismatch`].
    pub fn compile(source: &str, dataset: &Dataset) -> Result<Self, DerivationError> {
        let ast = parser::parse(source)?;
        let dtype = Checker { dataset, source }.infer(&ast)?;
        Ok(Self {
            source: source.to_string(),
            ast,
            dtype,
        })
    }

    /// Result type; `None` only for expressions that are always null.
    #[must_use]
    pub const fn dtype(&self) -> Option<DataType> {
        self.dtype
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate for one row of `dataset`.
    ///
    /// # Errors
    ///
    /// [`DerivationError::Overflow`] on integer overflow, or
    /// [`DerivationError::UnknownColumn`] if `dataset` lacks a column the
    /// expression was compiled against.
    pub fn eval_row(&self, dataset: &Dataset, row: usize) -> Result<Value, DerivationError> {
        Evaluator {
            dataset,
            source: &self.source,
        }
        .eval(&self.ast, row)
    }

    /// Evaluate for every row of `dataset`, in row order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::eval_row`].
    pub fn eval_all(&self, dataset: &Dataset) -> Result<Vec<Value>, DerivationError> {
        let evaluator = Evaluator {
            dataset,
            source: &self.source,
        };
        (0..dataset.row_count())
            .map(|row| evaluator.eval(&self.ast, row))
            .collect()
    }
}
