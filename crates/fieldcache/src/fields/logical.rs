use crate::error::Result;
use crate::field::{EvaluationContext, FieldCore};

/// Component-wise logical operators; non-zero is true, results are 1.0 or 0.0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
    Not,
    EqualTo,
    LessThan,
    GreaterThan,
}

impl LogicalOperator {
    /// Number of source fields the operator takes
    pub fn arity(self) -> usize {
        match self {
            Self::Not => 1,
            _ => 2,
        }
    }

    fn apply(self, a: f64, b: f64) -> bool {
        match self {
            Self::And => a != 0.0 && b != 0.0,
            Self::Or => a != 0.0 || b != 0.0,
            Self::Xor => (a != 0.0) != (b != 0.0),
            Self::Not => a == 0.0,
            Self::EqualTo => a == b,
            Self::LessThan => a < b,
            Self::GreaterThan => a > b,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "not",
            Self::EqualTo => "equal_to",
            Self::LessThan => "less_than",
            Self::GreaterThan => "greater_than",
        }
    }
}

#[derive(Debug)]
pub struct LogicalField {
    operator: LogicalOperator,
}

impl LogicalField {
    pub fn new(operator: LogicalOperator) -> Self {
        Self { operator }
    }
}

impl FieldCore for LogicalField {
    fn type_name(&self) -> &'static str {
        self.operator.type_name()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        let a = ctx.evaluate_source(0)?;
        let b = if self.operator.arity() == 2 {
            ctx.evaluate_source(1)?
        } else {
            vec![0.0; a.len()]
        };
        for ((value, a), b) in values.iter_mut().zip(&a).zip(&b) {
            *value = if self.operator.apply(*a, *b) { 1.0 } else { 0.0 };
        }
        Ok(())
    }
}
