use crate::error::Result;
use crate::field::{EvaluationContext, FieldCore};

/// Component-wise binary arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }
}

/// `source0 <op> source1`, both with the field's component count
#[derive(Debug)]
pub struct ArithmeticField {
    operator: ArithmeticOperator,
}

impl ArithmeticField {
    pub fn new(operator: ArithmeticOperator) -> Self {
        Self { operator }
    }
}

impl FieldCore for ArithmeticField {
    fn type_name(&self) -> &'static str {
        self.operator.type_name()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        let a = ctx.evaluate_source(0)?;
        let b = ctx.evaluate_source(1)?;
        for ((value, a), b) in values.iter_mut().zip(&a).zip(&b) {
            *value = self.operator.apply(*a, *b);
        }
        Ok(())
    }
}
