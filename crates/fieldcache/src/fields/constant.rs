use crate::error::{FieldCacheError, Result};
use crate::field::{EvaluationContext, FieldCore};
use std::cell::RefCell;

/// Same values at every location; reassignable
#[derive(Debug)]
pub struct ConstantField {
    values: RefCell<Vec<f64>>,
}

impl ConstantField {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: RefCell::new(values.to_vec()),
        }
    }

    fn check_count(&self, actual: usize) -> Result<()> {
        let expected = self.values.borrow().len();
        if expected != actual {
            return Err(FieldCacheError::ValueCountMismatch { expected, actual });
        }
        Ok(())
    }
}

impl FieldCore for ConstantField {
    fn type_name(&self) -> &'static str {
        "constant"
    }

    fn evaluate(&self, _ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        self.check_count(values.len())?;
        values.copy_from_slice(&self.values.borrow());
        Ok(())
    }

    fn is_defined_at_location(&self, _ctx: &EvaluationContext<'_>) -> bool {
        true
    }

    fn can_assign_at_location(&self, _ctx: &EvaluationContext<'_>) -> bool {
        true
    }

    fn assign(&self, _ctx: &EvaluationContext<'_>, values: &[f64]) -> Result<()> {
        self.check_count(values.len())?;
        self.values.borrow_mut().copy_from_slice(values);
        Ok(())
    }
}
