//! Fields whose value is read straight off the location.

use crate::error::{FieldCacheError, Result};
use crate::field::{EvaluationContext, FieldCore};
use crate::types::MAXIMUM_ELEMENT_XI_DIMENSIONS;

/// Chart coordinates of an element location, padded with zeros to
/// three components
#[derive(Debug, Default)]
pub struct XiCoordinatesField;

impl XiCoordinatesField {
    pub const NUMBER_OF_COMPONENTS: usize = MAXIMUM_ELEMENT_XI_DIMENSIONS;
}

impl FieldCore for XiCoordinatesField {
    fn type_name(&self) -> &'static str {
        "xi_coordinates"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        let chart = ctx.location().chart().ok_or_else(|| ctx.not_defined())?;
        let dimension = chart.dimension();
        if values.len() < dimension {
            return Err(FieldCacheError::ValueCountMismatch {
                expected: dimension,
                actual: values.len(),
            });
        }
        let (xi, padding) = values.split_at_mut(dimension);
        xi.copy_from_slice(chart.as_slice());
        padding.fill(0.0);
        Ok(())
    }

    fn is_defined_at_location(&self, ctx: &EvaluationContext<'_>) -> bool {
        ctx.location().chart().is_some()
    }
}

/// Time of the current location
#[derive(Debug, Default)]
pub struct TimeValueField;

impl FieldCore for TimeValueField {
    fn type_name(&self) -> &'static str {
        "time_value"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        values.fill(ctx.time());
        Ok(())
    }

    fn is_defined_at_location(&self, _ctx: &EvaluationContext<'_>) -> bool {
        true
    }
}
