use crate::error::{FieldCacheError, Result};
use crate::field::{EvaluationContext, FieldCore};
use crate::location::Location;
use crate::types::{Element, NodeId};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Field with parameters stored at nodes and interpolated over elements
/// with a linear Lagrange basis
#[derive(Debug, Default)]
pub struct FiniteElementField {
    parameters: RefCell<BTreeMap<NodeId, Vec<f64>>>,
}

impl FiniteElementField {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_defined_on_element(&self, element: &Element) -> bool {
        let parameters = self.parameters.borrow();
        element.has_nodes() && element.nodes.iter().all(|node| parameters.contains_key(node))
    }

    /// Blend node parameters with the tensor product of 1-D linear weights;
    /// local node `k` sits at xi_i = bit i of `k`
    fn interpolate(&self, element: &Element, xi: &[f64], values: &mut [f64]) -> bool {
        let parameters = self.parameters.borrow();
        values.fill(0.0);
        for (local, node) in element.nodes.iter().enumerate() {
            let Some(node_values) = parameters.get(node) else {
                return false;
            };
            let weight: f64 = xi
                .iter()
                .enumerate()
                .map(|(i, &x)| if local & (1 << i) != 0 { x } else { 1.0 - x })
                .product();
            for (value, parameter) in values.iter_mut().zip(node_values) {
                *value += weight * parameter;
            }
        }
        true
    }
}

impl FieldCore for FiniteElementField {
    fn type_name(&self) -> &'static str {
        "finite_element"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        match ctx.location() {
            Location::Node { node, .. } => {
                let parameters = self.parameters.borrow();
                let node_values = parameters.get(node).ok_or_else(|| ctx.not_defined())?;
                if node_values.len() != values.len() {
                    return Err(FieldCacheError::ValueCountMismatch {
                        expected: values.len(),
                        actual: node_values.len(),
                    });
                }
                values.copy_from_slice(node_values);
                Ok(())
            }
            Location::Element { element, chart, .. } => {
                let element = ctx.element(*element).ok_or_else(|| ctx.not_defined())?;
                if element.has_nodes() && self.interpolate(element, chart.as_slice(), values) {
                    Ok(())
                } else {
                    Err(ctx.not_defined())
                }
            }
            Location::Time { .. } | Location::FieldValues { .. } => Err(ctx.not_defined()),
        }
    }

    fn is_defined_at_location(&self, ctx: &EvaluationContext<'_>) -> bool {
        match ctx.location() {
            Location::Node { node, .. } => self.parameters.borrow().contains_key(node),
            Location::Element { element, .. } => ctx
                .element(*element)
                .is_some_and(|element| self.is_defined_on_element(element)),
            Location::Time { .. } | Location::FieldValues { .. } => false,
        }
    }

    fn can_assign_at_location(&self, ctx: &EvaluationContext<'_>) -> bool {
        matches!(ctx.location(), Location::Node { .. })
    }

    fn assign(&self, ctx: &EvaluationContext<'_>, values: &[f64]) -> Result<()> {
        let node = ctx.location().node().ok_or_else(|| ctx.not_defined())?;
        self.parameters.borrow_mut().insert(node, values.to_vec());
        Ok(())
    }
}
