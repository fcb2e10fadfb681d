use crate::error::{FieldCacheError, Result};
use crate::field::{EvaluationContext, FieldCore};

/// Where one component of a composite field comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositeComponent {
    /// Component `component` (0-based) of source field `source`
    Source { source: usize, component: usize },

    /// A literal value
    Value(f64),
}

/// Concatenation of source components and literal values
#[derive(Debug)]
pub struct CompositeField {
    components: Vec<CompositeComponent>,
}

impl CompositeField {
    /// Check `components` against the component counts of the sources
    pub fn new(components: Vec<CompositeComponent>, source_components: &[usize]) -> Result<Self> {
        if components.is_empty() {
            return Err(FieldCacheError::invalid_definition(
                "composite field needs at least one component",
            ));
        }
        for component in &components {
            if let CompositeComponent::Source { source, component } = *component {
                let available = source_components.get(source).copied().ok_or_else(|| {
                    FieldCacheError::invalid_definition(format!("composite source {source} does not exist"))
                })?;
                if component >= available {
                    return Err(FieldCacheError::invalid_definition(format!(
                        "composite source {source} has {available} components, component {component} requested"
                    )));
                }
            }
        }
        Ok(Self { components })
    }

    pub fn number_of_components(&self) -> usize {
        self.components.len()
    }
}

impl FieldCore for CompositeField {
    fn type_name(&self) -> &'static str {
        "composite"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        if values.len() != self.components.len() {
            return Err(FieldCacheError::ValueCountMismatch {
                expected: self.components.len(),
                actual: values.len(),
            });
        }
        let mut source_values: Vec<Option<Vec<f64>>> = vec![None; ctx.source_count()];
        for (value, component) in values.iter_mut().zip(&self.components) {
            *value = match *component {
                CompositeComponent::Value(literal) => literal,
                CompositeComponent::Source { source, component } => {
                    let cached = match source_values.get_mut(source) {
                        Some(Some(cached)) => cached,
                        Some(slot) => slot.insert(ctx.evaluate_source(source)?),
                        None => {
                            return Err(FieldCacheError::invalid_definition(format!(
                                "composite field '{}' has no source {source}",
                                ctx.field_name()
                            )))
                        }
                    };
                    cached.get(component).copied().ok_or_else(|| {
                        FieldCacheError::invalid_definition(format!(
                            "composite field '{}': source {source} has no component {component}",
                            ctx.field_name()
                        ))
                    })?
                }
            };
        }
        Ok(())
    }
}
