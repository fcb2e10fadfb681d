use crate::cache::FieldCache;
use crate::config::FieldModuleConfig;
use crate::error::{FieldCacheError, Result};
use crate::field::{self, EvaluationContext, EvaluationScope, Field, FieldCore};
use crate::fields::{
    ArithmeticField, ArithmeticOperator, CompositeComponent, CompositeField, ConstantField,
    FiniteElementField, LogicalField, LogicalOperator, TimeValueField, XiCoordinatesField,
};
use crate::region::Region;
use crate::types::FieldId;

/// Entry point for creating, evaluating and assigning the fields of one
/// region, and for creating the caches they are evaluated against
#[derive(Debug, Clone)]
pub struct FieldModule {
    region: Region,
    config: FieldModuleConfig,
}

impl FieldModule {
    pub fn new(region: &Region) -> Self {
        Self {
            region: region.clone(),
            config: FieldModuleConfig::default(),
        }
    }

    pub fn with_config(region: &Region, config: FieldModuleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            region: region.clone(),
            config,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn config(&self) -> &FieldModuleConfig {
        &self.config
    }

    /// New cache at the configured initial time, generation 0
    pub fn create_cache(&self) -> FieldCache {
        FieldCache::new(&self.region.inner, &self.config)
    }

    /// Add a field of an external type. An empty `name` gets an automatic one.
    ///
    /// # Errors
    ///
    /// Fails if a source is not in this region, the name is taken, or
    /// `number_of_components` is 0.
    pub fn create_field(
        &self,
        name: &str,
        number_of_components: usize,
        sources: &[FieldId],
        core: Box<dyn FieldCore>,
    ) -> Result<FieldId> {
        self.region.add_field(Field::new(
            name.to_string(),
            number_of_components,
            sources.to_vec(),
            core,
        ))
    }

    pub fn create_constant(&self, name: &str, values: &[f64]) -> Result<FieldId> {
        self.create_field(name, values.len(), &[], Box::new(ConstantField::new(values)))
    }

    pub fn create_composite(
        &self,
        name: &str,
        sources: &[FieldId],
        components: Vec<CompositeComponent>,
    ) -> Result<FieldId> {
        let source_components = sources
            .iter()
            .map(|&source| {
                self.region
                    .number_of_components(source)
                    .ok_or(FieldCacheError::UnknownField(source))
            })
            .collect::<Result<Vec<_>>>()?;
        let core = CompositeField::new(components, &source_components)?;
        self.create_field(name, core.number_of_components(), sources, Box::new(core))
    }

    /// Single component (0-based) of `source`
    pub fn create_component(&self, name: &str, source: FieldId, component: usize) -> Result<FieldId> {
        self.create_composite(
            name,
            &[source],
            vec![CompositeComponent::Source {
                source: 0,
                component,
            }],
        )
    }

    pub fn create_arithmetic(
        &self,
        name: &str,
        operator: ArithmeticOperator,
        a: FieldId,
        b: FieldId,
    ) -> Result<FieldId> {
        let components = self.matching_components(a, b)?;
        self.create_field(name, components, &[a, b], Box::new(ArithmeticField::new(operator)))
    }

    pub fn create_add(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_arithmetic(name, ArithmeticOperator::Add, a, b)
    }

    pub fn create_subtract(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_arithmetic(name, ArithmeticOperator::Subtract, a, b)
    }

    pub fn create_multiply(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_arithmetic(name, ArithmeticOperator::Multiply, a, b)
    }

    pub fn create_divide(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_arithmetic(name, ArithmeticOperator::Divide, a, b)
    }

    pub fn create_logical(
        &self,
        name: &str,
        operator: LogicalOperator,
        a: FieldId,
        b: FieldId,
    ) -> Result<FieldId> {
        if operator.arity() != 2 {
            return Err(FieldCacheError::invalid_definition(format!(
                "{operator:?} takes {} source field",
                operator.arity()
            )));
        }
        let components = self.matching_components(a, b)?;
        self.create_field(name, components, &[a, b], Box::new(LogicalField::new(operator)))
    }

    pub fn create_and(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_logical(name, LogicalOperator::And, a, b)
    }

    pub fn create_or(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_logical(name, LogicalOperator::Or, a, b)
    }

    pub fn create_xor(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_logical(name, LogicalOperator::Xor, a, b)
    }

    pub fn create_equal_to(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_logical(name, LogicalOperator::EqualTo, a, b)
    }

    pub fn create_less_than(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_logical(name, LogicalOperator::LessThan, a, b)
    }

    pub fn create_greater_than(&self, name: &str, a: FieldId, b: FieldId) -> Result<FieldId> {
        self.create_logical(name, LogicalOperator::GreaterThan, a, b)
    }

    pub fn create_not(&self, name: &str, source: FieldId) -> Result<FieldId> {
        let components = self
            .region
            .number_of_components(source)
            .ok_or(FieldCacheError::UnknownField(source))?;
        self.create_field(
            name,
            components,
            &[source],
            Box::new(LogicalField::new(LogicalOperator::Not)),
        )
    }

    /// Nodal field; values are assigned per node with [`Self::assign_real`]
    pub fn create_finite_element(&self, name: &str, number_of_components: usize) -> Result<FieldId> {
        self.create_field(
            name,
            number_of_components,
            &[],
            Box::new(FiniteElementField::new()),
        )
    }

    pub fn create_xi_coordinates(&self, name: &str) -> Result<FieldId> {
        self.create_field(
            name,
            XiCoordinatesField::NUMBER_OF_COMPONENTS,
            &[],
            Box::new(XiCoordinatesField),
        )
    }

    pub fn create_time_value(&self, name: &str) -> Result<FieldId> {
        self.create_field(name, 1, &[], Box::new(TimeValueField))
    }

    /// Values of `field` at the cache's location, memoized per location-set.
    ///
    /// # Errors
    ///
    /// Fails if the field or cache is not from this module's region, or the
    /// field (or one of its sources) is not defined at the location.
    pub fn evaluate_real(&self, field: FieldId, cache: &FieldCache) -> Result<Vec<f64>> {
        self.check(field, cache)?;
        self.with_scope(cache, |scope| field::evaluate_field(scope, field, 0))
    }

    pub fn is_defined_at_location(&self, field: FieldId, cache: &FieldCache) -> bool {
        self.check(field, cache).is_ok()
            && self.with_scope(cache, |scope| field::field_is_defined(scope, field, 0))
    }

    /// Assign `values` to `field` at the cache's location.
    ///
    /// Stored assignments clear the value caches of the field and everything
    /// computed from it, for every cache. With the cache's assign-in-cache-only
    /// flag set, only this cache's memoized values are cleared and the values
    /// replace the field's memoized value for the current location-set; other
    /// caches never see them.
    ///
    /// # Errors
    ///
    /// Fails on a value count mismatch, or if the field type cannot be
    /// assigned at the current location.
    pub fn assign_real(&self, field: FieldId, cache: &FieldCache, values: &[f64]) -> Result<()> {
        self.check(field, cache)?;
        let in_cache_only = cache.assign_in_cache_only();
        self.with_scope(cache, |scope| {
            let target = &scope.fields[field.index()];
            if values.len() != target.number_of_components {
                return Err(FieldCacheError::ValueCountMismatch {
                    expected: target.number_of_components,
                    actual: values.len(),
                });
            }
            let ctx = EvaluationContext::new(scope, field, target, 0);
            if !target.core.can_assign_at_location(&ctx) {
                return Err(FieldCacheError::NotAssignable(target.name.clone()));
            }
            if in_cache_only {
                Ok(())
            } else {
                target.core.assign(&ctx, values)
            }
        })?;

        let region = &self.region.inner;
        let scope = in_cache_only.then(|| cache.id());
        let cleared = region.clear_dependent_value_caches(field, scope);
        if in_cache_only {
            region.fields.borrow()[field.index()].store_values(cache.id(), cache.generation(), values);
        }
        log::debug!(
            "Assigned {field} at {} location (in cache only: {in_cache_only}); cleared {cleared} value caches",
            cache.location().kind()
        );
        Ok(())
    }

    /// Run `f` with the region's fields and mesh borrowed for one evaluation
    /// pass against `cache`
    fn with_scope<T>(&self, cache: &FieldCache, f: impl FnOnce(&EvaluationScope<'_>) -> T) -> T {
        let region = &self.region.inner;
        let state = cache.state();
        let fields = region.fields.borrow();
        let mesh = region.mesh.borrow();
        let scope = EvaluationScope {
            cache: cache.id(),
            generation: state.generation,
            location: &state.location,
            fields: &fields,
            mesh: &mesh,
            max_depth: self.config.max_evaluation_depth,
        };
        f(&scope)
    }

    fn check(&self, field: FieldId, cache: &FieldCache) -> Result<()> {
        if !cache.belongs_to(&self.region.inner) || field.region != self.region.inner.tag {
            return Err(FieldCacheError::RegionMismatch(field));
        }
        if !self.region.inner.contains_field(field) {
            return Err(FieldCacheError::UnknownField(field));
        }
        Ok(())
    }

    fn matching_components(&self, a: FieldId, b: FieldId) -> Result<usize> {
        let a_components = self
            .region
            .number_of_components(a)
            .ok_or(FieldCacheError::UnknownField(a))?;
        let b_components = self
            .region
            .number_of_components(b)
            .ok_or(FieldCacheError::UnknownField(b))?;
        if a_components != b_components {
            return Err(FieldCacheError::invalid_definition(format!(
                "source fields have {a_components} and {b_components} components"
            )));
        }
        Ok(a_components)
    }
}
