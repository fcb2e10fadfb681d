//! Contract between field types and the evaluation cache.
//!
//! Every field type implements [`FieldCore`]. The engine wraps each core in a
//! [`Field`] holding one memo entry per cache, stamped with the generation it
//! was computed for; a stored value is reused only while the cache's
//! generation still matches, so a shared source field in a DAG is computed
//! once per location-set and caches never evict each other's values.

use crate::error::{FieldCacheError, Result};
use crate::location::Location;
use crate::region::{FieldGraph, Mesh};
use crate::types::{CacheId, Element, ElementId, FieldId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Behaviour of one field type.
///
/// Cores read the current location through the [`EvaluationContext`] and
/// evaluate their sources through it, always against the same cache.
pub trait FieldCore: fmt::Debug {
    /// Short type name used in diagnostics
    fn type_name(&self) -> &'static str;

    /// Write this field's values at the current location into `values`,
    /// which holds exactly one slot per component.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCacheError::NotDefined`] when the field has no value at
    /// the current location, or any error raised by a source field.
    fn evaluate(&self, ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()>;

    /// Defaults to "all source fields are defined here"
    fn is_defined_at_location(&self, ctx: &EvaluationContext<'_>) -> bool {
        (0..ctx.source_count()).all(|index| ctx.is_source_defined(index))
    }

    /// Whether `assign` can store values at the current location
    fn can_assign_at_location(&self, _ctx: &EvaluationContext<'_>) -> bool {
        false
    }

    /// Store `values` for the current location in the field's own storage.
    ///
    /// # Errors
    ///
    /// Fails with [`FieldCacheError::NotAssignable`] unless overridden.
    fn assign(&self, ctx: &EvaluationContext<'_>, _values: &[f64]) -> Result<()> {
        Err(FieldCacheError::NotAssignable(ctx.field_name().to_string()))
    }

    /// Drop any evaluation state kept inside the core itself.
    /// Called once per field when a cache of its region is torn down;
    /// the engine has already dropped its own memo entry for that cache.
    fn clear_cache(&self) {}
}

#[derive(Debug)]
struct ValueCache {
    generation: u64,
    values: Vec<f64>,
}

/// Field node of a region's field graph
#[derive(Debug)]
pub(crate) struct Field {
    pub(crate) name: String,
    pub(crate) number_of_components: usize,
    pub(crate) sources: Vec<FieldId>,
    pub(crate) core: Box<dyn FieldCore>,
    value_caches: RefCell<HashMap<CacheId, ValueCache>>,
}

impl Field {
    pub(crate) fn new(
        name: String,
        number_of_components: usize,
        sources: Vec<FieldId>,
        core: Box<dyn FieldCore>,
    ) -> Self {
        Self {
            name,
            number_of_components,
            sources,
            core,
            value_caches: RefCell::new(HashMap::new()),
        }
    }

    fn cached_values(&self, cache: CacheId, generation: u64) -> Option<Vec<f64>> {
        self.value_caches
            .borrow()
            .get(&cache)
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.values.clone())
    }

    pub(crate) fn store_values(&self, cache: CacheId, generation: u64, values: &[f64]) {
        let mut entries = self.value_caches.borrow_mut();
        let entry = entries.entry(cache).or_insert_with(|| ValueCache {
            generation,
            values: Vec::with_capacity(values.len()),
        });
        entry.generation = generation;
        entry.values.clear();
        entry.values.extend_from_slice(values);
    }

    /// Forget the memoized value for `cache`, or for every cache
    pub(crate) fn forget_values(&self, cache: Option<CacheId>) {
        let mut entries = self.value_caches.borrow_mut();
        match cache {
            Some(cache) => {
                entries.remove(&cache);
            }
            None => entries.clear(),
        }
    }

    /// Teardown of `cache`: drop its memo entry and notify the core
    pub(crate) fn release_cache(&self, cache: CacheId) {
        self.forget_values(Some(cache));
        self.core.clear_cache();
    }

    #[cfg(test)]
    pub(crate) fn memo_entry_count(&self) -> usize {
        self.value_caches.borrow().len()
    }
}

/// Everything one evaluation pass over the field graph reads
pub(crate) struct EvaluationScope<'a> {
    pub(crate) cache: CacheId,
    pub(crate) generation: u64,
    pub(crate) location: &'a Location,
    pub(crate) fields: &'a FieldGraph,
    pub(crate) mesh: &'a Mesh,
    pub(crate) max_depth: usize,
}

/// View of the cache handed to a [`FieldCore`] while it evaluates
pub struct EvaluationContext<'a> {
    scope: &'a EvaluationScope<'a>,
    field_id: FieldId,
    field: &'a Field,
    depth: usize,
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn new(
        scope: &'a EvaluationScope<'a>,
        field_id: FieldId,
        field: &'a Field,
        depth: usize,
    ) -> Self {
        Self {
            scope,
            field_id,
            field,
            depth,
        }
    }

    pub fn location(&self) -> &Location {
        self.scope.location
    }

    pub fn time(&self) -> f64 {
        self.scope.location.time()
    }

    /// Generation of the cache being evaluated against
    pub fn generation(&self) -> u64 {
        self.scope.generation
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    pub fn field_name(&self) -> &str {
        &self.field.name
    }

    pub fn number_of_components(&self) -> usize {
        self.field.number_of_components
    }

    pub fn source_count(&self) -> usize {
        self.field.sources.len()
    }

    /// Component count of source `index`, 0 if there is no such source
    pub fn source_components(&self, index: usize) -> usize {
        self.field
            .sources
            .get(index)
            .and_then(|id| self.scope.fields.node_weight(id.index()))
            .map_or(0, |source| source.number_of_components)
    }

    /// Evaluate source `index` against the same cache
    pub fn evaluate_source(&self, index: usize) -> Result<Vec<f64>> {
        let source = self.source_id(index)?;
        evaluate_field(self.scope, source, self.depth + 1)
    }

    pub fn is_source_defined(&self, index: usize) -> bool {
        self.source_id(index)
            .map(|source| field_is_defined(self.scope, source, self.depth + 1))
            .unwrap_or(false)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.scope.mesh.element(id)
    }

    /// "Not defined here" error for this field at the current location kind
    pub fn not_defined(&self) -> FieldCacheError {
        FieldCacheError::not_defined(self.field.name.as_str(), self.scope.location.kind().as_str())
    }

    fn source_id(&self, index: usize) -> Result<FieldId> {
        self.field.sources.get(index).copied().ok_or_else(|| {
            FieldCacheError::invalid_definition(format!(
                "field '{}' has no source {index}",
                self.field.name
            ))
        })
    }
}

fn lookup<'a>(scope: &EvaluationScope<'a>, id: FieldId, depth: usize) -> Result<&'a Field> {
    if depth > scope.max_depth {
        return Err(FieldCacheError::DepthExceeded(scope.max_depth));
    }
    scope
        .fields
        .node_weight(id.index())
        .ok_or(FieldCacheError::UnknownField(id))
}

/// Memoized evaluation of `id` and, recursively, its sources
pub(crate) fn evaluate_field(scope: &EvaluationScope<'_>, id: FieldId, depth: usize) -> Result<Vec<f64>> {
    let field = lookup(scope, id, depth)?;

    // the reference field of a field-values location is the prescribed values
    if let Some((reference, values)) = scope.location.field_values() {
        if reference == id {
            return Ok(values.to_vec());
        }
    }

    if let Some(values) = field.cached_values(scope.cache, scope.generation) {
        log::trace!("{} '{}': reusing value from generation {}", id, field.name, scope.generation);
        return Ok(values);
    }

    let ctx = EvaluationContext::new(scope, id, field, depth);
    let mut values = vec![0.0; field.number_of_components];
    field.core.evaluate(&ctx, &mut values)?;
    log::trace!(
        "{} '{}' ({}): evaluated at {} location, generation {}",
        id,
        field.name,
        field.core.type_name(),
        scope.location.kind(),
        scope.generation
    );
    field.store_values(scope.cache, scope.generation, &values);
    Ok(values)
}

pub(crate) fn field_is_defined(scope: &EvaluationScope<'_>, id: FieldId, depth: usize) -> bool {
    let Ok(field) = lookup(scope, id, depth) else {
        return false;
    };
    if matches!(scope.location.field_values(), Some((reference, _)) if reference == id) {
        return true;
    }
    let ctx = EvaluationContext::new(scope, id, field, depth);
    field.core.is_defined_at_location(&ctx)
}
