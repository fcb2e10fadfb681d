//! Shared evaluation context for a region's fields.
//!
//! A [`FieldCache`] holds the current [`Location`] and a generation counter
//! bumped by every successful location change. Handles are reference counted:
//! [`FieldCache::access`] adds a handle, [`FieldCache::destroy`] releases one,
//! and releasing the last handle clears the value caches of every field in the
//! owning region exactly once.

use crate::config::FieldModuleConfig;
use crate::error::{FieldCacheError, Result};
use crate::location::{ChartCoordinates, Location};
use crate::region::RegionInner;
use crate::types::{CacheId, ElementId, FieldId, NodeId};
use serde::Serialize;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct CacheState {
    pub(crate) location: Location,
    pub(crate) generation: u64,
    pub(crate) assign_in_cache_only: bool,
}

struct CacheInner {
    id: CacheId,
    /// Back-reference used to validate handles and for the teardown sweep
    region: Weak<RegionInner>,
    state: RefCell<CacheState>,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        match self.region.upgrade() {
            Some(region) => {
                let cleared = region.release_cache(self.id);
                log::debug!(
                    "Released {}: cleared value caches of {cleared} fields in region '{}'",
                    self.id,
                    region.name
                );
            }
            None => log::trace!("Released {} after its region", self.id),
        }
    }
}

/// Point-in-time copy of a cache's observable state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSnapshot {
    pub cache: CacheId,
    pub generation: u64,
    pub location: Location,
}

/// Reference-counted handle to a field cache.
///
/// Not thread-safe: a cache is driven by one thread and its location must not
/// change while a field is being evaluated against it.
#[derive(Clone)]
pub struct FieldCache {
    inner: Rc<CacheInner>,
}

impl fmt::Debug for FieldCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("FieldCache")
            .field("id", &self.inner.id)
            .field("generation", &state.generation)
            .field("location", &state.location)
            .finish()
    }
}

impl FieldCache {
    pub(crate) fn new(region: &Rc<RegionInner>, config: &FieldModuleConfig) -> Self {
        let id = region.next_cache_id();
        log::debug!("Created {id} for region '{}'", region.name);
        Self {
            inner: Rc::new(CacheInner {
                id,
                region: Rc::downgrade(region),
                state: RefCell::new(CacheState {
                    location: Location::at_time(config.initial_time),
                    generation: 0,
                    assign_in_cache_only: config.assign_in_cache_only,
                }),
            }),
        }
    }

    /// Another handle to the same cache
    pub fn access(&self) -> Self {
        self.clone()
    }

    /// Release the handle in `cache`, leaving `None` behind.
    /// The cache is torn down when its last handle goes.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCacheError::ReleasedCache`] if `cache` is already empty.
    pub fn destroy(cache: &mut Option<Self>) -> Result<()> {
        let handle = cache.take().ok_or(FieldCacheError::ReleasedCache)?;
        log::trace!(
            "Releasing handle to {} ({} remaining)",
            handle.inner.id,
            handle.reference_count() - 1
        );
        drop(handle);
        Ok(())
    }

    /// Number of live handles to this cache
    pub fn reference_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn id(&self) -> CacheId {
        self.inner.id
    }

    /// Incremented by every successful location change, never reset
    pub fn generation(&self) -> u64 {
        self.inner.state.borrow().generation
    }

    pub fn time(&self) -> f64 {
        self.inner.state.borrow().location.time()
    }

    /// Current location, for inspection by field evaluators and callers
    pub fn location(&self) -> Ref<'_, Location> {
        Ref::map(self.inner.state.borrow(), |state| &state.location)
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let state = self.inner.state.borrow();
        CacheSnapshot {
            cache: self.inner.id,
            generation: state.generation,
            location: state.location.clone(),
        }
    }

    pub fn assign_in_cache_only(&self) -> bool {
        self.inner.state.borrow().assign_in_cache_only
    }

    /// When set, assigned values live only in this cache's memoized values
    /// for the current location instead of in field storage
    pub fn set_assign_in_cache_only(&self, value: bool) {
        self.inner.state.borrow_mut().assign_in_cache_only = value;
    }

    pub fn set_time(&self, time: f64) -> Result<()> {
        self.change_location("set_time", |location| {
            location.set_time(time);
            Ok(())
        })
    }

    /// Move to `node`, keeping the time.
    ///
    /// # Errors
    ///
    /// Fails if the node is not in the cache's region or the region is gone.
    pub fn set_node(&self, node: NodeId) -> Result<()> {
        let region = self.region()?;
        if !region.mesh.borrow().contains_node(node) {
            return self.reject("set_node", FieldCacheError::UnknownNode(node));
        }
        self.change_location("set_node", |location| {
            location.set_node(node);
            Ok(())
        })
    }

    /// Move to the chart origin of `element`
    pub fn set_element(&self, element: ElementId) -> Result<()> {
        let region = self.region()?;
        let dimension = match region.mesh.borrow().element(element) {
            Some(e) => e.dimension,
            None => return self.reject("set_element", FieldCacheError::UnknownElement(element)),
        };
        let origin = ChartCoordinates::origin(dimension).ok_or(FieldCacheError::DimensionMismatch {
            element,
            expected: dimension,
            actual: 0,
        })?;
        self.set_element_location(element, dimension, origin.as_slice())
    }

    /// Move to chart coordinates `xi` in `element`.
    ///
    /// # Errors
    ///
    /// Fails, leaving the cache unchanged, if the element is unknown,
    /// `dimension` is not the element's dimension, or `xi` does not hold
    /// `dimension` values.
    pub fn set_element_location(&self, element: ElementId, dimension: usize, xi: &[f64]) -> Result<()> {
        self.set_mesh_location("set_element_location", element, dimension, xi, None)
    }

    /// As [`Self::set_element_location`], also recording the higher
    /// dimensional `parent` element chosen by the caller
    pub fn set_element_location_with_parent(
        &self,
        element: ElementId,
        dimension: usize,
        xi: &[f64],
        parent: ElementId,
    ) -> Result<()> {
        self.set_mesh_location(
            "set_element_location_with_parent",
            element,
            dimension,
            xi,
            Some(parent),
        )
    }

    /// Prescribe the values of `field`.
    ///
    /// # Errors
    ///
    /// Fails if the field belongs to another region or is unknown, or if
    /// `values` does not hold exactly one value per component.
    pub fn set_field_real(&self, field: FieldId, values: &[f64]) -> Result<()> {
        let region = self.region()?;
        if field.region != region.tag {
            return self.reject("set_field_real", FieldCacheError::RegionMismatch(field));
        }
        let Some(components) = region.with_field(field, |f| f.number_of_components) else {
            return self.reject("set_field_real", FieldCacheError::UnknownField(field));
        };
        self.change_location("set_field_real", |location| {
            location.set_field_values(field, components, values)
        })
    }

    /// Drop the spatial part of the location, keeping the time
    pub fn clear_location(&self) -> Result<()> {
        self.change_location("clear_location", |location| {
            location.clear();
            Ok(())
        })
    }

    pub(crate) fn state(&self) -> Ref<'_, CacheState> {
        self.inner.state.borrow()
    }

    pub(crate) fn belongs_to(&self, region: &Rc<RegionInner>) -> bool {
        std::ptr::eq(self.inner.region.as_ptr(), Rc::as_ptr(region))
    }

    fn region(&self) -> Result<Rc<RegionInner>> {
        self.inner
            .region
            .upgrade()
            .ok_or(FieldCacheError::ReleasedRegion)
    }

    fn set_mesh_location(
        &self,
        op: &'static str,
        element: ElementId,
        dimension: usize,
        xi: &[f64],
        parent: Option<ElementId>,
    ) -> Result<()> {
        let region = self.region()?;
        let mesh = region.mesh.borrow();
        let Some(target) = mesh.element(element) else {
            return self.reject(op, FieldCacheError::UnknownElement(element));
        };
        let parent = match parent {
            Some(id) => match mesh.element(id) {
                Some(p) => Some(p),
                None => return self.reject(op, FieldCacheError::UnknownElement(id)),
            },
            None => None,
        };
        self.change_location(op, |location| {
            location.set_element_xi(target, dimension, xi, parent)
        })
    }

    /// Apply `change` and bump the generation, or leave everything untouched
    /// if it fails
    fn change_location(
        &self,
        op: &'static str,
        change: impl FnOnce(&mut Location) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state_mut()?;
        let changed = change(&mut state.location);
        if let Err(err) = changed {
            drop(state);
            return self.reject(op, err);
        }
        state.generation += 1;
        log::trace!(
            "{} {op}: {} location, time {}, generation {}",
            self.inner.id,
            state.location.kind(),
            state.location.time(),
            state.generation
        );
        Ok(())
    }

    fn state_mut(&self) -> Result<RefMut<'_, CacheState>> {
        self.inner.state.try_borrow_mut().map_err(|_| FieldCacheError::CacheBusy)
    }

    fn reject(&self, op: &'static str, err: FieldCacheError) -> Result<()> {
        log::debug!("{} rejected {op}: {err}", self.inner.id);
        Err(err)
    }
}
