use crate::error::{FieldCacheError, Result};
use crate::field::Field;
use crate::module::FieldModule;
use crate::types::{
    CacheId, Element, ElementId, FieldId, NodeId, RegionTag, MAXIMUM_ELEMENT_XI_DIMENSIONS,
};
use petgraph::algo::has_path_connecting;
use petgraph::graph::DiGraph;
use petgraph::visit::Dfs;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_REGION_TAG: AtomicU32 = AtomicU32::new(1);

/// Field graph: edges run from a source field to the field computed from it,
/// weighted with the source's position in the dependent's source list
pub(crate) type FieldGraph = DiGraph<Field, usize>;

/// Nodes and elements of a region
#[derive(Debug)]
pub(crate) struct Mesh {
    tag: RegionTag,
    node_count: u32,
    elements: Vec<Element>,
}

impl Mesh {
    fn new(tag: RegionTag) -> Self {
        Self {
            tag,
            node_count: 0,
            elements: Vec::new(),
        }
    }

    pub(crate) fn contains_node(&self, node: NodeId) -> bool {
        node.region == self.tag && node.index < self.node_count
    }

    pub(crate) fn element(&self, id: ElementId) -> Option<&Element> {
        if id.region != self.tag {
            return None;
        }
        self.elements.get(id.index as usize)
    }
}

pub(crate) struct RegionInner {
    pub(crate) name: String,
    pub(crate) tag: RegionTag,
    pub(crate) fields: RefCell<FieldGraph>,
    pub(crate) mesh: RefCell<Mesh>,
    next_cache_id: Cell<u64>,
    next_automatic_name: Cell<u32>,
}

impl RegionInner {
    pub(crate) fn next_cache_id(&self) -> CacheId {
        let id = self.next_cache_id.get();
        self.next_cache_id.set(id + 1);
        CacheId(id)
    }

    /// Teardown sweep for `cache`: every field in the region drops its memo
    /// entry for the cache and has its core notified, whether or not the
    /// cache ever evaluated it.
    pub(crate) fn release_cache(&self, cache: CacheId) -> usize {
        let Ok(fields) = self.fields.try_borrow() else {
            log::warn!(
                "Region '{}': field graph busy, value caches not cleared",
                self.name
            );
            return 0;
        };
        for field in fields.node_weights() {
            field.release_cache(cache);
        }
        fields.node_count()
    }

    /// Forget the memoized values of `field` and every field computed from
    /// it, for `cache` only or for every cache
    pub(crate) fn clear_dependent_value_caches(&self, field: FieldId, cache: Option<CacheId>) -> usize {
        if !self.contains_field(field) {
            return 0;
        }
        let fields = self.fields.borrow();
        let mut dfs = Dfs::new(&*fields, field.index());
        let mut cleared = 0;
        while let Some(index) = dfs.next(&*fields) {
            fields[index].forget_values(cache);
            cleared += 1;
        }
        cleared
    }

    /// Apply `f` to `field` if it belongs to this region
    pub(crate) fn with_field<T>(&self, field: FieldId, f: impl FnOnce(&Field) -> T) -> Option<T> {
        if field.region != self.tag {
            return None;
        }
        self.fields.borrow().node_weight(field.index()).map(f)
    }

    pub(crate) fn contains_field(&self, field: FieldId) -> bool {
        self.with_field(field, |_| ()).is_some()
    }
}

/// Finite element domain owning a mesh and a graph of fields.
///
/// Cloning yields another handle to the same region.
#[derive(Clone)]
pub struct Region {
    pub(crate) inner: Rc<RegionInner>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.inner.name)
            .field("nodes", &self.node_count())
            .field("elements", &self.element_count())
            .field("fields", &self.field_count())
            .finish()
    }
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        let tag = RegionTag(NEXT_REGION_TAG.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Rc::new(RegionInner {
                name: name.into(),
                tag,
                fields: RefCell::new(FieldGraph::new()),
                mesh: RefCell::new(Mesh::new(tag)),
                next_cache_id: Cell::new(0),
                next_automatic_name: Cell::new(1),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Field module with default configuration
    pub fn field_module(&self) -> FieldModule {
        FieldModule::new(self)
    }

    pub fn create_node(&self) -> NodeId {
        let mut mesh = self.inner.mesh.borrow_mut();
        let node = NodeId::new(mesh.tag, mesh.node_count);
        mesh.node_count += 1;
        node
    }

    /// Add an element of `dimension` with optional linear Lagrange nodes.
    ///
    /// # Errors
    ///
    /// Fails if the dimension is outside 1..=3, if `nodes` is neither empty
    /// nor exactly `2^dimension` long, or if a node is not in this region.
    pub fn create_element(&self, dimension: usize, nodes: &[NodeId]) -> Result<ElementId> {
        if dimension == 0 || dimension > MAXIMUM_ELEMENT_XI_DIMENSIONS {
            return Err(FieldCacheError::invalid_mesh(format!(
                "element dimension must be 1..={MAXIMUM_ELEMENT_XI_DIMENSIONS}, got {dimension}"
            )));
        }
        let expected = Element::linear_node_count(dimension);
        if !nodes.is_empty() && nodes.len() != expected {
            return Err(FieldCacheError::invalid_mesh(format!(
                "{dimension}-D element needs {expected} nodes, got {}",
                nodes.len()
            )));
        }

        let mut mesh = self.inner.mesh.borrow_mut();
        if let Some(&missing) = nodes.iter().find(|&&node| !mesh.contains_node(node)) {
            return Err(FieldCacheError::UnknownNode(missing));
        }
        let id = ElementId::new(mesh.tag, mesh.elements.len() as u32);
        mesh.elements.push(Element {
            id,
            dimension,
            nodes: nodes.to_vec(),
        });
        Ok(id)
    }

    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.inner.mesh.borrow().element(id).cloned()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.inner.mesh.borrow().contains_node(node)
    }

    pub fn node_count(&self) -> usize {
        self.inner.mesh.borrow().node_count as usize
    }

    pub fn element_count(&self) -> usize {
        self.inner.mesh.borrow().elements.len()
    }

    pub fn field_count(&self) -> usize {
        self.inner.fields.borrow().node_count()
    }

    /// All fields in creation order
    pub fn field_ids(&self) -> Vec<FieldId> {
        self.inner
            .fields
            .borrow()
            .node_indices()
            .map(|index| FieldId::from_index(self.inner.tag, index))
            .collect()
    }

    pub fn find_field_by_name(&self, name: &str) -> Option<FieldId> {
        let fields = self.inner.fields.borrow();
        fields
            .node_indices()
            .find(|&index| fields[index].name == name)
            .map(|index| FieldId::from_index(self.inner.tag, index))
    }

    pub fn field_name(&self, field: FieldId) -> Option<String> {
        self.inner.with_field(field, |f| f.name.clone())
    }

    pub fn number_of_components(&self, field: FieldId) -> Option<usize> {
        self.inner.with_field(field, |f| f.number_of_components)
    }

    /// Source fields of `field`, in order
    pub fn source_fields(&self, field: FieldId) -> Vec<FieldId> {
        self.inner
            .with_field(field, |f| f.sources.clone())
            .unwrap_or_default()
    }

    /// True if `field` is `other` or is computed, directly or not, from `other`
    pub fn depends_on_field(&self, field: FieldId, other: FieldId) -> bool {
        if !self.inner.contains_field(field) || !self.inner.contains_field(other) {
            return false;
        }
        let fields = self.inner.fields.borrow();
        has_path_connecting(&*fields, other.index(), field.index(), None)
    }

    /// Insert a field whose sources must already be in this region, so the
    /// graph stays acyclic
    pub(crate) fn add_field(&self, mut field: Field) -> Result<FieldId> {
        if field.number_of_components == 0 {
            return Err(FieldCacheError::invalid_definition(format!(
                "field '{}' must have at least one component",
                field.name
            )));
        }
        if let Some(&missing) = field
            .sources
            .iter()
            .find(|&&source| !self.inner.contains_field(source))
        {
            return Err(FieldCacheError::UnknownField(missing));
        }
        if field.name.is_empty() {
            field.name = self.automatic_name();
        } else if self.find_field_by_name(&field.name).is_some() {
            return Err(FieldCacheError::invalid_definition(format!(
                "a field named '{}' already exists in region '{}'",
                field.name,
                self.name()
            )));
        }

        let sources = field.sources.clone();
        let name = field.name.clone();
        let type_name = field.core.type_name();
        let mut fields = self.inner.fields.borrow_mut();
        let index = fields.add_node(field);
        for (position, source) in sources.iter().enumerate() {
            fields.add_edge(source.index(), index, position);
        }
        let id = FieldId::from_index(self.inner.tag, index);
        log::debug!(
            "Region '{}': created {} field '{}' as {}",
            self.name(),
            type_name,
            name,
            id
        );
        Ok(id)
    }

    fn automatic_name(&self) -> String {
        loop {
            let number = self.inner.next_automatic_name.get();
            self.inner.next_automatic_name.set(number + 1);
            let name = format!("temp{number}");
            if self.find_field_by_name(&name).is_none() {
                return name;
            }
        }
    }
}
