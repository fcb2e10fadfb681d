use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;
use zinc_fieldcache::fields::{CompositeComponent, CompositeField, ConstantField, XiCoordinatesField};
use zinc_fieldcache::{
    ElementId, EvaluationContext, FieldCacheError, FieldCore, FieldId, FieldModule,
    FieldModuleConfig, LocationKind, NodeId, Region, Result,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Constant that counts its evaluations
#[derive(Debug)]
struct EvaluationCounter {
    value: f64,
    evaluations: Rc<Cell<usize>>,
}

impl FieldCore for EvaluationCounter {
    fn type_name(&self) -> &'static str {
        "evaluation_counter"
    }

    fn evaluate(&self, _ctx: &EvaluationContext<'_>, values: &mut [f64]) -> Result<()> {
        self.evaluations.set(self.evaluations.get() + 1);
        values.fill(self.value);
        Ok(())
    }
}

/// Unit square scaled by 2 in y: nodes (0,0), (1,0), (0,2), (1,2)
fn scaled_square(module: &FieldModule) -> (FieldId, ElementId, Vec<NodeId>) {
    let region = module.region();
    let nodes: Vec<NodeId> = (0..4).map(|_| region.create_node()).collect();
    let element = region.create_element(2, &nodes).unwrap();
    let coordinates = module.create_finite_element("coordinates", 2).unwrap();

    let cache = module.create_cache();
    let positions = [[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [1.0, 2.0]];
    for (node, position) in nodes.iter().zip(positions) {
        cache.set_node(*node).unwrap();
        module.assign_real(coordinates, &cache, &position).unwrap();
    }
    (coordinates, element, nodes)
}

#[test]
fn interpolates_coordinates_in_element() {
    init_logging();
    let region = Region::new("square");
    let module = region.field_module();
    let (coordinates, element, nodes) = scaled_square(&module);
    let cache = module.create_cache();

    cache.set_element_location(element, 2, &[0.25, 0.75]).unwrap();
    assert!(module.is_defined_at_location(coordinates, &cache));
    assert_eq!(module.evaluate_real(coordinates, &cache).unwrap(), vec![0.25, 1.5]);

    cache.set_node(nodes[3]).unwrap();
    assert_eq!(module.evaluate_real(coordinates, &cache).unwrap(), vec![1.0, 2.0]);
}

#[test]
fn shared_source_evaluated_once_per_location() {
    init_logging();
    let region = Region::new("dag");
    let module = region.field_module();
    let evaluations = Rc::new(Cell::new(0));
    let source = module
        .create_field(
            "source",
            1,
            &[],
            Box::new(EvaluationCounter {
                value: 2.0,
                evaluations: Rc::clone(&evaluations),
            }),
        )
        .unwrap();
    let sum = module.create_add("sum", source, source).unwrap();
    let product = module.create_multiply("product", sum, source).unwrap();
    let cache = module.create_cache();

    assert_eq!(module.evaluate_real(product, &cache).unwrap(), vec![8.0]);
    assert_eq!(evaluations.get(), 1);

    assert_eq!(module.evaluate_real(product, &cache).unwrap(), vec![8.0]);
    assert_eq!(module.evaluate_real(source, &cache).unwrap(), vec![2.0]);
    assert_eq!(evaluations.get(), 1);

    cache.set_time(1.0).unwrap();
    assert_eq!(module.evaluate_real(product, &cache).unwrap(), vec![8.0]);
    assert_eq!(evaluations.get(), 2);

    // a second cache never reuses values computed for the first
    let other = module.create_cache();
    assert_eq!(module.evaluate_real(sum, &other).unwrap(), vec![4.0]);
    assert_eq!(evaluations.get(), 3);
}

#[test]
fn values_follow_each_cache() {
    init_logging();
    let region = Region::new("times");
    let module = region.field_module();
    let time = module.create_time_value("time").unwrap();

    let a = module.create_cache();
    let b = module.create_cache();
    a.set_time(1.0).unwrap();
    b.set_time(2.0).unwrap();

    assert_eq!(module.evaluate_real(time, &a).unwrap(), vec![1.0]);
    assert_eq!(module.evaluate_real(time, &b).unwrap(), vec![2.0]);
    assert_eq!(module.evaluate_real(time, &a).unwrap(), vec![1.0]);
}

#[test]
fn caches_keep_their_own_values_when_interleaved() {
    init_logging();
    let region = Region::new("interleaved");
    let module = region.field_module();
    let evaluations = Rc::new(Cell::new(0));
    let source = module
        .create_field(
            "source",
            1,
            &[],
            Box::new(EvaluationCounter {
                value: 3.0,
                evaluations: Rc::clone(&evaluations),
            }),
        )
        .unwrap();
    let sum = module.create_add("sum", source, source).unwrap();

    let a = module.create_cache();
    let b = module.create_cache();
    for _ in 0..3 {
        assert_eq!(module.evaluate_real(sum, &a).unwrap(), vec![6.0]);
        assert_eq!(module.evaluate_real(sum, &b).unwrap(), vec![6.0]);
    }
    // once per cache, no re-evaluation while neither location changes
    assert_eq!(evaluations.get(), 2);

    b.set_time(1.0).unwrap();
    assert_eq!(module.evaluate_real(sum, &a).unwrap(), vec![6.0]);
    assert_eq!(module.evaluate_real(sum, &b).unwrap(), vec![6.0]);
    assert_eq!(evaluations.get(), 3);
}

#[test]
fn cache_only_assignment_survives_other_caches() {
    init_logging();
    let region = Region::new("cache_only_interleaved");
    let module = region.field_module();
    let f = module.create_constant("f", &[1.0]).unwrap();
    let one = module.create_constant("one", &[1.0]).unwrap();
    let d = module.create_add("d", f, one).unwrap();

    let a = module.create_cache();
    a.set_assign_in_cache_only(true);
    let b = module.create_cache();

    module.assign_real(f, &a, &[9.0]).unwrap();
    assert_eq!(module.evaluate_real(d, &a).unwrap(), vec![10.0]);

    assert_eq!(module.evaluate_real(f, &b).unwrap(), vec![1.0]);
    assert_eq!(module.evaluate_real(d, &b).unwrap(), vec![2.0]);

    let f_on_a = module.evaluate_real(f, &a).unwrap();
    let d_on_a = module.evaluate_real(d, &a).unwrap();
    assert_eq!(f_on_a, vec![9.0]);
    assert_eq!(f_on_a[0] + 1.0, d_on_a[0]);
    assert_eq!(a.generation(), 0);
}

#[test]
fn prescribed_values_replace_the_field() {
    init_logging();
    let region = Region::new("prescribed");
    let module = region.field_module();
    let coordinates = module.create_finite_element("coordinates", 3).unwrap();
    let doubled = module.create_add("doubled", coordinates, coordinates).unwrap();
    let cache = module.create_cache();

    assert!(!module.is_defined_at_location(coordinates, &cache));
    assert!(matches!(
        module.evaluate_real(doubled, &cache),
        Err(FieldCacheError::NotDefined { .. })
    ));

    cache.set_field_real(coordinates, &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(cache.location().kind(), LocationKind::FieldValues);
    assert!(module.is_defined_at_location(doubled, &cache));
    assert_eq!(
        module.evaluate_real(coordinates, &cache).unwrap(),
        vec![1.0, 2.0, 3.0]
    );
    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![2.0, 4.0, 6.0]);

    cache.set_field_real(coordinates, &[0.5, 0.0, -1.0]).unwrap();
    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![1.0, 0.0, -2.0]);
}

#[test]
fn nodal_field_needs_element_nodes() {
    init_logging();
    let region = Region::new("nodal");
    let module = region.field_module();
    let temperature = module.create_finite_element("temperature", 1).unwrap();
    let node = region.create_node();
    let bare = region.create_element(1, &[]).unwrap();
    let cache = module.create_cache();

    cache.set_node(node).unwrap();
    module.assign_real(temperature, &cache, &[300.0]).unwrap();
    assert_eq!(module.evaluate_real(temperature, &cache).unwrap(), vec![300.0]);

    cache.set_element_location(bare, 1, &[0.5]).unwrap();
    assert!(!module.is_defined_at_location(temperature, &cache));
    let err = module.evaluate_real(temperature, &cache).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'temperature' is not defined at element location"
    );
    assert!(matches!(
        module.assign_real(temperature, &cache, &[1.0]),
        Err(FieldCacheError::NotAssignable(_))
    ));
}

#[test]
fn location_fields() {
    init_logging();
    let region = Region::new("xi");
    let module = region.field_module();
    let xi = module.create_xi_coordinates("xi").unwrap();
    let time = module.create_time_value("time").unwrap();
    let square = region.create_element(2, &[]).unwrap();
    let cache = module.create_cache();

    assert!(!module.is_defined_at_location(xi, &cache));
    cache.set_time(3.5).unwrap();
    cache.set_element_location(square, 2, &[0.25, 0.75]).unwrap();
    assert_eq!(module.evaluate_real(xi, &cache).unwrap(), vec![0.25, 0.75, 0.0]);
    assert_eq!(module.evaluate_real(time, &cache).unwrap(), vec![3.5]);
}

#[test]
fn composite_and_component_fields() {
    init_logging();
    let region = Region::new("composite");
    let module = region.field_module();
    let a = module.create_constant("a", &[1.0, 2.0]).unwrap();
    let b = module.create_constant("b", &[3.0]).unwrap();
    let cache = module.create_cache();

    let mixed = module
        .create_composite(
            "mixed",
            &[a, b],
            vec![
                CompositeComponent::Source { source: 0, component: 1 },
                CompositeComponent::Value(7.0),
                CompositeComponent::Source { source: 1, component: 0 },
            ],
        )
        .unwrap();
    assert_eq!(region.number_of_components(mixed), Some(3));
    assert_eq!(module.evaluate_real(mixed, &cache).unwrap(), vec![2.0, 7.0, 3.0]);

    let second = module.create_component("", a, 1).unwrap();
    assert_eq!(module.evaluate_real(second, &cache).unwrap(), vec![2.0]);

    assert!(matches!(
        module.create_component("bad", b, 1),
        Err(FieldCacheError::InvalidDefinition(_))
    ));
}

#[test]
fn arithmetic_and_logical_fields() {
    init_logging();
    let region = Region::new("operators");
    let module = region.field_module();
    let a = module.create_constant("a", &[1.0, 0.0, 3.0]).unwrap();
    let b = module.create_constant("b", &[1.0, 1.0, 0.0]).unwrap();
    let cache = module.create_cache();
    let eval = |field| module.evaluate_real(field, &cache).unwrap();

    assert_eq!(eval(module.create_subtract("sub", a, b).unwrap()), vec![0.0, -1.0, 3.0]);
    assert_eq!(eval(module.create_multiply("mul", a, b).unwrap()), vec![1.0, 0.0, 0.0]);
    assert_eq!(eval(module.create_divide("div", b, a).unwrap()), vec![1.0, f64::INFINITY, 0.0]);

    assert_eq!(eval(module.create_and("and", a, b).unwrap()), vec![1.0, 0.0, 0.0]);
    assert_eq!(eval(module.create_or("or", a, b).unwrap()), vec![1.0, 1.0, 1.0]);
    assert_eq!(eval(module.create_xor("xor", a, b).unwrap()), vec![0.0, 1.0, 1.0]);
    assert_eq!(eval(module.create_not("not", a).unwrap()), vec![0.0, 1.0, 0.0]);
    assert_eq!(eval(module.create_equal_to("eq", a, b).unwrap()), vec![1.0, 0.0, 0.0]);
    assert_eq!(eval(module.create_less_than("lt", a, b).unwrap()), vec![0.0, 1.0, 0.0]);
    assert_eq!(eval(module.create_greater_than("gt", a, b).unwrap()), vec![0.0, 0.0, 1.0]);

    let scalar = module.create_constant("scalar", &[1.0]).unwrap();
    assert!(matches!(
        module.create_add("mismatch", a, scalar),
        Err(FieldCacheError::InvalidDefinition(_))
    ));
}

#[test]
fn assignment_clears_dependents() {
    init_logging();
    let region = Region::new("assign");
    let module = region.field_module();
    let c = module.create_constant("c", &[1.0]).unwrap();
    let doubled = module.create_add("doubled", c, c).unwrap();
    let cache = module.create_cache();

    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![2.0]);
    module.assign_real(c, &cache, &[3.0]).unwrap();
    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![6.0]);

    assert!(matches!(
        module.assign_real(c, &cache, &[1.0, 2.0]),
        Err(FieldCacheError::ValueCountMismatch { expected: 1, actual: 2 })
    ));
    assert!(matches!(
        module.assign_real(doubled, &cache, &[1.0]),
        Err(FieldCacheError::NotAssignable(_))
    ));
    assert_eq!(module.evaluate_real(c, &cache).unwrap(), vec![3.0]);
}

#[test]
fn assignment_in_cache_only() {
    init_logging();
    let region = Region::new("cache_only");
    let module = region.field_module();
    let c = module.create_constant("c", &[1.0]).unwrap();
    let doubled = module.create_add("doubled", c, c).unwrap();
    let cache = module.create_cache();
    cache.set_assign_in_cache_only(true);

    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![2.0]);
    module.assign_real(c, &cache, &[5.0]).unwrap();
    assert_eq!(module.evaluate_real(c, &cache).unwrap(), vec![5.0]);
    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![10.0]);

    // stored value is untouched once the location moves on
    cache.set_time(1.0).unwrap();
    assert_eq!(module.evaluate_real(c, &cache).unwrap(), vec![1.0]);
    assert_eq!(module.evaluate_real(doubled, &cache).unwrap(), vec![2.0]);
}

#[test]
fn field_from_another_region_rejected() {
    init_logging();
    let first = Region::new("first");
    let second = Region::new("second");
    let module = first.field_module();
    let c = module.create_constant("c", &[1.0]).unwrap();
    let foreign = second.field_module().create_cache();

    assert!(matches!(
        module.evaluate_real(c, &foreign),
        Err(FieldCacheError::RegionMismatch(_))
    ));
    assert!(!module.is_defined_at_location(c, &foreign));
    assert!(module.assign_real(c, &foreign, &[2.0]).is_err());

    // field of the other region with a cache of this one, same index as `c`
    let local = module.create_cache();
    let other = second.field_module().create_constant("c", &[5.0]).unwrap();
    assert!(matches!(
        module.evaluate_real(other, &local),
        Err(FieldCacheError::RegionMismatch(_))
    ));
    assert!(matches!(
        local.set_field_real(other, &[2.0]),
        Err(FieldCacheError::RegionMismatch(_))
    ));
    assert_eq!(local.generation(), 0);
}

#[test]
fn inconsistent_cores_fail_instead_of_panicking() {
    init_logging();
    let region = Region::new("inconsistent");
    let module = region.field_module();
    let square = region.create_element(2, &[]).unwrap();
    let cache = module.create_cache();

    let short = module
        .create_field("short", 2, &[], Box::new(ConstantField::new(&[1.0])))
        .unwrap();
    assert!(matches!(
        module.evaluate_real(short, &cache),
        Err(FieldCacheError::ValueCountMismatch { expected: 1, actual: 2 })
    ));
    assert!(matches!(
        module.assign_real(short, &cache, &[1.0, 2.0]),
        Err(FieldCacheError::ValueCountMismatch { expected: 1, actual: 2 })
    ));

    let narrow_xi = module
        .create_field("narrow_xi", 1, &[], Box::new(XiCoordinatesField))
        .unwrap();
    cache.set_element_location(square, 2, &[0.5, 0.5]).unwrap();
    assert!(matches!(
        module.evaluate_real(narrow_xi, &cache),
        Err(FieldCacheError::ValueCountMismatch { expected: 2, actual: 1 })
    ));

    let a = module.create_constant("a", &[1.0]).unwrap();
    let two_sources = CompositeField::new(
        vec![CompositeComponent::Source { source: 1, component: 0 }],
        &[1, 1],
    )
    .unwrap();
    let broken = module
        .create_field("broken", 1, &[a], Box::new(two_sources))
        .unwrap();
    assert!(matches!(
        module.evaluate_real(broken, &cache),
        Err(FieldCacheError::InvalidDefinition(_))
    ));
}

#[test]
fn evaluation_depth_is_limited() {
    init_logging();
    let region = Region::new("deep");
    let config = FieldModuleConfig {
        max_evaluation_depth: 2,
        ..FieldModuleConfig::default()
    };
    let module = FieldModule::with_config(&region, config).unwrap();
    let c = module.create_constant("c", &[1.0]).unwrap();
    let a1 = module.create_add("a1", c, c).unwrap();
    let a2 = module.create_add("a2", a1, a1).unwrap();
    let a3 = module.create_add("a3", a2, a2).unwrap();
    let cache = module.create_cache();

    assert_eq!(module.evaluate_real(a2, &cache).unwrap(), vec![4.0]);
    cache.set_time(1.0).unwrap();
    assert!(matches!(
        module.evaluate_real(a3, &cache),
        Err(FieldCacheError::DepthExceeded(2))
    ));
}
