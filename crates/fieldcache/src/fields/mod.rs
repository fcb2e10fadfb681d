//! Built-in field types.

mod arithmetic;
mod composite;
mod constant;
mod finite_element;
mod location_fields;
mod logical;

pub use arithmetic::{ArithmeticField, ArithmeticOperator};
pub use composite::{CompositeComponent, CompositeField};
pub use constant::ConstantField;
pub use finite_element::FiniteElementField;
pub use location_fields::{TimeValueField, XiCoordinatesField};
pub use logical::{LogicalField, LogicalOperator};
