//! Where and when a field is evaluated.
//!
//! A [`Location`] is always exactly one of four variants. Each carries its own
//! time; switching to another variant keeps the time of the previous one.

use crate::error::{FieldCacheError, Result};
use crate::types::{Element, ElementId, FieldId, NodeId, MAXIMUM_ELEMENT_XI_DIMENSIONS};
use serde::Serialize;
use std::fmt;

/// Chart (xi) coordinates within an element, stored by value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartCoordinates {
    dimension: usize,
    xi: [f64; MAXIMUM_ELEMENT_XI_DIMENSIONS],
}

impl ChartCoordinates {
    /// Copy `xi` into a new chart; `None` if its length is 0 or above the maximum
    pub fn new(xi: &[f64]) -> Option<Self> {
        if xi.is_empty() || xi.len() > MAXIMUM_ELEMENT_XI_DIMENSIONS {
            return None;
        }
        let mut chart = Self {
            dimension: xi.len(),
            xi: [0.0; MAXIMUM_ELEMENT_XI_DIMENSIONS],
        };
        chart.xi[..xi.len()].copy_from_slice(xi);
        Some(chart)
    }

    /// Origin of a chart of the given dimension
    pub fn origin(dimension: usize) -> Option<Self> {
        Self::new(&[0.0; MAXIMUM_ELEMENT_XI_DIMENSIONS][..dimension.min(MAXIMUM_ELEMENT_XI_DIMENSIONS)])
            .filter(|chart| chart.dimension == dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.xi[..self.dimension]
    }
}

/// Discriminant of a [`Location`], used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Time,
    Node,
    Element,
    FieldValues,
}

impl LocationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Node => "node",
            Self::Element => "element",
            Self::FieldValues => "field values",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current evaluation point in space and time.
///
/// Node, element and field handles are borrowed ids; a location never keeps
/// the objects they name alive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// Time only, no spatial part
    Time { time: f64 },

    /// At a node
    Node { node: NodeId, time: f64 },

    /// At chart coordinates in an element, optionally with the higher
    /// dimensional parent element that embeds it
    Element {
        element: ElementId,
        chart: ChartCoordinates,
        parent: Option<ElementId>,
        time: f64,
    },

    /// At explicit values of a reference field
    FieldValues {
        field: FieldId,
        values: Vec<f64>,
        time: f64,
    },
}

impl Default for Location {
    fn default() -> Self {
        Self::Time { time: 0.0 }
    }
}

impl Location {
    pub fn at_time(time: f64) -> Self {
        Self::Time { time }
    }

    pub fn kind(&self) -> LocationKind {
        match self {
            Self::Time { .. } => LocationKind::Time,
            Self::Node { .. } => LocationKind::Node,
            Self::Element { .. } => LocationKind::Element,
            Self::FieldValues { .. } => LocationKind::FieldValues,
        }
    }

    pub fn time(&self) -> f64 {
        match self {
            Self::Time { time }
            | Self::Node { time, .. }
            | Self::Element { time, .. }
            | Self::FieldValues { time, .. } => *time,
        }
    }

    /// Change the time, keeping the spatial part
    pub fn set_time(&mut self, new_time: f64) {
        match self {
            Self::Time { time }
            | Self::Node { time, .. }
            | Self::Element { time, .. }
            | Self::FieldValues { time, .. } => *time = new_time,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node { node, .. } => Some(*node),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<ElementId> {
        match self {
            Self::Element { element, .. } => Some(*element),
            _ => None,
        }
    }

    pub fn chart(&self) -> Option<&ChartCoordinates> {
        match self {
            Self::Element { chart, .. } => Some(chart),
            _ => None,
        }
    }

    pub fn parent_element(&self) -> Option<ElementId> {
        match self {
            Self::Element { parent, .. } => *parent,
            _ => None,
        }
    }

    /// Reference field and its prescribed values at a field-values location
    pub fn field_values(&self) -> Option<(FieldId, &[f64])> {
        match self {
            Self::FieldValues { field, values, .. } => Some((*field, values.as_slice())),
            _ => None,
        }
    }

    /// Drop the spatial part, keeping the time
    pub fn clear(&mut self) {
        *self = Self::Time { time: self.time() };
    }

    pub fn set_node(&mut self, new_node: NodeId) {
        match self {
            Self::Node { node, .. } => *node = new_node,
            _ => {
                *self = Self::Node {
                    node: new_node,
                    time: self.time(),
                }
            }
        }
    }

    /// Move to chart coordinates `xi` in `element`.
    ///
    /// # Errors
    ///
    /// Fails without touching the location if `dimension` is not the element's
    /// dimension, if `xi` does not hold exactly `dimension` values, or if
    /// `parent` is not of higher dimension than `element`.
    pub fn set_element_xi(
        &mut self,
        element: &Element,
        dimension: usize,
        xi: &[f64],
        parent: Option<&Element>,
    ) -> Result<()> {
        if dimension != element.dimension {
            return Err(FieldCacheError::DimensionMismatch {
                element: element.id,
                expected: element.dimension,
                actual: dimension,
            });
        }
        if xi.len() != dimension {
            return Err(FieldCacheError::ValueCountMismatch {
                expected: dimension,
                actual: xi.len(),
            });
        }
        if let Some(parent) = parent {
            if parent.dimension <= element.dimension {
                return Err(FieldCacheError::InvalidParent {
                    element: element.id,
                    parent: parent.id,
                });
            }
        }
        let new_chart = ChartCoordinates::new(xi).ok_or(FieldCacheError::ValueCountMismatch {
            expected: dimension,
            actual: xi.len(),
        })?;
        let new_parent = parent.map(|p| p.id);

        match self {
            Self::Element {
                element: current,
                chart,
                parent,
                ..
            } => {
                *current = element.id;
                *chart = new_chart;
                *parent = new_parent;
            }
            _ => {
                *self = Self::Element {
                    element: element.id,
                    chart: new_chart,
                    parent: new_parent,
                    time: self.time(),
                }
            }
        }
        Ok(())
    }

    /// Prescribe `values` for a reference field with `number_of_components`.
    ///
    /// # Errors
    ///
    /// Fails without touching the location if the value count differs from
    /// the component count.
    pub fn set_field_values(
        &mut self,
        field: FieldId,
        number_of_components: usize,
        new_values: &[f64],
    ) -> Result<()> {
        if new_values.len() != number_of_components {
            return Err(FieldCacheError::ValueCountMismatch {
                expected: number_of_components,
                actual: new_values.len(),
            });
        }
        match self {
            Self::FieldValues {
                field: current,
                values,
                ..
            } => {
                *current = field;
                values.clear();
                values.extend_from_slice(new_values);
            }
            _ => {
                *self = Self::FieldValues {
                    field,
                    values: new_values.to_vec(),
                    time: self.time(),
                }
            }
        }
        Ok(())
    }
}
