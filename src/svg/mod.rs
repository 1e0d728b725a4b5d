mod document;
mod path;
mod tree;

pub use document::SvgDocument;

use crate::geometry::{BoundingBox, Point, Transform};
use once_cell::sync::Lazy;
use regex::Regex;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const INKSCAPE_NS: &str = "http://www.inkscape.org/namespaces/inkscape";
pub const FLUTTER_MAPS_NS: &str = "urn:flutter-maps:navigation";

pub const ATTR_ID: &str = "id";
pub const ATTR_LABEL: &str = "inkscape:label";
pub const ATTR_GROUPMODE: &str = "inkscape:groupmode";
pub const ATTR_A_ID: &str = "flutter_maps:a_id";
pub const ATTR_B_ID: &str = "flutter_maps:b_id";
pub const ATTR_TYPE: &str = "flutter_maps:type";
pub const ATTR_SUBTYPE: &str = "flutter_maps:subtype";
pub const ATTR_BUILDING_ID: &str = "flutter_maps:building_id";
pub const ATTR_MODIFIED_BY: &str = "flutter_maps:modified_by_code";

static LEADING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
});

/// Opaque handle to an element of the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Ellipse,
    Line,
    Group,
    Other,
}

impl ShapeKind {
    /// Circles and ellipses are the only shapes that can act as points.
    pub fn is_point_marker(&self) -> bool {
        matches!(self, ShapeKind::Circle | ShapeKind::Ellipse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    First,
    Last,
}

/// An element to be created by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct NewElement {
    pub tag: &'static str,
    pub attributes: Vec<(String, String)>,
}

impl NewElement {
    pub fn line(start: Point, end: Point) -> Self {
        Self {
            tag: "line",
            attributes: vec![
                ("x1".to_string(), start.x.to_string()),
                ("y1".to_string(), start.y.to_string()),
                ("x2".to_string(), end.x.to_string()),
                ("y2".to_string(), end.y.to_string()),
            ],
        }
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self {
            tag: "circle",
            attributes: vec![
                ("cx".to_string(), center.x.to_string()),
                ("cy".to_string(), center.y.to_string()),
                ("r".to_string(), radius.to_string()),
            ],
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
        self
    }

    pub fn with_style(self, properties: &[(&str, String)]) -> Self {
        let style = properties
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect::<Vec<_>>()
            .join(";");
        self.with_attribute("style", style)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The host document as seen by the navigation operations.
pub trait Canvas {
    /// Every element in document order.
    fn elements(&self) -> Vec<ElementId>;

    /// Selected elements in the order the user selected them.
    fn selection(&self) -> Vec<ElementId>;

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str);

    fn shape_kind(&self, element: ElementId) -> ShapeKind;

    /// Bounding box in the coordinate frame of the element's parent
    /// (the element's own transform applied).
    fn bounding_box(&self, element: ElementId) -> Option<BoundingBox>;

    /// The element's own `transform`.
    fn local_transform(&self, element: ElementId) -> Transform;

    /// Own transform composed with every ancestor's.
    fn composed_transform(&self, element: ElementId) -> Transform;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn root(&self) -> ElementId;

    fn find_layer(&self, label: &str) -> Option<ElementId>;

    /// Creates an empty layer as the last child of the root.
    fn create_layer(&mut self, label: &str) -> ElementId;

    /// Relocates `element` to be the last child of the root.
    fn move_to_end(&mut self, element: ElementId);

    fn insert(&mut self, parent: ElementId, at: InsertAt, element: NewElement) -> ElementId;

    fn remove(&mut self, element: ElementId);

    /// Every `id` attribute in the document.
    fn element_ids(&self) -> Vec<String> {
        self.elements()
            .into_iter()
            .filter_map(|el| self.attribute(el, ATTR_ID).map(str::to_string))
            .collect()
    }

    /// Numeric attribute value, ignoring a trailing unit suffix; 0 when absent.
    fn number_attribute(&self, element: ElementId, name: &str) -> f64 {
        self.attribute(element, name)
            .and_then(parse_leading_number)
            .unwrap_or(0.0)
    }
}

pub(crate) fn parse_leading_number(text: &str) -> Option<f64> {
    let caps = LEADING_NUMBER_RE.captures(text)?;
    caps[1].parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_numbers_ignore_units() {
        assert_eq!(parse_leading_number("12.5px"), Some(12.5));
        assert_eq!(parse_leading_number(" -3"), Some(-3.0));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("1e2"), Some(100.0));
        assert_eq!(parse_leading_number("auto"), None);
    }

    #[test]
    fn new_elements_carry_style() {
        let line = NewElement::line(Point::new(0.0, 1.0), Point::new(2.0, 3.0))
            .with_style(&[("stroke", "red".to_string()), ("stroke-width", "0.5".to_string())])
            .with_attribute("id", "nav_line-1-2");
        assert_eq!(line.attribute("x2"), Some("2"));
        assert_eq!(line.attribute("style"), Some("stroke:red;stroke-width:0.5"));
        assert_eq!(line.attribute("id"), Some("nav_line-1-2"));
    }
}
