use super::tree::XmlTree;
use super::{
    ATTR_GROUPMODE, ATTR_ID, ATTR_LABEL, Canvas, ElementId, FLUTTER_MAPS_NS, INKSCAPE_NS,
    InsertAt, NewElement, SVG_NS, ShapeKind, path,
};
use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Point, Transform};
use tracing::warn;

/// A parsed SVG file with an ordered selection.
#[derive(Debug, Clone)]
pub struct SvgDocument {
    tree: XmlTree,
    selection: Vec<ElementId>,
}

impl SvgDocument {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            tree: XmlTree::parse(text)?,
            selection: Vec::new(),
        })
    }

    /// Serializes the document, declaring the namespaces new attributes rely on.
    pub fn to_svg_string(&self) -> String {
        let mut tree = self.tree.clone();
        let root = self.root_index();
        if tree.attribute(root, "xmlns").is_none() {
            tree.set_attribute(root, "xmlns", SVG_NS);
        }
        for (prefix, uri) in [("inkscape", INKSCAPE_NS), ("flutter_maps", FLUTTER_MAPS_NS)] {
            let key = format!("xmlns:{prefix}");
            if tree.attribute(root, &key).is_none() && uses_prefix(&tree, root, prefix) {
                tree.set_attribute(root, &key, uri);
            }
        }
        tree.serialize()
    }

    pub fn find_by_id(&self, id: &str) -> Option<ElementId> {
        self.elements()
            .into_iter()
            .find(|el| self.attribute(*el, ATTR_ID) == Some(id))
    }

    /// Selects elements by `id` attribute, keeping the given order.
    pub fn select_ids<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let mut selection = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            let element = self
                .find_by_id(id)
                .ok_or_else(|| Error::UnknownElement(id.to_string()))?;
            if !selection.contains(&element) {
                selection.push(element);
            }
        }
        self.selection = selection;
        Ok(())
    }

    pub fn tag_name(&self, element: ElementId) -> Option<&str> {
        self.tree.local_name(element.0)
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.tree.element_children(element.0).map(ElementId).collect()
    }

    fn root_index(&self) -> usize {
        // parse() guarantees a root element
        self.tree.root_element().unwrap_or(XmlTree::DOCUMENT)
    }

    fn numbers(&self, element: ElementId, names: &[&str]) -> Vec<f64> {
        names
            .iter()
            .map(|name| self.number_attribute(element, name))
            .collect()
    }

    fn local_geometry_box(&self, element: ElementId, transform: &Transform) -> Option<BoundingBox> {
        match self.tag_name(element)? {
            "circle" => {
                let v = self.numbers(element, &["cx", "cy", "r"]);
                Some(ellipse_box(Point::new(v[0], v[1]), v[2], v[2], transform))
            }
            "ellipse" => {
                let v = self.numbers(element, &["cx", "cy", "rx", "ry"]);
                Some(ellipse_box(Point::new(v[0], v[1]), v[2], v[3], transform))
            }
            "rect" | "image" => {
                let v = self.numbers(element, &["x", "y", "width", "height"]);
                Some(BoundingBox::new(v[0], v[1], v[0] + v[2], v[1] + v[3]).transformed(transform))
            }
            "line" => {
                let v = self.numbers(element, &["x1", "y1", "x2", "y2"]);
                BoundingBox::from_points([
                    transform.apply(Point::new(v[0], v[1])),
                    transform.apply(Point::new(v[2], v[3])),
                ])
            }
            "polyline" | "polygon" => {
                let coords =
                    crate::geometry::parse_numbers(self.attribute(element, "points")?)?;
                BoundingBox::from_points(
                    coords
                        .chunks_exact(2)
                        .map(|pair| transform.apply(Point::new(pair[0], pair[1]))),
                )
            }
            "path" => path::bounding_box(self.attribute(element, "d")?, transform),
            "g" | "a" | "switch" | "svg" => {
                let mut bbox: Option<BoundingBox> = None;
                for child in self.children(element) {
                    if let Some(child_box) = self.bounding_box(child) {
                        bbox = Some(match bbox {
                            Some(current) => current.union(&child_box),
                            None => child_box,
                        });
                    }
                }
                bbox.map(|b| b.transformed(transform))
            }
            _ => None,
        }
    }
}

fn uses_prefix(tree: &XmlTree, root: usize, prefix: &str) -> bool {
    let marker = format!("{prefix}:");
    std::iter::once(root)
        .chain(tree.descendants(root))
        .any(|el| {
            tree.name(el).is_some_and(|name| name.starts_with(&marker))
                || tree
                    .attribute_names(el)
                    .any(|name| name.starts_with(&marker))
        })
}

/// Exact box of an axis-aligned ellipse after an affine transform.
fn ellipse_box(center: Point, rx: f64, ry: f64, t: &Transform) -> BoundingBox {
    let c = t.apply(center);
    let half_w = ((t.a * rx).powi(2) + (t.c * ry).powi(2)).sqrt();
    let half_h = ((t.b * rx).powi(2) + (t.d * ry).powi(2)).sqrt();
    BoundingBox::around(c, half_w, half_h)
}

impl Canvas for SvgDocument {
    fn elements(&self) -> Vec<ElementId> {
        let root = self.root_index();
        std::iter::once(root)
            .chain(self.tree.descendants(root))
            .map(ElementId)
            .collect()
    }

    fn selection(&self) -> Vec<ElementId> {
        self.selection
            .iter()
            .copied()
            .filter(|el| self.tree.is_attached(el.0))
            .collect()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str> {
        self.tree.attribute(element.0, name)
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) {
        self.tree.set_attribute(element.0, name, value);
    }

    fn shape_kind(&self, element: ElementId) -> ShapeKind {
        match self.tag_name(element) {
            Some("circle") => ShapeKind::Circle,
            Some("ellipse") => ShapeKind::Ellipse,
            Some("line") => ShapeKind::Line,
            Some("g") => ShapeKind::Group,
            _ => ShapeKind::Other,
        }
    }

    fn bounding_box(&self, element: ElementId) -> Option<BoundingBox> {
        let transform = self.local_transform(element);
        self.local_geometry_box(element, &transform)
    }

    fn local_transform(&self, element: ElementId) -> Transform {
        let Some(text) = self.attribute(element, "transform") else {
            return Transform::identity();
        };
        Transform::parse(text).unwrap_or_else(|| {
            warn!(transform = text, "ignoring malformed transform attribute");
            Transform::identity()
        })
    }

    fn composed_transform(&self, element: ElementId) -> Transform {
        let own = self.local_transform(element);
        match self.parent(element) {
            Some(parent) => self.composed_transform(parent) * own,
            None => own,
        }
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.tree
            .parent(element.0)
            .filter(|p| self.tree.is_element(*p))
            .map(ElementId)
    }

    fn root(&self) -> ElementId {
        ElementId(self.root_index())
    }

    fn find_layer(&self, label: &str) -> Option<ElementId> {
        self.elements().into_iter().find(|el| {
            self.tag_name(*el) == Some("g")
                && self.attribute(*el, ATTR_GROUPMODE) == Some("layer")
                && self.attribute(*el, ATTR_LABEL) == Some(label)
        })
    }

    fn create_layer(&mut self, label: &str) -> ElementId {
        let root = self.root_index();
        let id = self.tree.create_element(
            root,
            None,
            "g",
            vec![
                (ATTR_ID.to_string(), format!("{label}-layer")),
                (ATTR_GROUPMODE.to_string(), "layer".to_string()),
                (ATTR_LABEL.to_string(), label.to_string()),
            ],
        );
        ElementId(id)
    }

    fn move_to_end(&mut self, element: ElementId) {
        let root = self.root_index();
        self.tree.attach(element.0, root, None);
    }

    fn insert(&mut self, parent: ElementId, at: InsertAt, element: NewElement) -> ElementId {
        let index = match at {
            InsertAt::First => Some(0),
            InsertAt::Last => None,
        };
        ElementId(
            self.tree
                .create_element(parent.0, index, element.tag, element.attributes),
        )
    }

    fn remove(&mut self, element: ElementId) {
        self.tree.detach(element.0);
        self.selection.retain(|el| *el != element);
    }
}
