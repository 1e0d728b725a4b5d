use crate::error::{Error, Result};
use crate::geometry::Transform;
use crate::ids::{
    self, BuildingId, PointId, decode_building, decode_point, extract_building_id_number,
    extract_point_id_number, max_existing_id,
};
use crate::svg::{ATTR_A_ID, ATTR_B_ID, Canvas, ElementId, InsertAt, NewElement};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Label of the layer that collects generated lines and entrances.
pub const NAVIGATION_LAYER: &str = "navigation";

/// Value written to `flutter_maps:modified_by_code`.
pub const MODIFIED_BY: &str = "navmap";

/// Neighbor ids kept in insertion order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborSet(Vec<PointId>);

impl NeighborSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `id` was already present.
    pub fn insert(&mut self, id: PointId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.0.contains(&id)
    }

    pub fn retain<F: FnMut(PointId) -> bool>(&mut self, mut keep: F) {
        self.0.retain(|id| keep(*id));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PointId] {
        &self.0
    }
}

impl FromIterator<PointId> for NeighborSet {
    fn from_iter<I: IntoIterator<Item = PointId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[derive(Debug, Clone)]
pub struct PointRecord {
    pub id: PointId,
    pub neighbors: NeighborSet,
    pub element: ElementId,
}

impl PointRecord {
    pub fn encode(&self) -> String {
        ids::encode_point(self.id, self.neighbors.iter())
    }
}

#[derive(Debug, Clone)]
pub struct BuildingRecord {
    pub id: BuildingId,
    pub kind: String,
    pub subtype: Option<String>,
    pub entrances: Vec<PointId>,
    pub element: ElementId,
}

impl BuildingRecord {
    pub fn encode(&self) -> String {
        ids::encode_building(&self.kind, self.subtype.as_deref(), self.id, &self.entrances)
    }
}

/// Any element carrying at least one endpoint reference attribute.
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub element: ElementId,
    pub a: Option<PointId>,
    pub b: Option<PointId>,
}

/// Snapshot of every navigation entity in one document. Built once per
/// operation and dropped with it.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    points: BTreeMap<PointId, PointRecord>,
    buildings: BTreeMap<BuildingId, BuildingRecord>,
    edges: Vec<EdgeRecord>,
    entrance_ids: BTreeSet<PointId>,
    max_point_id: PointId,
    max_building_id: BuildingId,
}

impl DocumentIndex {
    pub fn scan<C: Canvas + ?Sized>(canvas: &C) -> Self {
        let mut index = Self::default();
        let mut all_ids = Vec::new();

        for element in canvas.elements() {
            let Some(id_attr) = canvas.attribute(element, crate::svg::ATTR_ID) else {
                continue;
            };
            all_ids.push(id_attr);

            if let Some(code) = decode_point(id_attr) {
                if index.points.contains_key(&code.id) {
                    warn!(id = id_attr, "duplicate point id; keeping the first element");
                } else {
                    index.points.insert(
                        code.id,
                        PointRecord {
                            id: code.id,
                            neighbors: code.neighbors.into_iter().collect(),
                            element,
                        },
                    );
                }
            } else if let Some(code) = decode_building(id_attr) {
                if index.buildings.contains_key(&code.id) {
                    warn!(id = id_attr, "duplicate building id; keeping the first element");
                } else {
                    index.entrance_ids.extend(code.entrances.iter().copied());
                    index.buildings.insert(
                        code.id,
                        BuildingRecord {
                            id: code.id,
                            kind: code.kind,
                            subtype: code.subtype,
                            entrances: code.entrances,
                            element,
                        },
                    );
                }
            }

            // drawn as <line> here, as <path> by older tooling
            let a_attr = canvas.attribute(element, ATTR_A_ID);
            let b_attr = canvas.attribute(element, ATTR_B_ID);
            if a_attr.is_some() || b_attr.is_some() {
                index.edges.push(EdgeRecord {
                    element,
                    a: a_attr.and_then(|v| v.trim().parse().ok()),
                    b: b_attr.and_then(|v| v.trim().parse().ok()),
                });
            }
        }

        index.max_point_id = max_existing_id(all_ids.iter().copied(), extract_point_id_number);
        index.max_building_id =
            max_existing_id(all_ids.iter().copied(), extract_building_id_number);
        debug!(
            points = index.points.len(),
            buildings = index.buildings.len(),
            edges = index.edges.len(),
            "scanned document"
        );
        index
    }

    pub fn points(&self) -> impl Iterator<Item = &PointRecord> {
        self.points.values()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &BuildingRecord> {
        self.buildings.values()
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    pub fn point(&self, id: PointId) -> Option<&PointRecord> {
        self.points.get(&id)
    }

    pub fn contains_point(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    /// Whether some building lists `id` among its entrances.
    pub fn is_entrance(&self, id: PointId) -> bool {
        self.entrance_ids.contains(&id)
    }

    pub fn max_point_id(&self) -> PointId {
        self.max_point_id
    }

    pub fn max_building_id(&self) -> BuildingId {
        self.max_building_id
    }

    pub fn allocator(&self) -> IdAllocator {
        IdAllocator {
            last_point: self.max_point_id,
            last_building: self.max_building_id,
        }
    }
}

/// Hands out ids strictly above everything seen in the document and
/// everything handed out before.
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    last_point: PointId,
    last_building: BuildingId,
}

impl IdAllocator {
    pub fn next_point_id(&mut self) -> Result<PointId> {
        self.last_point = self
            .last_point
            .checked_add(1)
            .ok_or(Error::IdSpaceExhausted("point"))?;
        Ok(self.last_point)
    }

    pub fn next_building_id(&mut self) -> Result<BuildingId> {
        self.last_building = self
            .last_building
            .checked_add(1)
            .ok_or(Error::IdSpaceExhausted("building"))?;
        Ok(self.last_building)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    SetId { element: ElementId, id: String },
    Remove(ElementId),
    /// A line placed below everything else in the navigation layer.
    AddLine(NewElement),
    /// An entrance appended on top of the navigation layer.
    AddEntrance(NewElement),
}

/// What an applied change set did to the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub ids_written: usize,
    pub removed: usize,
    pub lines_added: usize,
    pub entrances_added: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Mutations planned by an operation. Nothing touches the document until
/// [`ChangeSet::apply`], so a failed operation leaves it unchanged.
#[derive(Debug, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_id(&mut self, element: ElementId, id: String) {
        self.changes.push(Change::SetId { element, id });
    }

    pub fn remove(&mut self, element: ElementId) {
        self.changes.push(Change::Remove(element));
    }

    pub fn add_line(&mut self, line: NewElement) {
        self.changes.push(Change::AddLine(line));
    }

    pub fn add_entrance(&mut self, entrance: NewElement) {
        self.changes.push(Change::AddEntrance(entrance));
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn apply<C: Canvas + ?Sized>(self, canvas: &mut C) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        let mut layer: Option<ElementId> = None;

        for change in self.changes {
            match change {
                Change::SetId { element, id } => {
                    canvas.set_attribute(element, crate::svg::ATTR_ID, &id);
                    summary.ids_written += 1;
                }
                Change::Remove(element) => {
                    canvas.remove(element);
                    summary.removed += 1;
                }
                Change::AddLine(line) => {
                    let target = *layer.get_or_insert_with(|| ensure_navigation_layer(canvas));
                    canvas.insert(target, InsertAt::First, line);
                    summary.lines_added += 1;
                }
                Change::AddEntrance(entrance) => {
                    let target = *layer.get_or_insert_with(|| ensure_navigation_layer(canvas));
                    canvas.insert(target, InsertAt::Last, entrance);
                    summary.entrances_added += 1;
                }
            }
        }
        summary
    }
}

/// Finds or creates the navigation layer and makes it the last child of the root.
pub fn ensure_navigation_layer<C: Canvas + ?Sized>(canvas: &mut C) -> ElementId {
    let layer = canvas
        .find_layer(NAVIGATION_LAYER)
        .unwrap_or_else(|| canvas.create_layer(NAVIGATION_LAYER));
    canvas.move_to_end(layer);
    layer
}

/// Composed transform the navigation layer will have once it sits directly
/// under the root, without touching the document.
pub fn navigation_layer_frame<C: Canvas + ?Sized>(canvas: &C) -> Transform {
    let root = canvas.composed_transform(canvas.root());
    match canvas.find_layer(NAVIGATION_LAYER) {
        Some(layer) => root * canvas.local_transform(layer),
        None => root,
    }
}

/// Maps document coordinates into the navigation layer.
pub fn navigation_layer_inverse<C: Canvas + ?Sized>(canvas: &C) -> Result<Transform> {
    let frame = navigation_layer_frame(canvas);
    frame
        .inverse()
        .ok_or_else(|| Error::DegenerateTransform(frame.to_svg()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::{Canvas, SvgDocument};

    const MAP: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:flutter_maps="urn:flutter-maps:navigation">
  <ellipse id="point-3=4-9" cx="0" cy="0" rx="1" ry="1"/>
  <circle id="point-4=3" cx="5" cy="0" r="1"/>
  <rect id="shop-2=4" x="0" y="0" width="4" height="4"/>
  <rect id="toilet-male-7=" x="0" y="0" width="4" height="4"/>
  <rect id="unrelated" x="0" y="0" width="4" height="4"/>
  <line id="nav_line-3-4" x1="0" y1="0" x2="5" y2="0" flutter_maps:a_id="3" flutter_maps:b_id="4"/>
  <line id="plain" x1="0" y1="0" x2="5" y2="0"/>
  <text id="point-12">not a marker but still counted</text>
</svg>"#;

    #[test]
    fn scan_collects_every_entity() {
        let doc = SvgDocument::parse(MAP).unwrap();
        let index = DocumentIndex::scan(&doc);

        let ids: Vec<PointId> = index.points().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 4, 12]);
        assert_eq!(index.point(3).unwrap().neighbors.as_slice(), &[4, 9]);
        assert_eq!(index.buildings().count(), 2);
        assert_eq!(index.edges().len(), 1);
        assert_eq!(index.edges()[0].a, Some(3));
        assert!(index.is_entrance(4));
        assert!(!index.is_entrance(3));
        assert_eq!(index.max_point_id(), 12);
        assert_eq!(index.max_building_id(), 7);
    }

    #[test]
    fn allocator_is_monotonic_per_namespace() {
        let doc = SvgDocument::parse(MAP).unwrap();
        let mut ids = DocumentIndex::scan(&doc).allocator();
        assert_eq!(ids.next_point_id().unwrap(), 13);
        assert_eq!(ids.next_point_id().unwrap(), 14);
        assert_eq!(ids.next_building_id().unwrap(), 8);
    }

    #[test]
    fn allocator_refuses_to_wrap() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
  <circle id="point-18446744073709551615" r="1"/>
  <rect id="shop-18446744073709551615=" width="1" height="1"/>
</svg>"#,
        )
        .unwrap();
        let mut ids = DocumentIndex::scan(&doc).allocator();
        assert!(matches!(ids.next_point_id(), Err(Error::IdSpaceExhausted("point"))));
        assert!(matches!(ids.next_building_id(), Err(Error::IdSpaceExhausted("building"))));
        // a failed call does not move the counter
        assert!(ids.next_point_id().is_err());
    }

    #[test]
    fn neighbor_set_keeps_first_insertion_order() {
        let mut set: NeighborSet = [5, 2, 5, 9].into_iter().collect();
        assert_eq!(set.as_slice(), &[5, 2, 9]);
        assert!(!set.insert(2));
        assert!(set.insert(1));
        set.retain(|id| id != 5);
        assert_eq!(set.as_slice(), &[2, 9, 1]);
    }

    #[test]
    fn change_set_leaves_document_alone_until_applied() {
        let mut doc = SvgDocument::parse(MAP).unwrap();
        let shop = doc.find_by_id("unrelated").unwrap();
        let mut changes = ChangeSet::new();
        changes.set_id(shop, "shop-8=".to_string());
        changes.add_line(NewElement::line(Default::default(), Default::default()));
        assert!(doc.find_by_id("shop-8=").is_none());
        assert!(doc.find_layer(NAVIGATION_LAYER).is_none());

        let summary = changes.apply(&mut doc);
        assert_eq!(summary.ids_written, 1);
        assert_eq!(summary.lines_added, 1);
        assert!(doc.find_by_id("shop-8=").is_some());
        let layer = doc.find_layer(NAVIGATION_LAYER).unwrap();
        assert_eq!(doc.children(doc.root()).last(), Some(&layer));
    }

    #[test]
    fn layer_frame_predicts_relocation() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
  <g transform="translate(100,0)">
    <g inkscape:groupmode="layer" inkscape:label="navigation" transform="scale(2)"/>
  </g>
</svg>"#,
        )
        .unwrap();
        assert_eq!(navigation_layer_frame(&doc), Transform::scale(2.0, 2.0));
    }
}
