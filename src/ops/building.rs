use crate::config::{
    AnchorPosition, BuildingOptions, EntranceOptions, Placement, Separation, SortOptions,
};
use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Point, Transform};
use crate::graph::{
    BuildingRecord, ChangeSet, ChangeSummary, DocumentIndex, IdAllocator, MODIFIED_BY,
    navigation_layer_inverse,
};
use crate::ids;
use crate::svg::{
    ATTR_BUILDING_ID, ATTR_ID, ATTR_LABEL, ATTR_MODIFIED_BY, ATTR_SUBTYPE, ATTR_TYPE, Canvas,
    ElementId, NewElement,
};
use tracing::{debug, info};

use super::sort_by_center;

const TEN_PERCENT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    Middle,
    End,
}

fn horizontal_side(anchor: AnchorPosition) -> Side {
    use AnchorPosition::*;
    match anchor {
        UpperLeft | CenterLeft | LowerLeft => Side::Start,
        UpperCenter | Center | LowerCenter => Side::Middle,
        UpperRight | CenterRight | LowerRight => Side::End,
    }
}

fn vertical_side(anchor: AnchorPosition) -> Side {
    use AnchorPosition::*;
    match anchor {
        UpperLeft | UpperCenter | UpperRight => Side::Start,
        CenterLeft | Center | CenterRight => Side::Middle,
        LowerLeft | LowerCenter | LowerRight => Side::End,
    }
}

/// Exact point of `bbox` named by `anchor`.
pub fn anchor_point(bbox: &BoundingBox, anchor: AnchorPosition) -> Point {
    let center = bbox.center();
    let x = match horizontal_side(anchor) {
        Side::Start => bbox.left,
        Side::Middle => center.x,
        Side::End => bbox.right,
    };
    let y = match vertical_side(anchor) {
        Side::Start => bbox.top,
        Side::Middle => center.y,
        Side::End => bbox.bottom,
    };
    Point::new(x, y)
}

/// Edge alignment on a single axis. Left/right anchors (corners included)
/// resolve horizontally; upper/lower center resolve vertically.
fn border_displacement(
    anchor: AnchorPosition,
    building: &BoundingBox,
    entrance: &BoundingBox,
    outside: bool,
) -> (f64, f64) {
    match (horizontal_side(anchor), vertical_side(anchor), outside) {
        (Side::Start, _, false) => (building.left - entrance.left, 0.0),
        (Side::Start, _, true) => (building.left - entrance.right, 0.0),
        (Side::End, _, false) => (building.right - entrance.right, 0.0),
        (Side::End, _, true) => (building.right - entrance.left, 0.0),
        (Side::Middle, Side::Start, false) => (0.0, building.top - entrance.top),
        (Side::Middle, Side::Start, true) => (0.0, building.top - entrance.bottom),
        (Side::Middle, Side::End, false) => (0.0, building.bottom - entrance.bottom),
        (Side::Middle, Side::End, true) => (0.0, building.bottom - entrance.top),
        (Side::Middle, Side::Middle, _) => (0.0, 0.0),
    }
}

/// Extra tenth of the building size on every axis the anchor is off-center.
fn ten_percent_offset(anchor: AnchorPosition, building: &BoundingBox, outside: bool) -> (f64, f64) {
    let sign = if outside { 1.0 } else { -1.0 };
    let step = |side: Side, extent: f64| match side {
        Side::Start => -TEN_PERCENT * extent * sign,
        Side::Middle => 0.0,
        Side::End => TEN_PERCENT * extent * sign,
    };
    (
        step(horizontal_side(anchor), building.width()),
        step(vertical_side(anchor), building.height()),
    )
}

/// Offset from the anchor to the entrance position. The center anchor is
/// never displaced.
pub fn entrance_displacement(
    anchor: AnchorPosition,
    separation: &Separation,
    building: &BoundingBox,
    entrance: &BoundingBox,
) -> Result<(f64, f64)> {
    if anchor == AnchorPosition::Center {
        return Ok((0.0, 0.0));
    }
    let displacement = match separation {
        Separation::CenterToCenter => (0.0, 0.0),
        Separation::BorderToBorderIn => border_displacement(anchor, building, entrance, false),
        Separation::BorderToBorderOut => border_displacement(anchor, building, entrance, true),
        Separation::TenPercentIn => {
            let (bx, by) = border_displacement(anchor, building, entrance, false);
            let (ex, ey) = ten_percent_offset(anchor, building, false);
            (bx + ex, by + ey)
        }
        Separation::TenPercentOut => {
            let (bx, by) = border_displacement(anchor, building, entrance, true);
            let (ex, ey) = ten_percent_offset(anchor, building, true);
            (bx + ex, by + ey)
        }
        Separation::Custom(_) => return Err(Error::NotImplemented("custom point separation")),
    };
    Ok(displacement)
}

/// Tags the selected shapes as buildings and gives each one an entrance
/// point in the navigation layer.
pub fn add_buildings<C: Canvas + ?Sized>(
    canvas: &mut C,
    building: &BuildingOptions,
    entrance: &EntranceOptions,
    sort: SortOptions,
) -> Result<ChangeSummary> {
    let changes = plan_buildings(&*canvas, building, entrance, sort)?;
    let summary = changes.apply(canvas);
    info!(
        buildings = summary.ids_written,
        entrances = summary.entrances_added,
        "added buildings"
    );
    Ok(summary)
}

pub fn plan_buildings<C: Canvas + ?Sized>(
    canvas: &C,
    options: &BuildingOptions,
    entrance: &EntranceOptions,
    sort: SortOptions,
) -> Result<ChangeSet> {
    let selection = canvas.selection();
    if selection.is_empty() {
        return Err(Error::InsufficientSelection { needed: 1, got: 0 });
    }
    let candidates = sort_by_center(canvas, selection, sort);

    let index = DocumentIndex::scan(canvas);
    let mut allocator = index.allocator();
    let mut layer_inverse: Option<Transform> = None;
    let mut changes = ChangeSet::new();

    for element in candidates {
        let id_attr = canvas.attribute(element, ATTR_ID).unwrap_or("");
        if ids::decode_point(id_attr).is_some() {
            debug!(id = id_attr, "skipping point marker");
            continue;
        }

        let mut record = match ids::decode_building(id_attr) {
            Some(code) if !code.entrances.is_empty() => {
                debug!(id = id_attr, "building already has entrances");
                continue;
            }
            Some(code) => BuildingRecord {
                id: code.id,
                kind: code.kind,
                subtype: code.subtype,
                entrances: code.entrances,
                element,
            },
            None => {
                let (kind, subtype) = options.kind.type_and_subtype();
                BuildingRecord {
                    id: allocator.next_building_id()?,
                    kind,
                    subtype,
                    entrances: Vec::new(),
                    element,
                }
            }
        };

        if let Some(placement) = &options.connection_point {
            let inverse = match layer_inverse {
                Some(inverse) => inverse,
                None => *layer_inverse.insert(navigation_layer_inverse(canvas)?),
            };
            let circle =
                plan_entrance(canvas, &mut record, placement, entrance, &mut allocator, &inverse)?;
            changes.add_entrance(circle);
        }

        let encoded = record.encode();
        if encoded != id_attr {
            changes.set_id(element, encoded);
        }
    }

    Ok(changes)
}

fn plan_entrance<C: Canvas + ?Sized>(
    canvas: &C,
    record: &mut BuildingRecord,
    placement: &Placement,
    options: &EntranceOptions,
    allocator: &mut IdAllocator,
    layer_inverse: &Transform,
) -> Result<NewElement> {
    let element: ElementId = record.element;
    let bbox = canvas.bounding_box(element).ok_or_else(|| {
        Error::MissingBoundingBox(canvas.attribute(element, ATTR_ID).unwrap_or("").to_string())
    })?;

    let anchor = anchor_point(&bbox, placement.anchor);
    let entrance_box = BoundingBox::around(anchor, options.radius, options.radius);
    let (dx, dy) = entrance_displacement(
        placement.anchor,
        &placement.separation,
        &bbox,
        &entrance_box,
    )?;

    // bbox is in the parent's frame
    let parent_frame = canvas
        .parent(element)
        .map(|parent| canvas.composed_transform(parent))
        .unwrap_or_default();
    let global = parent_frame.apply(Point::new(anchor.x + dx, anchor.y + dy));
    let target = layer_inverse.apply(global);

    let point_id = allocator.next_point_id()?;
    record.entrances.push(point_id);
    debug!(
        building = record.id,
        point = point_id,
        x = target.x,
        y = target.y,
        "placing entrance"
    );

    Ok(NewElement::circle(target, options.radius)
        .with_style(&[
            ("fill", options.fill_color.clone()),
            ("stroke", options.stroke_color.clone()),
            ("stroke-width", options.stroke_width.to_string()),
        ])
        .with_attribute(ATTR_TYPE, "point")
        .with_attribute(ATTR_SUBTYPE, "entrance")
        .with_attribute(ATTR_BUILDING_ID, record.id.to_string())
        .with_attribute(ATTR_MODIFIED_BY, MODIFIED_BY)
        .with_attribute(ATTR_LABEL, format!("building_point:{}", record.id))
        .with_attribute(ATTR_ID, ids::encode_point(point_id, std::iter::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildingKind, BuildingType};
    use crate::graph::Change;
    use crate::svg::SvgDocument;

    fn building() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 20.0)
    }

    fn entrance_at(anchor: AnchorPosition) -> BoundingBox {
        BoundingBox::around(anchor_point(&building(), anchor), 1.0, 1.0)
    }

    fn displacement(anchor: AnchorPosition, separation: Separation) -> (f64, f64) {
        entrance_displacement(anchor, &separation, &building(), &entrance_at(anchor)).unwrap()
    }

    #[test]
    fn anchors_map_to_box_coordinates() {
        let bbox = building();
        assert_eq!(anchor_point(&bbox, AnchorPosition::LowerRight), Point::new(10.0, 20.0));
        assert_eq!(anchor_point(&bbox, AnchorPosition::UpperLeft), Point::new(0.0, 0.0));
        assert_eq!(anchor_point(&bbox, AnchorPosition::CenterLeft), Point::new(0.0, 10.0));
        assert_eq!(anchor_point(&bbox, AnchorPosition::UpperCenter), Point::new(5.0, 0.0));
        assert_eq!(anchor_point(&bbox, AnchorPosition::Center), Point::new(5.0, 10.0));
    }

    #[test]
    fn lower_center_outside_touches_bottom_edge() {
        let entrance = entrance_at(AnchorPosition::LowerCenter);
        let (dx, dy) = displacement(AnchorPosition::LowerCenter, Separation::BorderToBorderOut);
        assert_eq!(dx, 0.0);
        assert_eq!(dy, building().bottom - entrance.top);
        assert_eq!(dy, 1.0);
    }

    #[test]
    fn border_strategies_move_along_one_axis() {
        use AnchorPosition::{CenterRight, UpperCenter, UpperLeft};
        use Separation::{BorderToBorderIn as In, BorderToBorderOut as Out};
        assert_eq!(displacement(UpperLeft, In), (1.0, 0.0));
        assert_eq!(displacement(UpperLeft, Out), (-1.0, 0.0));
        assert_eq!(displacement(CenterRight, In), (-1.0, 0.0));
        assert_eq!(displacement(UpperCenter, In), (0.0, 1.0));
        assert_eq!(displacement(UpperCenter, Out), (0.0, -1.0));
    }

    #[test]
    fn ten_percent_adds_offset_on_both_axes_for_corners() {
        // width 10, height 20
        use AnchorPosition::{LowerCenter, LowerRight};
        assert_eq!(displacement(LowerRight, Separation::TenPercentOut), (2.0, 2.0));
        assert_eq!(displacement(LowerRight, Separation::TenPercentIn), (-2.0, -2.0));
        assert_eq!(displacement(LowerCenter, Separation::TenPercentOut), (0.0, 3.0));
    }

    #[test]
    fn center_is_never_displaced() {
        let center = AnchorPosition::Center;
        assert_eq!(displacement(center, Separation::BorderToBorderOut), (0.0, 0.0));
        assert_eq!(
            displacement(center, Separation::Custom("10px-in-border".to_string())),
            (0.0, 0.0)
        );
        assert_eq!(displacement(AnchorPosition::LowerLeft, Separation::CenterToCenter), (0.0, 0.0));
    }

    #[test]
    fn custom_separation_is_not_implemented() {
        let err = entrance_displacement(
            AnchorPosition::LowerLeft,
            &Separation::Custom("1px".to_string()),
            &building(),
            &entrance_at(AnchorPosition::LowerLeft),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }

    const MAP: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <g id="floor" transform="translate(100,50)">
    <rect id="r1" x="0" y="0" width="10" height="20"/>
    <rect id="parking-4=9" x="0" y="0" width="10" height="20"/>
    <circle id="point-9" cx="0" cy="0" r="1"/>
    <text id="label">x</text>
  </g>
</svg>"#;

    #[test]
    fn entrance_lands_in_document_coordinates() {
        let mut doc = SvgDocument::parse(MAP).unwrap();
        doc.select_ids(&["r1", "parking-4=9", "point-9"]).unwrap();
        let options = BuildingOptions {
            kind: BuildingKind::Preset(BuildingType::ToiletFemale),
            connection_point: Some(Placement {
                anchor: AnchorPosition::LowerCenter,
                separation: Separation::BorderToBorderOut,
            }),
        };
        let changes =
            plan_buildings(&doc, &options, &EntranceOptions::default(), SortOptions::default())
                .unwrap();

        let circles: Vec<&NewElement> = changes
            .changes()
            .iter()
            .filter_map(|c| match c {
                Change::AddEntrance(el) => Some(el),
                _ => None,
            })
            .collect();
        assert_eq!(circles.len(), 1);
        assert_eq!(circles[0].attribute("cx"), Some("105"));
        assert_eq!(circles[0].attribute("cy"), Some("71"));
        assert_eq!(circles[0].attribute(ATTR_ID), Some("point-10"));
        assert_eq!(circles[0].attribute(ATTR_BUILDING_ID), Some("5"));

        let ids: Vec<&str> = changes
            .changes()
            .iter()
            .filter_map(|c| match c {
                Change::SetId { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, ["toilet-female-5=10"]);
    }

    #[test]
    fn shapes_without_a_box_abort_placement() {
        let mut doc = SvgDocument::parse(MAP).unwrap();
        doc.select_ids(&["r1", "label"]).unwrap();
        let err = add_buildings(
            &mut doc,
            &BuildingOptions::default(),
            &EntranceOptions::default(),
            SortOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingBoundingBox(id) if id == "label"));
        assert!(doc.find_by_id("r1").is_some());
    }

    #[test]
    fn buildings_are_tagged_without_entrances() {
        let mut doc = SvgDocument::parse(MAP).unwrap();
        doc.select_ids(&["r1"]).unwrap();
        let options = BuildingOptions {
            connection_point: None,
            ..BuildingOptions::default()
        };
        let summary =
            add_buildings(&mut doc, &options, &EntranceOptions::default(), SortOptions::default())
                .unwrap();
        assert_eq!(summary.entrances_added, 0);
        assert!(doc.find_by_id("shop-5=").is_some());
    }

    #[test]
    fn exhausted_building_ids_abort() {
        let mut doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
  <rect id="shop-18446744073709551615=" width="4" height="4"/>
  <rect id="new" width="4" height="4"/>
</svg>"#,
        )
        .unwrap();
        doc.select_ids(&["new"]).unwrap();
        let err = add_buildings(
            &mut doc,
            &BuildingOptions::default(),
            &EntranceOptions::default(),
            SortOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::IdSpaceExhausted("building")));
        assert!(doc.find_by_id("new").is_some());
    }
}
