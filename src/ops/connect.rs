use crate::config::{ConnectOptions, SortOptions};
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::graph::{ChangeSet, ChangeSummary, DocumentIndex, MODIFIED_BY, NeighborSet};
use crate::ids::{self, PointId};
use crate::svg::{ATTR_A_ID, ATTR_B_ID, ATTR_ID, ATTR_MODIFIED_BY, Canvas, ElementId, NewElement};
use std::collections::HashSet;
use tracing::{debug, info};

use super::sort_by_center;

struct SelectedPoint {
    element: ElementId,
    id: PointId,
    neighbors: NeighborSet,
    current: Option<String>,
}

/// Links consecutive selected point markers to each other, optionally
/// drawing a line for every pair.
pub fn connect_points<C: Canvas + ?Sized>(
    canvas: &mut C,
    options: &ConnectOptions,
    sort: SortOptions,
) -> Result<ChangeSummary> {
    let changes = plan_connect(&*canvas, options, sort)?;
    let summary = changes.apply(canvas);
    info!(
        points_updated = summary.ids_written,
        lines = summary.lines_added,
        "connected points"
    );
    Ok(summary)
}

pub fn plan_connect<C: Canvas + ?Sized>(
    canvas: &C,
    options: &ConnectOptions,
    sort: SortOptions,
) -> Result<ChangeSet> {
    let markers: Vec<ElementId> = canvas
        .selection()
        .into_iter()
        .filter(|el| canvas.shape_kind(*el).is_point_marker())
        .collect();
    let markers = sort_by_center(canvas, markers, sort);
    if markers.len() < 2 {
        return Err(Error::InsufficientSelection {
            needed: 2,
            got: markers.len(),
        });
    }

    let index = DocumentIndex::scan(canvas);
    let mut allocator = index.allocator();
    let mut points: Vec<SelectedPoint> = markers
        .into_iter()
        .map(|element| -> Result<SelectedPoint> {
            let current = canvas.attribute(element, ATTR_ID).map(str::to_string);
            let point = match current.as_deref().and_then(ids::decode_point) {
                Some(code) => SelectedPoint {
                    element,
                    id: code.id,
                    neighbors: code.neighbors.into_iter().collect(),
                    current,
                },
                None => {
                    let id = allocator.next_point_id()?;
                    debug!(point = id, "assigning new point id");
                    SelectedPoint {
                        element,
                        id,
                        neighbors: NeighborSet::new(),
                        current,
                    }
                }
            };
            Ok(point)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut changes = ChangeSet::new();
    let mut line_ids: HashSet<String> = canvas.element_ids().into_iter().collect();

    for i in 0..points.len() - 1 {
        let (a_id, b_id) = (points[i].id, points[i + 1].id);
        if a_id == b_id {
            continue;
        }
        points[i].neighbors.insert(b_id);
        points[i + 1].neighbors.insert(a_id);

        if !options.draw_lines {
            continue;
        }
        let line_id = format!("nav_line-{a_id}-{b_id}");
        if line_ids.contains(&line_id) || line_ids.contains(&format!("nav_line-{b_id}-{a_id}")) {
            debug!(line = line_id.as_str(), "line already drawn");
            continue;
        }
        let start = endpoint(canvas, points[i].element, options.copy_transform.applies_to_a());
        let end = endpoint(canvas, points[i + 1].element, options.copy_transform.applies_to_b());
        let line = NewElement::line(start, end)
            .with_style(&[
                ("stroke", options.line_color.clone()),
                ("stroke-width", options.line_stroke_width.to_string()),
            ])
            .with_attribute(ATTR_MODIFIED_BY, MODIFIED_BY)
            .with_attribute(ATTR_A_ID, a_id.to_string())
            .with_attribute(ATTR_B_ID, b_id.to_string())
            .with_attribute(ATTR_ID, line_id.clone());
        changes.add_line(line);
        line_ids.insert(line_id);
    }

    for point in &points {
        let encoded = ids::encode_point(point.id, point.neighbors.iter());
        if point.current.as_deref() != Some(encoded.as_str()) {
            changes.set_id(point.element, encoded);
        }
    }

    Ok(changes)
}

/// Center of a point marker, optionally mapped through its own transform.
fn endpoint<C: Canvas + ?Sized>(canvas: &C, element: ElementId, copy_transform: bool) -> Point {
    let center = Point::new(
        canvas.number_attribute(element, "cx"),
        canvas.number_attribute(element, "cy"),
    );
    if copy_transform {
        canvas.local_transform(element).apply(center)
    } else {
        center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CopyTransform;
    use crate::graph::Change;
    use crate::svg::SvgDocument;

    const PAIR: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <ellipse id="point-1" cx="0" cy="0" rx="1" ry="1" transform="translate(10,0)"/>
  <ellipse id="point-2" cx="5" cy="5" rx="1" ry="1" transform="translate(0,10)"/>
  <ellipse id="fresh" cx="9" cy="9" rx="1" ry="1"/>
  <rect id="box" width="1" height="1"/>
</svg>"#;

    fn planned_line(doc: &SvgDocument, copy_transform: CopyTransform) -> NewElement {
        let options = ConnectOptions {
            copy_transform,
            ..ConnectOptions::default()
        };
        let changes = plan_connect(doc, &options, SortOptions::default()).unwrap();
        changes
            .changes()
            .iter()
            .find_map(|c| match c {
                Change::AddLine(line) => Some(line.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn copy_policy_picks_endpoint_frames() {
        let mut doc = SvgDocument::parse(PAIR).unwrap();
        doc.select_ids(&["point-1", "point-2"]).unwrap();

        let none = planned_line(&doc, CopyTransform::NoCopy);
        assert_eq!(none.attribute("x1"), Some("0"));
        assert_eq!(none.attribute("y2"), Some("5"));

        let a = planned_line(&doc, CopyTransform::CopyFromA);
        assert_eq!(a.attribute("x1"), Some("10"));
        assert_eq!(a.attribute("y2"), Some("5"));

        let b = planned_line(&doc, CopyTransform::CopyFromB);
        assert_eq!(b.attribute("x1"), Some("0"));
        assert_eq!(b.attribute("y2"), Some("15"));

        let both = planned_line(&doc, CopyTransform::CopyFromBoth);
        assert_eq!(both.attribute("x1"), Some("10"));
        assert_eq!(both.attribute("y2"), Some("15"));
        assert_eq!(both.attribute(ATTR_ID), Some("nav_line-1-2"));
        assert_eq!(both.attribute(ATTR_A_ID), Some("1"));
    }

    #[test]
    fn non_markers_do_not_count() {
        let mut doc = SvgDocument::parse(PAIR).unwrap();
        doc.select_ids(&["point-1", "box"]).unwrap();
        let err = connect_points(&mut doc, &ConnectOptions::default(), SortOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientSelection { needed: 2, got: 1 }));
        assert!(doc.find_by_id("point-1").is_some());
    }

    #[test]
    fn new_ids_continue_after_the_document_maximum() {
        let mut doc = SvgDocument::parse(PAIR).unwrap();
        doc.select_ids(&["fresh", "point-2", "point-1"]).unwrap();
        connect_points(&mut doc, &ConnectOptions::default(), SortOptions::default()).unwrap();
        assert!(doc.find_by_id("point-3=2").is_some());
        assert!(doc.find_by_id("point-2=3-1").is_some());
        assert!(doc.find_by_id("point-1=2").is_some());
        assert!(doc.find_by_id("nav_line-3-2").is_some());
        assert!(doc.find_by_id("nav_line-2-1").is_some());
    }

    #[test]
    fn exhausted_point_ids_fail_without_wrapping() {
        let mut doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
  <circle id="point-18446744073709551615" cx="0" cy="0" r="1"/>
  <circle id="fresh" cx="5" cy="0" r="1"/>
</svg>"#,
        )
        .unwrap();
        let before = doc.to_svg_string();
        doc.select_ids(&["point-18446744073709551615", "fresh"]).unwrap();
        let err = connect_points(&mut doc, &ConnectOptions::default(), SortOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::IdSpaceExhausted("point")));
        assert_eq!(doc.to_svg_string(), before);
    }

    #[test]
    fn reconnecting_draws_nothing_new() {
        let mut doc = SvgDocument::parse(PAIR).unwrap();
        doc.select_ids(&["point-1", "point-2"]).unwrap();
        connect_points(&mut doc, &ConnectOptions::default(), SortOptions::default()).unwrap();

        doc.select_ids(&["point-2=1", "point-1=2"]).unwrap();
        let summary =
            connect_points(&mut doc, &ConnectOptions::default(), SortOptions::default()).unwrap();
        assert!(summary.is_empty());
    }
}
