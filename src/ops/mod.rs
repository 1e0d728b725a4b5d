pub mod building;
pub mod clean;
pub mod connect;

pub use building::{add_buildings, anchor_point, entrance_displacement};
pub use clean::clean_point_connections;
pub use connect::connect_points;

use crate::config::{
    Config, OperationMode, SmartConnectKind, SmartConnectOptions, SortDirection, SortMode,
    SortOptions,
};
use crate::error::{Error, Result};
use crate::graph::ChangeSummary;
use crate::svg::{Canvas, ElementId};
use tracing::{info, warn};

/// Runs the configured mode. The document is only written once the whole
/// operation has been planned without error.
pub fn run_operation<C: Canvas + ?Sized>(canvas: &mut C, config: &Config) -> Result<ChangeSummary> {
    let summary = match config.mode {
        OperationMode::Connect if config.smart_connect.enabled => {
            smart_connect(canvas, &config.smart_connect)?
        }
        OperationMode::Connect => connect_points(canvas, &config.connect, config.sort)?,
        OperationMode::Clean => clean_point_connections(canvas, config.clean)?,
        OperationMode::AddBuilding => {
            add_buildings(canvas, &config.building, &config.entrance, config.sort)?
        }
    };
    info!(
        mode = ?config.mode,
        ids_written = summary.ids_written,
        removed = summary.removed,
        lines_added = summary.lines_added,
        entrances_added = summary.entrances_added,
        "operation finished"
    );
    Ok(summary)
}

fn smart_connect<C: Canvas + ?Sized>(
    _canvas: &mut C,
    options: &SmartConnectOptions,
) -> Result<ChangeSummary> {
    match options.kind {
        SmartConnectKind::NearestPoint => Err(Error::NotImplemented("nearest-point smart connect")),
    }
}

/// Stable sort by bounding-box center. Shapes without a bounding box are
/// dropped with a warning.
pub(crate) fn sort_by_center<C: Canvas + ?Sized>(
    canvas: &C,
    elements: Vec<ElementId>,
    sort: SortOptions,
) -> Vec<ElementId> {
    if sort.mode == SortMode::None {
        return elements;
    }
    let mut keyed: Vec<(f64, ElementId)> = elements
        .into_iter()
        .filter_map(|el| match canvas.bounding_box(el) {
            Some(bbox) => {
                let center = bbox.center();
                let key = match sort.mode {
                    SortMode::ByXCenter => center.x,
                    SortMode::ByYCenter => center.y,
                    SortMode::None => 0.0,
                };
                Some((key, el))
            }
            None => {
                warn!(
                    id = canvas.attribute(el, crate::svg::ATTR_ID).unwrap_or(""),
                    "shape has no bounding box; leaving it out of the sorted selection"
                );
                None
            }
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match sort.direction {
        SortDirection::Ascending => a.total_cmp(b),
        SortDirection::Descending => b.total_cmp(a),
    });
    keyed.into_iter().map(|(_, el)| el).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::SvgDocument;

    const ROW: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <circle id="b" cx="20" cy="5" r="1"/>
  <circle id="a" cx="10" cy="9" r="1"/>
  <circle id="c" cx="30" cy="1" r="1"/>
  <circle id="tie" cx="10" cy="0" r="1"/>
  <text id="t">no box</text>
</svg>"#;

    fn ids(doc: &SvgDocument, order: &[ElementId]) -> Vec<String> {
        order
            .iter()
            .map(|el| doc.attribute(*el, "id").unwrap().to_string())
            .collect()
    }

    #[test]
    fn sorting_is_stable_in_both_directions() {
        let mut doc = SvgDocument::parse(ROW).unwrap();
        doc.select_ids(&["b", "a", "c", "tie", "t"]).unwrap();
        let selection = doc.selection();

        let asc = sort_by_center(
            &doc,
            selection.clone(),
            SortOptions {
                mode: SortMode::ByXCenter,
                direction: SortDirection::Ascending,
            },
        );
        assert_eq!(ids(&doc, &asc), ["a", "tie", "b", "c"]);

        let desc = sort_by_center(
            &doc,
            selection.clone(),
            SortOptions {
                mode: SortMode::ByYCenter,
                direction: SortDirection::Descending,
            },
        );
        assert_eq!(ids(&doc, &desc), ["a", "b", "c", "tie"]);

        let unsorted = sort_by_center(&doc, selection, SortOptions::default());
        assert_eq!(unsorted.len(), 5);
    }

    #[test]
    fn smart_connect_is_not_implemented() {
        let mut doc = SvgDocument::parse(ROW).unwrap();
        let mut config = Config::default();
        config.smart_connect.enabled = true;
        let err = run_operation(&mut doc, &config).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }
}
