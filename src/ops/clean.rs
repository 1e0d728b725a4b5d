use crate::config::CleanOptions;
use crate::error::Result;
use crate::graph::{ChangeSet, ChangeSummary, DocumentIndex};
use crate::svg::Canvas;
use tracing::{debug, info};

/// Drops lines and neighbor references that point at points no longer in
/// the document. Running it twice changes nothing the second time.
pub fn clean_point_connections<C: Canvas + ?Sized>(
    canvas: &mut C,
    options: CleanOptions,
) -> Result<ChangeSummary> {
    let index = DocumentIndex::scan(&*canvas);
    let changes = plan_clean(&index, options);
    let summary = changes.apply(canvas);
    info!(
        lines_removed = summary.removed,
        points_rewritten = summary.ids_written,
        "cleaned navigation graph"
    );
    Ok(summary)
}

pub fn plan_clean(index: &DocumentIndex, options: CleanOptions) -> ChangeSet {
    let mut changes = ChangeSet::new();

    if options.clean_lines {
        for edge in index.edges() {
            let a_ok = edge.a.is_some_and(|id| index.contains_point(id));
            let b_ok = edge.b.is_some_and(|id| index.contains_point(id));
            if !(a_ok && b_ok) {
                debug!(a = ?edge.a, b = ?edge.b, "removing line with a missing endpoint");
                changes.remove(edge.element);
            }
        }
    }

    for point in index.points() {
        let mut kept = point.neighbors.clone();
        kept.retain(|id| id != point.id && index.contains_point(id));
        if kept.len() < point.neighbors.len() {
            debug!(
                point = point.id,
                dropped = point.neighbors.len() - kept.len(),
                "pruning neighbors"
            );
            let mut repaired = point.clone();
            repaired.neighbors = kept;
            changes.set_id(point.element, repaired.encode());
        }
    }

    changes
}
