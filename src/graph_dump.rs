use crate::graph::DocumentIndex;
use crate::svg::{ATTR_ID, Canvas, ElementId};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GraphDump {
    pub points: Vec<PointDump>,
    pub buildings: Vec<BuildingDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct PointDump {
    pub id: u64,
    pub element_id: String,
    pub neighbors: Vec<u64>,
    pub entrance: bool,
}

#[derive(Debug, Serialize)]
pub struct BuildingDump {
    pub id: u64,
    pub element_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub entrances: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub element_id: Option<String>,
    pub a: Option<u64>,
    pub b: Option<u64>,
}

impl GraphDump {
    pub fn from_document<C: Canvas + ?Sized>(canvas: &C) -> Self {
        let index = DocumentIndex::scan(canvas);
        let element_id = |el: ElementId| {
            canvas
                .attribute(el, ATTR_ID)
                .unwrap_or_default()
                .to_string()
        };

        let points = index
            .points()
            .map(|point| PointDump {
                id: point.id,
                element_id: element_id(point.element),
                neighbors: point.neighbors.as_slice().to_vec(),
                entrance: index.is_entrance(point.id),
            })
            .collect();

        let buildings = index
            .buildings()
            .map(|building| BuildingDump {
                id: building.id,
                element_id: element_id(building.element),
                kind: building.kind.clone(),
                subtype: building.subtype.clone(),
                entrances: building.entrances.clone(),
            })
            .collect();

        let edges = index
            .edges()
            .iter()
            .map(|edge| EdgeDump {
                element_id: canvas.attribute(edge.element, ATTR_ID).map(str::to_string),
                a: edge.a,
                b: edge.b,
            })
            .collect();

        GraphDump {
            points,
            buildings,
            edges,
        }
    }
}

pub fn write_graph_dump<C: Canvas + ?Sized>(path: &Path, canvas: &C) -> anyhow::Result<()> {
    let dump = GraphDump::from_document(canvas);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
