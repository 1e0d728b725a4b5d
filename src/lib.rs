#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod graph_dump;
pub mod ids;
pub mod ops;
pub mod svg;
pub mod units;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config, parse_config};
pub use error::{Error, Result};
pub use graph::{ChangeSummary, DocumentIndex};
pub use ops::{add_buildings, clean_point_connections, connect_points, run_operation};
pub use svg::{Canvas, SvgDocument};
