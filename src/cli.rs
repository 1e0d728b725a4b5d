use crate::config::{Config, OperationMode, SortDirection, SortMode, load_config};
use crate::graph_dump::write_graph_dump;
use crate::ops::run_operation;
use crate::svg::SvgDocument;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "navmap",
    version,
    about = "Maintain the navigation graph stored in the element ids of an SVG map"
)]
pub struct Args {
    /// Input SVG file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output SVG file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Operation mode: connect, clean or add_building
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,

    /// Comma-separated element ids, in selection order
    #[arg(short = 's', long = "select", value_delimiter = ',')]
    pub select: Vec<String>,

    /// Processing order: no_sort, sort_horizontally or sort_vertically
    #[arg(long = "sort-mode")]
    pub sort_mode: Option<String>,

    /// asc or desc
    #[arg(long = "sort-direction")]
    pub sort_direction: Option<String>,

    /// Write the resulting navigation graph as JSON
    #[arg(long = "dump-graph")]
    pub dump_graph: Option<PathBuf>,

    /// Log per-element detail
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = apply_overrides(load_config(args.config.as_deref())?, &args)?;
    debug!(?config, "resolved configuration");

    let input = read_input(args.input.as_deref())?;
    let mut document = SvgDocument::parse(&input)?;
    let selection: Vec<&str> = args
        .select
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    document.select_ids(&selection)?;

    run_operation(&mut document, &config)?;

    if let Some(path) = args.dump_graph.as_deref() {
        write_graph_dump(path, &document)
            .with_context(|| format!("failed to write graph dump to {}", path.display()))?;
    }
    write_output_svg(&document.to_svg_string(), args.output.as_deref())?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "navmap=debug" } else { "navmap=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_overrides(mut config: Config, args: &Args) -> Result<Config> {
    if let Some(mode) = args.mode.as_deref() {
        config.mode = mode.parse::<OperationMode>()?;
    }
    if let Some(sort_mode) = args.sort_mode.as_deref() {
        config.sort.mode = sort_mode.parse::<SortMode>()?;
    }
    if let Some(direction) = args.sort_direction.as_deref() {
        config.sort.direction = direction.parse::<SortDirection>()?;
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}
