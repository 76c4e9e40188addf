#![warn(clippy::all)]

//! Layer Registry command line.
//!
//! Builds the layer list (the embedded export, or a manifest) and prints the
//! JSON document the viewer shell loads. Optionally prints one vector layer's
//! features as GeoJSON instead.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use layer_registry::manifest::RegistryManifest;
use layer_registry::{export, LayerError, LayerList};

#[derive(Debug, Parser)]
#[command(name = "layer-registry", version = layer_registry::VERSION)]
#[command(about = "Build the layer list of an exported web map")]
struct Cli {
    /// Build from a JSON manifest instead of the embedded export
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,

    /// Print the features of one vector layer as GeoJSON
    #[arg(long, value_name = "LAYER_ID")]
    geojson: Option<String>,
}

fn build(cli: &Cli) -> Result<LayerList, LayerError> {
    match &cli.manifest {
        Some(path) => RegistryManifest::load(path)?.build(),
        None => export::build_registry(),
    }
}

fn run(cli: &Cli) -> Result<String, LayerError> {
    let layers = build(cli)?;

    for layer in &layers {
        log::info!(
            "{} ({:?}) visible={} opacity={}",
            layer.id(),
            layer.kind(),
            layer.is_visible(),
            layer.opacity()
        );
    }

    match &cli.geojson {
        Some(id) => {
            let layer = layers
                .find(id)
                .ok_or_else(|| LayerError::UnknownLayer(id.clone()))?;
            let source = layer
                .vector_source()
                .ok_or_else(|| LayerError::NotAVectorLayer(id.clone()))?;
            let geojson = source.to_geojson();
            if cli.pretty {
                serde_json::to_string_pretty(&geojson).map_err(LayerError::Serialize)
            } else {
                Ok(geojson.to_string())
            }
        }
        None => layers.to_json(cli.pretty),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to build layer registry: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
