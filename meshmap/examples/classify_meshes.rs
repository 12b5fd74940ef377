// Example: classify a mesh usage file under every rule-set preset
//
// Usage: cargo run --example classify_meshes -- <mesh_usage.geojson> [preset] [out.geojson]
use anyhow::{Context, Result};
use meshmap::logging::init_logging;
use meshmap::{DataSource, FileSource, MeshDataset, RuleSet};
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging("info");

    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(
        args.next()
            .context("usage: classify_meshes <mesh_usage.geojson> [preset] [out.geojson]")?,
    );
    let chosen = args.next().unwrap_or_else(|| "revised_min50".to_string());
    let output = args.next().map(PathBuf::from);

    let parent = input.parent().map(PathBuf::from).unwrap_or_default();
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("input path has no file name")?;
    let text = FileSource::new(parent).fetch_text(name).await?;

    println!("=== Category counts per preset ===\n");
    for preset in RuleSet::PRESET_NAMES {
        let dataset = MeshDataset::from_geojson_str(&text, &RuleSet::preset(preset)?)?;
        println!("{} ({} meshes):", preset, dataset.len());
        for (category, count) in dataset.counts() {
            println!("  {:<12} {}", category, count);
        }
        println!();
    }

    if let Some(output) = output {
        let dataset = MeshDataset::from_geojson_str(&text, &RuleSet::preset(&chosen)?)?;
        std::fs::write(&output, dataset.to_geojson())
            .with_context(|| format!("Failed to write {:?}", output))?;
        println!("Annotated meshes ({}) written to {:?}", chosen, output);
    }

    Ok(())
}
