// Example: split a line-delimited building file into longitude partitions
//
// Usage: cargo run --example split_buildings -- <buildings.geojsonl> [out_dir] [config.json]
use anyhow::{Context, Result};
use meshmap::collect::shard::split_by_region;
use meshmap::logging::init_logging;
use meshmap::{RegionTable, ViewerConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

fn main() -> Result<()> {
    init_logging("info");

    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(
        args.next()
            .context("usage: split_buildings <buildings.geojsonl> [out_dir] [config.json]")?,
    );
    let out_dir = PathBuf::from(
        args.next()
            .unwrap_or_else(|| "web_data/buildings_by_region".to_string()),
    );

    // Region bins come from the viewer config when given, so both sides agree
    let regions = match args.next() {
        Some(path) => ViewerConfig::from_json_file(&path)?.regions,
        None => RegionTable::fukuoka_default(),
    };

    println!("=== Splitting {:?} into {} regions ===\n", input, regions.ranges().len());

    let file = File::open(&input).with_context(|| format!("Failed to open {:?}", input))?;
    let report = split_by_region(BufReader::new(file), &regions, &out_dir)?;

    for range in regions.ranges() {
        let count = report.counts.get(&range.id).copied().unwrap_or(0);
        println!(
            "  {} [{:.1}, {:.1}): {} buildings",
            range.id, range.min, range.max, count
        );
    }
    println!("\nWritten: {}", report.total());
    println!("Skipped (unparsable or no point): {}", report.skipped);
    println!("Outside coverage, written to last region: {}", report.clamped);

    Ok(())
}
