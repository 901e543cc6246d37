//! text-marker - command line entry point
//!
//! `text-marker render <doc.json>` prints the annotated markup,
//! `text-marker check <doc.json>` validates and lists the ranges.

use std::path::Path;

use anyhow::{bail, Context, Result};
use text_marker::{MarkerDocument, TextMarker};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: text-marker <render|check> <doc.json>";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(command), Some(path)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let marker = load(Path::new(&path))?;
    match command.as_str() {
        "render" => println!("{}", marker.markup()),
        "check" => {
            let ranges = marker.ranges();
            println!("{} chars, {} ranges", marker.raw_text().chars().count(), ranges.len());
            for (index, range) in ranges.iter().enumerate() {
                let label = marker.options().iter()
                    .find(|o| o.value == range.data)
                    .map_or(range.data.as_str(), |o| o.label.as_str());
                println!("{index}\t[{}, {})\t{}\t{:?}", range.start, range.end, label, range.text);
            }
        }
        other => bail!("unknown command `{other}`\n{USAGE}"),
    }
    Ok(())
}

fn load(path: &Path) -> Result<TextMarker> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = MarkerDocument::from_json(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded {} ({} ranges, {} options)", path.display(), document.ranges.len(), document.options.len());
    let marker = TextMarker::mount(document)
        .with_context(|| format!("Invalid document {}", path.display()))?;
    Ok(marker)
}
