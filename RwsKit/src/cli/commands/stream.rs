//! CLI commands for .stream bundles

use std::path::Path;

use crate::cli::progress::simple_spinner;
use crate::stream::StreamOperations;

/// Split a bundle into section files
pub fn unpack(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let spinner = simple_spinner(&format!("Unpacking {}", source.display()));
    let result = StreamOperations::unpack_with_progress(source, destination, &|p| {
        if let Some(name) = &p.current_file {
            spinner.set_message(name.clone());
        }
    });
    spinner.finish_and_clear();
    let result = result?;

    println!(
        "Unpacked {} section(s), {} wrapped asset(s), manifest at {}",
        result.section_count,
        result.asset_count,
        result.manifest_path.display()
    );
    Ok(())
}

/// Rebuild a bundle from section files
pub fn repack(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let spinner = simple_spinner(&format!("Writing {}", destination.display()));
    let result = StreamOperations::repack_with_progress(source, destination, &|p| {
        if let Some(name) = &p.current_file {
            spinner.set_message(name.clone());
        }
    });
    spinner.finish_and_clear();
    let result = result?;

    println!(
        "Wrote {} section(s) to {} ({} bytes)",
        result.section_count,
        result.output.display(),
        result.bytes_written
    );
    Ok(())
}
