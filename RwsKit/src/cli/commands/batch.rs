//! CLI command for batch unpacking

use std::path::Path;
use std::time::Instant;

use super::LayoutArgs;
use crate::cli::progress::{TRUCK, print_done, print_step, simple_bar};
use crate::rws::{batch_unpack, find_rws_files};

/// Unpack every .rws file under `source`
pub fn execute(source: &Path, dest: &Path, layout: &LayoutArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = layout.resolve()?;
    let files = find_rws_files(source);

    if files.is_empty() {
        println!("No RWS files found in: {}", source.display());
        return Ok(());
    }

    print_step(1, 1, TRUCK, &format!("Unpacking {} RWS files", files.len()));
    let pb = simple_bar(files.len() as u64, "Unpacking");

    let result = batch_unpack(&files, source, dest, &config, |progress| {
        pb.set_position(progress.current as u64);
        if let Some(ref name) = progress.current_file {
            pb.set_message(name.clone());
        }
    });

    pb.finish_and_clear();

    println!();
    println!("Unpack complete:");
    println!("  Success: {}", result.success_count);
    println!("  Failed: {}", result.fail_count);

    if result.fail_count > 0 {
        println!();
        println!("Failures:");
        for msg in result.results.iter().filter(|m| m.starts_with("Failed")) {
            println!("  {msg}");
        }
    }

    print_done(started.elapsed());
    if result.fail_count > 0 {
        anyhow::bail!("{} of {} containers failed", result.fail_count, files.len());
    }
    Ok(())
}
