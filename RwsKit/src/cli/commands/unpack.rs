//! CLI command for RWS unpacking

use std::path::Path;
use std::time::Instant;

use super::LayoutArgs;
use crate::cli::progress::{LOOKING_GLASS, PACKAGE, print_done, print_step, print_warning, simple_bar};
use crate::rws::{RwsOperations, RwsPhase};

pub fn execute(
    source: &Path,
    destination: &Path,
    layout: &LayoutArgs,
    progress: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = layout.resolve()?;

    let result = if progress {
        print_step(1, 2, LOOKING_GLASS, &format!("Reading {}", source.display()));
        let pb = simple_bar(0, "Extracting");

        let result = RwsOperations::unpack_with_progress(source, destination, &config, &|p| {
            if p.phase == RwsPhase::ExtractingLayers {
                if p.current == 1 {
                    print_step(2, 2, PACKAGE, "Extracting layers...");
                }
                pb.set_length(p.total as u64);
                pb.set_position(p.current as u64);
                if let Some(name) = &p.current_file {
                    pb.set_message(name.clone());
                }
            }
        });
        pb.finish_and_clear();
        result?
    } else {
        RwsOperations::unpack(source, destination, &config)?
    };

    for warning in &result.warnings {
        print_warning(&warning.to_string());
    }
    println!(
        "Unpacked {} block(s), {} bytes, manifest at {}",
        result.artifact_count,
        result.bytes_extracted,
        result.manifest_path.display()
    );
    if progress {
        print_done(started.elapsed());
    }
    Ok(())
}
