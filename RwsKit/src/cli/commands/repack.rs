//! CLI command for RWS repacking

use std::path::Path;
use std::time::Instant;

use super::LayoutArgs;
use crate::cli::progress::{DISK, GEAR, print_done, print_step, simple_bar};
use crate::rws::{Manifest, RepackOptions, RwsOperations, RwsPhase};

pub fn execute(
    source: &Path,
    destination: &Path,
    resize: &[String],
    resize_all: bool,
    layout: &LayoutArgs,
    progress: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();

    // Individual alignment flags refine the alignment recorded at unpack time
    let override_layout = if layout.is_set() {
        let recorded = Manifest::load(source)?.layout;
        Some(layout.resolve_over(recorded)?)
    } else {
        None
    };

    let options = RepackOptions {
        resize: resize.iter().cloned().collect(),
        resize_all,
        layout: override_layout,
    };

    let result = if progress {
        print_step(1, 2, GEAR, "Validating artifacts and planning layout...");
        let pb = simple_bar(0, "Writing");

        let result = RwsOperations::repack_with_progress(source, destination, &options, &|p| {
            if p.phase == RwsPhase::WritingContainer {
                if p.current == 1 {
                    print_step(2, 2, DISK, &format!("Writing {}", destination.display()));
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
        RwsOperations::repack_with_options(source, destination, &options)?
    };

    for name in &result.resized {
        println!("  resized: {name}");
    }
    println!(
        "Wrote {} ({} bytes, layer alignment {}, segment alignment {})",
        result.output.display(),
        result.bytes_written,
        result.layout.layer_alignment,
        result.layout.segment_alignment
    );
    if progress {
        print_done(started.elapsed());
    }
    Ok(())
}
