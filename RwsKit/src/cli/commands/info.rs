//! CLI command for inspecting an RWS container

use std::path::Path;

use super::LayoutArgs;
use crate::cli::progress::print_warning;
use crate::rws::RwsOperations;

/// Show header, segment and layer details
pub fn execute(source: &Path, json: bool, layout: &LayoutArgs) -> anyhow::Result<()> {
    let config = layout.resolve()?;
    let info = RwsOperations::inspect(source, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("RWS Information: {}", source.display());
    println!();
    println!("Name: {}", info.name);
    println!("Identity: {}", info.identity);
    println!("Version: {:#010x}", info.container_version);
    println!(
        "Segments: {}  Layers: {}",
        info.total_segments, info.total_layers
    );
    println!(
        "Data: {} bytes, first segment at {:#x}, block layers size {}",
        info.data_len, info.data_offset, info.block_layers_size
    );

    for segment in &info.segments {
        println!();
        println!(
            "Segment {} {:?}: offset {:#x}, size {:#x}",
            segment.index, segment.name, segment.data_offset, segment.layers_size
        );
        for layer in &segment.layers {
            println!(
                "  Layer {:>2}: {:<16} {:>6} Hz {} ch {:>2}-bit  block {:#x}/{:#x} at {:#x}  {} used  ~{} samples ({:.2}s){}",
                layer.index,
                layer.codec,
                layer.sample_rate,
                layer.channels,
                layer.bits_per_sample,
                layer.block_size,
                layer.block_size_pad,
                layer.layer_start,
                layer.usable_size,
                layer.estimated_samples,
                layer.duration,
                if layer.has_dsp { "  [DSP coefs]" } else { "" }
            );
        }
    }

    if !info.warnings.is_empty() {
        println!();
        for warning in &info.warnings {
            print_warning(warning);
        }
    }

    Ok(())
}
