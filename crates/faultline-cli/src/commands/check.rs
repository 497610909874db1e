//! Plan validation command.

use anyhow::Result;
use faultline::FaultKind;
use faultline_config::FaultlineConfig;

/// Validates the plan, materializes it and prints the resulting device state.
pub fn run(config: &FaultlineConfig) -> Result<()> {
    let (injector, report) = super::materialize(config)?;

    println!("Faultline Plan");
    println!("==============\n");

    println!("Backends: {}", config.backends.len());
    for backend in &config.backends {
        println!(
            "  {} ({} x {} bytes)",
            backend.name, backend.num_blocks, backend.block_size
        );
    }
    println!();

    println!("Devices:");
    for name in &report.materialized {
        println!("  {name} (live)");
        let Some(disk) = injector.disk(name) else {
            continue;
        };
        for (io_type, vector) in disk.error_vectors().iter() {
            if vector.fault_kind == FaultKind::None && !vector.is_active() {
                continue;
            }
            print!(
                "    {:<6} {} x{}",
                io_type.to_string(),
                vector.fault_kind,
                vector.remaining
            );
            if vector.queue_depth_threshold > 0 {
                print!(" at queue depth >= {}", vector.queue_depth_threshold);
            }
            if vector.fault_kind == FaultKind::CorruptData {
                print!(
                    " (xor {:#04x} at byte {})",
                    vector.corrupt_value, vector.corrupt_offset
                );
            }
            println!();
        }
    }
    for name in &report.deferred {
        println!("  {name} (waiting for backend)");
    }
    println!();

    println!(
        "Faults: {} applied, {} waiting for their device",
        report.faults_applied, report.faults_skipped
    );

    injector.shutdown();
    Ok(())
}
