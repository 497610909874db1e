//! Request simulation against a materialized plan.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use faultline::{FaultChannel, MONITORED};
use faultline_config::FaultlineConfig;
use faultline_io::{BlockIo, IoStatus, IoType, IoVecs};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    success: u32,
    failed: u32,
    no_memory: u32,
}

impl Tally {
    fn record(&mut self, status: IoStatus) {
        match status {
            IoStatus::Success => self.success += 1,
            IoStatus::Failed => self.failed += 1,
            IoStatus::NoMemory => self.no_memory += 1,
        }
    }

    fn completed(self) -> u32 {
        self.success + self.failed + self.no_memory
    }
}

type Tallies = Arc<Mutex<BTreeMap<(String, IoType), Tally>>>;

/// Submits `rounds` single-block requests of every monitored type to each
/// live device and prints how they completed.
pub fn run(config: &FaultlineConfig, rounds: u32, reset: bool) -> Result<()> {
    let (injector, _) = super::materialize(config)?;
    let tallies: Tallies = Arc::default();
    let mut submitted: BTreeMap<(String, IoType), u32> = BTreeMap::new();

    for name in injector.disk_names() {
        let Some(disk) = injector.disk(&name) else {
            continue;
        };
        let channel = FaultChannel::new();
        let block_size = disk.block_size() as usize;

        for _ in 0..rounds {
            for io_type in MONITORED {
                let io = match io_type {
                    IoType::Read => BlockIo::read(0, 1, IoVecs::zeroed(&[block_size])),
                    IoType::Write => {
                        BlockIo::write(0, 1, IoVecs::from(vec![0xA5; block_size]))
                    }
                    other => BlockIo::without_payload(other, 0, 1),
                };
                let key = (name.clone(), io_type);
                *submitted.entry(key.clone()).or_default() += 1;

                let tallies = Arc::clone(&tallies);
                disk.submit(
                    &channel,
                    io,
                    Box::new(move |_, status| {
                        tallies
                            .lock()
                            .expect("tallies poisoned")
                            .entry(key)
                            .or_default()
                            .record(status);
                    }),
                );
            }
        }

        if reset {
            disk.submit(&channel, BlockIo::reset(), Box::new(|_, _| {}));
        }
        tracing::debug!(device = %name, pending = disk.pending_count(), "simulation finished");
    }

    let tallies = tallies.lock().expect("tallies poisoned");
    println!(
        "{:<20} {:<6} {:>9} {:>8} {:>7} {:>9} {:>5}",
        "DEVICE", "TYPE", "SUBMITTED", "SUCCESS", "FAILED", "NO_MEMORY", "HELD"
    );
    for ((device, io_type), count) in &submitted {
        let tally = tallies
            .get(&(device.clone(), *io_type))
            .copied()
            .unwrap_or_default();
        println!(
            "{:<20} {:<6} {:>9} {:>8} {:>7} {:>9} {:>5}",
            device,
            io_type.to_string(),
            count,
            tally.success,
            tally.failed,
            tally.no_memory,
            count - tally.completed()
        );
    }
    drop(tallies);

    injector.shutdown();
    Ok(())
}
