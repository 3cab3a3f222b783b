//! Demonstration of recording application statistics with a [`Recorder`].
//!
//! Several worker threads share one dataset through an `Arc`, counting the
//! jobs they run and reporting a queue-depth gauge. The dataset is then
//! backed up, restored into a fresh in-memory dataset, and trimmed.

use std::sync::Arc;
use std::thread;

use mobius::{Dataset, Recorder};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let dataset = Arc::new(Dataset::open(dir.path().join("stats"))?);
    let stats = Recorder::new(Arc::clone(&dataset))
        .with_prefix("demo.")
        .with_base_tag("service", "worker-pool");

    let workers: Vec<_> = (0..4i64)
        .map(|id| {
            let stats = stats.clone();
            thread::spawn(move || -> mobius::Result<()> {
                for job in 0..25u32 {
                    stats.increment("jobs.completed", &[("worker", id.into())])?;
                    stats.gauge("queue.depth", f64::from(25 - job), &[("worker", id.into())])?;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        if let Ok(result) = worker.join() {
            result?;
        }
    }
    stats.set("build.version", 3.0, &[])?;

    println!("Series recorded:");
    for name in dataset.get_names("demo.**")? {
        println!("  {name}: {} points", dataset.num_points(&name)?);
    }

    let busy = dataset.get_names("demo.jobs.*:worker=0|1")?;
    println!("\nWorkers 0 and 1 have {} job series", busy.len());

    let mut backup = Vec::new();
    dataset.backup(&mut backup)?;
    println!("\nBackup is {} bytes", backup.len());

    let copy = Dataset::in_memory();
    copy.restore(backup.as_slice())?;
    let trimmed = copy.trim_oldest_to_count(5, &["demo.queue.depth"])?;
    println!("Restored copy: trimmed {trimmed} old queue-depth samples");

    dataset.compact()?;
    dataset.close()?;
    Ok(())
}
