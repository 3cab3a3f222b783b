//! Demonstration of the query pipeline in mobius.
//!
//! Writes a minute and a half of CPU and memory samples, reads them back,
//! merges the per-core series, and consolidates them into 15 second buckets
//! with a few different reducers.

use mobius::{Dataset, GroupBy, Metric, Reducer, merge_metrics};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let dataset = Dataset::open(dir.path().join("consolidation_demo"))?;
    println!("Opened dataset in {}", dir.path().display());

    let base_time = 1_640_995_200_000_000_000u64; // 2022-01-01 00:00:00 UTC in ns
    println!("\nWriting 90 seconds of samples at 1s resolution:");

    for core in 0..2u32 {
        let mut cpu = Metric::new(&format!("cpu.usage:host=server1,core={core}"));
        for i in 0u32..90 {
            let fi = f64::from(i);
            // periodic spikes on top of a sinusoidal base load
            let value = if i % 10 == 0 {
                95.0 + (fi % 3.0)
            } else {
                45.0 + 15.0 * (fi * 0.1 + f64::from(core)).sin()
            };
            cpu.push(base_time + u64::from(i) * 1_000_000_000, value);
        }
        dataset.write(&cpu)?;
    }

    let mut memory = Metric::new("memory.usage:host=server1");
    for i in 0u32..90 {
        memory.push(base_time + u64::from(i) * 1_000_000_000, 60.0 + f64::from(i) * 0.3);
    }
    dataset.write(&memory)?;

    for name in dataset.get_names("**")? {
        println!("  {name}: {} points", dataset.num_points(&name)?);
    }

    let series = dataset.range(Some(base_time), None, &["cpu.usage:host=server1"])?;
    let merged = merge_metrics(&series, &GroupBy::Name);
    println!(
        "\nMerged {} cpu series into {} ({} points)",
        series.len(),
        merged[0],
        merged[0].points().len()
    );

    let width = 15 * 1_000_000_000;
    for reducer in [Reducer::Mean, Reducer::Maximum, Reducer::Percentile(0.9)] {
        let consolidated = merged[0].consolidate(width, reducer);
        let values: Vec<String> = consolidated
            .points()
            .values()
            .iter()
            .map(|v| format!("{v:.1}"))
            .collect();
        println!("  15s {:<10} [{}]", reducer.name(), values.join(", "));
    }

    let memory = dataset.newest(&["memory.usage"])?;
    println!("\nNewest memory sample: {}", memory[0].points()[0]);

    let summary = dataset.range(None, None, &["memory.*"])?[0]
        .summarize(&[Reducer::Minimum, Reducer::Median, Reducer::Maximum]);
    println!(
        "Memory min/median/max: {:.1} / {:.1} / {:.1}",
        summary[0], summary[1], summary[2]
    );

    dataset.close()?;
    Ok(())
}
