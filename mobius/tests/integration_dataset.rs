//! Integration tests for the dataset lifecycle: writes, discovery, ranges,
//! trims and persistence across reopen.

#![allow(clippy::cast_precision_loss)]

use std::sync::Arc;

use mobius::{Dataset, DatasetConfig, EngineError, Metric, MobiusError, TagValue};
use tempfile::tempdir;

const SECOND: u64 = 1_000_000_000;
const BASE: u64 = 1_700_000_000 * SECOND;

fn series(raw: &str, count: u64) -> Metric {
    let mut metric = Metric::new(raw);
    for i in 0..count {
        metric.push(BASE + i * SECOND, i as f64);
    }
    metric
}

/// 100 series spread across ten `testNN` groups.
fn populate_names(dataset: &Dataset) {
    for i in 0..100u64 {
        let raw = format!("mobius.test{:02}.keytest{:04}", i % 10, i);
        dataset.write(&series(&raw, 1)).unwrap();
    }
}

#[test]
fn test_write_and_range_with_duplicate_timestamps() {
    let dataset = Dataset::in_memory();

    let mut event = Metric::new("mobius.test.event1");
    for i in 0..10u64 {
        event.push(BASE + i * SECOND, i as f64);
    }
    // same timestamps again, new values
    for i in 0..10u64 {
        event.push(BASE + i * SECOND, (i * 10) as f64);
    }
    dataset.write(&event).unwrap();

    let metrics = dataset.range(None, None, &["mobius.test.event1"]).unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].points().len(), 10);
    assert_eq!(metrics[0].points().values()[3], 30.0);
    assert!(metrics[0].points().is_sorted());
}

#[test]
fn test_get_names_globbing() {
    let dataset = Dataset::in_memory();
    populate_names(&dataset);

    assert_eq!(dataset.get_names("**").unwrap().len(), 100);
    assert_eq!(dataset.get_names("**.test02.*").unwrap().len(), 10);
    assert_eq!(dataset.get_names("**.test0{1,3,5,7,9}.*").unwrap().len(), 50);
    assert_eq!(dataset.get_names("mobius.*.keytest00?7").unwrap().len(), 10);
    assert_eq!(dataset.get_names("mobius.test07.keytest00?7").unwrap().len(), 10);
    assert!(dataset.get_names("mobius.test02").unwrap().is_empty());

    let names = dataset.get_names("mobius.test0{1,2}.*").unwrap();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    assert!(matches!(
        dataset.get_names("mobius.{a,b"),
        Err(MobiusError::Pattern(_))
    ));
}

#[test]
fn test_tag_filters_are_anded_and_values_ored() {
    let dataset = Dataset::in_memory();
    for raw in [
        "cpu.usage:host=web1,zone=east",
        "cpu.usage:host=web2,zone=east",
        "cpu.usage:host=db1,zone=west",
        "cpu.usage:host=web3,zone=west|east",
    ] {
        dataset.write(&series(raw, 2)).unwrap();
    }

    let east = dataset.get_names("cpu.usage:zone=east").unwrap();
    assert_eq!(east.len(), 3);

    let both = dataset.get_names("cpu.*:zone=west,host=db1|web3").unwrap();
    assert_eq!(
        both,
        vec!["cpu.usage:host=db1,zone=west", "cpu.usage:host=web3,zone=west|east"]
    );

    // filter order does not matter
    assert_eq!(
        dataset.get_names("cpu.*:host=db1|web3,zone=west").unwrap(),
        both
    );

    assert!(dataset
        .is_tag_value_in_name("cpu.usage:host=web1,zone=east", "host", &TagValue::from("web1"))
        .unwrap());
    assert!(dataset.get_names("cpu.usage:zone=north").unwrap().is_empty());
}

#[test]
fn test_range_bounds_are_inclusive() {
    let dataset = Dataset::in_memory();
    dataset.write(&series("disk.io", 10)).unwrap();

    let metrics = dataset
        .range(Some(BASE + 2 * SECOND), Some(BASE + 5 * SECOND), &["disk.io"])
        .unwrap();
    assert_eq!(
        metrics[0].points().timestamps(),
        (2..=5).map(|i| BASE + i * SECOND).collect::<Vec<_>>()
    );

    assert_eq!(dataset.num_points("disk.io").unwrap(), 10);
    assert_eq!(
        dataset
            .num_points_range("disk.io", Some(BASE + 8 * SECOND), None)
            .unwrap(),
        2
    );

    // matching series with no points in range are still returned
    let empty = dataset.range(Some(0), Some(1), &["disk.io"]).unwrap();
    assert_eq!(empty.len(), 1);
    assert!(empty[0].is_empty());
}

#[test]
fn test_range_deduplicates_across_patterns() {
    let dataset = Dataset::in_memory();
    dataset.write(&series("net.rx", 3)).unwrap();
    dataset.write(&series("net.tx", 3)).unwrap();

    let metrics = dataset.range(None, None, &["net.*", "net.rx"]).unwrap();
    let names: Vec<String> = metrics.iter().map(Metric::unique_name).collect();
    assert_eq!(names, vec!["net.rx", "net.tx"]);
}

#[test]
fn test_oldest_and_newest() {
    let dataset = Dataset::in_memory();
    dataset.write(&series("temp:room=a", 5)).unwrap();
    dataset.write(&series("temp:room=b", 3)).unwrap();

    let oldest = dataset.oldest(&["temp"]).unwrap();
    assert_eq!(oldest.len(), 2);
    assert!(oldest.iter().all(|m| m.points().timestamps() == vec![BASE]));

    let newest = dataset.newest(&["temp"]).unwrap();
    assert_eq!(newest[0].points().timestamps(), vec![BASE + 4 * SECOND]);
    assert_eq!(newest[1].points().timestamps(), vec![BASE + 2 * SECOND]);
}

#[test]
fn test_newest_ignores_points_dated_after_now() {
    let dataset = Dataset::in_memory();
    let mut metric = Metric::new("clock.skew");
    metric.push(BASE, 1.0);
    metric.push(u64::MAX - SECOND, 2.0);
    dataset.write(&metric).unwrap();

    let newest = dataset.newest(&["clock.skew"]).unwrap();
    assert_eq!(newest[0].points().timestamps(), vec![BASE]);
    assert_eq!(
        dataset.range(None, None, &["clock.skew"]).unwrap()[0].points().timestamps(),
        vec![BASE]
    );
    assert_eq!(dataset.num_points("clock.skew").unwrap(), 2);
}

#[test]
fn test_trim_by_time() {
    let dataset = Dataset::in_memory();
    dataset.write(&series("a.x", 10)).unwrap();
    dataset.write(&series("b.x", 10)).unwrap();

    let removed = dataset.trim_before(BASE + 3 * SECOND, &["a.*"]).unwrap();
    assert_eq!(removed, 3);
    assert_eq!(dataset.num_points("a.x").unwrap(), 7);
    assert_eq!(dataset.num_points("b.x").unwrap(), 10);

    // no patterns means every series
    let removed = dataset.trim_after(BASE + 8 * SECOND, &[]).unwrap();
    assert_eq!(removed, 4);
    assert_eq!(dataset.num_points("**").unwrap(), 5 + 8);

    // trims never prune the name index
    dataset.trim_before(u64::MAX, &[]).unwrap();
    assert_eq!(dataset.get_names("**").unwrap().len(), 2);
}

#[test]
fn test_trim_to_count() {
    let dataset = Dataset::in_memory();
    dataset.write(&series("q.old", 10)).unwrap();
    dataset.write(&series("q.new", 10)).unwrap();

    assert_eq!(dataset.trim_oldest_to_count(0, &["q.*"]).unwrap(), 0);

    assert_eq!(dataset.trim_oldest_to_count(4, &["q.old"]).unwrap(), 6);
    let kept = dataset.range(None, None, &["q.old"]).unwrap();
    assert_eq!(
        kept[0].points().values(),
        vec![6.0, 7.0, 8.0, 9.0]
    );

    assert_eq!(dataset.trim_newest_to_count(3, &["q.new"]).unwrap(), 7);
    let kept = dataset.range(None, None, &["q.new"]).unwrap();
    assert_eq!(kept[0].points().values(), vec![0.0, 1.0, 2.0]);

    // already within bounds
    assert_eq!(dataset.trim_oldest_to_count(50, &["q.*"]).unwrap(), 0);
}

#[test]
fn test_remove_clears_series_and_indices() {
    let dataset = Dataset::in_memory();
    dataset.write(&series("svc.latency:host=a", 4)).unwrap();
    dataset.write(&series("svc.latency:host=b", 4)).unwrap();
    dataset.write(&series("svc.errors:host=a", 4)).unwrap();

    assert_eq!(dataset.remove(&["svc.latency"]).unwrap(), 2);
    assert_eq!(dataset.get_names("**").unwrap(), vec!["svc.errors:host=a"]);
    assert!(!dataset
        .is_tag_value_in_name("svc.latency:host=a", "host", &"a".into())
        .unwrap());
    assert_eq!(dataset.num_points("svc.latency").unwrap(), 0);

    assert_eq!(dataset.remove(&["nothing.here"]).unwrap(), 0);
}

#[test]
fn test_reopen_preserves_everything() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen");

    {
        let dataset = Dataset::open(&path).unwrap();
        populate_names(&dataset);
        dataset.write(&series("extra:kind=late", 5)).unwrap();
        dataset.compact().unwrap();
        dataset.trim_oldest_to_count(2, &["extra"]).unwrap();
        dataset.close().unwrap();
    }

    let dataset = Dataset::open(&path).unwrap();
    assert_eq!(dataset.path(), Some(path.as_path()));
    assert_eq!(dataset.get_names("mobius.**").unwrap().len(), 100);
    assert_eq!(dataset.num_points("extra").unwrap(), 2);
    assert_eq!(dataset.get_names("extra:kind=late").unwrap().len(), 1);
}

#[test]
fn test_writes_after_a_torn_journal_tail_survive_reopen() {
    use std::io::Write;

    let dir = tempdir().unwrap();
    let path = dir.path().join("torn");

    {
        let dataset = Dataset::open(&path).unwrap();
        dataset.write(&series("a", 3)).unwrap();

        // a partial record left behind by a failed append
        let mut journal = std::fs::OpenOptions::new()
            .append(true)
            .open(path.join("journal.log"))
            .unwrap();
        journal.write_all(&[7, 0, 0, 0, 1, 2]).unwrap();
        drop(journal);

        dataset.write(&series("b", 3)).unwrap();
        assert_eq!(dataset.get_names("*").unwrap(), vec!["a", "b"]);
    }

    let dataset = Dataset::open(&path).unwrap();
    assert_eq!(dataset.get_names("*").unwrap(), vec!["a", "b"]);
    assert_eq!(dataset.num_points("b").unwrap(), 3);
}

#[test]
fn test_read_only_dataset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ro");

    assert!(matches!(
        Dataset::open_read_only(&path),
        Err(MobiusError::Engine(EngineError::DirectoryAccess { .. }))
    ));

    {
        let dataset = Dataset::open(&path).unwrap();
        dataset.write(&series("ro.metric", 3)).unwrap();
    }

    let dataset = Dataset::open_read_only(&path).unwrap();
    assert!(dataset.config().read_only);
    assert_eq!(dataset.num_points("ro.metric").unwrap(), 3);
    assert!(dataset.write(&series("ro.other", 1)).is_err());
    assert!(matches!(
        dataset.trim_before(u64::MAX, &[]),
        Err(MobiusError::Engine(EngineError::ReadOnly))
    ));
    assert!(matches!(
        dataset.compact(),
        Err(MobiusError::Engine(EngineError::ReadOnly))
    ));
}

#[test]
fn test_close_is_idempotent_and_final() {
    let dir = tempdir().unwrap();
    let dataset = Dataset::open_with(DatasetConfig::new(dir.path()).sync_writes(true)).unwrap();
    dataset.write(&series("x", 1)).unwrap();

    dataset.close().unwrap();
    dataset.close().unwrap();
    assert!(matches!(
        dataset.get_names("**"),
        Err(MobiusError::Engine(EngineError::Closed))
    ));
}

#[test]
fn test_concurrent_writers() {
    let dataset = Arc::new(Dataset::in_memory());

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let dataset = Arc::clone(&dataset);
            std::thread::spawn(move || {
                for i in 0..25u64 {
                    let mut metric = Metric::new(&format!("threads.worker:id={t}"));
                    metric.push(BASE + i * SECOND, i as f64);
                    dataset.write(&metric).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(dataset.get_names("threads.worker").unwrap().len(), 4);
    assert_eq!(dataset.num_points("threads.*").unwrap(), 100);
}
