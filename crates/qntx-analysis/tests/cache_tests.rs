//! Disk cache behavior: hit/miss by path existence, round-trips, recompute on delete

use std::cell::Cell;

use ndarray::{array, Array2};
use qntx_analysis::{cached, DiskCache, Error};

#[test]
fn test_computes_once_per_path() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Cell::new(0);
    let squares = cached(dir.path().join("squares.json"), |n: usize| {
        calls.set(calls.get() + 1);
        (0..n).map(|i| (i * i) as f64).collect::<Vec<f64>>()
    });

    let first = squares.call(4).unwrap();
    let second = squares.call(4).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(first, vec![0.0, 1.0, 4.0, 9.0]);
    assert_eq!(first, second);
    assert!(squares.cache().is_hit());
}

#[test]
fn test_tensor_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let logits = cached(dir.path().join("logits.json"), |()| {
        array![[0.1, -2.5, 3.0], [1.0 / 3.0, 1e-12, -7.25]]
    });

    let computed: Array2<f64> = logits.call(()).unwrap();
    let loaded: Array2<f64> = logits.call(()).unwrap();
    assert_eq!(computed, loaded);
}

#[test]
fn test_hit_ignores_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let scaled = cached(dir.path().join("scaled.json"), |factor: f64| {
        vec![factor, 2.0 * factor]
    });

    assert_eq!(scaled.call(1.0).unwrap(), vec![1.0, 2.0]);
    // Stale by design: the path alone decides the hit.
    assert_eq!(scaled.call(10.0).unwrap(), vec![1.0, 2.0]);
}

#[test]
fn test_delete_forces_recompute() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.json");
    let calls = Cell::new(0u32);
    let counter = cached(&path, |()| {
        calls.set(calls.get() + 1);
        calls.get()
    });

    assert_eq!(counter.call(()).unwrap(), 1);
    assert_eq!(counter.call(()).unwrap(), 1);

    std::fs::remove_file(&path).unwrap();
    assert_eq!(counter.call(()).unwrap(), 2);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_existing_file_is_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preset.json");
    DiskCache::new(&path).store(&vec![42.0]).unwrap();

    let never = cached(&path, |()| -> Vec<f64> { panic!("should load from disk") });
    assert_eq!(never.call(()).unwrap(), vec![42.0]);
}

#[test]
fn test_corrupt_file_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.json");
    std::fs::write(&path, "[1.0, 2.0").unwrap();

    let values = cached(&path, |()| vec![1.0, 2.0]);
    let result: Result<Vec<f64>, Error> = values.call(());
    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[test]
fn test_type_mismatch_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mismatch.json");
    DiskCache::new(&path).store(&"not a tensor".to_string()).unwrap();

    let result: Result<Array2<f64>, Error> = DiskCache::new(&path).load();
    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[test]
fn test_try_call_skips_store_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let fallible = cached(dir.path().join("fallible.json"), |fail: bool| {
        if fail {
            Err(Error::InvalidInput("refused".into()))
        } else {
            Ok(vec![1u32, 2, 3])
        }
    });

    assert!(matches!(fallible.try_call(true), Err(Error::InvalidInput(_))));
    assert!(!fallible.cache().is_hit());
    assert_eq!(fallible.try_call(false).unwrap(), vec![1, 2, 3]);
    assert!(fallible.cache().is_hit());
}

#[test]
fn test_missing_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let values = cached(dir.path().join("no/such/dir/values.json"), |()| vec![1.0]);
    let result: Result<Vec<f64>, Error> = values.call(());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_non_finite_values_fail_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log_probs.json");
    let log_probs = cached(&path, |()| array![0.0, f64::NEG_INFINITY, -1.5]);

    let result: Result<ndarray::Array1<f64>, Error> = log_probs.call(());
    assert!(matches!(result, Err(Error::Serialization(_))));
    assert!(!path.exists());

    // Still a miss, so the next call fails the same way instead of loading
    // a file it cannot read.
    let again: Result<ndarray::Array1<f64>, Error> = log_probs.call(());
    assert!(matches!(again, Err(Error::Serialization(_))));
}

#[test]
fn test_store_rejects_nan_and_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kept.json");
    let cache = DiskCache::new(&path);
    cache.store(&vec![1.0, 2.0]).unwrap();

    assert!(matches!(
        cache.store(&vec![f64::NAN]),
        Err(Error::Serialization(_))
    ));
    assert_eq!(cache.load::<Vec<f64>>().unwrap(), vec![1.0, 2.0]);
}
