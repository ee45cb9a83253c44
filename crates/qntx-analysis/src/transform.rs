//! Batch attribute transforms.
//!
//! Reads one vector from each object, reduces the whole batch at once, and
//! writes the `i`-th output point back onto the `i`-th object.
//!
//! # Example
//!
//! ```rust
//! use qntx_analysis::reduce::{Metric, TsneConfig};
//! use qntx_analysis::transform::{tsne_points, ScoredObject};
//!
//! let mut objects: Vec<ScoredObject> = (0..6)
//!     .map(|i| ScoredObject::new(format!("w{}", i), vec![i as f64, 1.0, (i % 2) as f64]))
//!     .collect();
//!
//! let config = TsneConfig {
//!     perplexity: 2.0,
//!     n_iter: 300,
//!     metric: Metric::Euclidean,
//!     ..Default::default()
//! };
//! tsne_points(&mut objects, &config).unwrap();
//! assert!(objects.iter().all(|o| o.tsne_point.as_ref().map(|p| p.len()) == Some(2)));
//! ```

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::reduce::{Reducer, Svd, SvdConfig, Tsne, TsneConfig};
use crate::tracing::prefix;

/// An analyzed entity: a named mean vector plus the points derived from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredObject {
    pub name: String,
    pub mean_vector: Vec<f64>,
    /// Written by [`tsne_points`]
    pub tsne_point: Option<Array1<f64>>,
    /// Written by [`eigen_points`]
    pub eigen_point: Option<Array1<f64>>,
}

impl ScoredObject {
    pub fn new(name: impl Into<String>, mean_vector: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            mean_vector,
            ..Default::default()
        }
    }
}

/// Reduce the vectors `get` reads from `objects` and hand each output row to
/// `set` alongside the object it came from.
///
/// An empty batch is rejected with [`Error::InvalidInput`] before `reducer`
/// runs, as are rows of unequal length and reducer output whose row count
/// differs from the batch. Errors from `reducer` are returned unchanged.
pub fn convert_for_each<T, G, S, R>(
    objects: &mut [T],
    get: G,
    mut set: S,
    reducer: &R,
) -> Result<()>
where
    G: Fn(&T) -> &[f64],
    S: FnMut(&mut T, Array1<f64>),
    R: Reducer + ?Sized,
{
    let batch = stack_rows(objects.iter().map(|object| get(object)))?;
    debug!(
        "{} reducing {}x{} batch with {}",
        prefix::REDUCE,
        batch.nrows(),
        batch.ncols(),
        reducer.name()
    );

    let points = reducer.reduce(batch.view())?;
    if points.nrows() != objects.len() {
        return Err(Error::invalid(format!(
            "{} returned {} rows for {} objects",
            reducer.name(),
            points.nrows(),
            objects.len()
        )));
    }

    for (object, point) in objects.iter_mut().zip(points.outer_iter()) {
        set(object, point.to_owned());
    }
    Ok(())
}

/// t-SNE over `mean_vector`, stored in `tsne_point`.
pub fn tsne_points(objects: &mut [ScoredObject], config: &TsneConfig) -> Result<()> {
    convert_for_each(
        objects,
        |object| object.mean_vector.as_slice(),
        |object, point| object.tsne_point = Some(point),
        &Tsne::new(config.clone()),
    )
}

/// Left singular vectors over `mean_vector`, stored in `eigen_point`.
pub fn eigen_points(objects: &mut [ScoredObject], config: &SvdConfig) -> Result<()> {
    convert_for_each(
        objects,
        |object| object.mean_vector.as_slice(),
        |object, point| object.eigen_point = Some(point),
        &Svd::new(config.clone()),
    )
}

/// Stack equally sized rows into an `[N, D]` matrix, preserving order.
fn stack_rows<'a, I>(rows: I) -> Result<Array2<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut data = Vec::new();
    let mut width = None;
    let mut n_rows = 0;

    for (i, row) in rows.into_iter().enumerate() {
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(Error::invalid(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    w
                )));
            }
            Some(_) => {}
        }
        data.extend_from_slice(row);
        n_rows += 1;
    }

    let width = width.ok_or_else(|| Error::invalid("cannot reduce an empty batch"))?;
    Array2::from_shape_vec((n_rows, width), data).map_err(|e| Error::invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s, ArrayView2};
    use std::cell::Cell;

    fn objects() -> Vec<ScoredObject> {
        vec![
            ScoredObject::new("a", vec![1.0, 10.0, 100.0]),
            ScoredObject::new("b", vec![2.0, 20.0, 200.0]),
            ScoredObject::new("c", vec![3.0, 30.0, 300.0]),
        ]
    }

    #[test]
    fn output_rows_follow_input_order() {
        let mut objects = objects();
        convert_for_each(
            &mut objects,
            |o| o.mean_vector.as_slice(),
            |o, p| o.tsne_point = Some(p),
            &|v: ArrayView2<'_, f64>| -> Result<Array2<f64>> { Ok(v.slice(s![.., ..2]).to_owned()) },
        )
        .unwrap();

        assert_eq!(objects[0].tsne_point, Some(array![1.0, 10.0]));
        assert_eq!(objects[1].tsne_point, Some(array![2.0, 20.0]));
        assert_eq!(objects[2].tsne_point, Some(array![3.0, 30.0]));
        assert!(objects.iter().all(|o| o.eigen_point.is_none()));
    }

    #[test]
    fn empty_batch_is_rejected_before_reducing() {
        let calls = Cell::new(0);
        let mut empty: Vec<ScoredObject> = Vec::new();
        let result = convert_for_each(
            &mut empty,
            |o| o.mean_vector.as_slice(),
            |o, p| o.tsne_point = Some(p),
            &|v: ArrayView2<'_, f64>| -> Result<Array2<f64>> {
                calls.set(calls.get() + 1);
                Ok(v.to_owned())
            },
        );

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut objects = objects();
        objects[1].mean_vector.pop();
        let result = eigen_points(&mut objects, &SvdConfig::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(objects.iter().all(|o| o.eigen_point.is_none()));
    }

    #[test]
    fn reducer_errors_pass_through() {
        let mut objects = objects();
        let result = convert_for_each(
            &mut objects,
            |o| o.mean_vector.as_slice(),
            |o, p| o.tsne_point = Some(p),
            &|_: ArrayView2<'_, f64>| -> Result<Array2<f64>> {
                Err(Error::Reduce("boom".into()))
            },
        );

        match result {
            Err(Error::Reduce(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected reducer error, got {:?}", other),
        }
        assert!(objects.iter().all(|o| o.tsne_point.is_none()));
    }

    #[test]
    fn short_reducer_output_is_rejected() {
        let mut objects = objects();
        let result = convert_for_each(
            &mut objects,
            |o| o.mean_vector.as_slice(),
            |o, p| o.tsne_point = Some(p),
            &|v: ArrayView2<'_, f64>| -> Result<Array2<f64>> { Ok(v.slice(s![..1, ..]).to_owned()) },
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn eigen_points_fill_every_object() {
        let mut objects = objects();
        objects[2].mean_vector = vec![0.0, 1.0, -1.0];
        eigen_points(&mut objects, &SvdConfig::default()).unwrap();
        for object in &objects {
            assert_eq!(object.eigen_point.as_ref().map(|p| p.len()), Some(3));
        }
    }
}
