//! Top-k score reports.
//!
//! Renders one line per step of a score matrix (`[steps, vocab]`, or a single
//! `[vocab]` vector treated as one step):
//!
//! ```text
//! 0.700 b        | 0.700 b        0.200 c
//! ```
//!
//! The segment before `|` appears only when the step has a true label and
//! shows the score the step gave that label. The rest lists the `top_k`
//! highest scores in descending order; equal scores keep ascending index
//! order.
//!
//! # Example
//!
//! ```rust
//! use ndarray::array;
//! use qntx_analysis::report::{TopKReport, ValueFormat};
//!
//! let vocab = vec!["the", "cat", "sat"];
//! let probs = array![[0.2, 0.5, 0.3], [0.6, 0.1, 0.3]];
//!
//! let lines = TopKReport::new(&vocab)
//!     .labels(&[2, 0])
//!     .top_k(1)
//!     .value_format(ValueFormat::Percent)
//!     .render(probs.view())
//!     .unwrap();
//! assert_eq!(lines[1], " 60.0% the      |  60.0% the     ");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::io::{self, Write};

use ndarray::{ArrayView, ArrayView1, ArrayView2, Axis, Dimension, Ix1, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format;

/// Integer index → display string.
pub trait LabelMap {
    fn lookup(&self, index: usize) -> Option<&str>;
}

impl<S: AsRef<str>, H: BuildHasher> LabelMap for HashMap<usize, S, H> {
    fn lookup(&self, index: usize) -> Option<&str> {
        self.get(&index).map(AsRef::as_ref)
    }
}

impl<S: AsRef<str>> LabelMap for BTreeMap<usize, S> {
    fn lookup(&self, index: usize) -> Option<&str> {
        self.get(&index).map(AsRef::as_ref)
    }
}

impl<S: AsRef<str>> LabelMap for [S] {
    fn lookup(&self, index: usize) -> Option<&str> {
        self.get(index).map(AsRef::as_ref)
    }
}

impl<S: AsRef<str>> LabelMap for Vec<S> {
    fn lookup(&self, index: usize) -> Option<&str> {
        self.as_slice().lookup(index)
    }
}

/// Built-in score formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// `0.700`
    #[default]
    Decimal,
    /// ` 70.0%`
    Percent,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Decimal => format::decimal(value),
            Self::Percent => format::percent(value),
        }
    }
}

/// Report layout options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Entries listed per step (default: 5)
    pub top_k: usize,
    /// Display columns per label (default: 8)
    pub label_width: usize,
    /// Cut labels longer than `label_width` (default: false)
    pub truncate_labels: bool,
    pub value_format: ValueFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            label_width: 8,
            truncate_labels: false,
            value_format: ValueFormat::Decimal,
        }
    }
}

/// The `k` highest `(value, index)` pairs of `row`, highest first.
///
/// Equal values keep ascending index order; NaN ranks above every number.
pub fn top_k(row: ArrayView1<'_, f64>, k: usize) -> Vec<(f64, usize)> {
    let mut ranked: Vec<(f64, usize)> = row.iter().copied().zip(0..).collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    ranked.truncate(k);
    ranked
}

/// Builder for top-k reports over a score matrix.
pub struct TopKReport<'a, M: LabelMap + ?Sized> {
    idx2word: &'a M,
    config: ReportConfig,
    labels: Option<Vec<Option<usize>>>,
    steps: Option<Vec<usize>>,
    formatter: Option<Box<dyn Fn(f64) -> String + 'a>>,
}

impl<'a, M: LabelMap + ?Sized> TopKReport<'a, M> {
    pub fn new(idx2word: &'a M) -> Self {
        Self {
            idx2word,
            config: ReportConfig::default(),
            labels: None,
            steps: None,
            formatter: None,
        }
    }

    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    /// One true label per step.
    pub fn labels(mut self, labels: &[usize]) -> Self {
        self.labels = Some(labels.iter().copied().map(Some).collect());
        self
    }

    /// True label for a single-vector report.
    pub fn label(self, label: usize) -> Self {
        self.labels(&[label])
    }

    /// Per-step labels where `None` omits the label segment for that step.
    pub fn step_labels(mut self, labels: Vec<Option<usize>>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Steps to render, in output order. Defaults to every step ascending.
    pub fn steps(mut self, steps: &[usize]) -> Self {
        self.steps = Some(steps.to_vec());
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn label_width(mut self, width: usize) -> Self {
        self.config.label_width = width;
        self
    }

    pub fn truncate_labels(mut self, truncate: bool) -> Self {
        self.config.truncate_labels = truncate;
        self
    }

    pub fn value_format(mut self, format: ValueFormat) -> Self {
        self.config.value_format = format;
        self
    }

    /// Custom score formatter; overrides `value_format`.
    pub fn value_formatter(mut self, formatter: impl Fn(f64) -> String + 'a) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Build the report lines without printing them.
    pub fn render<D: Dimension>(&self, values: ArrayView<'_, f64, D>) -> Result<Vec<String>> {
        let values = as_steps(values)?;
        let (n_steps, vocab) = values.dim();

        let labels = match &self.labels {
            Some(labels) if labels.len() != n_steps => {
                return Err(Error::invalid(format!(
                    "{} labels for {} steps",
                    labels.len(),
                    n_steps
                )));
            }
            Some(labels) => labels.clone(),
            None => vec![None; n_steps],
        };
        if self.config.top_k > vocab {
            return Err(Error::invalid(format!(
                "top_k ({}) exceeds vocabulary size ({})",
                self.config.top_k, vocab
            )));
        }

        let steps: Vec<usize> = match &self.steps {
            Some(steps) => steps.clone(),
            None => (0..n_steps).collect(),
        };

        steps
            .into_iter()
            .map(|step| {
                if step >= n_steps {
                    return Err(Error::invalid(format!(
                        "step {} out of range for {} steps",
                        step, n_steps
                    )));
                }
                self.render_step(values.row(step), labels[step])
            })
            .collect()
    }

    /// Render and print to stdout, returning the printed lines.
    pub fn report<D: Dimension>(&self, values: ArrayView<'_, f64, D>) -> Result<Vec<String>> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_to(&mut out, values)
    }

    /// Render and write one line per step to `writer`.
    pub fn write_to<W: Write, D: Dimension>(
        &self,
        writer: &mut W,
        values: ArrayView<'_, f64, D>,
    ) -> Result<Vec<String>> {
        let lines = self.render(values)?;
        for line in &lines {
            writeln!(writer, "{}", line)?;
        }
        Ok(lines)
    }

    fn render_step(&self, row: ArrayView1<'_, f64>, label: Option<usize>) -> Result<String> {
        let mut line = String::new();

        if let Some(label) = label {
            let value = row.get(label).copied().ok_or_else(|| {
                Error::invalid(format!(
                    "label {} outside vocabulary of {}",
                    label,
                    row.len()
                ))
            })?;
            line.push_str(&self.entry(value, label)?);
            line.push_str(" | ");
        }

        let entries = top_k(row, self.config.top_k)
            .into_iter()
            .map(|(value, index)| self.entry(value, index))
            .collect::<Result<Vec<_>>>()?;
        line.push_str(&entries.join(" "));

        Ok(line)
    }

    fn entry(&self, value: f64, index: usize) -> Result<String> {
        let word = self
            .idx2word
            .lookup(index)
            .ok_or(Error::LookupNotFound(index))?;
        let value = match &self.formatter {
            Some(formatter) => formatter(value),
            None => self.config.value_format.format(value),
        };
        Ok(format!(
            "{} {}",
            value,
            format::pad_label(word, self.config.label_width, self.config.truncate_labels)
        ))
    }
}

/// View scores as `[steps, vocab]`, promoting a single vector to one step.
fn as_steps<'v, D: Dimension>(values: ArrayView<'v, f64, D>) -> Result<ArrayView2<'v, f64>> {
    let shape_error = |e: ndarray::ShapeError| Error::invalid(e.to_string());
    match values.ndim() {
        1 => Ok(values
            .into_dimensionality::<Ix1>()
            .map_err(shape_error)?
            .insert_axis(Axis(0))),
        2 => values.into_dimensionality::<Ix2>().map_err(shape_error),
        n => Err(Error::invalid(format!(
            "expected 1-D or 2-D scores, got {}-D",
            n
        ))),
    }
}
