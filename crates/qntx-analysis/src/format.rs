//! Display helpers for analysis output.

/// Fixed-width score with three decimals: `0.7` → `0.700`.
pub fn decimal(value: f64) -> String {
    format!("{:5.3}", value)
}

/// Probability as a percentage, right-aligned in six columns: `0.7` → ` 70.0%`.
pub fn percent(value: f64) -> String {
    format!("{:>6}", format!("{:.1}%", value * 100.0))
}

/// `"m / n = xx.xx%"`.
///
/// Panics if `n` is zero.
pub fn frac_format(m: usize, n: usize) -> String {
    assert!(n != 0, "fraction denominator must be non-zero");
    format!("{} / {} = {:.2}%", m, n, m as f64 / n as f64 * 100.0)
}

/// Rows needed to lay out `n_items` in a grid of `n_cols` columns.
///
/// Panics if `n_cols` is zero.
pub fn n_rows(n_items: usize, n_cols: usize) -> usize {
    n_items.div_ceil(n_cols)
}

/// Left-align `label` in `width` columns, cutting it to `width` characters
/// when `truncate` is set.
pub fn pad_label(label: &str, width: usize, truncate: bool) -> String {
    if truncate {
        let cut: String = label.chars().take(width).collect();
        format!("{:<width$}", cut, width = width)
    } else {
        format!("{:<width$}", label, width = width)
    }
}
