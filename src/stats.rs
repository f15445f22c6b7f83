//! Derived statistics over time series.

use crate::model::{DataKind, Point, Series, StoreError, TimeSeriesStore};

/// Default number of days assumed between case confirmation and death.
pub const DEFAULT_CFR_LAG: usize = 7;

/// Compute the day-over-day growth factor of a cumulative series.
///
/// Point `i` (for `i >= 2`) is `(x[i] - x[i-1]) / (x[i-1] - x[i-2])`.
/// Zero denominators and non-positive ratios resolve to 0. The output is
/// aligned to the source dates starting at the third point, so it is empty
/// for series shorter than 3 points.
pub fn growth_factor(series: &Series) -> Series {
    let pts = series.points();
    pts.windows(3)
        .map(|win| {
            let num = win[2].value - win[1].value;
            let den = win[1].value - win[0].value;
            let ratio = if den == 0.0 { 0.0 } else { num / den };
            Point {
                date: win[2].date,
                value: if ratio.is_finite() && ratio > 0.0 {
                    ratio
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Compute the lagged case-fatality rate `D[i] / C[i - lag]`.
///
/// The output is aligned to the dates of `deaths` from position `lag`
/// onward. A zero case count yields a rate of 0. Both series must share
/// the same date domain; misaligned inputs are not detected.
pub fn case_fatality_rate(confirmed: &Series, deaths: &Series, lag: usize) -> Series {
    let cases = confirmed.points();
    deaths
        .tail(lag)
        .iter()
        .enumerate()
        .map_while(|(idx, pt)| {
            // `idx` is already `i - lag`.
            let n_cases = cases.get(idx)?.value;
            Some(Point {
                date: pt.date,
                value: if n_cases == 0.0 {
                    0.0
                } else {
                    pt.value / n_cases
                },
            })
        })
        .collect()
}

/// Fit an in-sample linear trend to the positive points of `series`.
///
/// Points with values `<= 0` are dropped and the remaining dates are
/// encoded by first-occurrence order (`0..k`), so gaps in the calendar are
/// compacted. Returns `None` when no positive point remains.
pub fn linear_trend(series: &Series) -> Option<Series> {
    let kept: Vec<&Point> = series.points().iter().filter(|pt| pt.value > 0.0).collect();
    if kept.is_empty() {
        return None;
    }

    let codes = factorize(kept.iter().map(|pt| pt.date));
    let xs: Vec<f64> = codes.iter().map(|&code| code as f64).collect();
    let ys: Vec<f64> = kept.iter().map(|pt| pt.value).collect();
    let (intercept, slope) = fit_line(&xs, &ys)?;

    Some(
        kept.iter()
            .zip(&xs)
            .map(|(pt, &x)| Point {
                date: pt.date,
                value: intercept + slope * x,
            })
            .collect(),
    )
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        return None;
    }
    Some(vals.iter().sum::<f64>() / vals.len() as f64)
}

/// Growth factor of the confirmed cases of `region`.
pub fn growth_factor_for_region(
    store: &TimeSeriesStore,
    region: &str,
) -> Result<Series, StoreError> {
    let confirmed = store.series(DataKind::Confirmed, region)?;
    Ok(growth_factor(confirmed))
}

/// Case-fatality rate of `region` with the given lag.
pub fn cfr_for_region(
    store: &TimeSeriesStore,
    region: &str,
    lag: usize,
) -> Result<Series, StoreError> {
    let confirmed = store.series(DataKind::Confirmed, region)?;
    let deaths = store.series(DataKind::Deaths, region)?;
    Ok(case_fatality_rate(confirmed, deaths, lag))
}

/// Assign `0..k` to distinct items in order of first appearance.
fn factorize<T: PartialEq, I: IntoIterator<Item = T>>(items: I) -> Vec<usize> {
    let mut seen: Vec<T> = Vec::new();
    items
        .into_iter()
        .map(|item| match seen.iter().position(|s| *s == item) {
            Some(code) => code,
            None => {
                seen.push(item);
                seen.len() - 1
            }
        })
        .collect()
}

/// Ordinary least squares fit of `y = intercept + slope * x`.
///
/// A constant `x` (including a single point) yields a flat line at the mean.
fn fit_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;

    let (cov, x_var) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(cov, var), (&x, &y)| {
            let dx = x - x_mean;
            (cov + dx * (y - y_mean), var + dx * dx)
        });

    let slope = if x_var > 0.0 { cov / x_var } else { 0.0 };
    Some((y_mean - slope * x_mean, slope))
}
