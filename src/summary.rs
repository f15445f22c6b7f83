//! Printable per-region summary tables.

use crate::model::{DataKind, Series, TimeSeriesStore};
use crate::stats::{cfr_for_region, growth_factor_for_region, linear_trend, mean};
use anyhow::Result;
use std::fmt;

/// Latest and mean value of a derived series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentMean {
    pub current: Option<f64>,
    pub mean: Option<f64>,
}

impl CurrentMean {
    fn of(series: &Series) -> Self {
        Self {
            current: series.last().map(|pt| pt.value),
            mean: mean(&series.values()),
        }
    }
}

/// Summary of every statistic for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub region: String,
    pub confirmed: f64,
    pub recovered: f64,
    pub deaths: f64,
    pub growth_factor: CurrentMean,
    pub cfr_lag: usize,
    pub cfr: CurrentMean,
    /// Latest CFR trend value, `None` if no trend could be fitted.
    pub cfr_trend: Option<f64>,
}

impl RegionSummary {
    /// Compute the summary of `region`.
    ///
    /// # Errors
    /// Returns an error if any data kind is missing for `region`.
    pub fn new(store: &TimeSeriesStore, region: &str, cfr_lag: usize) -> Result<Self> {
        let latest = |kind| -> Result<f64> {
            let series = store.series(kind, region)?;
            Ok(series.last().map_or(0.0, |pt| pt.value))
        };

        let growth_factor = growth_factor_for_region(store, region)?;
        let cfr = cfr_for_region(store, region, cfr_lag)?;
        let cfr_trend = linear_trend(&cfr).and_then(|trend| trend.last().map(|pt| pt.value));

        Ok(Self {
            region: region.to_string(),
            confirmed: latest(DataKind::Confirmed)?,
            recovered: latest(DataKind::Recovered)?,
            deaths: latest(DataKind::Deaths)?,
            growth_factor: CurrentMean::of(&growth_factor),
            cfr_lag,
            cfr: CurrentMean::of(&cfr),
            cfr_trend,
        })
    }
}

impl fmt::Display for RegionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.region.len().max(6);
        let region = &self.region;

        writeln!(f, "{:width$} {:>14} {:>14} {:>14}", "", "Confirmed", "Recovered", "Deaths")?;
        writeln!(
            f,
            "{region:width$} {:>14} {:>14} {:>14}",
            format_count(self.confirmed),
            format_count(self.recovered),
            format_count(self.deaths)
        )?;
        writeln!(f)?;

        writeln!(f, "Growth factor")?;
        writeln!(f, "{:width$} {:>14} {:>14}", "", "Current", "Mean")?;
        writeln!(
            f,
            "{region:width$} {:>14} {:>14}",
            format_opt(self.growth_factor.current, |v| format!("{v:.6}")),
            format_opt(self.growth_factor.mean, |v| format!("{v:.6}"))
        )?;
        writeln!(f)?;

        writeln!(f, "Case fatality rate (lag {} days)", self.cfr_lag)?;
        writeln!(f, "{:width$} {:>14} {:>14}", "", "Current", "Mean")?;
        writeln!(
            f,
            "{region:width$} {:>14} {:>14}",
            format_opt(self.cfr.current, format_percent),
            format_opt(self.cfr.mean, format_percent)
        )?;
        writeln!(f)?;

        match self.cfr_trend {
            Some(val) => writeln!(f, "CFR trend: {}", format_percent(val)),
            None => writeln!(
                f,
                "Could not calculate CFR linear regression for this region."
            ),
        }
    }
}

/// Format a count with thousands separators (`1234567.0` -> `1,234,567`).
pub fn format_count(val: f64) -> String {
    let rounded = val.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a ratio as a percentage with two decimals (`0.0345` -> `3.45%`).
pub fn format_percent(val: f64) -> String {
    format!("{:.2}%", val * 100.0)
}

fn format_opt(val: Option<f64>, fmt: impl Fn(f64) -> String) -> String {
    val.map_or_else(|| "n/a".to_string(), fmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};

    fn store(deaths: [f64; 5]) -> TimeSeriesStore {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dates: Vec<_> = (0..5).map(|d| start + Days::new(d)).collect();

        let mut store = TimeSeriesStore::new();
        let data = [
            (DataKind::Confirmed, [100.0, 100.0, 110.0, 130.0, 1_234_567.0]),
            (DataKind::Recovered, [0.0, 0.0, 1.0, 5.0, 1_000.0]),
            (DataKind::Deaths, deaths),
        ];
        for (kind, values) in data {
            store
                .insert(kind, "Testland", Series::from_parts(&dates, &values))
                .unwrap();
        }
        store
    }

    #[test]
    fn summary_collects_every_statistic() {
        let summary = RegionSummary::new(&store([0.0, 0.0, 1.0, 2.0, 3.0]), "Testland", 2).unwrap();

        assert_eq!(summary.confirmed, 1_234_567.0);
        assert_eq!(summary.recovered, 1_000.0);
        assert_eq!(summary.deaths, 3.0);

        // Growth factor points: 10 / 0 -> 0, 20 / 10 = 2, (1234567 - 130) / 20.
        let gf_last = (1_234_567.0 - 130.0) / 20.0;
        assert_relative_eq!(summary.growth_factor.current.unwrap(), gf_last, epsilon = 1e-9);
        assert_relative_eq!(
            summary.growth_factor.mean.unwrap(),
            (0.0 + 2.0 + gf_last) / 3.0,
            epsilon = 1e-9
        );

        // CFR points: 1 / 100, 2 / 100, 3 / 110.
        let cfr = [0.01, 0.02, 3.0 / 110.0];
        assert_relative_eq!(summary.cfr.current.unwrap(), cfr[2], epsilon = 1e-12);
        assert_relative_eq!(
            summary.cfr.mean.unwrap(),
            (cfr[0] + cfr[1] + cfr[2]) / 3.0,
            epsilon = 1e-12
        );

        // Fitted at ordinal positions 0, 1, 2: slope is half the end-to-end rise.
        let cfr_mean = (cfr[0] + cfr[1] + cfr[2]) / 3.0;
        let trend_last = cfr_mean + (cfr[2] - cfr[0]) / 2.0;
        assert_relative_eq!(summary.cfr_trend.unwrap(), trend_last, epsilon = 1e-12);

        let text = summary.to_string();
        assert!(text.contains("1,234,567"));
        assert!(text.contains("1,000"));
        assert!(text.contains(&format!("{gf_last:.6}")));
        assert!(text.contains(&format_percent(cfr[2])));
        assert!(text.contains(&format!("CFR trend: {}", format_percent(trend_last))));
        assert!(!text.contains("n/a"));
    }

    #[test]
    fn summary_of_short_series_prints_not_available() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dates = [start, start + Days::new(1)];

        let mut store = TimeSeriesStore::new();
        for (kind, values) in [
            (DataKind::Confirmed, [10.0, 20.0]),
            (DataKind::Recovered, [0.0, 1.0]),
            (DataKind::Deaths, [0.0, 1.0]),
        ] {
            store
                .insert(kind, "Tinyland", Series::from_parts(&dates, &values))
                .unwrap();
        }

        let summary = RegionSummary::new(&store, "Tinyland", 2).unwrap();
        let empty = CurrentMean {
            current: None,
            mean: None,
        };
        assert_eq!(summary.growth_factor, empty);
        assert_eq!(summary.cfr, empty);
        assert_eq!(summary.cfr_trend, None);

        let text = summary.to_string();
        assert_eq!(text.matches("n/a").count(), 4);
        assert!(text.contains("Could not calculate CFR linear regression for this region."));
    }

    #[test]
    fn summary_reports_missing_trend() {
        let summary = RegionSummary::new(&store([0.0; 5]), "Testland", 2).unwrap();

        assert_eq!(summary.cfr_trend, None);
        assert!(
            summary
                .to_string()
                .contains("Could not calculate CFR linear regression for this region.")
        );
    }

    #[test]
    fn summary_of_missing_region_fails() {
        assert!(RegionSummary::new(&store([0.0; 5]), "Nowhere", 2).is_err());
    }

    #[test]
    fn counts_and_percentages_are_formatted() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1_000.0), "1,000");
        assert_eq!(format_count(1_234_567.0), "1,234,567");
        assert_eq!(format_count(-12_345.0), "-12,345");
        assert_eq!(format_percent(0.0345), "3.45%");
        assert_eq!(format_percent(0.1), "10.00%");
    }
}
