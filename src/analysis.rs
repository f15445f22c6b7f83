use crate::model::{Series, TimeSeriesStore};
use crate::stats::{cfr_for_region, growth_factor_for_region, linear_trend};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Identifier of an exportable report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    GrowthFactor,
    Cfr,
    CfrTrend,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::GrowthFactor, ReportKind::Cfr, ReportKind::CfrTrend];

    pub fn id(&self) -> &'static str {
        match self {
            ReportKind::GrowthFactor => "growth_factor",
            ReportKind::Cfr => "cfr",
            ReportKind::CfrTrend => "cfr_trend",
        }
    }

    fn build(&self, cfr_lag: usize) -> Box<dyn Report> {
        let kind = *self;
        match kind {
            ReportKind::GrowthFactor => Box::new(SeriesReport::new(
                kind,
                |store: &TimeSeriesStore, region: &str| -> Result<Series> {
                    Ok(growth_factor_for_region(store, region)?)
                },
            )),
            ReportKind::Cfr => Box::new(SeriesReport::new(
                kind,
                move |store: &TimeSeriesStore, region: &str| -> Result<Series> {
                    Ok(cfr_for_region(store, region, cfr_lag)?)
                },
            )),
            ReportKind::CfrTrend => Box::new(SeriesReport::new(
                kind,
                move |store: &TimeSeriesStore, region: &str| -> Result<Series> {
                    cfr_trend_for_region(store, region, cfr_lag)
                },
            )),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Per-region derived series collected for one export file.
pub trait Report {
    fn kind(&self) -> ReportKind;
    fn add_region(&mut self, store: &TimeSeriesStore, region: &str) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Report mapping every added region to the series computed for it.
pub struct SeriesReport<F> {
    kind: ReportKind,
    compute: F,
    series_map: BTreeMap<String, Series>,
}

impl<F> SeriesReport<F>
where
    F: Fn(&TimeSeriesStore, &str) -> Result<Series>,
{
    pub fn new(kind: ReportKind, compute: F) -> Self {
        Self {
            kind,
            compute,
            series_map: BTreeMap::new(),
        }
    }
}

impl<F> Report for SeriesReport<F>
where
    F: Fn(&TimeSeriesStore, &str) -> Result<Series>,
{
    fn kind(&self) -> ReportKind {
        self.kind
    }

    fn add_region(&mut self, store: &TimeSeriesStore, region: &str) -> Result<()> {
        let series = (self.compute)(store, region)?;
        self.series_map.insert(region.to_string(), series);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!(self.series_map)
    }
}

fn cfr_trend_for_region(store: &TimeSeriesStore, region: &str, cfr_lag: usize) -> Result<Series> {
    let cfr = cfr_for_region(store, region, cfr_lag)?;
    let Some(trend) = linear_trend(&cfr) else {
        bail!("could not calculate CFR linear regression");
    };
    Ok(trend)
}

/// Region that could not be added to a report.
#[derive(Debug)]
pub struct RegionFailure {
    pub report: ReportKind,
    pub region: String,
    pub reason: String,
}

/// Outcome of a batch export.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub failures: Vec<RegionFailure>,
}

/// Batch exporter collecting every configured report over a set of regions.
///
/// Regions are processed independently: a failure is recorded and the
/// remaining regions and reports are still processed.
pub struct Analyzer {
    report_ptr_vec: Vec<Box<dyn Report>>,
    failures: Vec<RegionFailure>,
}

impl Analyzer {
    pub fn new(kinds: &[ReportKind], cfr_lag: usize) -> Self {
        let report_ptr_vec = kinds.iter().map(|kind| kind.build(cfr_lag)).collect();
        Self {
            report_ptr_vec,
            failures: Vec::new(),
        }
    }

    pub fn add_region(&mut self, store: &TimeSeriesStore, region: &str) {
        for report in &mut self.report_ptr_vec {
            if let Err(error) = report.add_region(store, region) {
                let kind = report.kind();
                log::warn!("skipped region {region:?} in {kind} report: {error:#}");
                self.failures.push(RegionFailure {
                    report: kind,
                    region: region.to_string(),
                    reason: format!("{error:#}"),
                });
            }
        }
    }

    /// Write one `<date>-<report id>.json` file per report into `dir`.
    pub fn save_results<P: AsRef<Path>>(self, dir: P, date: NaiveDate) -> Result<ExportSummary> {
        let dir = dir.as_ref();
        let mut files = Vec::with_capacity(self.report_ptr_vec.len());

        for report in &self.report_ptr_vec {
            let file = dir.join(format!("{}-{}.json", date.format("%Y-%m-%d"), report.kind()));
            save_json(&file, &report.report())
                .with_context(|| format!("failed to save {} report", report.kind()))?;
            log::info!("saved {file:?}");
            files.push(file);
        }

        Ok(ExportSummary {
            files,
            failures: self.failures,
        })
    }
}

fn save_json(file: &Path, value: &serde_json::Value) -> Result<()> {
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("failed to serialize report")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataKind;
    use chrono::Days;

    fn store() -> TimeSeriesStore {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dates: Vec<_> = (0..5).map(|d| start + Days::new(d)).collect();

        let mut store = TimeSeriesStore::new();
        for (region, confirmed, deaths) in [
            ("Testland", [10.0, 20.0, 30.0, 45.0, 60.0], [0.0, 0.0, 1.0, 2.0, 3.0]),
            ("Quietland", [5.0, 5.0, 5.0, 5.0, 5.0], [0.0; 5]),
        ] {
            store
                .insert(DataKind::Confirmed, region, Series::from_parts(&dates, &confirmed))
                .unwrap();
            store
                .insert(DataKind::Deaths, region, Series::from_parts(&dates, &deaths))
                .unwrap();
        }
        store
    }

    #[test]
    fn failures_are_isolated_per_region() {
        let store = store();
        let mut analyzer = Analyzer::new(&ReportKind::ALL, 2);
        for region in ["Quietland", "Nowhere", "Testland"] {
            analyzer.add_region(&store, region);
        }

        // Nowhere fails every report, Quietland only has no trend.
        let failed: Vec<_> = analyzer
            .failures
            .iter()
            .map(|f| (f.report, f.region.as_str()))
            .collect();
        assert_eq!(
            failed,
            vec![
                (ReportKind::CfrTrend, "Quietland"),
                (ReportKind::GrowthFactor, "Nowhere"),
                (ReportKind::Cfr, "Nowhere"),
                (ReportKind::CfrTrend, "Nowhere"),
            ]
        );

        let trend = analyzer.report_ptr_vec[2].report();
        assert!(trend.get("Testland").is_some());
        assert!(trend.get("Quietland").is_none());

        let cfr = analyzer.report_ptr_vec[1].report();
        assert_eq!(cfr["Testland"][0]["date"], "2020-03-03");
        assert_eq!(cfr["Testland"][0]["value"], 0.1);
    }

    #[test]
    fn report_ids_match_config_names() {
        for kind in ReportKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.id());
        }
    }
}
