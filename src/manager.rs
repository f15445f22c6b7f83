use crate::analysis::{Analyzer, ExportSummary};
use crate::config::{Config, check_lag};
use crate::model::TimeSeriesStore;
use crate::summary::RegionSummary;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use glob::{Pattern, glob};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Owns a data directory: its configuration, store snapshot and reports.
pub struct Manager {
    data_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(data_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { data_dir, cfg })
    }

    /// Override the configured case-fatality lag.
    pub fn set_cfr_lag(&mut self, cfr_lag: usize) -> Result<()> {
        check_lag(cfr_lag)?;
        self.cfg.analysis.cfr_lag = cfr_lag;
        Ok(())
    }

    /// Load the store snapshot and add the global total region.
    pub fn load_store(&self) -> Result<TimeSeriesStore> {
        let store_file = self.store_file();
        let mut store = TimeSeriesStore::from_file(&store_file)
            .with_context(|| format!("failed to load {store_file:?}"))?;
        store.add_global_total(&self.cfg.analysis.global_region);
        log::info!("loaded {store_file:?}");
        Ok(store)
    }

    /// Compute the summary of `region` (the global region by default).
    pub fn summarize_region(&self, region: Option<&str>) -> Result<RegionSummary> {
        let store = self.load_store().context("failed to load store")?;
        let region = region.unwrap_or(&self.cfg.analysis.global_region);
        RegionSummary::new(&store, region, self.cfg.analysis.cfr_lag)
            .with_context(|| format!("failed to summarize region {region:?}"))
    }

    /// Export every configured report, dated `date`.
    pub fn export_reports(&self, date: NaiveDate) -> Result<ExportSummary> {
        let store = self.load_store().context("failed to load store")?;

        let out_dir = self.out_dir();
        fs::create_dir_all(&out_dir).with_context(|| format!("failed to create {out_dir:?}"))?;

        let regions = match &self.cfg.export.regions {
            Some(regions) => regions.clone(),
            None => store.regions(),
        };

        let mut analyzer = Analyzer::new(&self.cfg.export.reports, self.cfg.analysis.cfr_lag);
        for region in &regions {
            analyzer.add_region(&store, region);
        }

        let summary = analyzer
            .save_results(&out_dir, date)
            .context("failed to save results")?;
        log::info!(
            "exported {} regions with {} failures",
            regions.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Remove previously exported report files.
    pub fn clean_reports(&self) -> Result<usize> {
        let out_dir = self.out_dir();
        let out_dir = out_dir.to_str().context("output dir is not valid UTF-8")?;
        let pattern = Path::new(&Pattern::escape(out_dir)).join("*.json");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;

        let mut count = 0;
        for file in glob(pattern)
            .context("failed to glob report files")?
            .filter_map(Result::ok)
        {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
            count += 1;
        }
        Ok(count)
    }

    fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.msgpack")
    }

    fn out_dir(&self) -> PathBuf {
        self.data_dir.join(&self.cfg.export.out_dir)
    }
}
