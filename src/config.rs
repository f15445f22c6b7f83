use crate::analysis::ReportKind;
use crate::stats::DEFAULT_CFR_LAG;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Analysis configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Parameters of the derived statistics.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Days assumed between case confirmation and death.
    pub cfr_lag: usize,
    /// Name of the region aggregating all others.
    pub global_region: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cfr_lag: DEFAULT_CFR_LAG,
            global_region: "Global".to_string(),
        }
    }
}

/// Parameters of the batch export.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Reports written by each export.
    pub reports: Vec<ReportKind>,
    /// Regions to export (every region with confirmed cases if absent).
    pub regions: Option<Vec<String>>,
    /// Output directory, relative to the data directory.
    pub out_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            reports: ReportKind::ALL.to_vec(),
            regions: None,
            out_dir: "reports".to_string(),
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Missing sections and fields take their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_lag(self.analysis.cfr_lag)?;
        if self.analysis.global_region.trim().is_empty() {
            bail!("global region name must not be empty");
        }

        let reports = &self.export.reports;
        if reports.is_empty() {
            bail!("at least one report must be exported");
        }
        for (idx, report) in reports.iter().enumerate() {
            if reports[..idx].contains(report) {
                bail!("report {report} is listed more than once");
            }
        }

        if let Some(regions) = &self.export.regions {
            if regions.is_empty() {
                bail!("region list must not be empty when given");
            }
        }

        let out_dir = Path::new(&self.export.out_dir);
        if self.export.out_dir.is_empty() || out_dir.is_absolute() {
            bail!("output directory must be a non-empty relative path");
        }

        Ok(())
    }
}

/// Check that a case-fatality lag is within the supported range.
pub fn check_lag(lag: usize) -> Result<()> {
    check_num(lag, 0..=365).context("invalid case-fatality lag")
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
