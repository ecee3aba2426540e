use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::ensemble::EnsembleAggregator;
use crate::growth::GrowthTrajectory;
use crate::numeric::{Height, Real};
use crate::snapshot::Field;
use crate::stats::SnapshotAccumulator;
use crate::GrowthError;

/// Ensemble average and variance of one field at every checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSeries {
    pub average: Vec<f64>,
    pub variance: Vec<f64>,
}

/// Ensemble average and variance of one scalar.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FieldMoments {
    pub average: f64,
    pub variance: f64,
}

/// Regression coefficient distribution for each named field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoefficientSummary {
    pub height: FieldMoments,
    pub width: FieldMoments,
    pub skewness: FieldMoments,
    pub kurtosis: FieldMoments,
}

/// Everything an ensemble exposes for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleRecord {
    pub systems: usize,
    pub size: usize,
    pub size_x: usize,
    pub size_y: usize,
    pub nl: Vec<f64>,
    pub height: FieldSeries,
    pub width: FieldSeries,
    pub skewness: FieldSeries,
    pub kurtosis: FieldSeries,
    pub slope: CoefficientSummary,
    pub intercept: CoefficientSummary,
    pub grid: Vec<i64>,
}

impl EnsembleRecord {
    pub fn from_ensemble<H: Height, F: Real>(ensemble: &EnsembleAggregator<H, F>) -> Self {
        let seed = ensemble.seed_surface();
        let series = |field: Field| FieldSeries {
            average: to_f64(&ensemble.field_average(field)),
            variance: to_f64(&ensemble.field_variance(field)),
        };

        Self {
            systems: ensemble.systems(),
            size: seed.size(),
            size_x: seed.size_x(),
            size_y: seed.size_y(),
            nl: to_f64(ensemble.nl()),
            height: series(Field::Height),
            width: series(Field::Width),
            skewness: series(Field::Skewness),
            kurtosis: series(Field::Kurtosis),
            slope: CoefficientSummary::from_accumulator(ensemble.slope()),
            intercept: CoefficientSummary::from_accumulator(ensemble.intercept()),
            grid: seed.grid().iter().map(|h| h.to_i64()).collect(),
        }
    }

    pub fn field(&self, field: Field) -> &FieldSeries {
        match field {
            Field::Height => &self.height,
            Field::Width => &self.width,
            Field::Skewness => &self.skewness,
            Field::Kurtosis => &self.kurtosis,
        }
    }
}

impl CoefficientSummary {
    fn from_accumulator<F: Real>(acc: &SnapshotAccumulator<F>) -> Self {
        let average = acc.mean();
        let variance = acc.variance();
        let moments = |field: Field| FieldMoments {
            average: average.value(field).to_f64(),
            variance: variance.value(field).to_f64(),
        };

        Self {
            height: moments(Field::Height),
            width: moments(Field::Width),
            skewness: moments(Field::Skewness),
            kurtosis: moments(Field::Kurtosis),
        }
    }
}

fn to_f64<F: Real>(values: &[F]) -> Vec<f64> {
    values.iter().map(|v| v.to_f64()).collect()
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

fn ensure_len(context: &'static str, expected: usize, actual: usize) -> Result<(), GrowthError> {
    if expected == actual {
        return Ok(());
    }

    Err(GrowthError::ShapeMismatch {
        context,
        expected,
        got: actual,
    })
}

pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, GrowthError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

pub fn write_summary_json(path: &Path, record: &EnsembleRecord) -> Result<(), GrowthError> {
    fs::write(path, serde_json::to_string_pretty(record)?)?;
    Ok(())
}

pub fn read_summary_json(path: &Path) -> Result<EnsembleRecord, GrowthError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_checkpoints_csv(path: &Path, record: &EnsembleRecord) -> Result<(), GrowthError> {
    for field in Field::ALL {
        let series = record.field(field);
        ensure_len(field.name(), record.nl.len(), series.average.len())?;
        ensure_len(field.name(), record.nl.len(), series.variance.len())?;
    }

    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "nl",
        "height_av",
        "height_var",
        "width_av",
        "width_var",
        "skewness_av",
        "skewness_var",
        "kurtosis_av",
        "kurtosis_var",
    ])?;

    for idx in 0..record.nl.len() {
        writer.write_record([
            fmt_f64(record.nl[idx]),
            fmt_f64(record.height.average[idx]),
            fmt_f64(record.height.variance[idx]),
            fmt_f64(record.width.average[idx]),
            fmt_f64(record.width.variance[idx]),
            fmt_f64(record.skewness.average[idx]),
            fmt_f64(record.skewness.variance[idx]),
            fmt_f64(record.kurtosis.average[idx]),
            fmt_f64(record.kurtosis.variance[idx]),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Single-run series: `nl` against the four named fields.
pub fn write_trajectory_csv<H: Height, F: Real>(
    path: &Path,
    trajectory: &GrowthTrajectory<H, F>,
) -> Result<(), GrowthError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["nl", "height", "width", "skewness", "kurtosis"])?;

    for (nl, snapshot) in trajectory.nl().iter().zip(trajectory.snapshots()) {
        let [height, width, skewness, kurtosis] =
            Field::ALL.map(|field| fmt_f64(snapshot.value(field).to_f64()));
        writer.write_record([fmt_f64(nl.to_f64()), height, width, skewness, kurtosis])?;
    }

    writer.flush()?;
    Ok(())
}
