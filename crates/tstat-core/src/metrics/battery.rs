//! Battery charge, either reported directly or derived from cell voltage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{MetricSource, RawValue};
use crate::error::ProbeError;
use crate::format::bar_glyph;
use crate::probe;

/// Where the charge percentage comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatterySource {
    /// `<path>/capacity`, already a percentage.
    #[default]
    Capacity,
    /// `<path>/voltage_now` in microvolts, mapped through a [`VoltageCurve`].
    Voltage,
}

/// Piecewise-linear discharge curve of `(volts, percent)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageCurve {
    points: Vec<(f64, f64)>,
}

impl VoltageCurve {
    /// Builds a curve; points are sorted by voltage.
    ///
    /// # Errors
    /// Returns an error if fewer than two points are given or any is not finite.
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self, String> {
        if points.len() < 2 {
            return Err("voltage curve needs at least two points".to_string());
        }
        if points.iter().any(|(v, p)| !v.is_finite() || !p.is_finite()) {
            return Err("voltage curve points must be finite".to_string());
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { points })
    }

    /// Single Li-ion cell, resting voltage.
    pub fn lithium_ion() -> Self {
        Self {
            points: vec![
                (3.00, 0.0),
                (3.30, 5.0),
                (3.60, 20.0),
                (3.70, 50.0),
                (3.80, 70.0),
                (3.90, 80.0),
                (4.00, 90.0),
                (4.20, 100.0),
            ],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Charge percentage for `volts`, clamped to the curve's end points.
    pub fn percent(&self, volts: f64) -> f64 {
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        if volts <= first.0 {
            return first.1;
        }
        if volts >= last.0 {
            return last.1;
        }
        self.points
            .windows(2)
            .find(|w| volts <= w[1].0)
            .map_or(last.1, |w| {
                let ((v0, p0), (v1, p1)) = (w[0], w[1]);
                p0 + (volts - v0) * (p1 - p0) / (v1 - v0)
            })
    }
}

impl Default for VoltageCurve {
    fn default() -> Self {
        Self::lithium_ion()
    }
}

/// A battery exposed as a power-supply directory (`/sys/class/power_supply/BAT0`).
#[derive(Debug, Clone)]
pub struct Battery {
    pub path: PathBuf,
    pub source: BatterySource,
    pub curve: VoltageCurve,
}

impl Default for Battery {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/sys/class/power_supply/BAT0"),
            source: BatterySource::Capacity,
            curve: VoltageCurve::default(),
        }
    }
}

impl Battery {
    fn charging(&self) -> bool {
        probe::read_trimmed(&self.path.join("status")).is_ok_and(|s| s == "Charging")
    }
}

impl MetricSource for Battery {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        if !self.path.is_dir() {
            return Err(ProbeError::no_data("no battery present"));
        }
        let percent = match self.source {
            BatterySource::Capacity => probe::first_field(&self.path.join("capacity"))?,
            BatterySource::Voltage => {
                let microvolts = probe::first_field(&self.path.join("voltage_now"))?;
                self.curve.percent(microvolts / 1_000_000.0)
            }
        };
        Ok(RawValue::Battery {
            percent: percent.clamp(0.0, 100.0),
            charging: self.charging(),
        })
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        match raw {
            RawValue::Battery { percent, charging } => {
                let marker = if *charging { "+" } else { "" };
                Some(format!("{}{percent:.0}%{marker}", bar_glyph(*percent)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_curve_interpolates_and_clamps() {
        let curve = VoltageCurve::new(vec![(4.2, 100.0), (3.0, 0.0), (3.7, 50.0)]).unwrap();

        assert!((curve.percent(2.5) - 0.0).abs() < 1e-9);
        assert!((curve.percent(5.0) - 100.0).abs() < 1e-9);
        assert!((curve.percent(3.7) - 50.0).abs() < 1e-9);
        assert!((curve.percent(3.95) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_curve_rejects_single_point() {
        assert!(VoltageCurve::new(vec![(3.7, 50.0)]).is_err());
    }

    #[test]
    fn test_nan_capacity_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("capacity"), "nan\n").unwrap();
        let source = Battery {
            path: dir.path().to_path_buf(),
            ..Battery::default()
        };

        assert!(matches!(source.fetch_raw(), Err(ProbeError::Parse(_))));
    }

    #[test]
    fn test_capacity_source() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("capacity"), "87\n").unwrap();
        fs::write(dir.path().join("status"), "Charging\n").unwrap();
        let source = Battery {
            path: dir.path().to_path_buf(),
            ..Battery::default()
        };

        let raw = source.fetch_raw().unwrap();

        assert_eq!(
            raw,
            RawValue::Battery {
                percent: 87.0,
                charging: true
            }
        );
        assert_eq!(source.format(&raw).as_deref(), Some("▇87%+"));
    }

    #[test]
    fn test_voltage_source() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("voltage_now"), "3700000\n").unwrap();
        let source = Battery {
            path: dir.path().to_path_buf(),
            source: BatterySource::Voltage,
            curve: VoltageCurve::lithium_ion(),
        };

        let raw = source.fetch_raw().unwrap();

        assert_eq!(source.format(&raw).as_deref(), Some("▅50%"));
    }

    #[test]
    fn test_absent_battery_is_no_data() {
        let dir = tempdir().unwrap();
        let source = Battery {
            path: dir.path().join("BAT9"),
            ..Battery::default()
        };

        assert!(matches!(source.fetch_raw(), Err(ProbeError::NoData(_))));
    }
}
