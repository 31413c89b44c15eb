//! EBL (extragalactic background light) deabsorption.
//!
//! The absorption factors themselves come from an external tabulated model
//! library; this module owns the fixed label↔key mapping for the five
//! supported literature models, the `Absorption` seam the pipeline calls
//! through, and the element-wise correction arithmetic.
//!
//! At redshift 0 the correction is skipped entirely (the evaluator is never
//! called).

use std::io::Read;
use std::path::Path;

use crate::error::AppError;

/// The five built-in EBL absorption models.
///
/// The string keys are an external contract: a compatible absorption library
/// must expose the same five models under the same keys. The CLI resolves
/// `--ebl` through [`EblModel::parse`] so both labels and keys are accepted;
/// the persisted document stores the label as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EblModel {
    Dominguez,
    Franceschini,
    Franceschini17,
    SaldanaLopez21,
    Finke,
}

impl EblModel {
    pub const ALL: [EblModel; 5] = [
        EblModel::Dominguez,
        EblModel::Franceschini,
        EblModel::Franceschini17,
        EblModel::SaldanaLopez21,
        EblModel::Finke,
    ];

    /// Internal model key understood by the absorption library.
    pub fn key(self) -> &'static str {
        match self {
            EblModel::Dominguez => "dominguez",
            EblModel::Franceschini => "franceschini",
            EblModel::Franceschini17 => "franceschini17",
            EblModel::SaldanaLopez21 => "saldana-lopez21",
            EblModel::Finke => "finke",
        }
    }

    /// Human-readable label as shown to users.
    pub fn label(self) -> &'static str {
        match self {
            EblModel::Dominguez => "Dominguez et al. (2011)",
            EblModel::Franceschini => "Franceschini et al. (2008)",
            EblModel::Franceschini17 => "Franceschini & Rodighiero (2017)",
            EblModel::SaldanaLopez21 => "Saldana-Lopez et al. (2021)",
            EblModel::Finke => "Finke et al. (2010)",
        }
    }

    /// Resolve either a user-facing label or an internal key.
    pub fn parse(text: &str) -> Option<EblModel> {
        let trimmed = text.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.label() == trimmed || m.key() == trimmed)
    }
}

/// Seam for the external absorption-model library.
///
/// `evaluate` returns one multiplicative absorption factor per energy
/// (0 < factor ≤ 1); dividing an observed flux by it yields the intrinsic
/// flux.
pub trait Absorption {
    fn evaluate(&self, energies_mev: &[f64], redshift: f64) -> Vec<f64>;
}

/// Absorption model backed by a two-column table (energy_mev, factor),
/// interpolated linearly in `log10(E)`.
///
/// This is the file-based adapter used by the CLI; the table is expected to
/// be pre-evaluated for the run's redshift by the external library.
#[derive(Debug, Clone)]
pub struct TabulatedAbsorption {
    log_energies: Vec<f64>,
    factors: Vec<f64>,
}

impl TabulatedAbsorption {
    pub fn new(energies_mev: Vec<f64>, factors: Vec<f64>) -> Result<Self, AppError> {
        if energies_mev.len() != factors.len() || energies_mev.len() < 2 {
            return Err(AppError::new(
                2,
                "Absorption table needs at least two (energy, factor) rows.",
            ));
        }
        if energies_mev.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::new(
                2,
                "Absorption table energies must be strictly increasing.",
            ));
        }
        if factors.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(AppError::new(2, "Absorption factors must be finite and > 0."));
        }
        Ok(Self {
            log_energies: energies_mev.iter().map(|e| e.log10()).collect(),
            factors,
        })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, AppError> {
        let file = std::fs::File::open(path).map_err(|e| AppError::io(path, e))?;
        Self::from_csv(file)
    }

    pub fn from_csv(reader: impl Read) -> Result<Self, AppError> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut energies = Vec::new();
        let mut factors = Vec::new();
        for (idx, record) in csv.records().enumerate() {
            let record =
                record.map_err(|e| AppError::new(2, format!("Absorption table row {}: {e}", idx + 2)))?;
            if record.len() < 2 {
                return Err(AppError::new(
                    2,
                    format!("Absorption table row {}: expected 2 columns.", idx + 2),
                ));
            }
            let energy: f64 = record[0]
                .parse()
                .map_err(|_| AppError::new(2, format!("Absorption table row {}: bad energy.", idx + 2)))?;
            let factor: f64 = record[1]
                .parse()
                .map_err(|_| AppError::new(2, format!("Absorption table row {}: bad factor.", idx + 2)))?;
            energies.push(energy);
            factors.push(factor);
        }
        Self::new(energies, factors)
    }
}

impl Absorption for TabulatedAbsorption {
    fn evaluate(&self, energies_mev: &[f64], _redshift: f64) -> Vec<f64> {
        energies_mev
            .iter()
            .map(|&e| {
                let x = e.log10();
                let n = self.log_energies.len();
                // Clamp outside the tabulated range.
                if x <= self.log_energies[0] {
                    return self.factors[0];
                }
                if x >= self.log_energies[n - 1] {
                    return self.factors[n - 1];
                }
                let hi = self.log_energies.partition_point(|&le| le < x).min(n - 1);
                let lo = hi - 1;
                let frac = (x - self.log_energies[lo]) / (self.log_energies[hi] - self.log_energies[lo]);
                self.factors[lo] + frac * (self.factors[hi] - self.factors[lo])
            })
            .collect()
    }
}

/// Divide fluxes and their 1σ errors by the absorption factors.
///
/// The error scales identically to the flux (linear propagation, no
/// cross-terms).
pub fn deabsorb(flux: &[f64], flux_err: &[f64], factors: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let corrected = flux.iter().zip(factors.iter()).map(|(f, a)| f / a).collect();
    let corrected_err = flux_err.iter().zip(factors.iter()).map(|(e, a)| e / a).collect();
    (corrected, corrected_err)
}

/// Parse a user-supplied redshift string.
///
/// Unparseable input is recoverable: defaults to `0.0` (no EBL correction)
/// and returns a warning string for the caller's log instead of erroring.
pub fn parse_redshift(text: &str) -> (f64, Option<String>) {
    match text.trim().parse::<f64>() {
        Ok(z) if z.is_finite() && z >= 0.0 => (z, None),
        _ => (
            0.0,
            Some(format!(
                "WARNING: could not read redshift '{text}'. Setting redshift to 0.0 (no EBL correction)."
            )),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_key_mapping_is_fixed() {
        let expected = [
            ("Dominguez et al. (2011)", "dominguez"),
            ("Franceschini et al. (2008)", "franceschini"),
            ("Franceschini & Rodighiero (2017)", "franceschini17"),
            ("Saldana-Lopez et al. (2021)", "saldana-lopez21"),
            ("Finke et al. (2010)", "finke"),
        ];
        for (label, key) in expected {
            let model = EblModel::parse(label).unwrap();
            assert_eq!(model.key(), key);
            assert_eq!(EblModel::parse(key), Some(model));
        }
        assert_eq!(EblModel::parse("kneiske"), None);
    }

    #[test]
    fn deabsorb_divides_elementwise() {
        let (f, e) = deabsorb(&[2.0, 4.0], &[0.2, 0.4], &[0.5, 0.8]);
        assert!((f[0] - 4.0).abs() < 1e-12);
        assert!((f[1] - 5.0).abs() < 1e-12);
        assert!((e[0] - 0.4).abs() < 1e-12);
        assert!((e[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tabulated_interpolation_and_clamping() {
        let abs = TabulatedAbsorption::new(vec![1e3, 1e4, 1e5], vec![1.0, 0.8, 0.2]).unwrap();
        let f = abs.evaluate(&[1e2, 1e3, 10f64.powf(3.5), 1e6], 0.5);
        assert_eq!(f[0], 1.0);
        assert_eq!(f[1], 1.0);
        assert!((f[2] - 0.9).abs() < 1e-12);
        assert_eq!(f[3], 0.2);
    }

    #[test]
    fn tabulated_rejects_malformed_tables() {
        assert!(TabulatedAbsorption::new(vec![1e3], vec![1.0]).is_err());
        assert!(TabulatedAbsorption::new(vec![1e3, 1e3], vec![1.0, 0.9]).is_err());
        assert!(TabulatedAbsorption::new(vec![1e3, 1e4], vec![1.0, 0.0]).is_err());
    }

    #[test]
    fn from_csv_reads_two_columns() {
        let data = "energy_mev,factor\n1000,1.0\n10000,0.5\n";
        let abs = TabulatedAbsorption::from_csv(data.as_bytes()).unwrap();
        let f = abs.evaluate(&[1000.0], 0.3);
        assert_eq!(f[0], 1.0);
    }

    #[test]
    fn redshift_parsing_defaults_to_zero_with_warning() {
        assert_eq!(parse_redshift("0.31"), (0.31, None));
        let (z, warn) = parse_redshift("0,31");
        assert_eq!(z, 0.0);
        assert!(warn.is_some());
        let (z, warn) = parse_redshift("-1");
        assert_eq!(z, 0.0);
        assert!(warn.is_some());
    }
}
