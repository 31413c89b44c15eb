//! SED fusion: building the single data vector fed to the sampler.
//!
//! Inputs are the primary-instrument SED table and an optional secondary
//! (VHE) table. This module:
//!
//! - splits rows into detections (`ts > TS_MIN`) and upper limits
//! - converts VHE rows from TeV-scale to MeV-scale units
//! - concatenates primary ++ VHE, keeping the VHE counts so fused arrays can
//!   be re-split positionally for differentiated plotting
//! - converts `E²dN/dE` to `dN/dE` and into `log10` space for fitting
//!
//! Ordering invariant: the last `n_vhe` entries of the detection arrays (and
//! the last `n_vhe_ul` entries of the upper-limit arrays) always belong to
//! the secondary instrument, in its original row order.

use crate::domain::{SedPoint, TS_MIN, VhePoint};
use crate::math::{linear_to_log, log_error_from_linear};
use crate::models::FluxSpace;

/// TeV → MeV for energies, and TeV cm⁻² s⁻¹ → MeV cm⁻² s⁻¹ for energy flux.
const TEV_TO_MEV: f64 = 1e6;

/// Fraction of an upper limit used as the plotted arrow length.
const UL_YERR_FRACTION: f64 = 0.3;

/// Fused SED in linear units (MeV, MeV cm⁻² s⁻¹).
#[derive(Debug, Clone)]
pub struct FusedSed {
    // Detections, primary first then VHE.
    pub energy: Vec<f64>,
    pub energy_err_lo: Vec<f64>,
    pub energy_err_hi: Vec<f64>,
    pub e2dnde: Vec<f64>,
    pub e2dnde_err: Vec<f64>,

    // Upper limits, primary first then VHE.
    pub ul_energy: Vec<f64>,
    pub ul_energy_err_lo: Vec<f64>,
    pub ul_energy_err_hi: Vec<f64>,
    pub ul_e2dnde: Vec<f64>,
    pub ul_yerr: Vec<f64>,

    pub n_primary_detections: usize,
    pub n_vhe: usize,
    pub n_vhe_ul: usize,
    pub include_vhe: bool,
    /// Fitting requires more than 2 primary detections.
    pub allow_mcmc: bool,
}

/// Log-space vectors for the likelihood: `x = log10(E)`, `y` in the requested
/// flux space, `yerr` the propagated log error.
#[derive(Debug, Clone)]
pub struct FitData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub yerr: Vec<f64>,
}

/// Fuse the primary SED with an optional, already-parsed VHE table.
///
/// An unreadable VHE table is handled upstream (read failure → `None` here);
/// a readable table whose rows are all dropped (undefined upper limits)
/// degenerates to primary-only with `include_vhe = false`. VHE rows are only
/// fused when the primary table clears the fit guard (`allow_mcmc`): a run
/// with too few primary detections stays primary-only.
pub fn fuse(primary: &[SedPoint], vhe: Option<&[VhePoint]>) -> FusedSed {
    let mut out = FusedSed {
        energy: Vec::new(),
        energy_err_lo: Vec::new(),
        energy_err_hi: Vec::new(),
        e2dnde: Vec::new(),
        e2dnde_err: Vec::new(),
        ul_energy: Vec::new(),
        ul_energy_err_lo: Vec::new(),
        ul_energy_err_hi: Vec::new(),
        ul_e2dnde: Vec::new(),
        ul_yerr: Vec::new(),
        n_primary_detections: 0,
        n_vhe: 0,
        n_vhe_ul: 0,
        include_vhe: false,
        allow_mcmc: false,
    };

    for p in primary {
        if p.is_detection() {
            out.energy.push(p.e_ctr);
            out.energy_err_lo.push(p.e_ctr - p.e_min);
            out.energy_err_hi.push(p.e_max - p.e_ctr);
            out.e2dnde.push(p.e2dnde);
            out.e2dnde_err.push(p.e2dnde_err);
        } else {
            out.ul_energy.push(p.e_ctr);
            out.ul_energy_err_lo.push(p.e_ctr - p.e_min);
            out.ul_energy_err_hi.push(p.e_max - p.e_ctr);
            out.ul_e2dnde.push(p.e2dnde_ul95);
            out.ul_yerr.push(UL_YERR_FRACTION * p.e2dnde_ul95);
        }
    }
    out.n_primary_detections = out.energy.len();
    out.allow_mcmc = out.n_primary_detections > 2;

    // Too few primary detections disables both the fit and VHE inclusion:
    // secondary data never extends a run the primary table cannot support.
    if let (true, Some(vhe)) = (out.allow_mcmc, vhe) {
        // Rows with an undefined upper limit are dropped before
        // classification; the remaining rows split on the same TS threshold.
        for p in vhe.iter().filter(|p| !p.e2dnde_ul.is_nan()) {
            let e_ref = p.e_ref * TEV_TO_MEV;
            let e_min = p.e_min * TEV_TO_MEV;
            let e_max = p.e_max * TEV_TO_MEV;
            if p.ts > TS_MIN {
                out.energy.push(e_ref);
                out.energy_err_lo.push(e_ref - e_min);
                out.energy_err_hi.push(e_max - e_ref);
                out.e2dnde.push(p.e2dnde * TEV_TO_MEV);
                out.e2dnde_err.push(p.e2dnde_err * TEV_TO_MEV);
                out.n_vhe += 1;
            } else {
                let ul = p.e2dnde_ul * TEV_TO_MEV;
                out.ul_energy.push(e_ref);
                out.ul_energy_err_lo.push(e_ref - e_min);
                out.ul_energy_err_hi.push(e_max - e_ref);
                out.ul_e2dnde.push(ul);
                out.ul_yerr.push(UL_YERR_FRACTION * ul);
                out.n_vhe_ul += 1;
            }
        }
        out.include_vhe = out.n_vhe + out.n_vhe_ul > 0;
    }

    out
}

impl FusedSed {
    /// Build the likelihood vectors for the requested flux space.
    ///
    /// Only detections enter; upper limits are excluded from the likelihood
    /// entirely. The log error is identical in both spaces because relative
    /// errors are unchanged by the `E²` scaling.
    pub fn fit_data(&self, space: FluxSpace) -> FitData {
        let x = linear_to_log(&self.energy);
        let yerr = log_error_from_linear(&self.e2dnde, &self.e2dnde_err);
        let y = match space {
            FluxSpace::E2Dnde => linear_to_log(&self.e2dnde),
            FluxSpace::Dnde => {
                let dnde: Vec<f64> = self
                    .e2dnde
                    .iter()
                    .zip(self.energy.iter())
                    .map(|(&f, &e)| f / (e * e))
                    .collect();
                linear_to_log(&dnde)
            }
        };
        FitData { x, y, yerr }
    }

    /// `log10` x-range spanned by the data, for the dense model curve.
    ///
    /// Covers the detection bins edge-to-edge and widens to include
    /// upper-limit bins when they extend beyond. No ordering is assumed: the
    /// range is the true min/max over every bin's edges.
    pub fn x_range_log(&self) -> Option<(f64, f64)> {
        if self.energy.is_empty() {
            return None;
        }
        let mut xmin = f64::INFINITY;
        let mut xmax = f64::NEG_INFINITY;

        let edges = self
            .energy
            .iter()
            .zip(&self.energy_err_lo)
            .zip(&self.energy_err_hi)
            .chain(
                self.ul_energy
                    .iter()
                    .zip(&self.ul_energy_err_lo)
                    .zip(&self.ul_energy_err_hi),
            );
        for ((&e, &lo), &hi) in edges {
            let left = (e - lo).log10();
            let right = (e + hi).log10();
            if left.is_finite() && left < xmin {
                xmin = left;
            }
            if right.is_finite() && right > xmax {
                xmax = right;
            }
        }
        Some((xmin, xmax))
    }

    /// Copy with fluxes and errors divided by per-point absorption factors
    /// (`det_factors` aligned with detections, `ul_factors` with upper limits).
    pub fn deabsorbed(&self, det_factors: &[f64], ul_factors: &[f64]) -> FusedSed {
        let mut out = self.clone();
        out.e2dnde = self.e2dnde.iter().zip(det_factors).map(|(f, a)| f / a).collect();
        out.e2dnde_err = self.e2dnde_err.iter().zip(det_factors).map(|(e, a)| e / a).collect();
        out.ul_e2dnde = self.ul_e2dnde.iter().zip(ul_factors).map(|(f, a)| f / a).collect();
        out.ul_yerr = self.ul_yerr.iter().zip(ul_factors).map(|(e, a)| e / a).collect();
        out
    }
}
