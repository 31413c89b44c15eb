//! SVG quickplots: the fitted SED and the light curve.
//!
//! These are diagnostic plots, not publication figures. Everything is drawn
//! in log10 space for the SED; upper limits are rendered as short downward
//! strokes below the limit marker.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::LightCurveBin;
use crate::error::AppError;
use crate::fusion::FusedSed;

const DETECTION_COLOR: RGBColor = RGBColor(31, 119, 180);
const VHE_COLOR: RGBColor = RGBColor(214, 39, 40);
const CURVE_COLOR: RGBColor = RGBColor(44, 160, 44);
const SPREAD_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Everything the SED quickplot renders.
pub struct SedPlotData<'a> {
    pub fused: &'a FusedSed,
    /// MAP model curve in log space: (log10 E, log10 E²dN/dE).
    pub curve: Option<(&'a [f64], &'a [f64])>,
    /// Posterior model draws, same shape as `curve`.
    pub spread: &'a [(Vec<f64>, Vec<f64>)],
    pub title: &'a str,
}

pub fn plot_sed_svg(path: &Path, data: &SedPlotData<'_>) -> Result<(), AppError> {
    let fused = data.fused;

    let mut xs: Vec<f64> = Vec::new();
    let mut ys: Vec<f64> = Vec::new();
    for (&e, &f) in fused.energy.iter().zip(&fused.e2dnde) {
        if e > 0.0 && f > 0.0 {
            xs.push(e.log10());
            ys.push(f.log10());
        }
    }
    for (&e, &ul) in fused.ul_energy.iter().zip(&fused.ul_e2dnde) {
        if e > 0.0 && ul > 0.0 {
            xs.push(e.log10());
            ys.push(ul.log10());
        }
    }
    if xs.is_empty() {
        return Err(AppError::new(3, "Nothing to plot: no finite SED points."));
    }

    let (xmin, xmax) = padded_range(&xs, 0.3);
    let (ymin, ymax) = padded_range(&ys, 0.6);

    let root = SVGBackend::new(path, (900, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(data.title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(44)
        .y_label_area_size(64)
        .build_cartesian_2d(xmin..xmax, ymin..ymax)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("log10(E / MeV)")
        .y_desc("log10(E^2 dN/dE / MeV cm^-2 s^-1)")
        .draw()
        .map_err(plot_err)?;

    // Posterior spread first so the MAP curve and points draw on top.
    for (cx, cy) in data.spread {
        chart
            .draw_series(LineSeries::new(
                cx.iter().copied().zip(cy.iter().copied()),
                SPREAD_COLOR.mix(0.06),
            ))
            .map_err(plot_err)?;
    }

    if let Some((cx, cy)) = data.curve {
        chart
            .draw_series(LineSeries::new(
                cx.iter().copied().zip(cy.iter().copied()),
                CURVE_COLOR.stroke_width(2),
            ))
            .map_err(plot_err)?;
    }

    // Detections: primary and VHE in different colors, split positionally.
    let n_det = fused.energy.len();
    let n_primary = n_det - fused.n_vhe;
    for (i, ((&e, &f), &ferr)) in fused
        .energy
        .iter()
        .zip(&fused.e2dnde)
        .zip(&fused.e2dnde_err)
        .enumerate()
    {
        if !(e > 0.0 && f > 0.0) {
            continue;
        }
        let color = if i < n_primary { DETECTION_COLOR } else { VHE_COLOR };
        let x = e.log10();
        let y = f.log10();
        let y_lo = if f - ferr > 0.0 { (f - ferr).log10() } else { y - 0.5 };
        let y_hi = (f + ferr).log10();
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, y_lo), (x, y_hi)],
                color,
            )))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(Circle::new((x, y), 4, color.filled())))
            .map_err(plot_err)?;
    }

    // Upper limits: open marker with a downward stroke.
    let n_ul = fused.ul_energy.len();
    let n_primary_ul = n_ul - fused.n_vhe_ul;
    for (i, (&e, &ul)) in fused.ul_energy.iter().zip(&fused.ul_e2dnde).enumerate() {
        if !(e > 0.0 && ul > 0.0) {
            continue;
        }
        let color = if i < n_primary_ul { DETECTION_COLOR } else { VHE_COLOR };
        let x = e.log10();
        let y = ul.log10();
        chart
            .draw_series(std::iter::once(Circle::new((x, y), 4, color)))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, y), (x, y - 0.25)],
                color,
            )))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

pub fn plot_light_curve_svg(
    path: &Path,
    bins: &[LightCurveBin],
    title: &str,
) -> Result<(), AppError> {
    let mut xs: Vec<f64> = Vec::new();
    let mut ys: Vec<f64> = Vec::new();
    for b in bins {
        xs.push(b.tmin_mjd);
        xs.push(b.tmax_mjd);
        if b.is_detection() && b.flux.is_finite() {
            ys.push(b.flux);
        } else if b.flux_ul95.is_finite() {
            ys.push(b.flux_ul95);
        }
    }
    if ys.is_empty() {
        return Err(AppError::new(3, "Nothing to plot: no finite light-curve bins."));
    }

    let (xmin, xmax) = padded_range(&xs, 0.0);
    let ymax = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max) * 1.3;

    let root = SVGBackend::new(path, (900, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(44)
        .y_label_area_size(80)
        .build_cartesian_2d(xmin..xmax, 0.0..ymax)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Time (MJD)")
        .y_desc("Flux (ph cm^-2 s^-1)")
        .draw()
        .map_err(plot_err)?;

    for b in bins {
        let t = b.tmean_mjd();
        let half = 0.5 * (b.tmax_mjd - b.tmin_mjd);
        if b.is_detection() && b.flux.is_finite() {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(t - half, b.flux), (t + half, b.flux)],
                    DETECTION_COLOR,
                )))
                .map_err(plot_err)?;
            if b.flux_err.is_finite() {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![(t, b.flux - b.flux_err), (t, b.flux + b.flux_err)],
                        DETECTION_COLOR,
                    )))
                    .map_err(plot_err)?;
            }
            chart
                .draw_series(std::iter::once(Circle::new(
                    (t, b.flux),
                    3,
                    DETECTION_COLOR.filled(),
                )))
                .map_err(plot_err)?;
        } else if b.flux_ul95.is_finite() {
            chart
                .draw_series(std::iter::once(Circle::new((t, b.flux_ul95), 3, BLACK)))
                .map_err(plot_err)?;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(t, b.flux_ul95), (t, 0.7 * b.flux_ul95)],
                    BLACK,
                )))
                .map_err(plot_err)?;
        }
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

fn padded_range(values: &[f64], pad: f64) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-9 {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - pad, hi + pad)
}

fn plot_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::new(2, format!("Plot rendering failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SedPoint;
    use crate::fusion::fuse;

    fn sed_point(e: f64, ts: f64) -> SedPoint {
        SedPoint {
            e_ctr: e,
            e_min: 0.8 * e,
            e_max: 1.2 * e,
            e2dnde: 1e-5,
            e2dnde_err: 1e-6,
            e2dnde_ul95: 2e-5,
            ts,
        }
    }

    #[test]
    fn sed_quickplot_writes_an_svg() {
        let primary = vec![
            sed_point(200.0, 40.0),
            sed_point(2000.0, 30.0),
            sed_point(20000.0, 25.0),
            sed_point(200000.0, 2.0),
        ];
        let fused = fuse(&primary, None);
        let dir = std::env::temp_dir().join("gsed-plot-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sed.svg");

        let data = SedPlotData {
            fused: &fused,
            curve: None,
            spread: &[],
            title: "demo",
        };
        plot_sed_svg(&path, &data).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn light_curve_quickplot_writes_an_svg() {
        let bins = vec![
            LightCurveBin {
                tmin_mjd: 59000.0,
                tmax_mjd: 59007.0,
                ts: 64.0,
                flux: 2.1e-8,
                flux_err: 3.0e-9,
                flux_ul95: f64::NAN,
                eflux: 1.2e-5,
                eflux_err: 1.5e-6,
                eflux_ul95: f64::NAN,
            },
            LightCurveBin {
                tmin_mjd: 59007.0,
                tmax_mjd: 59014.0,
                ts: 1.2,
                flux: f64::NAN,
                flux_err: f64::NAN,
                flux_ul95: 4.0e-8,
                eflux: f64::NAN,
                eflux_err: f64::NAN,
                eflux_ul95: 2.0e-5,
            },
        ];
        let dir = std::env::temp_dir().join("gsed-plot-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lc.svg");
        plot_light_curve_svg(&path, &bins, "demo").unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }

    #[test]
    fn empty_sed_is_a_no_data_error() {
        let fused = fuse(
            &[SedPoint {
                e_ctr: 100.0,
                e_min: 80.0,
                e_max: 120.0,
                e2dnde: f64::NAN,
                e2dnde_err: f64::NAN,
                e2dnde_ul95: f64::NAN,
                ts: 1.0,
            }],
            None,
        );
        let data = SedPlotData {
            fused: &fused,
            curve: None,
            spread: &[],
            title: "demo",
        };
        let err = plot_sed_svg(Path::new("/tmp/never.svg"), &data).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
