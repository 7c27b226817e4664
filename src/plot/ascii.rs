//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - measured samples: `o`
//! - fitted circuit: `-` line

use crate::domain::{FitResult, Spectrum};
use crate::models::predict;

/// Bode magnitude plot: `log10(f)` across, `|Z|` up.
pub fn render_bode_plot(spectrum: &Spectrum, fit: Option<&FitResult>, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = spectrum.iter().map(|(f, z)| (f.log10(), z.norm())).collect();
    let curve = fit.and_then(|fit| {
        let (f_min, f_max) = spectrum.frequency_range()?;
        let freqs = log_grid(f_min, f_max, width.max(2) * 2);
        let z = predict(&fit.values, &freqs);
        Some(freqs.iter().zip(z).map(|(f, z)| (f.log10(), z.norm())).collect::<Vec<_>>())
    });

    let Some(frame) = Frame::fit(&points, curve.as_deref()) else {
        return "Bode: no samples\n".to_string();
    };
    let mut out = format!(
        "Bode: log10(f)=[{:.3}, {:.3}] | |Z|=[{:.4}, {:.4}] Ω\n",
        frame.x_min, frame.x_max, frame.y_min, frame.y_max
    );
    out.push_str(&render_grid(&frame, &points, curve.as_deref(), width, height));
    out
}

/// Nyquist plot: `Re Z` across, `-Im Z` up.
pub fn render_nyquist_plot(spectrum: &Spectrum, fit: Option<&FitResult>, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = spectrum.iter().map(|(_, z)| (z.re, -z.im)).collect();
    let curve = fit.and_then(|fit| {
        let (f_min, f_max) = spectrum.frequency_range()?;
        let freqs = log_grid(f_min, f_max, width.max(2) * 4);
        Some(predict(&fit.values, &freqs).into_iter().map(|z| (z.re, -z.im)).collect::<Vec<_>>())
    });

    let Some(frame) = Frame::fit(&points, curve.as_deref()) else {
        return "Nyquist: no samples\n".to_string();
    };
    let mut out = format!(
        "Nyquist: Re(Z)=[{:.4}, {:.4}] Ω | -Im(Z)=[{:.4}, {:.4}] Ω\n",
        frame.x_min, frame.x_max, frame.y_min, frame.y_max
    );
    out.push_str(&render_grid(&frame, &points, curve.as_deref(), width, height));
    out
}

/// Data ranges mapped onto the grid.
#[derive(Debug, Clone, Copy)]
struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    /// X spans the measured samples; Y covers samples and curve, padded by 5%.
    fn fit(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<Frame> {
        let (x_min, x_max) = range(points.iter().map(|p| p.0))?;
        let ys = points.iter().chain(curve.unwrap_or(&[])).map(|p| p.1);
        let (y_min, y_max) = range(ys)?;

        let (x_min, x_max) = if x_max > x_min {
            (x_min, x_max)
        } else {
            pad_range(x_min, x_max, 0.0)
        };
        let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
        Some(Frame { x_min, x_max, y_min, y_max })
    }
}

fn render_grid(
    frame: &Frame,
    points: &[(f64, f64)],
    curve: Option<&[(f64, f64)]>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = curve {
        draw_curve(&mut grid, curve, frame);
    }

    for &(x, y) in points {
        let col = map_x(x, frame.x_min, frame.x_max, width);
        let row = map_y(y, frame.y_min, frame.y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn log_grid(f_min: f64, f_max: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    let (a, b) = (f_min.log10(), f_max.log10());
    (0..n)
        .map(|i| 10f64.powf(a + (b - a) * i as f64 / (n as f64 - 1.0)))
        .collect()
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], frame: &Frame) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        let col = map_x(x, frame.x_min, frame.x_max, width);
        let row = map_y(y, frame.y_min, frame.y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitQuality;
    use num_complex::Complex64;

    #[test]
    fn bode_golden_snapshot_small() {
        let spectrum = Spectrum::new(vec![1.0, 10.0], vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0)]).unwrap();

        let txt = render_bode_plot(&spectrum, None, 10, 5);
        let expected = concat!(
            "Bode: log10(f)=[0.000, 1.000] | |Z|=[0.9500, 2.0500] Ω\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn fit_overlay_draws_a_line_under_the_points() {
        let params = [0.02, 0.03, 0.005, 0.85, 0.06, 0.05, 0.75, 5.0, 10.0];
        let freqs = log_grid(0.1, 1e4, 12);
        let spectrum = Spectrum::new(freqs.clone(), predict(&params, &freqs)).unwrap();
        let fit = FitResult {
            values: params,
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                iterations: 0,
                n_points: 12,
            },
        };

        for txt in [
            render_bode_plot(&spectrum, Some(&fit), 40, 12),
            render_nyquist_plot(&spectrum, Some(&fit), 40, 12),
        ] {
            let body: String = txt.lines().skip(1).collect();
            assert_eq!(txt.lines().count(), 13);
            assert!(body.contains('o'));
            assert!(body.contains('-'));
        }
    }

    #[test]
    fn empty_spectrum_renders_placeholder() {
        assert_eq!(render_bode_plot(&Spectrum::empty(), None, 40, 12), "Bode: no samples\n");
        assert_eq!(render_nyquist_plot(&Spectrum::empty(), None, 40, 12), "Nyquist: no samples\n");
    }
}
