//! Frequency-domain views of a spectrum.

use num_complex::Complex64;

use crate::domain::{BodeData, NyquistData, Spectrum};

/// Magnitude `|Z|` and phase `atan2(Im Z, Re Z)` in degrees, one entry per sample in input order.
pub fn bode(spectrum: &Spectrum) -> BodeData {
    let (magnitude, phase) = spectrum
        .impedances()
        .iter()
        .map(|z| (z.norm(), z.arg().to_degrees()))
        .unzip();

    BodeData {
        frequencies: spectrum.frequencies().to_vec(),
        magnitude,
        phase,
    }
}

/// `Re Z` against `-Im Z`, so capacitive arcs plot above the axis.
pub fn nyquist(spectrum: &Spectrum) -> NyquistData {
    NyquistData {
        real: spectrum.real(),
        neg_imag: spectrum.imag().into_iter().map(|im| -im).collect(),
    }
}

impl BodeData {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Rebuild `Z = |Z|·e^{iφ}` from the magnitude/phase table.
    pub fn to_impedance(&self) -> Vec<Complex64> {
        self.magnitude
            .iter()
            .zip(self.phase.iter())
            .map(|(&m, &deg)| Complex64::from_polar(m, deg.to_radians()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bode_of_known_points() {
        let spectrum = Spectrum::new(
            vec![1000.0, 100.0, 10.0],
            vec![
                Complex64::new(3.0, -4.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, -2.0),
            ],
        )
        .unwrap();

        let b = bode(&spectrum);
        assert_eq!(b.frequencies, vec![1000.0, 100.0, 10.0]);
        assert!((b.magnitude[0] - 5.0).abs() < 1e-12);
        assert!((b.phase[0] - (-4.0f64).atan2(3.0).to_degrees()).abs() < 1e-12);
        assert_eq!(b.phase[1], 0.0);
        assert!((b.phase[2] + 90.0).abs() < 1e-12);
    }

    #[test]
    fn empty_spectrum_gives_empty_arrays() {
        let b = bode(&Spectrum::empty());
        assert!(b.is_empty());
        assert!(b.magnitude.is_empty());
        assert!(b.phase.is_empty());
    }

    #[test]
    fn nyquist_flips_the_imaginary_axis() {
        let spectrum = Spectrum::new(vec![1.0, 2.0], vec![Complex64::new(0.1, -0.02), Complex64::new(0.2, 0.01)]).unwrap();
        let n = nyquist(&spectrum);
        assert_eq!(n.real, vec![0.1, 0.2]);
        assert_eq!(n.neg_imag, vec![0.02, -0.01]);
    }

    proptest! {
        #[test]
        fn magnitude_and_phase_round_trip(re in -10.0f64..10.0, im in -10.0f64..10.0) {
            let spectrum = Spectrum::new(vec![1.0], vec![Complex64::new(re, im)]).unwrap();
            let b = bode(&spectrum);
            prop_assert!((b.magnitude[0] - (re * re + im * im).sqrt()).abs() <= 1e-12);

            let z = b.to_impedance()[0];
            let tol = 1e-9 * (1.0 + b.magnitude[0]);
            prop_assert!((z.re - re).abs() <= tol, "re {} vs {}", z.re, re);
            prop_assert!((z.im - im).abs() <= tol, "im {} vs {}", z.im, im);
        }
    }
}
