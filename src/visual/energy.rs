/// Band-limited energy of one spectrum read, each value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandEnergy {
    pub bass: f64,
    pub mid: f64,
    pub high: f64,
    pub overall: f64,
}

fn band_mean(bins: &[u8]) -> f64 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| u64::from(b)).sum();
    sum as f64 / bins.len() as f64 / 255.0
}

impl BandEnergy {
    /// Split a byte spectrum into bass `[0, 15%)`, mid `[15%, 50%)` and
    /// high `[50%, 100%)` by bin index.
    pub fn from_spectrum(bins: &[u8]) -> Self {
        let len = bins.len();
        let bass_end = len * 15 / 100;
        let mid_end = len / 2;
        Self {
            bass: band_mean(&bins[..bass_end]),
            mid: band_mean(&bins[bass_end..mid_end]),
            high: band_mean(&bins[mid_end..]),
            overall: band_mean(bins),
        }
    }
}
