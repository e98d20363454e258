//! Band reduction: collapse a spectrum frame into a few band-energy averages.
//!
//! Bin `i` of an `L`-bin frame belongs to band `floor(i * N / L)`. Bands are
//! contiguous, cover every bin exactly once and are ordered lowest frequency
//! first. For 128 bins and 5 bands the widths are 26, 26, 25, 26, 25.

use crate::audio::SpectrumFrame;

/// Mean magnitude (0..=255) per band, lowest band first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandVector(Vec<f32>);

impl BandVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for BandVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Band index of `bin` in a frame of `len` bins split into `band_count` bands
pub fn band_of(bin: usize, len: usize, band_count: usize) -> usize {
    if len == 0 {
        return 0;
    }
    bin * band_count / len
}

/// Reduce `frame` into `band_count` averages
pub fn reduce(frame: &SpectrumFrame, band_count: usize) -> BandVector {
    let mut bands = BandVector::default();
    reduce_into(frame.as_slice(), band_count, &mut bands);
    bands
}

/// Reduce raw bins into a reusable band buffer
///
/// Bands with no member bins (only possible when `band_count` exceeds the
/// bin count) average to 0.
pub fn reduce_into(bins: &[u8], band_count: usize, out: &mut BandVector) {
    out.0.clear();
    out.0.resize(band_count, 0.0);
    if band_count == 0 {
        return;
    }

    let len = bins.len();
    let mut start = 0;
    for (band, value) in out.0.iter_mut().enumerate() {
        // First bin whose band index exceeds `band`
        let end = (band + 1) * len / band_count + usize::from((band + 1) * len % band_count != 0);
        let end = end.min(len);
        let members = &bins[start.min(end)..end];
        if !members.is_empty() {
            let sum: u32 = members.iter().map(|&b| u32::from(b)).sum();
            *value = sum as f32 / members.len() as f32;
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bins: Vec<u8>) -> SpectrumFrame {
        SpectrumFrame::from(bins)
    }

    /// Reference partition straight from the index formula
    fn naive(bins: &[u8], band_count: usize) -> Vec<f32> {
        let mut sums = vec![0u32; band_count];
        let mut counts = vec![0u32; band_count];
        for (i, &b) in bins.iter().enumerate() {
            let band = band_of(i, bins.len(), band_count);
            sums[band] += u32::from(b);
            counts[band] += 1;
        }
        sums.iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { 0.0 } else { s as f32 / c as f32 })
            .collect()
    }

    #[test]
    fn test_all_zero_frame() {
        let bands = reduce(&frame(vec![0; 128]), 5);
        assert_eq!(bands.as_slice(), &[0.0; 5]);
    }

    #[test]
    fn test_low_bins_land_in_first_band() {
        let mut bins = vec![0u8; 128];
        bins[..26].fill(255);

        let bands = reduce(&frame(bins), 5);
        assert_eq!(bands.len(), 5);
        assert!((bands.as_slice()[0] - 255.0).abs() < 1e-4);
        assert!(bands.as_slice()[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_boundaries_follow_index_formula() {
        // 128 bins / 5 bands: band starts at 0, 26, 52, 77, 103
        assert_eq!(band_of(25, 128, 5), 0);
        assert_eq!(band_of(26, 128, 5), 1);
        assert_eq!(band_of(51, 128, 5), 1);
        assert_eq!(band_of(52, 128, 5), 2);
        assert_eq!(band_of(76, 128, 5), 2);
        assert_eq!(band_of(77, 128, 5), 3);
        assert_eq!(band_of(102, 128, 5), 3);
        assert_eq!(band_of(103, 128, 5), 4);
        assert_eq!(band_of(127, 128, 5), 4);
    }

    #[test]
    fn test_matches_index_formula_for_many_shapes() {
        let bins: Vec<u8> = (0..128).map(|i| ((i * 37 + 11) % 256) as u8).collect();
        for len in [1, 2, 5, 7, 64, 100, 127, 128] {
            for band_count in 1..=len.min(12) {
                let got = reduce(&frame(bins[..len].to_vec()), band_count);
                let want = naive(&bins[..len], band_count);
                assert_eq!(got.len(), band_count);
                for (g, w) in got.as_slice().iter().zip(&want) {
                    assert!((g - w).abs() < 1e-3, "len {len} bands {band_count}");
                }
            }
        }
    }

    #[test]
    fn test_single_band_is_overall_mean() {
        let bands = reduce(&frame(vec![10, 20, 30, 40]), 1);
        assert_eq!(bands.as_slice(), &[25.0]);
    }

    #[test]
    fn test_more_bands_than_bins() {
        let bands = reduce(&frame(vec![100, 200]), 5);
        assert_eq!(bands.len(), 5);
        assert!(bands.as_slice().iter().all(|v| v.is_finite()));
        assert_eq!(bands.as_slice().iter().filter(|&&v| v == 0.0).count(), 3);
    }

    #[test]
    fn test_empty_frame() {
        let bands = reduce(&frame(Vec::new()), 5);
        assert_eq!(bands.as_slice(), &[0.0; 5]);
    }

    #[test]
    fn test_deterministic() {
        let f = frame((0..128).map(|i| (i * 2) as u8).collect());
        assert_eq!(reduce(&f, 5), reduce(&f, 5));
    }

    #[test]
    fn test_reduce_into_reuses_buffer() {
        let mut out = BandVector::from(vec![9.0; 8]);
        reduce_into(&[50; 10], 5, &mut out);
        assert_eq!(out.as_slice(), &[50.0; 5]);
    }
}
