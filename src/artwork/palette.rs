//! Dominant colour extraction.
//!
//! Pixels are sampled, quantised into 5-bit-per-channel buckets, and the most
//! populated buckets that are visibly distinct become swatches.

use std::cmp::Reverse;
use std::collections::HashMap;

use image::RgbaImage;

const MAX_SAMPLES: usize = 6_000;
const MAX_SWATCHES: usize = 6;
/// Squared RGB distance below which two swatches count as the same colour.
const DISTINCT_THRESHOLD: u32 = 400;
/// Mostly-transparent pixels carry no colour information.
const MIN_ALPHA: u8 = 128;

/// A representative colour and how many sampled pixels fell into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub rgb: [u8; 3],
    pub population: u32,
}

/// Swatches ordered by population, most common first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

impl Palette {
    /// Extract a palette from decoded pixels.
    pub fn extract(image: &RgbaImage) -> Self {
        let total = (image.width() as usize) * (image.height() as usize);
        if total == 0 {
            return Self::default();
        }
        let stride = (total / MAX_SAMPLES).max(1);

        // bucket -> (count, r sum, g sum, b sum)
        let mut buckets: HashMap<u16, (u32, u64, u64, u64)> = HashMap::new();
        for pixel in image.pixels().step_by(stride) {
            let [r, g, b, a] = pixel.0;
            if a < MIN_ALPHA {
                continue;
            }
            let bucket = (u16::from(r >> 3) << 10) | (u16::from(g >> 3) << 5) | u16::from(b >> 3);
            let entry = buckets.entry(bucket).or_default();
            entry.0 += 1;
            entry.1 += u64::from(r);
            entry.2 += u64::from(g);
            entry.3 += u64::from(b);
        }

        let mut ranked: Vec<Swatch> = buckets
            .into_values()
            .map(|(count, r, g, b)| {
                let n = u64::from(count);
                Swatch {
                    rgb: [(r / n) as u8, (g / n) as u8, (b / n) as u8],
                    population: count,
                }
            })
            .collect();
        ranked.sort_by_key(|s| (Reverse(s.population), s.rgb));

        let mut swatches: Vec<Swatch> = Vec::with_capacity(MAX_SWATCHES);
        for candidate in ranked {
            if let Some(existing) = swatches
                .iter_mut()
                .find(|s| distance_sq(s.rgb, candidate.rgb) <= DISTINCT_THRESHOLD)
            {
                existing.population += candidate.population;
                continue;
            }
            if swatches.len() < MAX_SWATCHES {
                swatches.push(candidate);
            }
        }
        swatches.sort_by_key(|s| Reverse(s.population));

        Self { swatches }
    }

    /// The most common colour.
    pub fn dominant(&self) -> Option<Swatch> {
        self.swatches.first().copied()
    }

    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }
}

fn distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = i32::from(x) - i32::from(y);
            (d * d) as u32
        })
        .sum()
}
