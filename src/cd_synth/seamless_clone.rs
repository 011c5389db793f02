//! Gradient-domain (seamless) cloning.
//!
//! Inside the clone region `Ω` the output `f` solves the discrete Poisson
//! equation whose guidance field is the gradient of the source patch `g`,
//! with the destination patch `d` as Dirichlet boundary:
//!
//! ```text
//! 4 f_p - Σ_{q ∈ N_p ∩ Ω} f_q = Σ_{q ∈ N_p} (g_p - g_q) + Σ_{q ∈ N_p \ Ω} d_q
//! ```
//!
//! The system is solved per channel with successive over-relaxation,
//! starting from the destination values. The outer one-pixel frame of the
//! patch never belongs to `Ω`, so every pixel of `Ω` has four neighbours
//! inside the patch and the frame always keeps the destination values.

use std::f32::consts::PI;

use image::{Luma, Rgb};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::BlendError;
use crate::utils::round_f32_to_u8;
use crate::Image;

/// Maximum number of relaxation sweeps per channel.
pub const MAX_SWEEPS: usize = 10_000;

/// A sweep whose largest update is below this value ends the iteration.
pub const TOLERANCE: f32 = 0.01;

const OUTSIDE: usize = usize::MAX;

/// Unknowns of the Poisson system, in row-major order.
struct CloneRegion {
    /// Raster index of each unknown.
    pixels: Vec<usize>,
    /// Unknown index of the four neighbours (left, right, up, down), or `OUTSIDE`.
    neighbours: Vec<[usize; 4]>,
    width: usize,
}

impl CloneRegion {
    fn new(region: &Image<Luma<u8>>) -> Self {
        let (w, h) = (region.width() as usize, region.height() as usize);
        let raw = region.as_raw();
        let inside = |x: usize, y: usize| {
            x >= 1 && y >= 1 && x + 1 < w && y + 1 < h && raw[y * w + x] != 0
        };

        let mut unknown = vec![OUTSIDE; w * h];
        let mut pixels = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if inside(x, y) {
                    unknown[y * w + x] = pixels.len();
                    pixels.push(y * w + x);
                }
            }
        }

        let neighbours = pixels
            .iter()
            .map(|&p| [unknown[p - 1], unknown[p + 1], unknown[p - w], unknown[p + w]])
            .collect();

        Self {
            pixels,
            neighbours,
            width: w,
        }
    }

    fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Over-relaxation factor that is optimal for a square grid of side `n`.
fn relaxation_factor(n: usize) -> f32 {
    2.0 / (1.0 + (PI / n.max(2) as f32).sin())
}

/// Solves one channel and returns the values of the unknowns.
fn solve_channel(
    region: &CloneRegion,
    source: &[u8],
    dest: &[u8],
    channel: usize,
    omega: f32,
) -> Vec<f32> {
    let w = region.width;
    let at = |raw: &[u8], index: usize| f32::from(raw[index * 3 + channel]);

    // Constant right-hand side: guidance divergence plus the Dirichlet boundary.
    let rhs: Vec<f32> = region
        .pixels
        .iter()
        .zip(&region.neighbours)
        .map(|(&p, neighbours)| {
            let offsets = [p - 1, p + 1, p - w, p + w];
            offsets
                .iter()
                .zip(neighbours)
                .map(|(&q, &n)| {
                    let guidance = at(source, p) - at(source, q);
                    if n == OUTSIDE {
                        guidance + at(dest, q)
                    } else {
                        guidance
                    }
                })
                .sum()
        })
        .collect();

    let mut solution: Vec<f32> = region.pixels.iter().map(|&p| at(dest, p)).collect();

    for _ in 0..MAX_SWEEPS {
        let mut max_delta = 0.0f32;
        for (i, neighbours) in region.neighbours.iter().enumerate() {
            let inner: f32 = neighbours
                .iter()
                .filter(|&&n| n != OUTSIDE)
                .map(|&n| solution[n])
                .sum();
            let target = (rhs[i] + inner) / 4.0;
            let delta = omega * (target - solution[i]);
            solution[i] += delta;
            max_delta = max_delta.max(delta.abs());
        }
        if max_delta < TOLERANCE {
            break;
        }
    }

    solution
}

/// Clones `source` into `dest` over the non-zero pixels of `region`.
///
/// All three images must share one size. The clone is placed in register:
/// pixel `(x, y)` of the source guides pixel `(x, y)` of the output.
///
/// # Errors
///
/// * `BlendError::DimensionMismatch` - when the sizes differ
/// * `BlendError::EmptyMask` - when no pixel of `region` lies inside the patch frame
pub fn seamless_clone(
    source: &Image<Rgb<u8>>,
    dest: &Image<Rgb<u8>>,
    region: &Image<Luma<u8>>,
) -> Result<Image<Rgb<u8>>, BlendError> {
    let dims = dest.dimensions();
    if source.dimensions() != dims || region.dimensions() != dims {
        return Err(BlendError::DimensionMismatch {
            source_dims: source.dimensions(),
            mask_dims: region.dimensions(),
            dest_dims: dims,
        });
    }

    let region = CloneRegion::new(region);
    if region.is_empty() {
        return Err(BlendError::EmptyMask);
    }

    let omega = relaxation_factor(dims.0.max(dims.1) as usize);
    let (source_raw, dest_raw) = (source.as_raw(), dest.as_raw());
    let solve = |channel: usize| solve_channel(&region, source_raw, dest_raw, channel, omega);

    #[cfg(feature = "rayon")]
    let channels: Vec<Vec<f32>> = (0..3).into_par_iter().map(solve).collect();
    #[cfg(not(feature = "rayon"))]
    let channels: Vec<Vec<f32>> = (0..3).map(solve).collect();

    let mut out = dest.clone();
    let raw: &mut [u8] = &mut out;
    for (channel, values) in channels.iter().enumerate() {
        for (&p, &value) in region.pixels.iter().zip(values) {
            raw[p * 3 + channel] = round_f32_to_u8(value);
        }
    }

    Ok(out)
}
