use rand::Rng;

use crate::cd_synth::occupancy::Occupancy;
use crate::error::PlacementError;
use crate::utils::is_non_empty;

/// Number of random draws before a region search gives up.
pub const DEFAULT_MAX_TRIES: usize = 10;

/// Outcome of a region search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Top-left corner of a fully unoccupied region.
    Found { x: u32, y: u32 },
    /// Every draw hit an occupied sample.
    Exhausted { tries: usize },
}

impl Placement {
    pub const fn position(self) -> Option<(u32, u32)> {
        match self {
            Self::Found { x, y } => Some((x, y)),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Retry-bounded random search for unoccupied regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementSampler {
    pub max_tries: usize,
}

impl Default for PlacementSampler {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
        }
    }
}

impl PlacementSampler {
    pub const fn new(max_tries: usize) -> Self {
        Self { max_tries }
    }

    /// Draws top-left corners uniformly until a `width x height` region of
    /// `occupancy` is entirely free.
    ///
    /// Running out of draws is reported as [`Placement::Exhausted`], which
    /// the caller is expected to handle by moving on to another instance.
    ///
    /// # Errors
    ///
    /// * `PlacementError::EmptyRegion` - when `width` or `height` is zero
    /// * `PlacementError::RegionTooLarge` - when the region does not fit in the mask
    pub fn sample_area<R: Rng + ?Sized>(
        &self,
        occupancy: &mut Occupancy,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> Result<Placement, PlacementError> {
        if !is_non_empty(width, height) {
            return Err(PlacementError::EmptyRegion { width, height });
        }
        let (mask_width, mask_height) = occupancy.dimensions();
        if width > mask_width || height > mask_height {
            return Err(PlacementError::RegionTooLarge {
                width,
                height,
                mask_width,
                mask_height,
            });
        }

        Ok(self.search(mask_width - width, mask_height - height, rng, |x, y| {
            occupancy.is_free(x, y, width, height)
        }))
    }

    /// Draws corners in `0..=max_x` x `0..=max_y`, checking each one once.
    fn search<R, F>(&self, max_x: u32, max_y: u32, rng: &mut R, mut is_free: F) -> Placement
    where
        R: Rng + ?Sized,
        F: FnMut(u32, u32) -> bool,
    {
        for _ in 0..self.max_tries {
            let x = rng.random_range(0..=max_x);
            let y = rng.random_range(0..=max_y);
            if is_free(x, y) {
                return Placement::Found { x, y };
            }
        }

        Placement::Exhausted {
            tries: self.max_tries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_rect_mask;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_empty_mask_accepts_first_draw() {
        let mut occupancy = Occupancy::empty(50, 40);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let placement = PlacementSampler::default()
            .sample_area(&mut occupancy, 10, 10, &mut rng)
            .unwrap();

        let (x, y) = placement.position().unwrap();
        assert!(x <= 40 && y <= 30);
    }

    #[test]
    fn test_full_mask_exhausts_after_ten_tries() {
        let mut occupancy = Occupancy::new(create_rect_mask(20, 20, (0, 0, 20, 20), 255));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let placement = PlacementSampler::default()
            .sample_area(&mut occupancy, 5, 5, &mut rng)
            .unwrap();

        assert_eq!(placement, Placement::Exhausted { tries: 10 });
    }

    #[test]
    fn test_search_checks_exactly_max_tries_regions() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut checks = 0;

        let placement = PlacementSampler::default().search(15, 15, &mut rng, |_, _| {
            checks += 1;
            false
        });

        assert_eq!(placement, Placement::Exhausted { tries: 10 });
        assert_eq!(checks, 10);
    }

    #[test]
    fn test_search_stops_at_first_free_region() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut checks = 0;

        let placement = PlacementSampler::new(4).search(15, 15, &mut rng, |_, _| {
            checks += 1;
            checks == 3
        });

        assert!(matches!(placement, Placement::Found { x, y } if x <= 15 && y <= 15));
        assert_eq!(checks, 3);
    }

    #[test]
    fn test_found_region_never_overlaps() {
        let mut occupancy = Occupancy::new(create_rect_mask(30, 30, (0, 0, 30, 15), 255));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sampler = PlacementSampler::new(1000);

        for _ in 0..50 {
            if let Placement::Found { x, y } =
                sampler.sample_area(&mut occupancy, 6, 6, &mut rng).unwrap()
            {
                assert!(y >= 15, "({x}, {y}) overlaps the occupied band");
            }
        }
    }

    #[test]
    fn test_region_filling_the_mask() {
        let mut occupancy = Occupancy::empty(8, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let placement = PlacementSampler::default()
            .sample_area(&mut occupancy, 8, 8, &mut rng)
            .unwrap();

        assert_eq!(placement, Placement::Found { x: 0, y: 0 });
    }

    #[test]
    fn test_region_too_large() {
        let mut occupancy = Occupancy::empty(8, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            PlacementSampler::default().sample_area(&mut occupancy, 9, 4, &mut rng),
            Err(PlacementError::RegionTooLarge {
                width: 9,
                height: 4,
                mask_width: 8,
                mask_height: 8,
            })
        );
    }

    #[test]
    fn test_empty_region() {
        let mut occupancy = Occupancy::empty(8, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!(
            PlacementSampler::default().sample_area(&mut occupancy, 0, 4, &mut rng),
            Err(PlacementError::EmptyRegion {
                width: 0,
                height: 4
            })
        );
    }
}
