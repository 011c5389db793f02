//! Property-based tests for cd-synth
//!
//! These tests use proptest to check the invariants of color transfer,
//! blending and placement over generated inputs.

use cd_synth::{
    blend, effective_expansion, transfer_lab_statistics, BlendMode, Branch, ChannelStatistics,
    Image, Occupancy, Placement, PlacementSampler, SceneAccumulators, SceneRasters,
};
use image::{Luma, Rgb};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Strategy for generating small but valid image dimensions
fn image_dimensions() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=16, 1u32..=16)
}

fn rgb_pixel() -> impl Strategy<Value = Rgb<u8>> {
    any::<[u8; 3]>().prop_map(Rgb)
}

/// Strategy for an RGB image of the given size with arbitrary pixels.
fn rgb_image(width: u32, height: u32) -> impl Strategy<Value = Image<Rgb<u8>>> {
    prop::collection::vec(any::<u8>(), (width * height * 3) as usize)
        .prop_map(move |raw| Image::from_raw(width, height, raw).unwrap())
}

fn blend_mode() -> impl Strategy<Value = BlendMode> {
    prop_oneof![
        Just(BlendMode::Direct),
        Just(BlendMode::gaussian()),
        Just(BlendMode::box_blur()),
        Just(BlendMode::poisson()),
    ]
}

fn sized_pair() -> impl Strategy<Value = (Image<Rgb<u8>>, Image<Rgb<u8>>)> {
    image_dimensions().prop_flat_map(|(w, h)| (rgb_image(w, h), rgb_image(w, h)))
}

proptest! {
    #[test]
    fn uniform_source_channel_maps_to_target_mean(
        color in rgb_pixel(),
        (sw, sh) in image_dimensions(),
        target in image_dimensions().prop_flat_map(|(w, h)| rgb_image(w, h)),
    ) {
        let source = Image::from_pixel(sw, sh, color);
        let stats = ChannelStatistics::of(&target).unwrap();

        let out = transfer_lab_statistics(&source, &target).unwrap();

        for pixel in out.pixels() {
            for c in 0..3 {
                let expected = stats.mean[c].round().clamp(0.0, 255.0) as u8;
                prop_assert_eq!(pixel[c], expected);
            }
        }
    }

    #[test]
    fn transfer_keeps_source_dimensions(
        (source, target) in sized_pair(),
    ) {
        let out = transfer_lab_statistics(&source, &target).unwrap();
        prop_assert_eq!(out.dimensions(), source.dimensions());
    }

    #[test]
    fn direct_full_mask_reproduces_source((source, dest) in sized_pair()) {
        let (w, h) = source.dimensions();
        let mask = Image::from_pixel(w, h, Luma([1u8]));

        let out = blend(&source, &mask, &dest, &BlendMode::Direct, true).unwrap();
        prop_assert_eq!(out, source);
    }

    #[test]
    fn direct_partial_mask_is_a_cut_and_paste(
        (source, dest) in sized_pair(),
        seed in any::<u64>(),
    ) {
        let (w, h) = source.dimensions();
        let mut mask: Image<Luma<u8>> = Image::from_fn(w, h, |x, y| {
            Luma([u8::from((u64::from(x * 31 + y * 17) + seed % 3) % 3 == 0)])
        });
        mask.put_pixel(0, 0, Luma([1]));

        let out = blend(&source, &mask, &dest, &BlendMode::Direct, true).unwrap();

        for (x, y, pixel) in out.enumerate_pixels() {
            let expected = if mask.get_pixel(x, y)[0] == 1 {
                source.get_pixel(x, y)
            } else {
                dest.get_pixel(x, y)
            };
            prop_assert_eq!(pixel, expected);
        }
    }

    #[test]
    fn poisson_result_ignores_expansion_flag(
        (source, dest) in (3u32..=10, 3u32..=10)
            .prop_flat_map(|(w, h)| (rgb_image(w, h), rgb_image(w, h))),
    ) {
        let (w, h) = source.dimensions();
        let mask = Image::from_fn(w, h, |x, y| Luma([u8::from(x == w / 2 && y == h / 2)]));
        let mode = BlendMode::poisson();

        prop_assert!(!effective_expansion(&mode, true));
        let with = blend(&source, &mask, &dest, &mode, true).unwrap();
        let without = blend(&source, &mask, &dest, &mode, false).unwrap();
        prop_assert_eq!(with, without);
    }

    #[test]
    fn soft_blends_stay_between_source_and_destination(
        (w, h) in image_dimensions(),
        a in rgb_pixel(),
        b in rgb_pixel(),
        mode in blend_mode().prop_filter("alpha modes", |m| m.uses_feathering()),
        expand in any::<bool>(),
    ) {
        let source = Image::from_pixel(w, h, a);
        let dest = Image::from_pixel(w, h, b);
        let mask = Image::from_fn(w, h, |x, _| Luma([u8::from(x <= w / 2)]));

        let out = blend(&source, &mask, &dest, &mode, expand).unwrap();

        for pixel in out.pixels() {
            for c in 0..3 {
                let (low, high) = (i32::from(a[c].min(b[c])), i32::from(a[c].max(b[c])));
                let value = i32::from(pixel[c]);
                prop_assert!(value >= low - 1 && value <= high + 1, "{} not in {}..={}", value, low, high);
            }
        }
    }

    #[test]
    fn sampled_regions_are_always_free(
        (w, h) in (1u32..=12, 1u32..=12),
        band in 0u32..40,
        seed in any::<u64>(),
    ) {
        let mut occupancy = Occupancy::new(Image::from_fn(40, 40, |x, y| {
            Luma([if (x + y) % 40 < band { 255 } else { 0 }])
        }));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        match PlacementSampler::default().sample_area(&mut occupancy, w, h, &mut rng).unwrap() {
            Placement::Found { x, y } => {
                prop_assert!(x + w <= 40 && y + h <= 40);
                for yy in y..y + h {
                    for xx in x..x + w {
                        prop_assert_eq!(occupancy.mask().get_pixel(xx, yy)[0], 0);
                    }
                }
            }
            Placement::Exhausted { tries } => prop_assert_eq!(tries, 10),
        }
    }

    #[test]
    fn placement_updates_labels_and_occupancy_exactly(
        (w, h) in (1u32..=8, 1u32..=8),
        seed in any::<u64>(),
        second in any::<bool>(),
    ) {
        let rasters = SceneRasters::unchanged(
            Image::from_pixel(32, 32, Rgb([1, 2, 3])),
            Image::from_pixel(32, 32, Rgb([4, 5, 6])),
        );
        let mut scene = SceneAccumulators::new("s", rasters).unwrap();
        let true_mask: Image<Luma<u8>> = Image::from_fn(w, h, |x, y| {
            Luma([if (u64::from(x * 7 + y * 3) + seed % 2) % 2 == 0 { 255 } else { 0 }])
        });
        let true_count = true_mask.pixels().filter(|p| p[0] != 0).count();
        let composite = Image::from_pixel(w, h, Rgb([200, 200, 200]));
        let branch = if second { Branch::Second } else { Branch::First };
        let other = if second { Branch::First } else { Branch::Second };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let before = scene.occupancy().foreground_count();
        let Placement::Found { x, y } = PlacementSampler::default()
            .sample_area(scene.occupancy_mut(), w, h, &mut rng)
            .unwrap()
        else {
            panic!("an empty scene always has room");
        };
        scene.place(branch, x, y, &composite, &true_mask).unwrap();

        prop_assert_eq!(scene.occupancy().foreground_count(), before + true_count);
        for (mx, my, value) in true_mask.enumerate_pixels() {
            prop_assert_eq!(scene.label().get_pixel(x + mx, y + my), value);
            prop_assert_eq!(scene.branch_label(branch).get_pixel(x + mx, y + my), value);
        }
        prop_assert!(scene.branch_label(other).pixels().all(|p| p[0] == 0));
        prop_assert!(scene.image(other).pixels().all(|p| p[0] != 200));
    }
}
