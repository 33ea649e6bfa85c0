//! Property-based tests for sonance-core.
//!
//! Mix matrices survive the engine round trip bit for bit, parameter
//! descriptors decode to what was encoded, and fade points come back ordered.

use std::sync::Arc;

use proptest::prelude::*;
use sonance_core::mock::MockEngine;
use sonance_core::{
    ChannelControl, MixMatrix, ParameterDescriptor, ParameterKind, RawParameterDesc, System,
};

const DIMENSIONS: [usize; 4] = [1, 2, 8, 32];

fn system() -> System {
    System::builder(Arc::new(MockEngine::new())).build().unwrap()
}

/// Ordinary levels mixed with signed zeros, extremes and subnormals.
fn level_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![
        Just(0.0f32),
        Just(-0.0f32),
        Just(f32::MAX),
        Just(f32::MIN),
        Just(f32::MIN_POSITIVE),
        Just(1e-45f32),
        -4.0f32..4.0f32,
    ]
}

/// A matrix with out and in channel counts drawn from [`DIMENSIONS`].
fn matrix_strategy() -> impl Strategy<Value = MixMatrix> {
    (
        prop::sample::select(DIMENSIONS.to_vec()),
        prop::sample::select(DIMENSIONS.to_vec()),
    )
        .prop_flat_map(|(out, inp)| {
            prop::collection::vec(level_strategy(), out * inp)
                .prop_map(move |data| MixMatrix::from_flat(out, inp, data).unwrap())
        })
}

fn bits(matrix: &MixMatrix) -> Vec<u32> {
    matrix.as_slice().iter().map(|v| v.to_bits()).collect()
}

#[test]
fn boundary_levels_keep_their_bits() {
    let matrix = MixMatrix::from_rows(&[
        [f32::MAX, -0.0, 0.0],
        [f32::MIN, f32::MIN_POSITIVE, 1e-45],
    ])
    .unwrap();
    let system = system();
    let group = system.create_channel_group("edges").unwrap();
    group.set_mix_matrix(&matrix).unwrap();
    let read = group.mix_matrix().unwrap();
    assert_eq!((read.out_channels(), read.in_channels()), (2, 3));
    assert_eq!(bits(&read), bits(&matrix));
    assert_eq!(read.get(0, 1).map(f32::to_bits), Some(0x8000_0000));
    assert_eq!(read.get(1, 2).map(f32::to_bits), Some(1));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A matrix written to a bus reads back with the same shape and the same
    /// bit patterns.
    #[test]
    fn group_matrix_round_trip(matrix in matrix_strategy()) {
        let system = system();
        let group = system.create_channel_group("bus").unwrap();
        group.set_mix_matrix(&matrix).unwrap();

        prop_assert_eq!(
            group.mix_matrix_size().unwrap(),
            (matrix.out_channels(), matrix.in_channels())
        );
        let read = group.mix_matrix().unwrap();
        prop_assert_eq!(read.out_channels(), matrix.out_channels());
        prop_assert_eq!(read.in_channels(), matrix.in_channels());
        prop_assert_eq!(bits(&read), bits(&matrix));
    }

    /// Same property along a DSP connection.
    #[test]
    fn connection_matrix_round_trip(matrix in matrix_strategy()) {
        let system = system();
        let mixer = system.create_dsp_by_type(sonance_core::DspType::Mixer).unwrap();
        let source = system.create_dsp_by_type(sonance_core::DspType::Oscillator).unwrap();
        let edge = mixer
            .add_input(&source, sonance_core::DspConnectionType::Standard)
            .unwrap();
        edge.set_mix_matrix(&matrix).unwrap();
        prop_assert_eq!(bits(&edge.mix_matrix().unwrap()), bits(&matrix));
    }

    /// Float descriptors decode to the range they were built with.
    #[test]
    fn float_descriptor_decodes(
        name in "[A-Za-z ]{1,15}",
        min in -1.0e6f32..0.0f32,
        span in 0.0f32..1.0e6f32,
        t in 0.0f32..=1.0f32,
    ) {
        let max = min + span;
        let default = min + span * t;
        let raw = RawParameterDesc::float(&name, "Hz", "a float", min, max, default);
        let decoded = ParameterDescriptor::decode(&raw).unwrap();
        prop_assert_eq!(&decoded.name, &name);
        prop_assert_eq!(decoded.label.as_str(), "Hz");
        prop_assert_eq!(decoded.kind, ParameterKind::Float { min, max, default });
    }

    /// Int descriptors decode to the range they were built with.
    #[test]
    fn int_descriptor_decodes(min in any::<i32>(), max in any::<i32>(), default in any::<i32>()) {
        let raw = RawParameterDesc::int("Steps", "", "an int", min, max, default);
        let decoded = ParameterDescriptor::decode(&raw).unwrap();
        prop_assert_eq!(decoded.kind, ParameterKind::Int { min, max, default });
    }

    /// Fade points come back sorted by clock, one per distinct clock.
    #[test]
    fn fade_points_sorted(points in prop::collection::btree_map(0u64..1_000_000, 0.0f32..=1.0f32, 0..16)) {
        let system = system();
        let group = system.create_channel_group("fade").unwrap();
        // Insert in reverse so ordering is the engine's doing.
        for (&clock, &volume) in points.iter().rev() {
            group.add_fade_point(clock, volume).unwrap();
        }
        let read: Vec<(u64, f32)> = group
            .fade_points()
            .unwrap()
            .into_iter()
            .map(|p| (p.clock, p.volume))
            .collect();
        let expected: Vec<(u64, f32)> = points.into_iter().collect();
        prop_assert_eq!(read, expected);
    }
}
