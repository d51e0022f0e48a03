use ndarray::Axis;

use crate::{
    common::meta::{Meta, OBSID},
    coords::{CoordValues, ExtraCoord, EXPOSURE_TIME, TIME},
    cube::{
        correction::{ExposureCorrection, ScaleState},
        tests::{cube, data, extra_coords, wcs},
        MapCube,
    },
    error::Error,
};

use super::MapCubeSequence;

fn meta(obsid: i64) -> Meta {
    [(OBSID, obsid)].into_iter().collect()
}

fn sequence(scaled: bool) -> MapCubeSequence {
    MapCubeSequence::new(
        vec![cube(scaled, meta(1)), cube(scaled, meta(1))],
        meta(1),
        0,
    )
    .unwrap()
}

fn member_data(sequence: &MapCubeSequence) -> Vec<ndarray::ArrayD<f64>> {
    sequence.iter().map(|cube| cube.data().clone()).collect()
}

#[test]
fn dimensions() {
    let sequence = sequence(true);
    assert_eq!(sequence.dimensions(), [4, 3, 4]);
    assert_eq!(sequence.len(), 2);
    assert_eq!(sequence.common_axis(), 0);
}

#[test]
fn dimensions_on_other_axis() {
    let sequence = MapCubeSequence::new(
        vec![cube(true, meta(1)), cube(true, meta(1)), cube(true, meta(1))],
        meta(1),
        2,
    )
    .unwrap();
    assert_eq!(sequence.dimensions(), [2, 3, 12]);
}

#[test]
fn world_axis_physical_types() {
    assert_eq!(
        sequence(true).world_axis_physical_types(),
        [
            "time",
            "custom:pos.helioprojective.lat",
            "custom:pos.helioprojective.lon"
        ]
    );
}

#[test]
fn correction_copy_then_forced() {
    let sequence = sequence(false);

    let mut output = sequence
        .exposure_time_corrected(ExposureCorrection::APPLY)
        .unwrap();
    let half = (data() / 2.0).into_dyn();
    assert_eq!(member_data(&output), [half.clone(), half]);

    output
        .apply_exposure_time_correction(ExposureCorrection::APPLY.forced())
        .unwrap();
    let quarter = (data() / 4.0).into_dyn();
    assert_eq!(member_data(&output), [quarter.clone(), quarter]);
    assert!(output.iter().all(|cube| cube.scaled() == ScaleState::Scaled));

    // The copy never touched the original cubes
    assert_eq!(member_data(&sequence), [data().into_dyn(), data().into_dyn()]);
    assert!(sequence.iter().all(|cube| cube.scaled() == ScaleState::Raw));
}

#[test]
fn undo_copy_then_forced() {
    let sequence = sequence(true);

    let mut output = sequence
        .exposure_time_corrected(ExposureCorrection::UNDO.forced())
        .unwrap();
    let double = (data() * 2.0).into_dyn();
    assert_eq!(member_data(&output), [double.clone(), double]);

    output
        .apply_exposure_time_correction(ExposureCorrection::UNDO.forced())
        .unwrap();
    let quadruple = (data() * 4.0).into_dyn();
    assert_eq!(member_data(&output), [quadruple.clone(), quadruple]);
}

#[test]
fn correction_is_skipped_per_cube() {
    let mut sequence = MapCubeSequence::new(
        vec![cube(false, meta(1)), cube(true, meta(1))],
        meta(1),
        0,
    )
    .unwrap();

    sequence
        .apply_exposure_time_correction(ExposureCorrection::APPLY)
        .unwrap();

    let half = (data() / 2.0).into_dyn();
    assert_eq!(member_data(&sequence), [half, data().into_dyn()]);
    assert!(sequence.iter().all(|cube| cube.scaled() == ScaleState::Scaled));
}

#[test]
fn failing_cube_aborts_without_changes() {
    let without_exposure = MapCube::builder(data(), wcs())
        .meta(meta(1))
        .build()
        .unwrap();
    let mut sequence =
        MapCubeSequence::new(vec![cube(false, meta(1)), without_exposure], meta(1), 0).unwrap();
    let before = sequence.clone();

    assert!(matches!(
        sequence.apply_exposure_time_correction(ExposureCorrection::APPLY),
        Err(Error::MissingExtraCoord { .. })
    ));
    assert_eq!(sequence, before);

    assert!(matches!(
        sequence.exposure_time_corrected(ExposureCorrection::APPLY),
        Err(Error::MissingExtraCoord { .. })
    ));
}

#[test]
fn rejects_different_observations() {
    assert!(matches!(
        MapCubeSequence::new(vec![cube(true, meta(1)), cube(true, meta(2))], meta(1), 0),
        Err(Error::InconsistentMeta { index: 1, key: OBSID })
    ));
    assert!(matches!(
        MapCubeSequence::new(vec![cube(true, meta(1)), cube(true, Meta::new())], meta(1), 0),
        Err(Error::InconsistentMeta { index: 1, .. })
    ));
}

#[test]
fn rejects_inconsistent_shapes() {
    assert!(matches!(
        MapCubeSequence::new(vec![], meta(1), 0),
        Err(Error::EmptySequence)
    ));
    assert!(matches!(
        MapCubeSequence::new(vec![cube(true, meta(1))], meta(1), 3),
        Err(Error::CommonAxisOutOfRange { axis: 3, ndim: 3 })
    ));

    let slice = cube(true, meta(1)).index_axis(0, 0).unwrap();
    assert!(matches!(
        MapCubeSequence::new(vec![cube(true, meta(1)), slice], meta(1), 0),
        Err(Error::MemberDimensionality {
            index: 1,
            expected: 3,
            found: 2
        })
    ));

    let narrow = cube(true, meta(1)).index_axis(2, 0).unwrap();
    let narrow = MapCube::builder(
        narrow.data().clone().insert_axis(Axis(2)),
        wcs(),
    )
    .meta(meta(1))
    .build()
    .unwrap();
    assert!(matches!(
        MapCubeSequence::new(vec![cube(true, meta(1)), narrow], meta(1), 0),
        Err(Error::MemberShape { index: 1, .. })
    ));
}

#[test]
fn index_as_cube_spans_cubes() {
    let first = MapCube::builder(data(), wcs())
        .meta(meta(1))
        .extra_coords(extra_coords(&[2.0, 3.0]))
        .build()
        .unwrap();
    let second = MapCube::builder(data() * 10.0, wcs())
        .meta(meta(1))
        .extra_coords(extra_coords(&[5.0, 7.0]))
        .build()
        .unwrap();
    let sequence = MapCubeSequence::new(vec![first, second], meta(1), 0).unwrap();

    let third = sequence.index_as_cube(2).unwrap();
    assert_eq!(third.dimensions(), [3, 4]);
    assert_eq!(
        third.data(),
        &(data().index_axis(Axis(0), 0).to_owned() * 10.0).into_dyn()
    );
    assert_eq!(
        third
            .extra_coords()
            .get(EXPOSURE_TIME)
            .unwrap()
            .values
            .as_seconds(),
        Some(vec![5.0])
    );

    assert!(matches!(
        sequence.index_as_cube(4),
        Err(Error::IndexOutOfBounds { index: 4, len: 4 })
    ));
}

#[test]
fn common_axis_extra_coords_are_joined() {
    let first = MapCube::builder(data(), wcs())
        .meta(meta(1))
        .extra_coords(extra_coords(&[2.0, 3.0]))
        .extra_coord("SLIT X", ExtraCoord::on_axis(2, CoordValues::Float(vec![0.0; 4])))
        .build()
        .unwrap();
    let second = MapCube::builder(data(), wcs())
        .meta(meta(1))
        .extra_coords(extra_coords(&[5.0, 7.0]))
        .build()
        .unwrap();
    let sequence = MapCubeSequence::new(vec![first, second], meta(1), 0).unwrap();

    let coords = sequence.common_axis_extra_coords().unwrap();
    assert_eq!(coords.len(), 2);
    let exposure = coords.get(EXPOSURE_TIME).unwrap();
    assert_eq!(exposure.axis, Some(0));
    assert_eq!(exposure.values.as_seconds(), Some(vec![2.0, 3.0, 5.0, 7.0]));
    assert_eq!(coords.get(TIME).unwrap().values.len(), 4);
    assert!(!coords.contains("SLIT X"));
}

#[test]
fn common_axis_extra_coords_need_every_cube() {
    let with_float_exposure = MapCube::builder(data(), wcs())
        .meta(meta(1))
        .extra_coords(extra_coords(&[2.0, 2.0]))
        .extra_coord(
            EXPOSURE_TIME,
            ExtraCoord::on_axis(0, CoordValues::Float(vec![2.0, 2.0])),
        )
        .build()
        .unwrap();
    let sequence =
        MapCubeSequence::new(vec![cube(true, meta(1)), with_float_exposure], meta(1), 0).unwrap();
    assert!(matches!(
        sequence.common_axis_extra_coords(),
        Err(Error::MixedCoordValues { name }) if name == EXPOSURE_TIME
    ));

    let bare = MapCube::builder(data(), wcs()).meta(meta(1)).build().unwrap();
    let sequence = MapCubeSequence::new(vec![cube(true, meta(1)), bare], meta(1), 0).unwrap();
    assert!(matches!(
        sequence.common_axis_extra_coords(),
        Err(Error::MissingExtraCoord { .. })
    ));
}

#[test]
fn display_summary() {
    let text = sequence(true).to_string();
    assert!(text.starts_with("MapCubeSequence"));
    assert!(text.contains("Cubes: 2"));
    assert!(text.contains("[4, 3, 4]"));
}

#[test]
fn deserializes_through_new() {
    let sequence = sequence(true);
    let json = serde_json::to_string(&sequence).unwrap();
    let back: MapCubeSequence = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sequence);
    assert_eq!(back.dimensions(), [4, 3, 4]);
}

#[test]
fn deserialize_rejects_different_observations() {
    let value = serde_json::json!({
        "cubes": [
            serde_json::to_value(cube(true, meta(1))).unwrap(),
            serde_json::to_value(cube(true, meta(2))).unwrap(),
        ],
        "common_axis": 0,
        "meta": {},
    });
    let err = serde_json::from_value::<MapCubeSequence>(value).unwrap_err();
    assert!(err.to_string().contains(OBSID), "{err}");
}

#[test]
fn deserialize_rejects_empty_sequence() {
    let value = serde_json::json!({ "cubes": [], "common_axis": 0, "meta": {} });
    assert!(serde_json::from_value::<MapCubeSequence>(value).is_err());
}
