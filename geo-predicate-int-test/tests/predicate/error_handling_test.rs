use geo::{point, MultiPoint};
use geo_predicate::{
    encode_geometry_field, spatial, Crs, CrsGeometry, DistanceUnit, ElementMapper, Envelope, IndexBinding,
    InternalId, NamedEnvelope, RStarSpatialIndex, SpatialError, SpatialResult,
};
use geo_predicate_int_test::test_util::{
    cleanup, create_diagonal_context, create_test_context, id_set, run_test, TestRecord,
};
use std::sync::Arc;

struct UnreachableMapper;

impl ElementMapper for UnreachableMapper {
    fn id_for(&self, id: InternalId) -> SpatialResult<Option<NamedEnvelope>> {
        Err(SpatialError::IndexAccess(format!("entry {} is unreachable", id)))
    }
}

struct ShortMapper;

impl ElementMapper for ShortMapper {
    fn id_for(&self, id: InternalId) -> SpatialResult<Option<NamedEnvelope>> {
        if id == 0 {
            Ok(Some(NamedEnvelope::new(
                "r0",
                Envelope::new(0.0, 0.0, 1.0, 1.0, Crs::CARTESIAN),
            )))
        } else {
            Ok(None)
        }
    }
}

fn corrupt_records() -> Vec<TestRecord> {
    let mut truncated = encode_geometry_field(&point!(x: 1.0, y: 1.0).into(), Crs::CARTESIAN)
        .expect("encode");
    truncated.truncate(9);

    // Well sized, but the WKB type code 0x63 names no geometry.
    let mut unknown_type = 0u32.to_le_bytes().to_vec();
    unknown_type.extend_from_slice(&[0x01, 0x63, 0x00, 0x00, 0x00]);
    unknown_type.extend_from_slice(&[0u8; 16]);

    let mut unknown_member =
        encode_geometry_field(&MultiPoint::from(vec![(2.0, 2.0)]).into(), Crs::CARTESIAN)
            .expect("encode");
    unknown_member[14] = 0x63;

    vec![
        TestRecord::new("good-1", point!(x: 1.0, y: 1.0)),
        TestRecord::new("good-2", point!(x: 8.0, y: 8.0)),
        TestRecord::raw("garbage", vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]),
        TestRecord::raw("truncated", truncated),
        TestRecord::raw("unknown-type", unknown_type),
        TestRecord::raw("unknown-member", unknown_member),
        TestRecord::without_geometry("missing"),
    ]
}

#[test]
fn test_undecodable_records_are_skipped() {
    run_test(
        create_test_context,
        |mut ctx| {
            ctx.insert(corrupt_records())?;

            let everything = Envelope::new(0.0, 0.0, 10.0, 10.0, Crs::CARTESIAN);
            assert_eq!(
                ctx.matching_ids(&spatial(everything).intersects()?)?,
                id_set(&["good-1", "good-2"])
            );

            // Reverse predicates do not pick up broken records either.
            let far_away = Envelope::new(50.0, 50.0, 60.0, 60.0, Crs::CARTESIAN);
            assert_eq!(
                ctx.matching_ids(&spatial(far_away).disjoint()?)?,
                id_set(&["good-1", "good-2"])
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_operand_reprojection_failure_is_fatal() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let lambert = Envelope::new(0.0, 0.0, 1.0, 1.0, Crs::new(2154));
            let mut query = spatial(lambert).intersects()?;
            query.attach_index(&ctx.binding(Crs::CARTESIAN)?, false);

            assert!(ctx.matching_ids(&query).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_stored_geometry_reprojection_failure_is_fatal() {
    run_test(
        create_diagonal_context,
        |ctx| {
            // Stored geometries are cartesian and cannot be converted to WGS84.
            let query = spatial(Envelope::new(0.0, 0.0, 1.0, 1.0, Crs::WGS84)).intersects()?;
            assert!(ctx.matching_ids(&query).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_stored_geometries_are_reprojected_to_operand_crs() {
    run_test(
        create_test_context,
        |mut ctx| {
            ctx.insert(vec![
                TestRecord::new("near", point!(x: 10.0, y: 10.0)).with_crs(Crs::WGS84),
                TestRecord::new("far", point!(x: 20.0, y: 20.0)).with_crs(Crs::WGS84),
            ])?;

            // (10, 10) degrees is roughly (1113195, 1118890) in web mercator.
            let mercator = Envelope::new(1.0e6, 1.0e6, 1.2e6, 1.2e6, Crs::WEB_MERCATOR);
            assert_eq!(
                ctx.matching_ids(&spatial(mercator).intersects()?)?,
                id_set(&["near"])
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_in_other_crs_rejects_records() {
    run_test(
        create_diagonal_context,
        |ctx| {
            assert!(ctx.binding(Crs::WGS84).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_mapper_failure_is_fatal() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let index = RStarSpatialIndex::bulk_load(
                (0..5).map(|i| {
                    let min = i as f64;
                    (i, Envelope::new(min, min, min + 1.0, min + 1.0, Crs::CARTESIAN))
                }),
                Crs::CARTESIAN,
            )?;
            let binding = IndexBinding::new(Arc::new(index), Arc::new(UnreachableMapper));

            let mut query = spatial(Envelope::new(0.0, 0.0, 1.0, 1.0, Crs::CARTESIAN)).intersects()?;
            query.attach_index(&binding, true);
            assert!(ctx.matching_ids(&query).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_index_entries_are_skipped() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let index = RStarSpatialIndex::bulk_load(
                vec![
                    (0, Envelope::new(0.0, 0.0, 1.0, 1.0, Crs::CARTESIAN)),
                    (7, Envelope::new(1.0, 1.0, 2.0, 2.0, Crs::CARTESIAN)),
                ],
                Crs::CARTESIAN,
            )?;
            let binding = IndexBinding::new(Arc::new(index), Arc::new(ShortMapper));

            let mut query = spatial(Envelope::new(0.0, 0.0, 2.0, 2.0, Crs::CARTESIAN)).intersects()?;
            query.attach_index(&binding, true);
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r0"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_geometry_operand_in_other_crs_is_reprojected() {
    run_test(
        create_test_context,
        |mut ctx| {
            let record = TestRecord::new("cafe", point!(x: 1113194.9, y: 1118889.97))
                .with_crs(Crs::WEB_MERCATOR);
            ctx.insert(vec![record])?;
            let mut query = spatial(CrsGeometry::new(point!(x: 10.0, y: 10.0), Crs::WGS84))
                .dwithin(10.0, DistanceUnit::Kilometers)?;
            query.attach_index(&ctx.binding(Crs::WEB_MERCATOR)?, false);

            assert_eq!(ctx.matching_ids(&query)?, id_set(&["cafe"]));
            Ok(())
        },
        cleanup,
    )
}
