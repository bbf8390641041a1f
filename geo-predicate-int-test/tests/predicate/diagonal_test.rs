use geo::point;
use geo_predicate::{spatial, Crs, CrsGeometry, DistanceUnit, Envelope, SpatialPredicateQuery};
use geo_predicate_int_test::test_util::{cleanup, create_diagonal_context, id_set, run_test};

fn search_box() -> Envelope {
    Envelope::new(0.5, 0.5, 2.4, 2.4, Crs::CARTESIAN)
}

fn origin_within(distance: f64) -> SpatialPredicateQuery {
    spatial(CrsGeometry::new(point!(x: 0.0, y: 0.0), Crs::CARTESIAN))
        .dwithin(distance, DistanceUnit::Meters)
        .expect("valid distance")
}

#[test]
fn test_envelope_only_bbox_returns_index_candidates() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let mut query = spatial(search_box()).bbox()?;
            query.attach_index(&ctx.binding(Crs::CARTESIAN)?, true);

            // r2's indexed envelope (2,2)-(3,3) overlaps the box even though
            // its stored point does not.
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r0", "r1", "r2"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_exact_bbox_refines_index_candidates() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let mut query = spatial(search_box()).bbox()?;
            query.attach_index(&ctx.binding(Crs::CARTESIAN)?, false);

            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r0", "r1"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_exact_scan_without_index() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let query = spatial(search_box()).bbox()?;
            assert!(query.binding().is_none());
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r0", "r1"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_within_with_and_without_index() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let area = Envelope::new(0.0, 0.0, 3.0, 3.0, Crs::CARTESIAN);
            let plain = spatial(area).within()?;
            let mut indexed = spatial(area).within()?;
            indexed.attach_index(&ctx.binding(Crs::CARTESIAN)?, false);

            let expected = id_set(&["r0", "r1", "r2"]);
            assert_eq!(ctx.matching_ids(&plain)?, expected);
            assert_eq!(ctx.matching_ids(&indexed)?, expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_contains_point() {
    run_test(
        create_diagonal_context,
        |ctx| {
            // A point only contains itself.
            let query = spatial(CrsGeometry::new(point!(x: 3.5, y: 3.5), Crs::CARTESIAN)).contains()?;
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r3"]));

            let query = spatial(CrsGeometry::new(point!(x: 3.5, y: 3.5), Crs::CARTESIAN)).equals()?;
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r3"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_dwithin_always_refines() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let plain = origin_within(2.2);
            let mut envelope_only = origin_within(2.2);
            envelope_only.attach_index(&ctx.binding(Crs::CARTESIAN)?, true);

            // Distances from the origin: r0 0.71, r1 2.12, r2 3.54
            let expected = id_set(&["r0", "r1"]);
            assert_eq!(ctx.matching_ids(&plain)?, expected);
            assert_eq!(ctx.matching_ids(&envelope_only)?, expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_distance_units_are_converted() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let query = spatial(CrsGeometry::new(point!(x: 0.0, y: 0.0), Crs::CARTESIAN))
                .dwithin(0.0022, DistanceUnit::Kilometers)?;
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r0", "r1"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_deleted_record_never_matches() {
    run_test(
        create_diagonal_context,
        |mut ctx| {
            ctx.delete("r1")?;
            // The index still knows r1.
            let binding = ctx.binding(Crs::CARTESIAN)?;

            let mut envelope_only = spatial(search_box()).bbox()?;
            envelope_only.attach_index(&binding, true);
            assert_eq!(ctx.matching_ids(&envelope_only)?, id_set(&["r0", "r2"]));

            let mut disjoint = spatial(search_box()).disjoint()?;
            disjoint.attach_index(&binding, false);
            assert_eq!(ctx.matching_ids(&disjoint)?, id_set(&["r2", "r3", "r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_spans_every_segment() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let searcher = ctx.searcher()?;
            assert_eq!(searcher.segment_readers().len(), 2);

            let everything = Envelope::new(-1.0, -1.0, 10.0, 10.0, Crs::CARTESIAN);
            assert_eq!(ctx.matching_ids(&spatial(everything).intersects()?)?, ctx.all_ids());
            Ok(())
        },
        cleanup,
    )
}
