use geo_predicate::{
    chain, spatial, AttachIndex, CompositeSpatialQuery, Crs, Envelope, LogicalOperator, SortKey,
    SortOrder, SortType, SpatialPredicateQuery, SpatialResult,
};
use geo_predicate_int_test::test_util::{
    cleanup, create_test_context, diagonal_records, id_set, run_test, TestContext,
};

/// Diagonal records with a short description each.
fn create_described_context() -> SpatialResult<TestContext> {
    let mut ctx = create_test_context()?;
    let bodies = ["river bank", "mountain river", "desert", "river delta", "forest"];
    let records = diagonal_records()
        .into_iter()
        .zip(bodies)
        .map(|(record, body)| record.with_body(body))
        .collect();
    ctx.insert(records)?;
    Ok(ctx)
}

/// r0, r1, r2
fn lower_left() -> SpatialPredicateQuery {
    spatial(Envelope::new(0.0, 0.0, 2.9, 2.9, Crs::CARTESIAN))
        .intersects()
        .expect("finite box")
}

fn river_near(join: LogicalOperator) -> SpatialResult<CompositeSpatialQuery> {
    CompositeSpatialQuery::builder()
        .text("river", vec!["body"])
        .spatial(lower_left())
        .join(join)
        .build()
}

#[test]
fn test_and_join() {
    run_test(
        create_described_context,
        |ctx| {
            let query = river_near(LogicalOperator::And)?;
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r0", "r1"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_or_and_default_joins() {
    run_test(
        create_described_context,
        |ctx| {
            let expected = id_set(&["r0", "r1", "r2", "r3"]);
            assert_eq!(ctx.matching_ids(&river_near(LogicalOperator::Or)?)?, expected);
            assert_eq!(ctx.matching_ids(&river_near(LogicalOperator::Default)?)?, expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_not_join_excludes_spatial_matches() {
    run_test(
        create_described_context,
        |ctx| {
            let query = river_near(LogicalOperator::Not)?;
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r3"]));

            let spatial_only = CompositeSpatialQuery::builder()
                .spatial(lower_left())
                .join(LogicalOperator::Not)
                .build()?;
            assert_eq!(ctx.matching_ids(&spatial_only)?, id_set(&["r3", "r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_single_part_is_used_alone() {
    run_test(
        create_described_context,
        |ctx| {
            let text_only = CompositeSpatialQuery::builder()
                .text("river", vec!["body"])
                .build()?;
            assert_eq!(ctx.matching_ids(&text_only)?, id_set(&["r0", "r1", "r3"]));

            let spatial_only = CompositeSpatialQuery::builder().spatial(lower_left()).build()?;
            assert_eq!(ctx.matching_ids(&spatial_only)?, id_set(&["r0", "r1", "r2"]));

            let empty = CompositeSpatialQuery::builder().build()?;
            assert_eq!(ctx.matching_ids(&empty)?, ctx.all_ids());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_chain_as_spatial_part() {
    run_test(
        create_described_context,
        |ctx| {
            let upper_right = spatial(Envelope::new(2.0, 2.0, 5.0, 5.0, Crs::CARTESIAN)).intersects()?;
            let middle = chain(
                vec![lower_left().into(), upper_right.into()],
                vec![LogicalOperator::And],
            )?;
            let query = CompositeSpatialQuery::builder()
                .text("desert OR delta", vec!["body"])
                .spatial(middle)
                .build()?;
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r2"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_attached_index_gives_same_results() {
    run_test(
        create_described_context,
        |ctx| {
            let plain = river_near(LogicalOperator::And)?;
            let mut indexed = river_near(LogicalOperator::And)?;
            indexed.attach_index(&ctx.binding(Crs::CARTESIAN)?, false);

            assert_eq!(indexed, plain);
            assert_eq!(ctx.matching_ids(&indexed)?, ctx.matching_ids(&plain)?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_sort_keys_and_sub_queries_are_carried() {
    run_test(
        create_described_context,
        |ctx| {
            let sub = river_near(LogicalOperator::Or)?;
            let query = CompositeSpatialQuery::builder()
                .text("forest", vec!["body"])
                .sort_by(SortKey::new("id", SortOrder::Descending, SortType::String))
                .sub_query(sub.clone())
                .build()?;

            assert_eq!(query.sort().len(), 1);
            assert_eq!(query.sort()[0].order, SortOrder::Descending);
            assert_eq!(query.sub_queries(), &[sub]);
            // Sub-queries do not contribute to the top-level result.
            assert_eq!(ctx.matching_ids(&query)?, id_set(&["r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unknown_text_field_fails() {
    run_test(
        create_described_context,
        |ctx| {
            let query = CompositeSpatialQuery::builder()
                .text("river", vec!["summary"])
                .spatial(lower_left())
                .build()?;
            assert!(ctx.matching_ids(&query).is_err());
            Ok(())
        },
        cleanup,
    )
}
