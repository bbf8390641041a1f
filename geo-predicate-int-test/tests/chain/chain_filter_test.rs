use geo_predicate::{
    chain, spatial, AttachIndex, Crs, Envelope, LogicalOperator, SerialChainFilter, SpatialError,
    SpatialFilter,
};
use geo_predicate_int_test::test_util::{cleanup, create_diagonal_context, id_set, run_test};
use LogicalOperator::*;

/// Intersects the box `(min, min)-(max, max)`.
fn square(min: f64, max: f64) -> SpatialFilter {
    spatial(Envelope::new(min, min, max, max, Crs::CARTESIAN))
        .intersects()
        .expect("finite square")
        .into()
}

/// r0, r1
fn first() -> SpatialFilter {
    square(0.0, 1.9)
}

/// r1, r2
fn second() -> SpatialFilter {
    square(1.0, 2.9)
}

/// r4
fn third() -> SpatialFilter {
    square(4.0, 5.0)
}

#[test]
fn test_single_filter_chain_is_identity() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let filter = chain(vec![first()], vec![])?;
            assert_eq!(ctx.matching_ids(&filter)?, id_set(&["r0", "r1"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_leading_not_is_complement() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let filter = chain(vec![first()], vec![Not])?;
            assert_eq!(ctx.matching_ids(&filter)?, id_set(&["r2", "r3", "r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_operators_fold_left_to_right() {
    run_test(
        create_diagonal_context,
        |ctx| {
            // (F1 AND F2) OR F3, not F1 AND (F2 OR F3)
            let filter = chain(vec![first(), second(), third()], vec![And, Or])?;
            assert_eq!(ctx.matching_ids(&filter)?, id_set(&["r1", "r4"]));

            // (F1 OR F2) AND F3
            let filter = chain(vec![first(), second(), third()], vec![Or, And])?;
            assert!(ctx.matching_ids(&filter)?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_xor_and_default() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let xor = chain(vec![first(), second()], vec![Xor])?;
            assert_eq!(ctx.matching_ids(&xor)?, id_set(&["r0", "r2"]));

            let default = chain(vec![first(), second()], vec![Default])?;
            let or = chain(vec![first(), second()], vec![Or])?;
            assert_eq!(ctx.matching_ids(&default)?, id_set(&["r0", "r1", "r2"]));
            assert_eq!(ctx.matching_ids(&default)?, ctx.matching_ids(&or)?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_not_negates_the_following_filter() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let difference = chain(vec![first(), second()], vec![And, Not])?;
            assert_eq!(ctx.matching_ids(&difference)?, id_set(&["r0"]));

            let filter = chain(vec![first(), third()], vec![Not, Or])?;
            assert_eq!(ctx.matching_ids(&filter)?, id_set(&["r2", "r3", "r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_deleted_documents_are_never_set() {
    run_test(
        create_diagonal_context,
        |mut ctx| {
            ctx.delete("r2")?;
            ctx.delete("r0")?;

            let complement = chain(vec![first()], vec![Not])?;
            assert_eq!(ctx.matching_ids(&complement)?, id_set(&["r3", "r4"]));

            // {r1} XOR (everything but r1)
            let xor = chain(vec![first(), second()], vec![Xor, Not])?;
            assert_eq!(ctx.matching_ids(&xor)?, id_set(&["r1", "r3", "r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nested_chains() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let inner: SpatialFilter = chain(vec![first(), second()], vec![And])?.into();
            let outer = chain(vec![inner, third()], vec![Not, And])?;
            assert_eq!(ctx.matching_ids(&outer)?, id_set(&["r4"]));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_attached_index_reaches_every_filter() {
    run_test(
        create_diagonal_context,
        |ctx| {
            let filters = vec![first(), second(), third()];
            let plain = chain(filters.clone(), vec![And, Or])?;
            let mut indexed = chain(filters, vec![And, Or])?;
            indexed.attach_index(&ctx.binding(Crs::CARTESIAN)?, false);

            for filter in indexed.filters() {
                match filter {
                    SpatialFilter::Predicate(query) => assert!(query.binding().is_some()),
                    SpatialFilter::Chain(_) => unreachable!("flat chain"),
                }
            }
            assert_eq!(indexed, plain);
            assert_eq!(ctx.matching_ids(&indexed)?, ctx.matching_ids(&plain)?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_operator_lists_are_rejected() {
    let result = SerialChainFilter::new(vec![first(), second()], vec![]);
    assert!(matches!(result, Err(SpatialError::ContractViolation(_))));

    let result = SerialChainFilter::new(vec![first()], vec![And]);
    assert!(matches!(result, Err(SpatialError::ContractViolation(_))));

    let result = SerialChainFilter::new(vec![first(), second()], vec![Not, Not]);
    assert!(matches!(result, Err(SpatialError::ContractViolation(_))));
}
