use geo_predicate::{spatial, Crs, DistanceUnit, Envelope, IndexBinding, SpatialPredicateQuery};
use geo_predicate_int_test::test_util::{cleanup, create_random_context, random_envelope, run_test};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn bind(mut query: SpatialPredicateQuery, binding: Option<(&IndexBinding, bool)>) -> SpatialPredicateQuery {
    if let Some((binding, envelope_only)) = binding {
        query.attach_index(binding, envelope_only);
    }
    query
}

#[test]
fn test_disjoint_is_complement_of_intersects() {
    run_test(
        create_random_context,
        |ctx| {
            let binding = ctx.binding(Crs::CARTESIAN)?;
            let live = ctx.live_ids();
            let mut rng = StdRng::seed_from_u64(11);

            for _ in 0..10 {
                let area = random_envelope(&mut rng);
                for mode in [None, Some((&binding, false)), Some((&binding, true))] {
                    let intersects = ctx.matching_ids(&bind(spatial(area).intersects()?, mode))?;
                    let disjoint = ctx.matching_ids(&bind(spatial(area).disjoint()?, mode))?;

                    assert!(intersects.is_disjoint(&disjoint));
                    let union: BTreeSet<String> = intersects.union(&disjoint).cloned().collect();
                    assert_eq!(union, live, "area {} with index {:?}", area, mode.map(|m| m.1));
                }
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_beyond_is_complement_of_dwithin() {
    run_test(
        create_random_context,
        |ctx| {
            let binding = ctx.binding(Crs::CARTESIAN)?;
            let live = ctx.live_ids();
            let mut rng = StdRng::seed_from_u64(23);

            for distance in [0.0, 2.5, 10.0, 40.0] {
                let area = random_envelope(&mut rng);
                for mode in [None, Some((&binding, false)), Some((&binding, true))] {
                    let near = spatial(area).dwithin(distance, DistanceUnit::Meters)?;
                    let far = spatial(area).beyond(distance, DistanceUnit::Meters)?;
                    let near = ctx.matching_ids(&bind(near, mode))?;
                    let far = ctx.matching_ids(&bind(far, mode))?;

                    assert!(near.is_disjoint(&far));
                    let union: BTreeSet<String> = near.union(&far).cloned().collect();
                    assert_eq!(union, live, "distance {} with index {:?}", distance, mode.map(|m| m.1));
                }
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_disjoint_of_empty_area_matches_everything() {
    run_test(
        create_random_context,
        |ctx| {
            let nowhere = Envelope::new(500.0, 500.0, 501.0, 501.0, Crs::CARTESIAN);
            let mut query = spatial(nowhere).disjoint()?;
            query.attach_index(&ctx.binding(Crs::CARTESIAN)?, true);
            assert_eq!(ctx.matching_ids(&query)?, ctx.live_ids());
            Ok(())
        },
        cleanup,
    )
}
