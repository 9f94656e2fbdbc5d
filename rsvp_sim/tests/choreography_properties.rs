use rsvp_core::{ChoreographyConfig, MessageStatus, SummaryPolicy};
use rsvp_sim::{SimConfig, SimWorld};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

const GUESTS: usize = 5;

fn world(seed: u64, tick_ms: u64, policy: SummaryPolicy) -> SimWorld {
    let mut choreography = ChoreographyConfig::default();
    choreography.summary_policy = policy;
    let config = SimConfig {
        seed,
        tick: Duration::from_millis(tick_ms),
        max_duration: Duration::from_secs(60),
        choreography,
    };
    SimWorld::new(config).expect("reference config is valid")
}

fn started(seed: u64, tick_ms: u64, policy: SummaryPolicy) -> SimWorld {
    let mut world = world(seed, tick_ms, policy);
    let invitation = world.invitation("Quarterly Offsite", "Sarah");
    world.submit(invitation).expect("idle engine accepts a run");
    world
}

#[test]
fn reference_run_produces_twelve_processed_messages() {
    let mut world = started(42, 50, SummaryPolicy::Recorded);
    assert!(world.run_until_idle());

    let messages = world.engine().messages();
    assert_eq!(messages.len(), 2 * GUESTS + 2);
    assert!(messages.iter().all(|m| m.status == MessageStatus::Processed));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_run_completes_with_one_response_per_guest(seed in any::<u64>()) {
        let mut world = started(seed, 50, SummaryPolicy::Recorded);
        prop_assert!(world.run_until_idle());

        let engine = world.engine();
        let responders: HashSet<&str> = engine.responses().iter().map(|r| r.guest_id.as_str()).collect();
        prop_assert_eq!(engine.responses().len(), GUESTS);
        prop_assert_eq!(responders.len(), GUESTS);

        let summary = engine.summary().expect("summary published");
        prop_assert_eq!(summary.total_invited, GUESTS);
        prop_assert_eq!(summary.total_responses, GUESTS);
        prop_assert_eq!(summary.yes_count + summary.no_count + summary.maybe_count, GUESTS);
    }

    #[test]
    fn message_status_only_moves_forward(seed in any::<u64>()) {
        let mut world = started(seed, 50, SummaryPolicy::Recorded);
        world.run_until_idle();

        let transitions = world.engine().transitions();
        prop_assert!(transitions.iter().all(|t| t.to > t.from));

        for message in world.engine().messages() {
            let hops = transitions.iter().filter(|t| t.message == message.id).count();
            prop_assert_eq!(hops, 2);
        }
    }

    #[test]
    fn summary_never_precedes_the_last_response(seed in any::<u64>(), tick_ms in 10_u64..400) {
        let mut world = started(seed, tick_ms, SummaryPolicy::Recorded);

        while world.engine().is_active() && world.now() < Duration::from_secs(30) {
            world.tick();
            let engine = world.engine();
            prop_assert!(engine.responses().len() <= GUESTS);
            if engine.summary().is_some() {
                prop_assert_eq!(engine.responses().len(), GUESTS);
            }
        }
        prop_assert!(world.engine().summary().is_some());
    }

    #[test]
    fn reset_at_any_point_leaves_nothing_behind(seed in any::<u64>(), reset_at_ms in 0_u64..12_000) {
        let mut world = started(seed, 50, SummaryPolicy::Recorded);
        world.run_until(Duration::from_millis(reset_at_ms));
        world.reset();
        world.run_for(Duration::from_secs(15));

        let engine = world.engine();
        prop_assert!(engine.messages().is_empty());
        prop_assert!(engine.responses().is_empty());
        prop_assert!(engine.summary().is_none());
        prop_assert!(engine.status().is_idle());
        prop_assert_eq!(engine.pending_steps(), 0);
    }

    #[test]
    fn outcome_does_not_depend_on_tick_length(seed in any::<u64>(), tick_ms in 1_u64..1_500) {
        let mut fine = started(seed, 50, SummaryPolicy::Recorded);
        let mut coarse = started(seed, tick_ms, SummaryPolicy::Recorded);
        fine.run_until_idle();
        coarse.run_until_idle();

        prop_assert_eq!(fine.engine().snapshot(), coarse.engine().snapshot());
        prop_assert_eq!(fine.engine().transitions(), coarse.engine().transitions());
    }

    #[test]
    fn resampled_summary_still_covers_every_guest(seed in any::<u64>()) {
        let mut world = started(seed, 50, SummaryPolicy::Resample);
        prop_assert!(world.run_until_idle());

        let summary = world.engine().summary().expect("summary published");
        prop_assert_eq!(summary.total_responses, GUESTS);
        prop_assert_eq!(summary.responses.len(), GUESTS);
        prop_assert_eq!(summary.yes_count + summary.no_count + summary.maybe_count, GUESTS);
    }
}
