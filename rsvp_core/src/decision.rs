//! Decision Model - synthetic guest answers.
//!
//! Pure over an injected random source: pass a seeded RNG to replay a run.

use rand::Rng;
use rsvp_env::uuid_from_rng;

use crate::model::{Decision, Guest, Invitation, Response, Tendency};

/// Probability that a guest with a fixed tendency answers with it verbatim.
pub const FOLLOW_TENDENCY_PROBABILITY: f64 = 0.7;

const YES_PHRASES: [&str; 5] = [
    "Looking forward to it!",
    "Count me in!",
    "Sounds great, I'll be there!",
    "Yes, definitely attending!",
    "Can't wait!",
];

const NO_PHRASES: [&str; 5] = [
    "Sorry, I have a conflict.",
    "Unfortunately, I can't make it.",
    "I have another commitment.",
    "Sorry, won't be able to attend.",
    "Previous engagement, sorry!",
];

const MAYBE_PHRASES: [&str; 5] = [
    "I'll try my best to make it.",
    "Tentatively yes, but might change.",
    "Let me check my schedule.",
    "Possibly, depends on other meetings.",
    "I'll confirm closer to the date.",
];

/// The canned remark pool for a decision.
pub fn phrases(decision: Decision) -> &'static [&'static str] {
    match decision {
        Decision::Yes => &YES_PHRASES,
        Decision::No => &NO_PHRASES,
        Decision::Maybe => &MAYBE_PHRASES,
    }
}

/// The two outcomes substituted when a guest deviates from its tendency.
///
/// `None` for `Tendency::Random`, which has no fixed preference to deviate
/// from.
pub fn alternatives(tendency: Tendency) -> Option<[Decision; 2]> {
    match tendency {
        Tendency::Yes => Some([Decision::Maybe, Decision::No]),
        Tendency::No => Some([Decision::Maybe, Decision::Yes]),
        Tendency::Maybe => Some([Decision::Yes, Decision::No]),
        Tendency::Random => None,
    }
}

/// Draws a decision for a tendency.
pub fn draw_decision<R: Rng + ?Sized>(tendency: Tendency, rng: &mut R) -> Decision {
    let preferred = match tendency {
        Tendency::Yes => Decision::Yes,
        Tendency::No => Decision::No,
        Tendency::Maybe => Decision::Maybe,
        Tendency::Random => return Decision::ALL[rng.gen_range(0..Decision::ALL.len())],
    };
    
    if rng.gen_bool(FOLLOW_TENDENCY_PROBABILITY) {
        return preferred;
    }
    
    match alternatives(tendency) {
        Some(alts) => alts[rng.gen_range(0..alts.len())],
        None => preferred,
    }
}

/// Produces a guest's response to an invitation.
///
/// The decision is drawn per [`draw_decision`], then a remark is picked
/// uniformly from that decision's pool.
pub fn decide<R: Rng + ?Sized>(
    guest: &Guest,
    invitation: &Invitation,
    rng: &mut R,
    created_at_ms: u64,
) -> Response {
    let decision = draw_decision(guest.preferences.tendency, rng);
    let pool = phrases(decision);
    let remark = pool[rng.gen_range(0..pool.len())];
    
    Response {
        id: uuid_from_rng(rng),
        invitation_id: invitation.id,
        guest_id: guest.id.clone(),
        guest_name: guest.name.clone(),
        decision,
        message: Some(remark.to_string()),
        created_at_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::GuestRegistry;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    
    fn invitation() -> Invitation {
        Invitation::new("Team Sync", "2025-02-15", "14:00", "Room A", "Sarah", 0)
    }
    
    #[test]
    fn test_decide_stays_in_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let inv = invitation();
        
        for guest in GuestRegistry::reference().list() {
            for _ in 0..200 {
                let resp = decide(guest, &inv, &mut rng, 42);
                let remark = resp.message.as_deref().unwrap();
                assert!(!remark.is_empty());
                assert!(phrases(resp.decision).contains(&remark));
                assert_eq!(resp.invitation_id, inv.id);
                assert_eq!(resp.guest_name, guest.name);
                assert_eq!(resp.created_at_ms, 42);
            }
        }
    }
    
    #[test]
    fn test_fixed_tendency_bias() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let trials = 10_000;
        let yes = (0..trials)
            .filter(|_| draw_decision(Tendency::Yes, &mut rng) == Decision::Yes)
            .count();
        
        // 0.7 verbatim; alternatives never include the tendency itself
        let ratio = yes as f64 / trials as f64;
        assert!((0.66..0.74).contains(&ratio), "ratio = {}", ratio);
    }
    
    #[test]
    fn test_alternatives_split_evenly() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut maybe = 0;
        let mut yes = 0;
        for _ in 0..10_000 {
            match draw_decision(Tendency::No, &mut rng) {
                Decision::Maybe => maybe += 1,
                Decision::Yes => yes += 1,
                Decision::No => {}
            }
        }
        // Each alternative ~15%
        assert!((1_200..1_800).contains(&maybe), "maybe = {}", maybe);
        assert!((1_200..1_800).contains(&yes), "yes = {}", yes);
    }
    
    #[test]
    fn test_random_tendency_covers_all() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut seen = [0usize; 3];
        for _ in 0..3_000 {
            let d = draw_decision(Tendency::Random, &mut rng);
            seen[Decision::ALL.iter().position(|x| *x == d).unwrap()] += 1;
        }
        for count in seen {
            assert!((800..1_200).contains(&count), "counts = {:?}", seen);
        }
    }
    
    #[test]
    fn test_seeded_rng_reproduces_response() {
        let roster = GuestRegistry::reference();
        let guest = &roster.list()[4];
        let inv = invitation();
        
        let a = decide(guest, &inv, &mut ChaCha8Rng::seed_from_u64(99), 0);
        let b = decide(guest, &inv, &mut ChaCha8Rng::seed_from_u64(99), 0);
        assert_eq!(a, b);
    }
}
