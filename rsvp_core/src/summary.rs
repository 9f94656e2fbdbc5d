//! Summary Aggregator - tallies guest decisions for one invitation.

use rand::Rng;
use rsvp_env::uuid_from_rng;

use crate::decision::decide;
use crate::model::{Decision, Invitation, Response, Summary};
use crate::roster::GuestRegistry;

/// Counts of each decision, in `(yes, no, maybe)` order.
pub fn tally(responses: &[Response]) -> (usize, usize, usize) {
    responses.iter().fold((0, 0, 0), |(y, n, m), r| match r.decision {
        Decision::Yes => (y + 1, n, m),
        Decision::No => (y, n + 1, m),
        Decision::Maybe => (y, n, m + 1),
    })
}

/// Packages already-collected responses into a summary.
pub fn summarize<R: Rng + ?Sized>(
    invitation: &Invitation,
    total_invited: usize,
    responses: Vec<Response>,
    rng: &mut R,
    created_at_ms: u64,
) -> Summary {
    let (yes_count, no_count, maybe_count) = tally(&responses);
    
    Summary {
        id: uuid_from_rng(rng),
        invitation_id: invitation.id,
        total_invited,
        total_responses: responses.len(),
        yes_count,
        no_count,
        maybe_count,
        responses,
        created_at_ms,
    }
}

/// Builds a summary by drawing a fresh decision for every roster guest.
///
/// Ignores anything recorded during the run, so `total_responses` always
/// equals the roster size.
pub fn build_summary<R: Rng + ?Sized>(
    invitation: &Invitation,
    roster: &GuestRegistry,
    rng: &mut R,
    created_at_ms: u64,
) -> Summary {
    let responses: Vec<Response> = roster
        .list()
        .iter()
        .map(|guest| decide(guest, invitation, rng, created_at_ms))
        .collect();
    
    summarize(invitation, roster.len(), responses, rng, created_at_ms)
}
