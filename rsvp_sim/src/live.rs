//! Live mode: one choreography against a real clock, narrated as it runs.

use crate::error::SimError;
use crate::exporter::changes;

use rsvp_core::{ChoreographyConfig, ChoreographyService, Invitation, RunSnapshot, Summary};
use rsvp_env::ChoreoContext;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs `invitation` to completion on `context`, logging every ledger and
/// actor change from the snapshot feed.
pub async fn run_live<Ctx: ChoreoContext>(
    context: Arc<Ctx>,
    config: ChoreographyConfig,
    invitation: Invitation,
) -> Result<Summary, SimError> {
    let service = ChoreographyService::new(context.clone(), config)?;
    let mut feed = service.subscribe();
    service.start();

    let run = service.submit_invitation(invitation)?;
    info!(%run, guests = service.roster().len(), "live run started");

    let mut last = RunSnapshot::default();
    loop {
        let next = feed.borrow_and_update().clone();
        for event in changes(&last, &next) {
            let at_ms = context.now().as_millis() as u64;
            if event.is_warning() {
                warn!(t_ms = at_ms, "{}", event.message);
            } else {
                info!(t_ms = at_ms, "{}", event.message);
            }
        }
        if let Some(summary) = &next.summary {
            return Ok(summary.clone());
        }
        last = next;

        if feed.changed().await.is_err() {
            return Err(SimError::FeedClosed);
        }
    }
}
