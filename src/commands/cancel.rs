//! Implementation of the `relay cancel` command.

use super::Setup;
use crate::cancel::CancellationController;
use crate::cli::CancelArgs;
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::exit_codes;
use serde_json::json;

pub fn cmd_cancel(setup: &Setup, args: CancelArgs) -> Result<i32> {
    let transport = setup.transport()?;
    let delivered = CancellationController::from_config(&transport, &setup.config).cancel(&args.session_id);

    setup.events().record(
        Event::new(EventAction::Cancel)
            .with_session(args.session_id.clone())
            .with_details(json!({ "delivered": delivered })),
    );

    if delivered {
        println!("Cancellation requested for session {}.", args.session_id);
        Ok(exit_codes::SUCCESS)
    } else {
        eprintln!(
            "Could not deliver a stop message to session {} after {} attempt(s).",
            args.session_id, setup.config.cancel_max_attempts
        );
        Ok(exit_codes::TRANSPORT_FAILURE)
    }
}
