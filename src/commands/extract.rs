//! Implementation of the `relay extract` command.

use super::{Setup, extract_request, print_json};
use crate::cli::ExtractArgs;
use crate::error::Result;
use crate::exit_codes;
use crate::extract::ArtifactExtractor;
use crate::transport::Transport;
use tracing::info;

pub fn cmd_extract(setup: &Setup, args: ExtractArgs) -> Result<i32> {
    let transport = setup.transport()?;
    let session = transport.get_session_state(&args.session_id)?;
    if !session.is_terminal() {
        info!(session_id = %session.id, status = %session.status, "session is still running; extracting from current snapshot");
    }

    let document = ArtifactExtractor::new(&transport).extract(&session, &extract_request(&args.extract))?;
    print_json(&document)?;
    Ok(exit_codes::SUCCESS)
}
