//! Implementation of the `relay status` command.

use super::{Setup, print_json};
use crate::cli::StatusArgs;
use crate::error::Result;
use crate::exit_codes;
use crate::transport::Transport;
use serde_json::json;

pub fn cmd_status(setup: &Setup, args: StatusArgs) -> Result<i32> {
    let transport = setup.transport()?;
    let session = transport.get_session_state(&args.session_id)?;

    print_json(&json!({
        "session_id": session.id,
        "status": session.status,
        "terminal": session.is_terminal(),
        "messages": session.messages.len(),
        "attachments": session.attachments,
        "structured_output": session.structured_output.is_some(),
        "latest_agent_message": session.latest_agent_message().map(|m| &m.content),
    }))?;
    Ok(exit_codes::SUCCESS)
}
