//! Implementation of the `relay execute` command.

use super::{Setup, print_json, print_message, read_template, render_prompt};
use crate::cli::ExecuteArgs;
use crate::error::Result;
use crate::runner::Runner;
use crate::session::Message;

pub fn cmd_execute(setup: &Setup, args: ExecuteArgs) -> Result<i32> {
    let template = read_template(&args.prompt)?;
    let prompt = render_prompt(&template, &[("repo", args.repo.as_deref())], &args.prompt.vars)?;

    let transport = setup.transport()?;
    let runner = Runner::new(&transport, &setup.config, setup.cache()).with_events(setup.events());

    let mut show = print_message;
    let observer: Option<&mut dyn FnMut(&Message)> = if args.live { Some(&mut show) } else { None };
    let report = runner.run_execution(&prompt, args.repo.as_deref(), observer)?;

    print_json(&report)?;
    Ok(report.exit_code())
}
