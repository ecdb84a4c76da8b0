//! Implementation of the `relay cache` subcommands.

use super::{Setup, print_json};
use crate::cache::CacheKey;
use crate::cli::{CacheAction, CacheCommand, CacheKeyArgs};
use crate::error::{RelayError, Result};
use crate::exit_codes;

pub fn dispatch_cache(setup: &Setup, cmd: CacheCommand) -> Result<i32> {
    match cmd.action {
        CacheAction::Get(args) => cmd_cache_get(setup, &args),
        CacheAction::Path(args) => cmd_cache_path(setup, &args),
    }
}

fn key_from(args: &CacheKeyArgs) -> Result<CacheKey> {
    CacheKey::new(&args.category, &args.subject, args.sub_id.as_deref())
}

fn cmd_cache_get(setup: &Setup, args: &CacheKeyArgs) -> Result<i32> {
    let key = key_from(args)?;
    let document = setup
        .cache()
        .get(&key)?
        .ok_or_else(|| RelayError::NotFound(format!("no cached artifact for '{}'", key)))?;
    print_json(&document)?;
    Ok(exit_codes::SUCCESS)
}

fn cmd_cache_path(setup: &Setup, args: &CacheKeyArgs) -> Result<i32> {
    let key = key_from(args)?;
    println!("{}", setup.cache().path_for(&key).display());
    Ok(exit_codes::SUCCESS)
}
