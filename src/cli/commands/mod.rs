//! CLI command implementations

pub mod config;
pub mod console;
pub mod history;
pub mod input;
pub mod list;
pub mod stop;
pub mod trigger;
pub mod watch;

pub use config::execute as config;
pub use console::execute as console;
pub use history::execute as history;
pub use input::execute as input;
pub use stop::{cancel, execute as stop};
pub use trigger::execute as trigger;
pub use watch::execute as watch;

use crate::cli::args::OutputFormat;
use crate::config::Config;
use crate::context::DeckContext;
use crate::error::DeckResult;
use crate::service::DeckService;
use serde::Serialize;
use std::sync::Arc;

/// Service for one CLI invocation
pub(crate) fn service(config: &Config) -> DeckService {
    DeckService::new(Arc::new(DeckContext::new(config.clone())))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> DeckResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `items` as JSON, or one `plain` line per item; false means the caller prints a table
pub(crate) fn print_machine<T, F>(format: OutputFormat, items: &[T], plain: F) -> DeckResult<bool>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    match format {
        OutputFormat::Json => {
            print_json(items)?;
            Ok(true)
        }
        OutputFormat::Plain => {
            for item in items {
                println!("{}", plain(item));
            }
            Ok(true)
        }
        OutputFormat::Table => Ok(false),
    }
}
