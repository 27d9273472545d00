//! Console command - print build output

use crate::cli::args::ConsoleArgs;
use crate::cli::commands::service;
use crate::config::Config;
use crate::error::DeckResult;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

/// Execute the console command
pub async fn execute(args: ConsoleArgs, config: &Config) -> DeckResult<()> {
    let service = service(config);
    let poll = Duration::from_secs(args.poll_secs.max(1));
    let mut offset = 0;

    loop {
        let chunk = service.console_text(&args.job, args.build, offset).await?;
        if !chunk.text.is_empty() {
            let mut stdout = std::io::stdout().lock();
            // A closed pipe (e.g. `| head`) ends the command quietly
            if stdout.write_all(chunk.text.as_bytes()).and_then(|_| stdout.flush()).is_err() {
                return Ok(());
            }
        }
        offset = chunk.next_offset;

        if !args.follow || !chunk.more_data {
            break;
        }

        debug!("Console at offset {}, waiting for more output", offset);
        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
