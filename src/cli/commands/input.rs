//! Input command - answer pipeline input steps

use crate::api::PendingInput;
use crate::cli::args::{InputAction, InputArgs, OutputFormat};
use crate::cli::commands::{print_json, service};
use crate::config::Config;
use crate::error::{DeckError, DeckResult};
use crate::service::DeckService;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the input command
pub async fn execute(args: InputArgs, config: &Config) -> DeckResult<()> {
    let service = service(config);

    match args.action {
        InputAction::List { job, build, format } => list(&service, &job, build, format).await,
        InputAction::Submit {
            job,
            build,
            input_id,
            params,
        } => submit(&service, &job, build, &input_id, params).await,
        InputAction::Abort {
            job,
            build,
            input_id,
            yes,
        } => abort(&service, &job, build, &input_id, yes).await,
    }
}

async fn list(
    service: &DeckService,
    job: &str,
    build: u64,
    format: OutputFormat,
) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(format);
    let inputs = service.pending_inputs(job, build).await?;

    match format {
        OutputFormat::Json => return print_json(&inputs),
        OutputFormat::Plain => {
            for input in &inputs {
                println!("{}", input.id);
            }
            return Ok(());
        }
        OutputFormat::Table => {}
    }

    if inputs.is_empty() {
        ui::step_info(&ctx, &format!("{} #{} is not waiting for input", job, build));
        return Ok(());
    }

    for input in &inputs {
        println!("{} {}", style(&input.id).cyan().bold(), input.message);
        for param in &input.inputs {
            println!(
                "    {} {} {}",
                param.name,
                style(format!("({})", param.kind)).dim(),
                param.description
            );
        }
    }
    Ok(())
}

async fn submit(
    service: &DeckService,
    job: &str,
    build: u64,
    input_id: &str,
    mut params: Vec<(String, String)>,
) -> DeckResult<()> {
    let ctx = UiContext::detect();
    let input = find_input(service, job, build, input_id).await?;

    // Ask for parameters the caller did not pass on the command line
    for param in &input.inputs {
        if params.iter().any(|(key, _)| key == &param.name) {
            continue;
        }
        let prompt = if param.description.is_empty() {
            param.name.clone()
        } else {
            format!("{} - {}", param.name, param.description)
        };
        if let Some(value) = ui::text(&ctx, &prompt, "", false).await? {
            params.push((param.name.clone(), value));
        }
    }

    service.submit_input(job, build, &input.id, &params).await?;
    let label = if input.proceed_text.is_empty() {
        "Proceeded"
    } else {
        input.proceed_text.as_str()
    };
    ui::step_ok(&ctx, &format!("{}: {} #{} ({})", label, job, build, input.id));
    Ok(())
}

async fn abort(
    service: &DeckService,
    job: &str,
    build: u64,
    input_id: &str,
    yes: bool,
) -> DeckResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let input = find_input(service, job, build, input_id).await?;

    let proceed = ui::confirm(&ctx, &format!("Abort {} #{} at '{}'?", job, build, input.message), true).await?;
    if !proceed {
        ui::remark(&ctx, "Cancelled");
        return Ok(());
    }

    service.abort_input(job, build, &input.id).await?;
    ui::step_ok(&ctx, &format!("Aborted {} #{}", job, build));
    Ok(())
}

/// Look up a pending input by id; matching is case-insensitive like Jenkins input ids
async fn find_input(
    service: &DeckService,
    job: &str,
    build: u64,
    input_id: &str,
) -> DeckResult<PendingInput> {
    let inputs = service.pending_inputs(job, build).await?;
    inputs
        .into_iter()
        .find(|input| input.id.eq_ignore_ascii_case(input_id))
        .ok_or_else(|| {
            DeckError::User(format!(
                "{} #{} has no pending input '{}'",
                job, build, input_id
            ))
        })
}
