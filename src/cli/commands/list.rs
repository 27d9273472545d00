//! Read-only listings: jobs, builds, stages, queue, nodes, running builds

use crate::api::{Build, Job, Node, QueueItem, RunningBuild, Stage};
use crate::cli::args::{BuildRefArgs, BuildsArgs, FormatArgs, JobsArgs};
use crate::cli::commands::{print_machine, service};
use crate::config::Config;
use crate::error::DeckResult;
use crate::poll::{BuildsInterval, PollOptions, PollScheduler};
use crate::service::DeckService;
use crate::ui::{self, format, TaskSpinner, UiContext};
use chrono::Utc;
use console::{style, Term};
use std::future::Future;

/// Run a fetch behind a spinner
async fn fetch<T, Fut>(ctx: &UiContext, what: &str, fut: Fut) -> DeckResult<T>
where
    Fut: Future<Output = DeckResult<T>>,
{
    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Fetching {}...", what));
    match fut.await {
        Ok(value) => {
            spinner.clear();
            Ok(value)
        }
        Err(e) => {
            spinner.stop_error(&format!("Failed to fetch {}", what));
            Err(e)
        }
    }
}

/// Execute the jobs command
pub async fn jobs(args: JobsArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let service = service(config);
    let jobs = fetch(&ctx, "jobs", service.jobs()).await?;

    let filtered: Vec<Job> = jobs
        .into_iter()
        .filter(|job| args.filter.as_deref().map_or(true, |f| job.fullname.contains(f)))
        .filter(|job| !args.running || job.is_running())
        .collect();

    if print_machine(args.format, &filtered, |job| job.fullname.clone())? {
        return Ok(());
    }
    if filtered.is_empty() {
        ui::step_info(&ctx, "No matching jobs");
        return Ok(());
    }

    println!(
        "{:<48} {:<12} {:>7}",
        style("JOB").bold(),
        style("STATE").bold(),
        style("LAST").bold()
    );
    for job in &filtered {
        let last = job
            .last_build_number()
            .map(|n| format!("#{}", n))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<48} {:<12} {:>7}",
            job.fullname,
            format::color(job.color),
            last
        );
    }
    println!();
    println!("{} job(s)", filtered.len());
    Ok(())
}

/// Execute the builds command
pub async fn builds(args: BuildsArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let service = service(config);

    if args.watch {
        return watch_builds(&ctx, service, &args, config).await;
    }

    let builds: Vec<Build> = fetch(&ctx, "builds", service.builds(&args.job, args.limit)).await?;
    if print_machine(args.format, &builds, |b| format!("{} {}", b.number, result_word(b)))? {
        return Ok(());
    }
    if builds.is_empty() {
        ui::step_info(&ctx, &format!("{} has no builds", args.job));
        return Ok(());
    }

    ui::intro(&ctx, &args.job);
    print_builds(&builds);
    Ok(())
}

/// Redraw the history whenever it changes until Ctrl-C
async fn watch_builds(
    ctx: &UiContext,
    service: DeckService,
    args: &BuildsArgs,
    config: &Config,
) -> DeckResult<()> {
    service.context().api()?;
    let policy = BuildsInterval::from_config(&config.polling);
    let job = args.job.clone();
    let limit = args.limit;

    let scheduler = PollScheduler::default();
    let mut builds = scheduler.subscribe(
        PollOptions::new(format!("builds of {}", job), policy.idle, move || {
            let service = service.clone();
            let job = job.clone();
            async move { service.builds(&job, limit).await }
        })
        .adaptive(move |builds: &Vec<Build>| policy.for_builds(builds)),
    );

    let term = Term::stdout();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = builds.changed() => {
                if !changed {
                    break;
                }
                let state = builds.state();
                if state.loading {
                    continue;
                }
                if ctx.use_fancy_output() {
                    term.clear_screen().ok();
                }
                if let Some(list) = &state.data {
                    ui::intro(ctx, &args.job);
                    print_builds(list);
                }
                if let Some(e) = &state.error {
                    ui::step_error_detail(ctx, "Refresh failed", &e.to_string());
                }
            }
        }
    }
    Ok(())
}

fn print_builds(builds: &[Build]) {
    println!(
        "{:>7} {:<10} {:<17} {:>9}",
        style("BUILD").bold(),
        style("RESULT").bold(),
        style("STARTED").bold(),
        style("DURATION").bold()
    );
    for build in builds {
        println!(
            "{:>7} {:<10} {:<17} {:>9}",
            format!("#{}", build.number),
            format::result(build.result, build.building),
            format::timestamp(build.timestamp),
            if build.building {
                "-".to_string()
            } else {
                format::duration_ms(build.duration)
            }
        );
    }
}

fn result_word(build: &Build) -> String {
    format::result(build.result, build.building)
        .force_styling(false)
        .to_string()
}

/// Execute the stages command
pub async fn stages(args: BuildRefArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let service = service(config);
    let stages: Vec<Stage> =
        fetch(&ctx, "stages", service.stages(&args.job, args.build)).await?;

    if print_machine(args.format, &stages, |s| format!("{} {:?}", s.name, s.status))? {
        return Ok(());
    }
    if stages.is_empty() {
        ui::step_info(&ctx, "No pipeline stages (not a pipeline, or not started)");
        return Ok(());
    }

    ui::intro(&ctx, &format!("{} #{}", args.job, args.build));
    for stage in &stages {
        println!(
            "  {:<32} {:<22} {:>9}",
            stage.name,
            format::stage_status(stage.status),
            format::duration_ms(stage.duration_millis)
        );
    }
    Ok(())
}

/// Execute the queue command
pub async fn queue(args: FormatArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let service = service(config);
    let items: Vec<QueueItem> = fetch(&ctx, "queue", service.queue()).await?;

    if print_machine(args.format, &items, |i| format!("{} {}", i.id, i.task_name))? {
        return Ok(());
    }
    if items.is_empty() {
        ui::step_info(&ctx, "Queue is empty");
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "{:>8} {:<40} {:<14} {}",
        style("ID").bold(),
        style("TASK").bold(),
        style("WAITING").bold(),
        style("WHY").bold()
    );
    for item in &items {
        let mut why = item.why.clone().unwrap_or_default();
        if item.stuck {
            why = format!("{} {}", style("[stuck]").red(), why);
        }
        println!(
            "{:>8} {:<40} {:<14} {}",
            item.id,
            item.task_name,
            format::age(item.in_queue_since, now),
            style(why).dim()
        );
    }
    Ok(())
}

/// Execute the nodes command
pub async fn nodes(args: FormatArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let service = service(config);
    let nodes: Vec<Node> = fetch(&ctx, "nodes", service.nodes()).await?;

    if print_machine(args.format, &nodes, |n| n.display_name.clone())? {
        return Ok(());
    }

    println!(
        "{:<32} {:<10} {:>9}  {}",
        style("NODE").bold(),
        style("STATE").bold(),
        style("EXECUTORS").bold(),
        style("REASON").bold()
    );
    for node in &nodes {
        let state = if node.offline {
            style("offline").red()
        } else if node.idle {
            style("idle").dim()
        } else {
            style("busy").blue()
        };
        println!(
            "{:<32} {:<10} {:>9}  {}",
            node.display_name,
            state,
            node.num_executors,
            node.offline_cause_reason.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Execute the running command
pub async fn running(args: FormatArgs, config: &Config) -> DeckResult<()> {
    let ctx = UiContext::detect().with_format(args.format);
    let service = service(config);
    let builds: Vec<RunningBuild> = fetch(&ctx, "running builds", service.running_builds()).await?;

    if print_machine(args.format, &builds, |b| b.url.clone())? {
        return Ok(());
    }
    if builds.is_empty() {
        ui::step_info(&ctx, "Nothing is building");
        return Ok(());
    }

    print_running(&builds);
    Ok(())
}

fn print_running(builds: &[RunningBuild]) {
    let now = Utc::now();
    println!(
        "{:<40} {:>7} {:<20} {:<14} {}",
        style("JOB").bold(),
        style("BUILD").bold(),
        style("NODE").bold(),
        style("RUNNING").bold(),
        style("PROGRESS").bold()
    );
    for build in builds {
        let elapsed = now.timestamp_millis().saturating_sub(build.timestamp).max(0);
        let progress = if build.estimated_duration > 0 {
            format!("{}%", (elapsed * 100 / build.estimated_duration).min(99))
        } else {
            "-".to_string()
        };
        println!(
            "{:<40} {:>7} {:<20} {:<14} {}",
            build.job.as_deref().unwrap_or(&build.display_name),
            format!("#{}", build.number),
            build.node,
            format::duration_ms(elapsed as u64),
            progress
        );
    }
}
