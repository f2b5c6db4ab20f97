use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use simulacat::orchestration::sim_package_root;
use simulacat::sim_config::merge_configs;
use simulacat::{Scenario, SimSource, SimulatorSession, StartOptions};
use std::io::BufRead;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
use cli::{Command, ProcessArgs, RenderArgs, ResolveTokenArgs, RootArgs, ServeArgs, ValidateArgs};

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Validate(args) => cmd_validate(args),
        Command::Render(args) => cmd_render(args),
        Command::ResolveToken(args) => cmd_resolve_token(args),
        Command::Serve(args) => cmd_serve(args),
        Command::JsRoot => cmd_js_root(),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    Scenario::load(path).with_context(|| format!("load scenario {}", path.display()))
}

#[derive(Serialize)]
struct ScenarioSummary {
    users: usize,
    organizations: usize,
    repositories: usize,
    branches: usize,
    issues: usize,
    pull_requests: usize,
    tokens: usize,
    apps: usize,
    app_installations: usize,
}

fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    let indexes = scenario
        .validate()
        .with_context(|| format!("validate {}", args.scenario.display()))?;
    let summary = ScenarioSummary {
        users: scenario.users().len(),
        organizations: scenario.organizations().len(),
        repositories: scenario.repositories().len(),
        branches: indexes.merged_branches().count(),
        issues: scenario.issues().len(),
        pull_requests: scenario.pull_requests().len(),
        tokens: scenario.tokens().len(),
        apps: scenario.apps().len(),
        app_installations: scenario.app_installations().len(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("ok: {}", args.scenario.display());
    println!(
        "  {} users, {} organizations, {} repositories, {} branches",
        summary.users, summary.organizations, summary.repositories, summary.branches
    );
    println!(
        "  {} issues, {} pull requests, {} tokens, {} apps, {} installations",
        summary.issues,
        summary.pull_requests,
        summary.tokens,
        summary.apps,
        summary.app_installations
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    let config = scenario
        .to_simulator_config(args.include_unsupported)
        .with_context(|| format!("render {}", args.scenario.display()))?;
    let text = serde_json::to_string_pretty(&config).context("serialize simulator config")?;
    match args.out {
        Some(out) => {
            std::fs::write(&out, format!("{text}\n"))
                .with_context(|| format!("write {}", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_resolve_token(args: ResolveTokenArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    let token = scenario
        .resolve_auth_token()
        .with_context(|| format!("resolve token for {}", args.scenario.display()))?;
    if let Some(token) = token {
        println!("{token}");
    }
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> Result<()> {
    let source = match &args.scenario {
        Some(path) => SimSource::from(load_scenario(path)?),
        None => SimSource::Raw(load_raw_layers(&args.raw)?),
    };
    let options = start_options(&args.process)?;
    let session = SimulatorSession::start(source, &options).context("start simulator")?;
    println!("{}", session.base_url());
    if let Some(token) = session.auth_token() {
        eprintln!("authorization: token {token}");
    }

    // Any line or EOF on stdin ends the session.
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read stdin")?;
    drop(session);
    Ok(())
}

fn load_raw_layers(paths: &[std::path::PathBuf]) -> Result<Value> {
    let layers = paths
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str::<Value>(&text)
                .with_context(|| format!("parse {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_configs(&layers)?)
}

fn start_options(args: &ProcessArgs) -> Result<StartOptions> {
    let timeout = Duration::try_from_secs_f64(args.startup_timeout)
        .map_err(|_| anyhow!("--startup-timeout must be a non-negative number of seconds"))?;
    let mut options = StartOptions::default().with_startup_timeout(timeout);
    if let Some(bun) = &args.bun {
        options = options.with_executable(bun.clone());
    }
    if let Some(entrypoint) = &args.entrypoint {
        options = options.with_entrypoint(entrypoint.clone());
    }
    Ok(options)
}

fn cmd_js_root() -> Result<()> {
    match sim_package_root() {
        Ok(root) => {
            println!("{}", root.display());
            Ok(())
        }
        Err(err) => {
            eprintln!("Failed to resolve SIMULACAT_JS_ROOT: {err}");
            std::process::exit(1);
        }
    }
}
