use anyhow::Result;
use clap::{ArgAction, Parser};
use codegen_agent::config::{AppConfig, ConfigError, Overrides, Profile, Provider};
use codegen_agent::core::{AgentEvent, AgentLoop, Task};
use codegen_agent::reporter::{Report, ResultReporter};
use codegen_agent::{PromptAssembler, create_gateway, toolset};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "codegen-agent")]
#[command(version)]
#[command(about = "Generates code from a natural-language request using an LLM with tools", long_about = None)]
struct Args {
    /// The request, e.g. "create a simple login form in react"
    query: Vec<String>,

    #[arg(long, default_value_t = Profile::Codegen)]
    profile: Profile,

    #[arg(long)]
    provider: Option<Provider>,

    #[arg(short, long)]
    model: Option<String>,

    #[arg(long, help = "Base URL for the LLM API")]
    base_url: Option<String>,

    #[arg(long, help = "API key (defaults to the provider's environment variable)")]
    api_key: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long, help = "Maximum think/act cycles before giving up")]
    max_iterations: Option<usize>,

    #[arg(long, help = "Retries for transient model errors")]
    retries: Option<u32>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long, help = "Directory holding component markdown docs")]
    components_dir: Option<PathBuf>,

    #[arg(long, help = "Run the tool calls of one model turn concurrently")]
    concurrent_tools: bool,

    #[arg(long, help = "Stop the run on the first failing tool")]
    abort_on_tool_error: bool,

    #[arg(long)]
    no_color: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            max_iterations: self.max_iterations,
            retries: self.retries,
            timeout_secs: self.timeout_secs,
            components_dir: self.components_dir.clone(),
            concurrent_tools: self.concurrent_tools,
            abort_on_tool_error: self.abort_on_tool_error,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn finish(reporter: &ResultReporter, report: Report) -> ExitCode {
    reporter.emit(&report);
    ExitCode::from(report.exit_code)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let color = !args.no_color;
    colored::control::set_override(color);
    let reporter = ResultReporter::new(color).for_profile(args.profile);

    let task = match Task::new(args.query.join(" ")) {
        Ok(task) => task,
        Err(e) => return Ok(finish(&reporter, reporter.render_config_error(&e))),
    };

    let config = match AppConfig::resolve(args.profile, args.overrides(), |var| {
        std::env::var(var).ok()
    }) {
        Ok(config) => config,
        Err(e) => return Ok(finish(&reporter, reporter.render_config_error(&e))),
    };

    if let Err(e) = config.check_component_docs().await {
        return Ok(finish(&reporter, reporter.render_config_error(&e)));
    }

    let gateway = match create_gateway(&config.gateway) {
        Ok(gateway) => gateway,
        Err(e) => {
            let error = ConfigError::InvalidValue {
                field: "provider",
                reason: e.to_string(),
            };
            return Ok(finish(&reporter, reporter.render_config_error(&error)));
        }
    };

    let tools = Arc::new(toolset(config.profile, config.components_dir.clone())?);
    let model = gateway.model_info();
    info!(
        profile = %config.profile,
        provider = %model.provider,
        model = %model.name,
        tools = tools.len(),
        "Starting agent"
    );

    eprintln!("{} {}", "Processing query:".bold(), task.as_str());

    let agent = AgentLoop::new(
        gateway,
        tools,
        PromptAssembler::for_profile(config.profile),
        config.agent.clone(),
    )
    .with_event_callback(move |event| match event {
        AgentEvent::Thinking { iteration } => {
            eprintln!("{}", format!("Thinking (iteration {})...", iteration + 1).dimmed());
        }
        AgentEvent::ToolCompleted { entry } => {
            eprintln!("{}", reporter.progress_line(entry));
        }
        AgentEvent::CycleComplete { .. } => {}
    });

    let run = agent.run(&task).await;
    debug!(
        gateway_calls = run.gateway_calls,
        tool_calls = run.scratchpad.len(),
        "Run finished"
    );

    Ok(finish(&reporter, reporter.render(&run.result)))
}
