mod agent;
mod config;
mod llm;
mod sandbox;
mod tools;

use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::agent::{AgentRuntime, RunContext};
use crate::config::Config;
use crate::sandbox::WorkingRoot;
use crate::tools::{builtin, ToolRegistry};

const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

/// Exit code after Ctrl-C, as a shell reports SIGINT
const EXIT_INTERRUPTED: i32 = 130;

fn print_help() {
    println!(
        "\
sandbox-agent v{}

A tool-calling AI agent confined to a single working directory.

USAGE:
    sandbox-agent [OPTIONS] <PROMPT>...

ARGUMENTS:
    PROMPT    The request for the agent. Multiple words are joined with spaces.

OPTIONS:
    -c, --config <PATH>    Path to TOML configuration file [default: {DEFAULT_CONFIG_PATH}]
    -m, --model <MODEL>    Override the model from the config file
    -v, --verbose          Echo the prompt, every tool call, and token usage
    -h, --help             Print this help message and exit
    -V, --version          Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG              Log level filter for tracing
                          (e.g. debug, sandbox_agent=debug,warn)
    ANTHROPIC_API_KEY     API key for Anthropic Claude models
                          (from https://console.anthropic.com/)

EXAMPLES:
    sandbox-agent \"what files are in the root?\"
    sandbox-agent -v -c /etc/agent.toml \"run tests.py and fix any failures\"
    RUST_LOG=debug sandbox-agent \"explain how main.py works\"",
        env!("CARGO_PKG_VERSION"),
    );
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Version,
    Run(RunArgs),
}

#[derive(Debug, PartialEq)]
struct RunArgs {
    prompt: String,
    verbose: bool,
    model: Option<String>,
    config_path: String,
}

fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut verbose = false;
    let mut model = None;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut words: Vec<String> = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--verbose" | "-v" => verbose = true,
            "--model" | "-m" => match args.next() {
                Some(value) => model = Some(value),
                None => bail!("{arg} requires a value"),
            },
            "--config" | "-c" => match args.next() {
                Some(value) => config_path = value,
                None => bail!("{arg} requires a value"),
            },
            // Everything after `--` is prompt text
            "--" => {
                words.extend(args.by_ref());
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                bail!("Unknown option: {flag} (see --help)")
            }
            _ => words.push(arg),
        }
    }

    let prompt = words.join(" ");
    if prompt.trim().is_empty() {
        bail!("No prompt provided (see --help)");
    }

    Ok(Command::Run(RunArgs {
        prompt,
        verbose,
        model,
        config_path,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args(std::env::args().skip(1))? {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("sandbox-agent v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Run(args) => args,
    };

    // Logs go to stderr; stdout carries only the agent's answer
    let default_filter = if args.verbose {
        "sandbox_agent=debug"
    } else {
        "sandbox_agent=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!("Loading configuration from {}", args.config_path);
    let mut config = Config::load(&args.config_path)?;
    if let Some(model) = args.model {
        info!("Model override: {model}");
        config.llm.model = model;
    }

    let root = WorkingRoot::new(&config.agent.working_dir)?;

    let llm = llm::from_config(&config.llm)?;
    info!("LLM: {}", llm.description());

    let mut registry = ToolRegistry::new();
    builtin::register_all(&mut registry, &config.tools);
    info!(
        "Tools: {} registered ({})",
        registry.len(),
        registry.names().join(", ")
    );

    let mut runtime = AgentRuntime::new(RunContext {
        root,
        registry,
        llm,
    })
    .with_max_iterations(config.agent.max_iterations)
    .with_verbose(args.verbose);
    if let Some(prompt) = config.agent.system_prompt.take() {
        runtime = runtime.with_system_prompt(prompt);
    }
    info!(
        "Working directory: {} (max {} iterations)",
        runtime.root().path().display(),
        runtime.max_iterations()
    );

    if args.verbose {
        println!("User prompt: {}\n", args.prompt);
    }

    // Dropping the run future on Ctrl-C also drops any running script,
    // which kills its whole process group.
    let outcome = tokio::select! {
        outcome = runtime.run(&args.prompt) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(outcome) = outcome else {
        warn!("Interrupted, exiting");
        std::process::exit(EXIT_INTERRUPTED);
    };

    if let Some(output) = &outcome.output {
        println!("{output}");
    }

    if args.verbose {
        println!();
        println!("Prompt tokens: {}", outcome.usage.input_tokens);
        println!("Response tokens: {}", outcome.usage.output_tokens);
    }

    if !outcome.is_success() {
        let reason = outcome.error.as_deref().unwrap_or("run did not complete");
        bail!("Agent run {:?}: {reason}", outcome.state.status);
    }

    Ok(())
}
