//! tatty command implementations

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use tatty_agent::tools::register_default_tools;
use tatty_agent::{
    AgentError, AgentObserver, AgentRuntime, ExecutionContext, InterruptFlag, RunOutcome,
    ToolRegistry,
};
use tatty_config::{self, Config, ConfigOverrides};
use tatty_provider::OpenRouterProvider;

/// Arguments of `tatty run`
pub struct RunArgs {
    pub query: Option<String>,
    pub dir: Option<String>,
    pub max_iterations: Option<u32>,
    pub max_depth: Option<u32>,
    pub model: Option<String>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub interactive: bool,
}

/// Defaults, then the config file, then `.env`, then the environment, then flags
async fn load_config(path: Option<PathBuf>, overrides: &ConfigOverrides) -> Result<Config> {
    let path = path.unwrap_or_else(tatty_config::config_path);
    let mut config = Config::load_from(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    if let Some(dotenv) = config.load_dotenv().context("Failed to load .env")? {
        debug!("Applied {}", dotenv.display());
    }
    config.apply_env();
    config.apply_overrides(overrides);
    debug!("Config sources: {:?}", config.sources());
    Ok(config)
}

/// Prints agent progress, indented by sub-agent depth
struct CliObserver {
    verbose: bool,
}

fn indent(depth: u32) -> String {
    "  ".repeat(depth as usize)
}

/// First line of `text`, cut to `max` characters
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > max {
        format!("{}…", line.chars().take(max).collect::<String>())
    } else if text.trim().lines().count() > 1 {
        format!("{} …", line)
    } else {
        line.to_string()
    }
}

#[async_trait]
impl AgentObserver for CliObserver {
    async fn iteration_started(&self, iteration: u32, depth: u32) {
        if self.verbose {
            println!("{}◆ Iteration {}", indent(depth), iteration + 1);
        }
    }

    async fn tool_started(
        &self,
        name: &str,
        params: &Value,
        index: usize,
        total: usize,
        depth: u32,
    ) {
        println!(
            "{}→ {} [{}/{}] {}",
            indent(depth),
            name,
            index + 1,
            total,
            preview(&params.to_string(), 80)
        );
    }

    async fn tool_finished(&self, result: &str, depth: u32) {
        println!("{}  ✓ {}", indent(depth), preview(result, 100));
    }

    async fn agent_reply(&self, reply: &str) {
        println!("\n◆ {}", reply);
    }

    async fn status_update(&self, status: &str, _iteration: u32) {
        if self.verbose {
            println!("  … {}", status);
        }
    }

    async fn sub_agent_started(&self, description: &str, depth: u32) {
        println!("{}▶ Sub-agent: {}", indent(depth), description);
    }

    async fn sub_agent_finished(&self, description: &str, result: &str, depth: u32) {
        println!(
            "{}◀ Sub-agent done: {} - {}",
            indent(depth),
            description,
            preview(result, 100)
        );
    }
}

/// First Ctrl-C raises the flag, a second one exits
fn spawn_interrupt_handler(flag: InterruptFlag) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                return;
            }
            if flag.is_requested() {
                eprintln!("\n◆ Forced exit");
                std::process::exit(130);
            }
            flag.request();
            eprintln!("\n◆ Interrupt requested, stopping after the current step (Ctrl-C again to force)");
        }
    });
}

/// Run the agent. Returns `true` when the last run was interrupted.
pub async fn run_command(args: RunArgs) -> Result<bool> {
    let overrides = ConfigOverrides {
        working_dir: args.dir.clone(),
        model: args.model.clone(),
        max_iterations: args.max_iterations,
        max_depth: args.max_depth,
    };
    let config = load_config(args.config.clone(), &overrides).await?;

    let api_key = config
        .api_key()
        .context("No API key configured. Set TATTY_API_KEY or add one to ~/.tatty/config.json")?;
    let provider = OpenRouterProvider::new(
        api_key,
        config.api_base(),
        Some(config.agent.model.clone()).filter(|m| !m.is_empty()),
    );

    let mut registry = ToolRegistry::new();
    register_default_tools(&mut registry, &config.tools);
    let runtime = AgentRuntime::from_config(provider, registry, &config);

    let flag = InterruptFlag::new();
    spawn_interrupt_handler(flag.clone());

    let observer = CliObserver {
        verbose: args.verbose,
    };
    let max_iterations = config.agent.max_iterations;
    let mut ctx = ExecutionContext::new(config.working_dir()).with_interrupt(flag.clone());
    info!(
        "Running in {:?} with model {}",
        ctx.working_dir(),
        config.agent.model
    );

    let mut interrupted = false;
    if let Some(query) = &args.query {
        match runtime.run(query, max_iterations, &mut ctx, &observer).await {
            Ok(outcome) => interrupted = report(outcome),
            // interactive sessions keep going after a failed query
            Err(e) if args.interactive => report_error(&e),
            Err(e) => return Err(e.into()),
        }
    }

    if !args.interactive {
        return Ok(interrupted);
    }

    println!("◆ Interactive mode (type 'exit' to quit)");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        flag.clear();
        match runtime.run(input, max_iterations, &mut ctx, &observer).await {
            Ok(outcome) => interrupted = report(outcome),
            Err(e) => {
                report_error(&e);
                interrupted = false;
            }
        }
        println!();
    }

    Ok(interrupted)
}

/// Print what the observer did not already show
fn report(outcome: RunOutcome) -> bool {
    match outcome {
        RunOutcome::Completed(_) => false,
        RunOutcome::Interrupted => {
            println!("\n◆ {}", RunOutcome::Interrupted.into_message());
            true
        }
        exhausted => {
            println!("\n◆ {}", exhausted.into_message());
            false
        }
    }
}

fn report_error(error: &AgentError) {
    debug!("Run failed: {:?}", error);
    eprintln!("✗ Run failed: {}", error);
}

/// Show the effective configuration
pub async fn config_command(path: Option<PathBuf>) -> Result<()> {
    let config = load_config(path, &ConfigOverrides::default()).await?;

    let mut shown = config.clone();
    shown.provider.api_key = config.masked_api_key();

    println!("◆ tatty configuration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", serde_json::to_string_pretty(&shown)?);

    println!("\nSources:");
    if config.sources().is_empty() {
        println!("  (defaults only)");
    }
    for source in config.sources() {
        println!("  {}", source);
    }

    Ok(())
}

/// Write the default config file if it does not exist
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing tatty...");

    let path = tatty_config::config_path();
    let existed = path.exists();
    tatty_config::init()
        .await
        .with_context(|| format!("Failed to initialize {}", path.display()))?;

    if existed {
        println!("Config already exists at {}", path.display());
    } else {
        println!("Config created at {}", path.display());
    }
    println!("\nNext steps:");
    println!("  1. Set TATTY_API_KEY or add your key to {}", path.display());
    println!("  2. Run a task: tatty run \"List the files in this project\"");

    Ok(())
}
