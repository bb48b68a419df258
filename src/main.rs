// nrepl-bridge - Clojure REPL sessions over nREPL
// Main entry point

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use nrepl_bridge::cli::{Repl, TerminalPrompter};
use nrepl_bridge::config::{load_config, ReplConfig};
use nrepl_bridge::console::{BufferPane, ConsolePane, TerminalPane};
use nrepl_bridge::logging;
use nrepl_bridge::project::Project;
use nrepl_bridge::toolwindow::{HeadlessPrompter, ReplToolWindow};

#[derive(Parser, Debug)]
#[command(name = "nrepl-bridge", version, about = "Clojure REPL sessions over nREPL")]
struct Cli {
    /// nREPL server, e.g. nrepl://localhost:54050
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Config file (defaults to ~/.nrepl-bridge/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Evaluate one expression, print its output, and exit
    #[arg(long, value_name = "EXPR")]
    eval: Option<String>,

    /// Skip the greeting evaluated when a session opens
    #[arg(long)]
    no_greeting: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.url = url;
    }
    if cli.no_greeting {
        config.greeting_enabled = false;
    }
    config.validate().context("Invalid command line options")?;

    logging::init(cli.verbose || config.debug_logging);

    let project = Project::current()?;

    match cli.eval {
        Some(expr) => eval_once(project, config, &expr),
        None => {
            let window = ReplToolWindow::new(
                project,
                config,
                Box::new(TerminalPrompter),
                Box::new(|| Arc::new(TerminalPane::default()) as Arc<dyn ConsolePane>),
            );
            Repl::new(window)?.run()
        }
    }
}

fn eval_once(project: Project, config: ReplConfig, expr: &str) -> Result<()> {
    let url = config.url.clone();
    let mut window = ReplToolWindow::new(
        project,
        config,
        Box::new(HeadlessPrompter::new()),
        Box::new(|| Arc::new(BufferPane::new()) as Arc<dyn ConsolePane>),
    );

    if window.create_repl().is_none() {
        bail!("Could not connect to nREPL server at {}", url);
    }

    let Some(output) = window.write_to_current_repl(expr, false) else {
        bail!("Evaluation failed");
    };

    let prompt = window
        .current_session()
        .and_then(|session| session.view().last_prompt())
        .unwrap_or_default();
    println!("{}", output.strip_suffix(prompt.as_str()).unwrap_or(&output));

    window.dispose();
    Ok(())
}
