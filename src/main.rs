#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # aigrade
//!
//! Command line front end: reads an assignment brief and a student solution
//! (a Jupyter notebook or a plain source file), has an LLM grade it, prints the
//! result and saves a report.
//!
//! API keys are read from `OPENAI_API_KEY` / `GEMINI_API_KEY`, either from the
//! environment or from a `.env` file in the working directory.

use std::path::{Path, PathBuf};

use aigrade::{
    Provider, ReportFormat,
    config::{self, ConfigState},
    grader::build_grader,
    pipeline::grade_files,
    session::GradingSession,
};
use anyhow::{Result, bail};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use tabled::{Table, settings::Style};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Provider selection shared by every command.
#[derive(Debug, Clone)]
struct ProviderArgs {
    /// Which provider to call
    provider:     Provider,
    /// Model used with OpenAI
    openai_model: String,
    /// Model used with Gemini
    gemini_model: String,
}

impl ProviderArgs {
    /// Model for the selected provider.
    fn model(&self) -> &str {
        match self.provider {
            Provider::OpenAi => &self.openai_model,
            Provider::Gemini => &self.gemini_model,
        }
    }
}

/// Arguments of the `grade` command.
#[derive(Debug, Clone)]
struct GradeArgs {
    /// Provider selection
    providers:  ProviderArgs,
    /// Assignment brief
    assignment: PathBuf,
    /// Student notebook, preferred when present
    notebook:   PathBuf,
    /// Student source file, used when there is no notebook
    pyfile:     PathBuf,
    /// Where the report is written
    out:        PathBuf,
    /// Report layout
    format:     ReportFormat,
    /// Also print the parsed fields as JSON
    json:       bool,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade a submission
    Grade(GradeArgs),
    /// Check that the API key works
    CheckKey(ProviderArgs),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the provider selection and model overrides
    fn provider_args() -> impl Parser<ProviderArgs> {
        let provider = long("provider")
            .help("Which provider to use: openai or gemini")
            .argument::<String>("PROVIDER")
            .parse(|s| s.parse::<Provider>())
            .fallback(Provider::OpenAi);
        let openai_model = long("openai-model")
            .help("OpenAI model to use")
            .argument::<String>("MODEL")
            .fallback(Provider::OpenAi.default_model().to_string());
        let gemini_model = long("gemini-model")
            .help("Gemini model to use")
            .argument::<String>("MODEL")
            .fallback(Provider::Gemini.default_model().to_string());
        construct!(ProviderArgs {
            provider,
            openai_model,
            gemini_model
        })
    }

    /// parses a path with a default
    fn path(name: &'static str, help: &'static str, default: &'static str) -> impl Parser<PathBuf> {
        long(name)
            .help(help)
            .argument::<PathBuf>("PATH")
            .fallback(PathBuf::from(default))
    }

    let providers = provider_args();
    let assignment = path("assignment", "Path to assignment description", "assignment.txt");
    let notebook = path("notebook", "Path to student's Jupyter notebook", "solution.ipynb");
    let pyfile = path("pyfile", "Path to student's Python file (fallback)", "solution.py");
    let out = path("out", "Output file or directory", "grading_results.txt");
    let format = long("format")
        .help("Report layout: raw or structured")
        .argument::<String>("FORMAT")
        .parse(|s| s.parse::<ReportFormat>())
        .fallback(ReportFormat::Raw);
    let json = long("json")
        .help("Also print the parsed fields as JSON")
        .switch();

    let grade = construct!(GradeArgs {
        providers,
        assignment,
        notebook,
        pyfile,
        out,
        format,
        json
    })
    .to_options()
    .command("grade")
    .help("Grade a submission")
    .map(Cmd::Grade);

    let check_key = construct!(Cmd::CheckKey(provider_args()))
        .to_options()
        .command("check-key")
        .help("Check that the provider accepts the API key");

    let cmd = construct!([grade, check_key]);

    cmd.to_options()
        .descr("AI assignment grader (OpenAI/Gemini)")
        .run()
}

/// Picks the student's solution file, preferring the notebook.
fn solution_path(args: &GradeArgs) -> Result<&Path> {
    if args.notebook.exists() {
        println!("Extracting code from notebook: {}", args.notebook.display());
        Ok(args.notebook.as_path())
    } else if args.pyfile.exists() {
        println!("Reading Python file: {}", args.pyfile.display());
        Ok(args.pyfile.as_path())
    } else {
        bail!("No solution file found! Provide a .ipynb or .py.");
    }
}

/// Runs the `grade` command.
async fn grade(config: &ConfigState, args: GradeArgs) -> Result<()> {
    let providers = &args.providers;
    let grader = build_grader(providers.provider, config, Some(providers.model()))?;
    println!("Using {} provider: {}", grader.provider(), grader.model());

    let solution = solution_path(&args)?;

    println!("Sending to AI for grading...");
    let mut session = GradingSession::from_config(config);
    let outcome = grade_files(grader.as_ref(), &mut session, &args.assignment, solution).await?;
    let report = &outcome.report;

    let rule = "-".repeat(40);
    println!("\n{rule}\nGRADING RESULTS:\n{rule}");
    println!("{}", report.raw());

    println!("{}", Table::new(report.parsed().rows()).with(Style::modern()));
    if args.json {
        println!("{}", serde_json::to_string_pretty(report.parsed())?);
    }

    let saved = report.persist(&args.out, args.format)?;
    println!(
        "\n{} Results saved to {}",
        "✅ Grading complete!".green().bold(),
        saved.display()
    );

    Ok(())
}

/// Runs the `check-key` command.
async fn check_key(config: &ConfigState, args: ProviderArgs) -> Result<()> {
    let grader = build_grader(args.provider, config, Some(args.model()))?;
    println!("Testing {} API key with {}...", grader.provider(), grader.model());

    match grader.check_connection().await {
        Ok(reply) => {
            println!("{}", "✅ API key is valid!".green().bold());
            println!("{}", reply.trim());
            Ok(())
        }
        Err(err) if err.is_authentication() => {
            bail!("{} {err}", "❌ Invalid API key:".red().bold())
        }
        Err(err) => bail!("{} {err}", "❌ Error testing API key:".red().bold()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let level = if std::env::var_os("AIGRADE_DEBUG").is_some() {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let cmd = options();
    let config = config::ensure_initialized()?;

    match cmd {
        Cmd::Grade(args) => grade(&config, args).await?,
        Cmd::CheckKey(args) => check_key(&config, args).await?,
    };

    Ok(())
}
