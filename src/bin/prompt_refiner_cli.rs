//! Prompt Refiner CLI - Anatomy prompts for Stable Diffusion
//!
//! Modes: enhance (default), --list-terms, --system-info
//! Results go to stdout, logs and errors to stderr.
//! Returns non-zero on any failure.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;

use prompt_refiner_anatomy::{
    EnhancementResult, PromptEnhancer, RefinerConfig, ViewType, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "prompt-refiner", version = ENGINE_VERSION)]
#[command(about = "Enhance prompts for anatomical education content in Stable Diffusion")]
#[command(after_help = "Examples:
  prompt-refiner heart
  prompt-refiner skeleton --view-type cross_section
  prompt-refiner brain --focus 3d_reconstruction --output json
  prompt-refiner --list-terms")]
struct Cli {
    /// Anatomical term or phrase to enhance (e.g. 'heart', 'skeleton')
    prompt: Option<String>,

    /// Focus area for optimization
    #[arg(long, value_enum)]
    focus: Option<Focus>,

    /// Type of anatomical view to generate
    #[arg(long, value_enum, default_value_t = ViewArg::Standard)]
    view_type: ViewArg,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// List all supported anatomical terms
    #[arg(long)]
    list_terms: bool,

    /// Show information about a body system
    #[arg(long, value_name = "SYSTEM")]
    system_info: Option<String>,

    /// Vocabulary JSON file (defaults to $PROMPT_REFINER_VOCABULARY, then the bundled data)
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Seed for reproducible modifier selection
    #[arg(long)]
    seed: Option<u64>,

    /// Show detected terms and full error chains
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Focus {
    /// Single organ on a neutral background for 3D reconstruction
    #[value(name = "3d_reconstruction")]
    Reconstruction3d,
    /// Clear educational diagrams
    Education,
    /// Detailed anatomical reference
    Scientific,
}

impl Focus {
    fn key(self) -> &'static str {
        match self {
            Focus::Reconstruction3d => "3d_reconstruction",
            Focus::Education => "education",
            Focus::Scientific => "scientific",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ViewArg {
    /// Basic anatomical illustration
    Standard,
    /// Cross-sectional / cutaway view
    #[value(name = "cross_section")]
    CrossSection,
    /// Overview of the entire body system
    #[value(name = "system_overview")]
    SystemOverview,
}

impl From<ViewArg> for ViewType {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Standard => ViewType::Standard,
            ViewArg::CrossSection => ViewType::CrossSection,
            ViewArg::SystemOverview => ViewType::SystemOverview,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_logging(config: &RefinerConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            config
                .log_level
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = RefinerConfig::from_env().with_vocabulary_path(cli.vocabulary.clone());
    if cli.verbose {
        config = config.with_minimum_log_level(LevelFilter::INFO);
    }
    init_logging(&config);

    match run(&cli, &config) {
        Ok(code) => code,
        Err(e) => {
            if cli.verbose {
                eprintln!("Error: {e:?}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &RefinerConfig) -> Result<ExitCode> {
    let vocabulary = config
        .load_vocabulary()
        .context("Error initializing prompt refiner")?;
    let enhancer = PromptEnhancer::new(vocabulary).context("Error initializing prompt refiner")?;

    if cli.list_terms {
        list_terms(&enhancer, cli.output)?;
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(system) = &cli.system_info {
        return show_system_info(&enhancer, system, cli.output);
    }

    let Some(prompt) = &cli.prompt else {
        Cli::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };

    let focus = cli.focus.map(Focus::key);
    let view_type = ViewType::from(cli.view_type);
    let result = match cli.seed {
        Some(seed) => enhancer.enhance_with(prompt, focus, view_type, &mut StdRng::seed_from_u64(seed)),
        None => enhancer.enhance(prompt, focus, view_type),
    }
    .context("Error enhancing prompt")?;

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result, cli.verbose),
    }

    Ok(ExitCode::SUCCESS)
}

fn list_terms(enhancer: &PromptEnhancer, output: OutputFormat) -> Result<()> {
    let terms = enhancer.list_supported_terms();

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&terms)?);
        return Ok(());
    }

    println!("Supported Anatomical Terms by Body System:");
    println!("{}", "=".repeat(45));
    for (system, mut system_terms) in terms {
        system_terms.sort();
        println!("\n{}:", system.to_uppercase());
        for term in system_terms {
            println!("  • {term}");
        }
    }
    Ok(())
}

fn show_system_info(enhancer: &PromptEnhancer, name: &str, output: OutputFormat) -> Result<ExitCode> {
    let name = name.to_lowercase();
    let Some(info) = enhancer.get_system_info(&name) else {
        eprintln!("Unknown body system: {name}");
        eprintln!("Available systems: {}", enhancer.list_systems().join(", "));
        return Ok(ExitCode::FAILURE);
    };

    if output == OutputFormat::Json {
        let wrapped = BTreeMap::from([(name.as_str(), info)]);
        println!("{}", serde_json::to_string_pretty(&wrapped)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Body System: {}", name.to_uppercase());
    println!("{}", "=".repeat(30));
    println!("Description: {}", info.description);
    println!("\nOrgans: {}", info.organs.join(", "));
    println!("Keywords: {}", info.keywords.join(", "));
    Ok(ExitCode::SUCCESS)
}

fn print_text_output(result: &EnhancementResult, verbose: bool) {
    println!("Enhanced Prompt Results");
    println!("{}", "=".repeat(25));
    println!("\nPositive Prompt:\n  {}", result.positive);
    println!("\nNegative Prompt:\n  {}", result.negative);

    if verbose {
        if !result.detected_terms.is_empty() {
            println!("\nDetected Terms: {}", result.detected_terms.join(", "));
        }
        if !result.detected_systems.is_empty() {
            println!("Detected Systems: {}", result.detected_systems.join(", "));
        }
    }

    println!("\nCopy the positive and negative prompts into your Stable Diffusion interface.");
}
