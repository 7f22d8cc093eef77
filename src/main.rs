use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use colored::*;
use tracing_subscriber::EnvFilter;

use function_analysis::{AnalysisConfig, AnalysisSession, Analyzer, PropertyKind};

#[derive(Parser, Debug)]
#[command(name = "fnalyze", about = "Analyze a function of x: zeros, parity, extrema, asymptotics")]
struct Cli {
    /// Expressions to analyze, e.g. "x^2 - 4" or "3sin(2x)". Runs the demo list when empty.
    expressions: Vec<String>,

    /// Half-width of the plotting window [-range, range]
    #[arg(long, short)]
    range: Option<u32>,

    /// TOML file overriding analysis parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the session as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Also print the plot table
    #[arg(long, default_value_t = false)]
    samples: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AnalysisConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", err.to_string().red());
                return ExitCode::FAILURE;
            }
        },
        None => AnalysisConfig::default(),
    };
    let range = cli.range.unwrap_or(config.plot.default_range);
    let analyzer = Analyzer::new(config);

    if cli.expressions.is_empty() {
        run_demo(&analyzer, range);
        return ExitCode::SUCCESS;
    }

    let mut failed = false;
    for expr in &cli.expressions {
        failed |= !run_one(&analyzer, expr, range, &cli);
    }
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn run_one(analyzer: &Analyzer, expr: &str, range: u32, cli: &Cli) -> bool {
    let session = match AnalysisSession::start(analyzer, expr, range) {
        Ok(session) => session,
        Err(err) => {
            if cli.json {
                println!("{}", serde_json::json!({ "expression": expr, "error": err.to_string() }));
            } else {
                println!("{}{}", "Input: ".cyan().bold(), expr.cyan());
                println!("{}", err.to_string().red());
                println!("{}", "-".repeat(40));
            }
            return false;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&session) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("{}", err.to_string().red());
                return false;
            }
        }
        return true;
    }

    print_session(&session);
    if cli.samples {
        print_samples(&session);
    }
    println!("{}", "-".repeat(40));
    true
}

fn print_session(session: &AnalysisSession) {
    println!("{}{}", "Input: ".cyan().bold(), session.expression.cyan());
    for record in &session.properties {
        let value = match record.kind {
            PropertyKind::Category | PropertyKind::Domain => record.value.green(),
            PropertyKind::Zeros | PropertyKind::Extrema => record.value.yellow(),
            _ => record.value.normal(),
        };
        println!("{}{} {}", format!("{}:", record.name).bold(), " ".repeat(20usize.saturating_sub(record.name.chars().count())), value);
        println!("{}{}", " ".repeat(22), record.description.dimmed());
    }
}

fn print_samples(session: &AnalysisSession) {
    println!("{}", format!("Plot table on [-{0}, {0}]:", session.range).white().bold());
    for point in &session.samples {
        match point.y {
            Some(y) => println!("  {:>10.4}  {:>12.6}", point.x, y),
            None => println!("  {:>10.4}  {:>12}", point.x, "-".dimmed()),
        }
    }
    println!("{}", format!("{} segment(s)", session.segments().len()).dimmed());
}

// =============================================================================
// DEMO
// =============================================================================
fn run_demo(analyzer: &Analyzer, range: u32) {
    println!("{}", "=== FUNCTION ANALYSIS ===\n".magenta().bold());

    let tests = vec![
        "2*x+1",
        "x^2 - 4",
        "x^3 - 3x",
        "sin(x)",
        "tan(x)",
        "exp(x)",
        "ln(x)",
        "sqrt(x)",
        "1/x",
        "abs(x)",
    ];

    let hard_tests = vec![
        "x sin(x)",
        "exp(-x^2)",
        "(x^2 - 1)/(x^2 + 1)",
        "sqrt(16 - x^2)",
        "2x^3 - 9x^2 + 12x",
        "log(x)/x",
        "1/sin(x)",
        "exp(sin(x))",
    ];

    let quiet = Cli {
        expressions: Vec::new(),
        range: None,
        config: None,
        json: false,
        samples: false,
    };

    println!("{}", "--- Standard Functions ---".white().bold());
    let start = Instant::now();
    for t in &tests {
        run_one(analyzer, t, range, &quiet);
    }
    let std_time = start.elapsed();

    println!("\n{}", "--- Harder Functions ---".white().bold());
    let start = Instant::now();
    for t in &hard_tests {
        run_one(analyzer, t, range, &quiet);
    }
    let hard_time = start.elapsed();

    println!("\n{}", "=== TIMING ===".magenta().bold());
    println!("Standard ({} functions): {:?}", tests.len(), std_time);
    println!("Harder ({} functions):   {:?}", hard_tests.len(), hard_time);
    println!(
        "Average per function:    {:?}",
        (std_time + hard_time) / (tests.len() + hard_tests.len()) as u32
    );
}
