//! unprofile CLI - profile-export PDF to JSON Resume

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unprofile::render::{to_json, to_json_value};
use unprofile::{inspect_file, Extraction, JsonFormat, ParseOptions, SectionKind, Unprofile};

#[derive(Parser)]
#[command(name = "unprofile")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert profile-export PDFs to JSON Resume records", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    parse: Option<ParseArgs>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a profile PDF to a JSON Resume record (default)
    Parse(ParseArgs),

    /// Print every reconstructed line with the section it landed in
    Inspect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Heuristic configuration file (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct ParseArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "FILE", default_value = "resume.json")]
    output: PathBuf,

    /// Personal-info JSON with fields the PDF omits
    #[arg(long, value_name = "FILE")]
    personal_info: Option<PathBuf>,

    /// Skills CSV export
    #[arg(long, value_name = "FILE")]
    skills_csv: Option<PathBuf>,

    /// Certifications CSV export
    #[arg(long, value_name = "FILE")]
    certifications_csv: Option<PathBuf>,

    /// Projects CSV export
    #[arg(long, value_name = "FILE")]
    projects_csv: Option<PathBuf>,

    /// Heuristic configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Document password
    #[arg(long, env = "UNPROFILE_PASSWORD")]
    password: Option<String>,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    /// Write warnings as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Fail on the first undecodable page instead of skipping it
    #[arg(long)]
    strict: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match (cli.command, cli.parse) {
        (Some(Commands::Parse(args)), _) => cmd_parse(&args),
        (Some(Commands::Inspect { input, config }), _) => cmd_inspect(&input, config.as_deref()),
        (Some(Commands::Version), _) => {
            cmd_version();
            Ok(())
        }
        (None, Some(args)) => cmd_parse(&args),
        (None, None) => {
            println!("{}", "Usage: unprofile <FILE> [-o resume.json]".yellow());
            println!("       unprofile --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_options(config: Option<&Path>) -> unprofile::Result<ParseOptions> {
    match config {
        Some(path) => {
            log::debug!("loading configuration from {}", path.display());
            ParseOptions::from_json_file(path)
        }
        None => Ok(ParseOptions::new()),
    }
}

fn cmd_parse(args: &ParseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Loading configuration...");
    let mut options = load_options(args.config.as_deref())?;
    if args.strict {
        options = options.strict();
    }
    if let Some(ref password) = args.password {
        options = options.with_password(password.clone());
    }

    let mut builder = Unprofile::new().with_options(options);
    if let Some(ref path) = args.personal_info {
        builder = builder.with_personal_info(path);
    }
    if let Some(ref path) = args.skills_csv {
        builder = builder.with_skills_csv(path);
    }
    if let Some(ref path) = args.certifications_csv {
        builder = builder.with_certifications_csv(path);
    }
    if let Some(ref path) = args.projects_csv {
        builder = builder.with_projects_csv(path);
    }
    pb.inc(1);

    pb.set_message("Extracting record...");
    let extraction = builder.parse(&args.input)?;
    pb.inc(1);

    pb.set_message("Writing JSON...");
    let format = if args.compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = to_json(&extraction.record, format)?;
    fs::write(&args.output, &json)?;

    if let Some(ref path) = args.report {
        fs::write(path, to_json_value(&extraction.warnings, JsonFormat::Pretty)?)?;
    }
    pb.inc(1);
    pb.finish_with_message("Done!");

    print_summary(&extraction);
    println!("{} {}", "Saved to".green(), args.output.display());
    if let Some(ref path) = args.report {
        println!("{} {}", "Report saved to".green(), path.display());
    }

    Ok(())
}

fn print_summary(extraction: &Extraction) {
    let record = &extraction.record;

    println!();
    println!("{}", "Record".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}",
        "Name".bold(),
        record.basics.name.as_deref().unwrap_or("-")
    );
    let counts = [
        ("Work", record.work.len()),
        ("Volunteer", record.volunteer.len()),
        ("Education", record.education.len()),
        ("Skills", record.skills.len()),
        ("Languages", record.languages.len()),
        ("Certificates", record.certificates.len()),
        ("Projects", record.projects.len()),
        ("Interests", record.interests.len()),
        ("Unrecognized", record.unrecognized.len()),
    ];
    for (label, count) in counts {
        if count > 0 {
            println!("{}: {}", label.bold(), count);
        }
    }

    if !extraction.warnings.is_empty() {
        println!();
        println!(
            "{} ({})",
            "Warnings".yellow().bold(),
            extraction.warnings.len()
        );
        for warning in &extraction.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }
    println!();
}

fn cmd_inspect(input: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(config)?;
    let sections = inspect_file(input, &options)?;

    println!("{}", "Sections".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());

    for section in &sections {
        let label = section.kind.as_str();
        let label = if section.kind == SectionKind::Unknown {
            label.red().bold()
        } else {
            label.green().bold()
        };

        for (i, line) in section.lines.iter().enumerate() {
            let tag = if i == 0 { format!("{:<14}", label) } else { " ".repeat(14) };
            let style = format!(
                "p{} c{} {:>5.1}{}",
                line.page,
                line.column,
                line.font_size,
                if line.is_bold { " B" } else { "  " }
            );
            println!("{} {} {}", tag, style.dimmed(), line.text);
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "unprofile".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Profile-export PDF to JSON Resume converter");
    println!();
    println!("License: MIT");
}
