mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use restamp_core::{EraseMode, LabelPolicy, Profile, RewriteOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "restamp",
    version,
    about = "Rewrite the labeled header fields of lab-report PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite header fields in one or more PDFs
    Process {
        /// Input PDF file(s)
        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// Student name
        #[arg(long)]
        name: Option<String>,

        /// Roll number
        #[arg(long)]
        roll: Option<String>,

        /// Class / year / branch
        #[arg(long)]
        class: Option<String>,

        /// Division / section / batch
        #[arg(long)]
        division: Option<String>,

        /// Registration number / PRN
        #[arg(long)]
        registration: Option<String>,

        /// Activity / experiment title
        #[arg(long)]
        activity: Option<String>,

        /// How matched lines are cleared before redrawing
        #[arg(long, value_enum, default_value_t = EraseArg::Redact)]
        erase: EraseArg,

        /// Which label text the rewritten lines carry
        #[arg(long, value_enum, default_value_t = LabelArg::Echo)]
        labels: LabelArg,

        /// Package the output as a zip even for a single input
        #[arg(long)]
        zip: bool,

        /// Output path (default: processed_<name>.pdf, or processed.zip)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Show the header-band text layout of a PDF
    Inspect {
        /// Path to PDF file
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Header band depth from the page top, in points
        #[arg(long, default_value_t = 300.0)]
        band: f32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EraseArg {
    /// Remove the original text operations from the content stream
    Redact,
    /// Paint a white rectangle over the original line
    Paint,
}

#[derive(Clone, Copy, ValueEnum)]
enum LabelArg {
    /// Keep the label exactly as it appears in the document
    Echo,
    /// Replace the label with the canonical one for the field
    Canonical,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input_files,
            name,
            roll,
            class,
            division,
            registration,
            activity,
            erase,
            labels,
            zip,
            out,
        } => {
            let profile = Profile {
                name,
                roll_number: roll,
                class_name: class,
                division,
                registration_id: registration,
                activity_title: activity,
            };
            let options = RewriteOptions {
                erase_mode: match erase {
                    EraseArg::Redact => EraseMode::Redact,
                    EraseArg::Paint => EraseMode::PaintOver,
                },
                label_policy: match labels {
                    LabelArg::Echo => LabelPolicy::EchoSource,
                    LabelArg::Canonical => LabelPolicy::Canonical,
                },
                ..RewriteOptions::default()
            };
            commands::process::run(input_files, profile, options, zip, out)
        }
        Commands::Inspect {
            input_file,
            output,
            band,
        } => commands::inspect::run(input_file, &output, band),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
