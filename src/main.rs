use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use docxide_format::server::UploadServer;
use docxide_format::{DEFAULT_TITLE, FormatOptions, HeadingScheme, format_docx, processed_file_name};

#[derive(Parser)]
#[command(name = "docxide-format")]
#[command(version)]
#[command(about = "Normalize academic DOCX manuscripts into the competition format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a manuscript file
    Format {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (default: 已排版_<name> next to the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Title shown in the page header
        #[arg(short, long, default_value = DEFAULT_TITLE)]
        title: String,

        /// Also recognize English headings and Figure/Table captions
        #[arg(long)]
        bilingual: bool,
    },

    /// Serve the upload form over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:5000")]
        addr: String,

        /// Also recognize English headings and Figure/Table captions
        #[arg(long)]
        bilingual: bool,
    },
}

fn scheme(bilingual: bool) -> HeadingScheme {
    if bilingual {
        HeadingScheme::Bilingual
    } else {
        HeadingScheme::Chinese
    }
}

fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manuscript.docx".to_string());
    input.with_file_name(processed_file_name(&name))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Format {
            input,
            output,
            title,
            bilingual,
        } => {
            let output = output.unwrap_or_else(|| default_output(&input));
            let options = FormatOptions {
                title,
                scheme: scheme(bilingual),
            };
            format_docx(&input, &output, &options).map(|report| {
                println!(
                    "{} -> {} ({} paragraphs, {} figures, {} tables)",
                    input.display(),
                    output.display(),
                    report.paragraphs,
                    report.figures,
                    report.tables,
                );
            })
        }
        Commands::Serve { addr, bilingual } => {
            UploadServer::bind(&addr, scheme(bilingual)).and_then(|server| server.run())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
