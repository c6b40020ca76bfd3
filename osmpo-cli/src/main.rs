use std::process::ExitCode;

use clap::{Parser, Subcommand};
use osmpo_cli::{export::run_export_to_stdout, import::run_import_to_stdout, logging};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log per-entry details (unresolved references, skipped lines, dropped entries)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a PO catalog of the translatable tags of an OSM file.
    Export {
        /// The OSM XML file to read
        input: String,
        /// Language code whose existing `<key>:<lang>` tags fill msgstr
        lang: String,
        /// Rule file to use instead of the built-in rules
        #[arg(short, long)]
        rules: Option<String>,
    },

    /// Merge a translated PO catalog into an OSM file and print the result.
    Import {
        /// The OSM XML file to update
        input: String,
        /// The translated PO catalog
        catalog: String,
        /// Language code of the translation; tags are written as `<key>:<lang>`
        lang: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let result = match args.commands {
        Commands::Export { input, lang, rules } => {
            run_export_to_stdout(&input, &lang, rules.as_deref())
        }
        Commands::Import {
            input,
            catalog,
            lang,
        } => run_import_to_stdout(&input, &catalog, &lang),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
