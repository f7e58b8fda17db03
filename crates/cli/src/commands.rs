use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Transform the cells of a CSV, TSV or Excel file with a prompt
    Run {
        #[arg(long, help = "Input file (.csv, .tsv, .xlsx or .xlsm)")]
        input: PathBuf,

        #[arg(
            long,
            required = true,
            value_delimiter = ',',
            help = "Columns whose cells are rewritten"
        )]
        targets: Vec<String>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Columns passed along as context for each cell"
        )]
        context: Vec<String>,

        #[arg(
            long,
            conflicts_with = "template",
            required_unless_present = "template",
            help = "Instruction for each cell; may reference {cell} and {context}"
        )]
        prompt: Option<String>,

        #[arg(long, help = "Use a named template from settings instead of --prompt")]
        template: Option<String>,

        #[arg(long, help = "Overrides the configured system prompt")]
        system_prompt: Option<String>,

        #[arg(long, requires = "end", help = "First row to process (0-based)")]
        start: Option<usize>,

        #[arg(long, requires = "start", help = "Last row to process (inclusive)")]
        end: Option<usize>,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<PathBuf>,
    },
    /// Run a YAML workflow of prompt steps
    Workflow {
        #[arg(long, help = "Workflow file path")]
        config: PathBuf,

        #[arg(long, help = "Overrides the input file named in the workflow")]
        input: Option<PathBuf>,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<PathBuf>,
    },
    /// Show columns, fill rates and sample values of a file
    Inspect {
        #[arg(long, help = "Input file (.csv, .tsv, .xlsx or .xlsm)")]
        input: PathBuf,

        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },
    /// Check that the configured completion backend answers
    TestConn,
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the effective settings as JSON
    Show,
    /// Write the default settings file
    Init {
        #[arg(long, help = "Overwrite an existing settings file")]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum TemplatesCommand {
    List,
    Add {
        name: String,
        prompt: String,

        #[arg(long, help = "Replace a template with the same name")]
        force: bool,
    },
    Remove {
        name: String,
    },
}
