//! Flex CLI
//!
//! Command-line tool for running Flex codex commands against a directory of
//! csv-backed workbooks.

use clap::{Parser, Subcommand, ValueEnum};
use flex_core::{
    a1, list_all_tables, on_edit, run as run_command, verify_tags, CatalogKind, CellValue, Command,
    DocumentStore, EditEvent, FlexConfig, FsStore, MemoryProperties, Session, Ui,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const PROPERTIES_FILE: &str = ".flex-properties.json";
const CONFIG_FILE: &str = "flex.json";

#[derive(Parser)]
#[command(name = "flex")]
#[command(about = "Flex character sheet codex tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding one sub-directory per workbook
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Settings file (defaults to <root>/flex.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Powers,
    MagicItems,
}

impl From<KindArg> for CatalogKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Powers => CatalogKind::Powers,
            KindArg::MagicItems => CatalogKind::MagicItems,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a sheet's row and column tags are unique
    VerifyTags {
        /// Workbook id
        #[arg(short, long)]
        document: String,

        #[arg(short, long)]
        sheet: String,
    },

    /// List every table available to a character, DB and custom
    ListTables {
        /// Workbook id of the character (or the Codex itself)
        #[arg(short, long)]
        active: String,

        #[arg(short, long, value_enum, default_value = "powers")]
        kind: KindArg,
    },

    /// Run a named command, as a menu entry would
    Run {
        /// Command name (see `flex commands`)
        name: String,

        /// Workbook id the command acts on
        #[arg(short, long)]
        active: String,

        /// Sheet the command acts on, for commands that need one
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Simulate a single-cell edit on a character's Game sheet
    Edit {
        #[arg(short, long)]
        active: String,

        /// Sheet name
        #[arg(short, long, default_value = "Game")]
        sheet: String,

        /// 0-based row
        #[arg(long)]
        row: usize,

        /// 0-based column
        #[arg(long)]
        col: usize,

        /// New cell value; empty clears
        #[arg(default_value = "")]
        value: String,
    },

    /// Resolve a (version, abbreviation) pair to a workbook id
    Resolve {
        version: String,
        abbreviation: String,

        /// Workbook id linked to the Codex
        #[arg(short, long)]
        active: String,
    },

    /// Print a sheet
    Show {
        #[arg(short, long)]
        document: String,

        #[arg(short, long)]
        sheet: String,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List every command name
    Commands,
}

/// Alerts and toasts on stdout, prompts read from stdin; end of input cancels
struct TerminalUi;

impl Ui for TerminalUi {
    fn alert(&mut self, title: &str, message: &str) {
        println!("{}", title);
        println!("{}", message);
        println!();
    }

    fn toast(&mut self, message: &str, title: &str) {
        if title.is_empty() {
            println!("{}", message);
        } else {
            println!("[{}] {}", title, message);
        }
    }

    fn prompt(&mut self, title: &str, message: &str) -> Option<String> {
        println!("{}", title);
        print!("{}\n> ", message);
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FLEX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> flex_core::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(|| cli.root.join(CONFIG_FILE));
    let config = FlexConfig::load_or_default(&config_path)?;

    match cli.command {
        Commands::VerifyTags { document, sheet } => cmd_verify_tags(&cli.root, &document, &sheet),
        Commands::ListTables { active, kind } => cmd_list_tables(&cli.root, &config, &active, kind.into()),
        Commands::Run { name, active, sheet } => cmd_run(&cli.root, &config, &name, &active, sheet),
        Commands::Edit {
            active,
            sheet,
            row,
            col,
            value,
        } => cmd_edit(&cli.root, &config, &active, &sheet, row, col, &value),
        Commands::Resolve {
            version,
            abbreviation,
            active,
        } => cmd_resolve(&cli.root, &config, &version, &abbreviation, &active),
        Commands::Show { document, sheet, limit } => cmd_show(&cli.root, &document, &sheet, limit),
        Commands::Commands => {
            cmd_commands();
            Ok(())
        }
    }
}

fn cmd_verify_tags(root: &Path, document: &str, sheet: &str) -> flex_core::Result<()> {
    let store = FsStore::load(root)?;
    let grid = store.open(document)?.require_sheet(sheet)?.grid();
    verify_tags(grid)?;
    println!("All column and row tags in \"{}\" are unique.", sheet);
    Ok(())
}

fn cmd_list_tables(root: &Path, config: &FlexConfig, active: &str, kind: CatalogKind) -> flex_core::Result<()> {
    let mut store = FsStore::load(root)?;
    let mut properties = load_properties(root)?;
    let mut ui = TerminalUi;
    let listing = {
        let mut session = Session::new(&mut store, &mut properties, &mut ui, config, active);
        list_all_tables(&mut session, kind)?
    };
    properties.save(root.join(PROPERTIES_FILE))?;

    println!("Tables ({}):", listing.tables.len());
    println!();
    for table in &listing.tables {
        println!("  {}\t{}", table.table_name, table.source);
    }
    if !listing.warnings.is_empty() {
        println!();
        println!("Skipped sources:");
        for warning in &listing.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}

fn cmd_run(
    root: &Path,
    config: &FlexConfig,
    name: &str,
    active: &str,
    sheet: Option<String>,
) -> flex_core::Result<()> {
    let mut store = FsStore::load(root)?;
    let mut properties = load_properties(root)?;
    let mut ui = TerminalUi;

    let succeeded = {
        let mut session = Session::new(&mut store, &mut properties, &mut ui, config, active);
        session.set_active_sheet(sheet);
        run_command(&mut session, name)
    };

    store.save()?;
    properties.save(root.join(PROPERTIES_FILE))?;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_edit(
    root: &Path,
    config: &FlexConfig,
    active: &str,
    sheet: &str,
    row: usize,
    col: usize,
    value: &str,
) -> flex_core::Result<()> {
    let mut store = FsStore::load(root)?;
    let mut properties = load_properties(root)?;
    let mut ui = TerminalUi;

    let outcome = {
        let mut session = Session::new(&mut store, &mut properties, &mut ui, config, active);
        let event = EditEvent::new(sheet, row, col, CellValue::stored(value));
        session.edit_sheet(active, sheet, |s| {
            s.set_value(row, col, event.value.clone());
            Ok(())
        })?;
        on_edit(&mut session, &event)?
    };

    store.save()?;
    properties.save(root.join(PROPERTIES_FILE))?;
    println!("{} {}: {:?}", sheet, a1(row, col), outcome);
    Ok(())
}

fn cmd_resolve(
    root: &Path,
    config: &FlexConfig,
    version: &str,
    abbreviation: &str,
    active: &str,
) -> flex_core::Result<()> {
    let mut store = FsStore::load(root)?;
    let mut properties = load_properties(root)?;
    let mut ui = TerminalUi;

    let id = {
        let mut session = Session::new(&mut store, &mut properties, &mut ui, config, active);
        session.resolve_document_id(version, abbreviation)?
    };
    properties.save(root.join(PROPERTIES_FILE))?;
    println!("{}", id);
    Ok(())
}

fn cmd_show(root: &Path, document: &str, sheet: &str, limit: Option<usize>) -> flex_core::Result<()> {
    let store = FsStore::load(root)?;
    let grid = store.open(document)?.require_sheet(sheet)?.grid();

    let row_limit = limit.unwrap_or(grid.row_count());
    for row in grid.rows().take(row_limit) {
        let values: Vec<String> = row.iter().map(CellValue::to_string_value).collect();
        println!("{}", values.join("\t"));
    }

    if grid.row_count() > row_limit {
        println!("... ({} more rows)", grid.row_count() - row_limit);
    }
    Ok(())
}

fn cmd_commands() {
    for command in Command::ALL {
        println!("  {:<28} {}", command.name(), command.summary());
    }
}

fn load_properties(root: &Path) -> flex_core::Result<MemoryProperties> {
    MemoryProperties::load(root.join(PROPERTIES_FILE))
}
