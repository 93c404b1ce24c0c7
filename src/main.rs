//! pluginskel CLI
//!
//! Usage:
//!   pluginskel [OPTIONS] <RECIPE>
//!
//! Options:
//!   -t, --target-dir <DIR>   Where to write the plugin (default: its install path)
//!       --templates <DIR>    Directory of templates overriding the built-in ones
//!       --force              Overwrite existing files
//!       --dry-run            Print the generated files instead of writing them
//!       --list-variables     List the variables each template needs
//!   -v, --verbose            More log output (repeatable)
//!   -h, --help               Print help

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{info, LevelFilter};

use pluginskel::recipe::Recipe;
use pluginskel::skel::{VariableKind, VariableSpec};
use pluginskel::{template_variables, write_files, GenerateError, GeneratorConfig, Manager};

#[derive(Parser)]
#[command(name = "pluginskel")]
#[command(about = "Generate Moodle plugin skeletons from a recipe")]
struct Cli {
    /// Recipe file (TOML format)
    #[arg(required_unless_present = "list_variables")]
    recipe: Option<PathBuf>,

    /// Target directory (defaults to the plugin's install path)
    #[arg(short, long)]
    target_dir: Option<PathBuf>,

    /// Directory of *.mustache files overriding the built-in templates
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Overwrite files that already exist
    #[arg(long)]
    force: bool,

    /// Print generated files to stdout instead of writing them
    #[arg(long)]
    dry_run: bool,

    /// List the variables each template needs and exit
    #[arg(long)]
    list_variables: bool,

    /// Plugin type used with --list-variables
    #[arg(long, requires = "list_variables")]
    plugin_type: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_variables {
        print_variables(cli.plugin_type.as_deref());
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e.report());
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<(), GenerateError> {
    let Some(recipe_path) = &cli.recipe else {
        return Ok(());
    };

    let recipe = Recipe::from_file(recipe_path)?;
    let mut config = GeneratorConfig::new();
    if let Some(dir) = &cli.templates {
        config = config.with_templates_dir(dir);
    }

    let target = cli
        .target_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(recipe.install_path()));
    let manager = Manager::new(recipe, config.registry()?);
    let files = manager.generate()?;

    if cli.dry_run {
        for file in &files {
            println!("==> {} <==", target.join(&file.path).display());
            println!("{}", file.content);
        }
        return Ok(());
    }

    write_files(&target, &files, cli.force)?;
    info!("{} files written to {}", files.len(), target.display());
    Ok(())
}

fn print_variables(plugin_type: Option<&str>) {
    for (kind, vars) in template_variables(plugin_type) {
        println!("{}:", kind);
        for (name, spec) in vars {
            println!("  {:<20} {}", name, describe(&spec));
        }
        println!();
    }
}

fn describe(spec: &VariableSpec) -> String {
    let kind = match spec.kind {
        VariableKind::Text => "text",
        VariableKind::Integer => "integer",
        VariableKind::List => "list",
        VariableKind::Table => "table",
    };
    let required = if spec.required { "required" } else { "optional" };
    format!("{} ({}, {})", spec.description, kind, required)
}
