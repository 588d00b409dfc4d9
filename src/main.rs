//  src/main.rs

use clap::Parser as ClapParser;
use miette::{IntoDiagnostic, Result, WrapErr};
use midtier::ast::Node;
use midtier::common::StateAllocator;
use midtier::emitter::{self, WriterOptions};
use midtier::semantics::break_continue::BreakContinueTransformer;
use midtier::semantics::validator::{self, ValidatorConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Validates a parse tree and lowers its break/continue statements.
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Rewrite break/continue into state machine fragments.
    #[arg(long)]
    lower: bool,
    /// First id handed out by the state allocator.
    #[arg(long, default_value_t = 0)]
    first_state: usize,
    /// Maximum nesting depth the validator descends into.
    #[arg(long, default_value_t = ValidatorConfig::default().max_depth)]
    max_depth: usize,
    /// Print the tree outline after each stage.
    #[arg(long)]
    dump: bool,
    /// Parse tree as JSON.
    input_file: PathBuf,
}

fn main() -> Result<()> {
    // 日志写到 stderr，由 RUST_LOG 控制
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run_pipeline(&cli)
}

fn run_pipeline(cli: &Cli) -> Result<()> {
    // --- STAGE 1: READING ---
    println!("1. Reading {}...", cli.input_file.display());
    let input_path = &cli.input_file;
    if !input_path.exists() {
        miette::bail!("Input file not found: {}", input_path.display());
    }
    let source = fs::read_to_string(input_path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", input_path.display()))?;
    let tree = Node::from_json(&source)
        .into_diagnostic()
        .wrap_err("input is not a parse tree")?;
    println!("   ✓ Read a {} tree.", tree.name());
    if cli.dump {
        dump("Input Tree", &tree, cli.max_depth)?;
    }

    // --- STAGE 2: VALIDATION ---
    println!("\n2. Validating parse tree...");
    let config = ValidatorConfig {
        max_depth: cli.max_depth,
    };
    validator::validate_with_config(&tree, config)?;
    println!("   ✓ Parse tree is well-formed.");
    if !cli.lower {
        println!("\n✅ Success! {} is valid.", input_path.display());
        return Ok(());
    }

    // --- STAGE 3: BREAK/CONTINUE LOWERING ---
    println!("\n3. Lowering break/continue statements...");
    let mut allocator = StateAllocator::starting_at(cli.first_state);
    let lowered = BreakContinueTransformer::new(&mut allocator).transform(tree);
    println!(
        "   ✓ Lowering complete, allocated states {}..{}.",
        cli.first_state,
        allocator.peek()
    );
    if cli.dump {
        dump("Lowered Tree", &lowered, cli.max_depth)?;
    }

    // --- STAGE 4: OUTPUT ---
    println!("\n4. Writing lowered tree...");
    let output_path = lowered_path(input_path)?;
    let json = serde_json::to_string_pretty(&lowered).into_diagnostic()?;
    fs::write(&output_path, json)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", output_path.display()))?;
    println!(
        "\n✅ Success! Lowered tree written to: {}",
        output_path.display()
    );

    Ok(())
}

fn dump(title: &str, tree: &Node, max_depth: usize) -> Result<()> {
    let options = WriterOptions {
        max_depth,
        ..WriterOptions::default()
    };
    let rendered = emitter::write_tree(tree, options).into_diagnostic()?;
    println!(
        "--- {} ---\n{}------------------------",
        title, rendered.text
    );
    Ok(())
}

/// `foo.json` -> `foo.lowered.json`, next to the input.
fn lowered_path(input: &Path) -> Result<PathBuf> {
    let file_stem = input
        .file_stem()
        .ok_or_else(|| miette::miette!("Invalid input file name"))?;
    let parent_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let mut name = file_stem.to_os_string();
    name.push(".lowered.json");
    Ok(parent_dir.join(name))
}
