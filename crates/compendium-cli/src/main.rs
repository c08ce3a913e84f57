//! Compendium CLI
//!
//! Command-line tool for scanning content trees and building compendiums.

use clap::{Parser, Subcommand};
use compendium_core::{
    build_compendiums, build_group, compendium_file_name, fix_bestiary_spells, merge_files,
    parse_xml, scan_content, BasetypeFormat, BuildConfig, Compendium, ExclusionTag, Includes,
    MergeOptions, MergeStrategy, SpellFixOptions, SubtypeFormat,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compendium")]
#[command(about = "Tabletop content compendium builder", long_about = None)]
#[command(version)]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a content root and summarize its groups
    Scan {
        /// Content root directory
        #[arg(short, long)]
        root: PathBuf,
    },

    /// List all discovered groups
    ListGroups {
        /// Content root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Show member files for each group
        #[arg(short, long)]
        verbose: bool,
    },

    /// Build every group compendium and the aggregate
    Build {
        /// Build configuration file (JSON); flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Content root directory
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Merged base class output (complete, none)
        #[arg(long)]
        basetype_format: Option<BasetypeFormat>,

        /// Subclass output (usable, reference, none)
        #[arg(long)]
        subtype_format: Option<SubtypeFormat>,

        /// Exclusion tags (UA, modern, homebrew, pseudo, inlined)
        #[arg(short = 'x', long, value_delimiter = ',')]
        exclude: Vec<ExclusionTag>,

        /// Groups to include (`*` for all)
        #[arg(short, long, value_delimiter = ',')]
        include: Vec<String>,

        /// Aggregate compendium name
        #[arg(short, long)]
        name: Option<String>,

        /// Build only this group, without the aggregate
        #[arg(short, long)]
        group: Option<String>,

        /// Skip groups with malformed documents
        #[arg(long)]
        skip_invalid: bool,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Merge specific files into one compendium
    Merge {
        /// Files to merge, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Merge strategy (pruned, concatenate, templated)
        #[arg(short, long, default_value = "templated")]
        strategy: MergeStrategy,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Merged base class output (complete, none)
        #[arg(long, default_value = "complete")]
        basetype_format: BasetypeFormat,

        /// Subclass output (usable, reference, none)
        #[arg(long, default_value = "usable")]
        subtype_format: SubtypeFormat,

        /// Exclusion tags (UA, modern, homebrew, pseudo, inlined)
        #[arg(short = 'x', long, value_delimiter = ',')]
        exclude: Vec<ExclusionTag>,
    },

    /// Parse and summarize a single document
    Parse {
        /// Path to XML file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Fix monster spell names against the spell lists
    FixSpells {
        /// Content root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Also fix homebrew monsters using official and homebrew spells
        #[arg(long)]
        homebrew: bool,

        /// Do not write fixed files
        #[arg(long)]
        dry_run: bool,

        /// List the sources used
        #[arg(short, long)]
        verbose: bool,
    },

    /// Create a build configuration template
    CreateConfig {
        /// Output path for the configuration file
        #[arg(short, long)]
        output: PathBuf,

        /// Content root to record
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Output directory to record
        #[arg(long, default_value = "Compendiums")]
        output_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> compendium_core::Result<()> {
    match command {
        Commands::Scan { root } => cmd_scan(&root),
        Commands::ListGroups { root, verbose } => cmd_list_groups(&root, verbose),
        Commands::Build {
            config,
            root,
            output,
            basetype_format,
            subtype_format,
            exclude,
            include,
            name,
            group,
            skip_invalid,
            report,
        } => {
            let mut build_config = match config {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading build config");
                    BuildConfig::load(path)?
                }
                None => BuildConfig::default(),
            };
            if let Some(root) = root {
                build_config.content_root = root;
            }
            if let Some(output) = output {
                build_config.output_dir = output;
            }
            if let Some(format) = basetype_format {
                build_config.merge.basetype_format = format;
            }
            if let Some(format) = subtype_format {
                build_config.merge.subtype_format = format;
            }
            for tag in exclude {
                build_config.merge.excludes.insert(tag);
            }
            if !include.is_empty() {
                build_config.includes = Includes::from_names(include);
            }
            if name.is_some() {
                build_config.name = name;
            }
            build_config.skip_invalid |= skip_invalid;

            match group {
                Some(group) => cmd_build_group(&build_config, &group),
                None => cmd_build(&build_config, report.as_deref()),
            }
        }
        Commands::Merge {
            files,
            strategy,
            output,
            basetype_format,
            subtype_format,
            exclude,
        } => {
            let options = MergeOptions {
                basetype_format,
                subtype_format,
                excludes: exclude.into_iter().collect(),
            };
            cmd_merge(&files, strategy, &output, &options)
        }
        Commands::Parse { file } => cmd_parse(&file),
        Commands::FixSpells {
            root,
            homebrew,
            dry_run,
            verbose,
        } => cmd_fix_spells(&root, homebrew, dry_run, verbose),
        Commands::CreateConfig {
            output,
            root,
            output_dir,
        } => cmd_create_config(&output, root, output_dir),
    }
}

fn cmd_scan(root: &Path) -> compendium_core::Result<()> {
    let result = scan_content(root, &Includes::All, &[])?;

    println!("Scanned {}", result.root.display());
    println!();
    println!(
        "Found {} files in {} groups",
        result.total_files,
        result.groups.len()
    );

    Ok(())
}

fn cmd_list_groups(root: &Path, verbose: bool) -> compendium_core::Result<()> {
    let result = scan_content(root, &Includes::All, &[])?;

    println!("Groups ({}):", result.groups.len());
    println!();

    for group in &result.groups {
        let kind = match group.kind {
            compendium_core::GroupKind::Category => "category",
            compendium_core::GroupKind::Class => "class",
        };
        if verbose {
            println!("{} [{}] ({} files)", group.name, kind, group.members.len());
            for member in &group.members {
                println!("  {}", member.display());
            }
            println!();
        } else {
            println!("  {} [{}] ({} files)", group.name, kind, group.members.len());
        }
    }

    Ok(())
}

fn cmd_build(config: &BuildConfig, report_path: Option<&Path>) -> compendium_core::Result<()> {
    let report = build_compendiums(config)?;

    for output in &report.outputs {
        output.diagnostics.log();
    }

    println!("Built {} compendium(s):", report.outputs.len());
    for output in &report.outputs {
        println!(
            "  {} ({} entries from {} sources, {} diagnostics)",
            output.path.display(),
            output.entries,
            output.sources,
            output.diagnostics.len()
        );
    }

    if !report.failures.is_empty() {
        println!("\nSkipped groups ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.group, failure.error);
        }
    }

    if let Some(path) = report_path {
        report.save(path)?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}

fn cmd_build_group(config: &BuildConfig, name: &str) -> compendium_core::Result<()> {
    let scan = scan_content(
        &config.content_root,
        &Includes::All,
        std::slice::from_ref(&config.output_dir),
    )?;
    let compendium = build_group(config, &scan, name)?;
    compendium.diagnostics.log();

    println!(
        "Built {} ({} entries from {} sources)",
        compendium_file_name(&compendium.name),
        compendium.entry_count(),
        compendium.sources.len()
    );

    Ok(())
}

fn cmd_merge(
    files: &[PathBuf],
    strategy: MergeStrategy,
    output: &Path,
    options: &MergeOptions,
) -> compendium_core::Result<()> {
    let name = output
        .file_stem()
        .map(|s| s.to_string_lossy().trim_end_matches(" Compendium").to_string())
        .unwrap_or_else(|| "Merged".to_string());

    let compendium: Compendium = merge_files(&name, files, strategy, options)?;
    compendium.diagnostics.log();
    compendium.write(output)?;

    println!(
        "Merged {} entries from {} files ({}) to {}",
        compendium.entry_count(),
        compendium.sources.len(),
        strategy,
        output.display()
    );

    Ok(())
}

fn cmd_parse(file: &Path) -> compendium_core::Result<()> {
    let document = parse_xml(file)?;

    println!("File: {}", file.display());
    println!("Root: {}", document.root.name);
    println!("Entries: {}", document.entry_count());
    println!();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in document.entries() {
        *counts.entry(entry.name.as_str()).or_default() += 1;
    }
    for (category, count) in &counts {
        println!("  {}: {}", category, count);
    }
    println!();

    // Print first 10 entries
    for entry in document.entries().iter().take(10) {
        println!(
            "{}\t{}",
            entry.name,
            compendium_core::index::identity(entry)
        );
    }

    if document.entry_count() > 10 {
        println!("... ({} more entries)", document.entry_count() - 10);
    }

    Ok(())
}

fn cmd_fix_spells(
    root: &Path,
    homebrew: bool,
    dry_run: bool,
    verbose: bool,
) -> compendium_core::Result<()> {
    let mut passes = vec![false];
    if homebrew {
        passes.push(true);
    }

    for homebrew in passes {
        let label = if homebrew { "homebrew" } else { "official" };
        let report = fix_bestiary_spells(root, &SpellFixOptions { homebrew, dry_run })?;

        println!("Fixing {} monsters", label);
        if verbose {
            println!("Using these spell sources:");
            for path in &report.spell_sources {
                println!("  {}", path.display());
            }
            println!("Fixing these bestiary sources:");
            for path in &report.bestiary_sources {
                println!("  {}", path.display());
            }
        }

        if !report.duplicate_spells.is_empty() {
            println!("Duplicate spells were found:");
            for name in &report.duplicate_spells {
                println!("  {}", name);
            }
        }

        for (path, fix) in &report.fixes {
            println!("  {} [{}]: {} -> {}", fix.monster, path.display(), fix.before, fix.after);
        }
        println!("{} list(s) fixed, {} file(s) written", report.fixes.len(), report.written.len());

        for (monster, spells) in &report.audit.duplicate_lists {
            println!("Monster with duplicate spells was found: {} ({})", monster, spells);
        }
        if !report.audit.unmatched.is_empty() {
            println!("Found monster spell(s) not in the spell lists:");
            for name in &report.audit.unmatched {
                println!("  {}", name);
            }
        }
        println!();
    }

    if dry_run {
        println!("Dry run, did not write results back to files");
    }

    Ok(())
}

fn cmd_create_config(output: &Path, root: PathBuf, output_dir: PathBuf) -> compendium_core::Result<()> {
    let mut config = BuildConfig {
        content_root: root,
        output_dir,
        ..Default::default()
    };
    config.merge.excludes.insert(ExclusionTag::Homebrew);

    config.save(output)?;
    println!("Created config file: {}", output.display());
    println!();
    println!("Edit the file to configure your build, then run:");
    println!("  compendium build --config {}", output.display());

    Ok(())
}
