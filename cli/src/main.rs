use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vdb_core::serialize_descriptor;
use vdb_packager::{
    DependencyArtifact, PackagerConfig, StaticBuildContext, merge_descriptor, package_vdb,
    read_embedded_descriptor,
};

const DEFAULT_CONFIG_FILE: &str = "vdb-package.yaml";

/// Output format for `inspect`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Xml,
}

#[derive(Debug, Parser)]
#[command(name = "vdb-package")]
#[command(about = "Package virtual database projects into .vdb archives")]
#[command(version)]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge imports, gather resources and write the .vdb archive.
    Package(PackageArgs),
    /// Merge imported VDBs into a descriptor without archiving.
    Merge(MergeArgs),
    /// Print the descriptor embedded in a .vdb archive.
    Inspect(InspectArgs),
    /// Write a configuration file with every default spelled out.
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
struct PackageArgs {
    /// Configuration file (default: vdb-package.yaml in the base directory, if present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Project directory that relative configured paths resolve against.
    #[arg(long)]
    base: Option<PathBuf>,
    /// Descriptor path, tried before searching the resource folder.
    #[arg(long)]
    descriptor: Option<PathBuf>,
    /// Primary resource folder.
    #[arg(long)]
    resources: Option<PathBuf>,
    /// Compiled-output folder.
    #[arg(long)]
    compiled: Option<PathBuf>,
    /// Output folder for the archive and intermediate files.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Archive base name.
    #[arg(long)]
    final_name: Option<String>,
    /// Dependency artifact as ID=PATH; repeat in scan order.
    #[arg(long = "dependency", value_name = "ID=PATH")]
    dependencies: Vec<String>,
    /// Classpath entry; repeatable.
    #[arg(long = "classpath", value_name = "PATH")]
    classpath: Vec<PathBuf>,
    /// Extra file or folder archived at the root; repeatable.
    #[arg(long = "include", value_name = "PATH")]
    includes: Vec<PathBuf>,
    /// Archive classpath files under lib/.
    #[arg(long)]
    include_libraries: bool,
}

#[derive(Debug, Args)]
struct MergeArgs {
    /// Descriptor to merge into.
    #[arg(long)]
    descriptor: PathBuf,
    /// Dependency artifact as ID=PATH; repeat in scan order.
    #[arg(long = "dependency", value_name = "ID=PATH")]
    dependencies: Vec<String>,
    /// Folder dependency archives are unpacked into.
    #[arg(long, default_value = "target/vdb-imports")]
    scratch: PathBuf,
    /// Write the merged descriptor here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Archive to read.
    archive: PathBuf,
    /// Output format.
    #[arg(long, default_value = "xml")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct InitConfigArgs {
    /// Where to write the configuration.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Package(args) => run_package(args),
        Command::Merge(args) => run_merge(args),
        Command::Inspect(args) => run_inspect(args),
        Command::InitConfig(args) => run_init_config(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_package(args: PackageArgs) -> Result<(), String> {
    let config = build_config(&args)?;
    let ctx = StaticBuildContext {
        dependencies: parse_dependencies(&args.dependencies),
        classpath: args.classpath,
    };

    let outcome = package_vdb(&config, &ctx).map_err(|e| e.to_string())?;

    for merged in &outcome.merged {
        println!(
            "Merged {}@{} from '{}' ({} model(s)).",
            merged.import.name,
            merged.import.version,
            merged.artifact_id,
            merged.models.len()
        );
    }
    println!(
        "Packaged {} entr{} into '{}'.",
        outcome.entries.len(),
        if outcome.entries.len() == 1 { "y" } else { "ies" },
        outcome.archive.display()
    );

    let unresolved = outcome.unresolved_imports();
    if !unresolved.is_empty() {
        let names: Vec<String> = unresolved
            .iter()
            .map(|i| format!("{}@{}", i.name, i.version))
            .collect();
        eprintln!(
            "{} import(s) not satisfied by any dependency: {}",
            unresolved.len(),
            names.join(", ")
        );
    }

    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<(), String> {
    let dependencies = parse_dependencies(&args.dependencies);
    let resolution = merge_descriptor(&args.descriptor, &dependencies, &args.scratch)
        .map_err(|e| e.to_string())?;
    let raw = serialize_descriptor(&resolution.descriptor)
        .map_err(|err| format!("Failed to serialize merged descriptor: {err}"))?;

    match args.output {
        Some(path) => {
            create_parent_dir(&path)?;
            fs::write(&path, raw)
                .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
            println!(
                "Merged {} import(s) into '{}'.",
                resolution.merged.len(),
                path.display()
            );
        }
        None => print!("{}", String::from_utf8_lossy(&raw)),
    }

    for import in resolution.unresolved() {
        eprintln!(
            "Import {}@{} not satisfied by any dependency.",
            import.name, import.version
        );
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let embedded = read_embedded_descriptor(&args.archive).map_err(|e| e.to_string())?;
    let raw = match args.format {
        CliOutputFormat::Json => embedded.to_json(),
        CliOutputFormat::Xml => embedded.to_text(),
    }
    .map_err(|e| e.to_string())?;
    println!("{}", raw.trim_end());
    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<(), String> {
    if args.path.exists() && !args.force {
        return Err(format!(
            "'{}' already exists; pass --force to overwrite",
            args.path.display()
        ));
    }
    create_parent_dir(&args.path)?;
    PackagerConfig::default()
        .save(&args.path)
        .map_err(|e| e.to_string())?;
    println!("Wrote default configuration to '{}'.", args.path.display());
    Ok(())
}

/// Layers command-line overrides on the configuration file, then resolves
/// relative paths against the base directory.
fn build_config(args: &PackageArgs) -> Result<PackagerConfig, String> {
    let base = args.base.clone().unwrap_or_else(|| PathBuf::from("."));
    let config_path = args
        .config
        .clone()
        .or_else(|| Some(base.join(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()));

    let mut config = match &config_path {
        Some(path) => PackagerConfig::load(path).map_err(|e| e.to_string())?,
        None => PackagerConfig::default(),
    };

    if let Some(descriptor) = &args.descriptor {
        config.descriptor = descriptor.clone();
    }
    if let Some(resources) = &args.resources {
        config.resource_dir = resources.clone();
    }
    if let Some(compiled) = &args.compiled {
        config.compiled_dir = compiled.clone();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(final_name) = &args.final_name {
        config.final_name = final_name.clone();
    }
    config.includes.extend(args.includes.iter().cloned());
    config.include_libraries |= args.include_libraries;

    Ok(config.resolve_against(&base))
}

fn parse_dependencies(raw: &[String]) -> Vec<DependencyArtifact> {
    raw.iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(DependencyArtifact::parse)
        .collect()
}

fn create_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    Ok(())
}
