mod cli;

use azsynth::hcl_documents::HclDocuments;
use azsynth::infra_document::InfraDocument;
use azsynth::resource::catalog::Catalog;
use serde::Serialize;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("AZSYNTH_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Synthesize(synth_cli) => synthesize(synth_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn synthesize(cli: cli::SynthesizeCommand) -> anyhow::Result<()> {
    let documents = load(&cli.input)?;
    let catalog = Catalog::builtin();
    let tree = InfraDocument::new(&documents, &catalog)?.into_tree();

    let document = azsynth::synth::synthesize(&tree)?;

    match &cli.unit {
        Some(unit) => {
            let template = document
                .get(unit)
                .ok_or_else(|| anyhow::anyhow!("No deployable unit `{unit}`"))?;
            output(&cli.output, template)
        }
        None => output(&cli.output, &document),
    }
}

fn load(input: &cli::InputArgs) -> anyhow::Result<HclDocuments> {
    let mut documents = HclDocuments::default();

    if !input.workdir && input.files.is_empty() && input.directories.is_empty() {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        documents.load_str(&stdin, None)?;
        return Ok(documents);
    }

    if input.workdir {
        documents.load_directory(&std::env::current_dir()?)?;
    }

    for file_path in &input.files {
        documents.load_file(file_path)?;
    }

    for dir_path in &input.directories {
        documents.load_directory(dir_path)?;
    }

    anyhow::ensure!(documents.source_count() > 0, "No files loaded");

    Ok(documents)
}

fn output(output: &cli::OutputArgs, value: &impl Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}

/// developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand;

    let catalog = Catalog::builtin();
    if let DevSubCommand::Catalog = cli.command {
        for key in catalog.keys() {
            let type_name = catalog.get(key).map(|schema| schema.type_name().to_string());
            println!("{key:<24} {}", type_name.unwrap_or_default());
        }
        return Ok(());
    }

    let documents = load(&cli.input)?;
    match cli.command {
        DevSubCommand::Documents => println!("{documents:#?}"),
        DevSubCommand::Tree => {
            let tree = InfraDocument::new(&documents, &catalog)?.into_tree();
            for node in tree.descendants() {
                let capabilities: Vec<String> = tree
                    .node(node)
                    .capabilities()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!(
                    "{:<40} {} [{}]",
                    tree.path(node).to_string(),
                    tree.node(node).kind(),
                    capabilities.join(", ")
                );
            }
        }
        DevSubCommand::Catalog => {}
    }

    Ok(())
}
