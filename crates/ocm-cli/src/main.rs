//! `ocm-construct`: a CLI front-end for the construction engine, backed by a
//! filesystem "common transport format" target repository.

mod config;
mod credentials;
mod ctf;
mod input_methods;
mod telemetry;

use std::sync::Arc;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use ocm_construct::ConstructOptions;

use config::Config;
use credentials::EnvCredentialProvider;
use ctf::FilesystemCtf;
use input_methods::{FileInputMethod, Utf8InputMethod};

#[derive(Parser, Debug)]
#[command(name = "ocm-construct", version, about = "Builds OCM component versions from a constructor document")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every component in a constructor document into the target repository.
    Construct {
        /// Path to the constructor document (YAML or JSON).
        constructor: camino::Utf8PathBuf,
        /// Directory holding `base.yml` and `<profile>.yml` configuration layers.
        #[arg(long, default_value = "config")]
        config_dir: camino::Utf8PathBuf,
        /// Selects the `<profile>.yml` overlay.
        #[arg(long, env = "OCM_PROFILE", default_value = "dev")]
        profile: String,
        /// After a successful build, export the target repository to this `.tar` path.
        #[arg(long)]
        export_tar: Option<camino::Utf8PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Construct {
            constructor,
            config_dir,
            profile,
            export_tar,
        } => run_construct(&constructor, &config_dir, &profile, export_tar.as_deref()).await,
    }
}

async fn run_construct(
    constructor_path: &Utf8Path,
    config_dir: &Utf8Path,
    profile: &str,
    export_tar: Option<&Utf8Path>,
) -> anyhow::Result<()> {
    let config = Config::load(config_dir, profile).map_err(|err| anyhow::anyhow!("loading configuration: {err}"))?;

    let document = fs_err::read_to_string(constructor_path)?;
    let constructor: ocm_spec::ComponentConstructor = serde_yaml::from_str(&document)
        .map_err(|err| anyhow::anyhow!("parsing constructor document `{constructor_path}`: {err}"))?;

    let target = Arc::new(FilesystemCtf::new(config.target_root.clone()));

    let options = ConstructOptions::builder(target.clone())
        .credentials(Arc::new(EnvCredentialProvider::new()))
        .resource_input_method(Arc::new(Utf8InputMethod))
        .resource_input_method(Arc::new(FileInputMethod))
        .source_input_method(Arc::new(Utf8InputMethod))
        .source_input_method(Arc::new(FileInputMethod))
        .concurrency_limit(config.concurrency_limit)
        .conflict_policy(config.conflict_policy.into())
        .external_copy_policy(config.external_copy_policy.into())
        .build();

    let descriptors = ocm_construct::construct(constructor, options).await?;
    tracing::info!(count = descriptors.len(), "construction finished");
    for descriptor in &descriptors {
        println!("{}:{}", descriptor.name, descriptor.version);
    }

    if let Some(destination) = export_tar {
        target.export_tar(destination)?;
        tracing::info!(%destination, "exported target repository");
    }

    Ok(())
}
