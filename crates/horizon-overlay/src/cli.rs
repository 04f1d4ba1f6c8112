//! Command-line interface for merging and rendering dashboard settings.

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use horizon_overlay_config::contrib::{ContribSettings, contrib_overlay};
use horizon_overlay_config::{
    ApplyReport, LayeredNamespaceOptions, Namespace, OverlayLayer, SecretPolicy, Settings,
};
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable holding the dashboard database password.
pub const DB_PASSWORD_ENV: &str = "HORIZON_DB_PASSWORD";
/// Environment variable holding the keystone admin token.
pub const ADMIN_TOKEN_ENV: &str = "HORIZON_ADMIN_TOKEN";
/// Environment variable holding the horizon service user password.
pub const SERVICE_PASSWORD_ENV: &str = "HORIZON_SERVICE_PASSWORD";

/// Command-line options for the overlay tool.
#[derive(Debug, Parser)]
#[command(name = "horizon-overlay", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge overlays and print the redacted settings as JSON
    Render {
        #[command(flatten)]
        inputs: MergeArgs,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Merge overlays and print a one-line summary
    Check {
        #[command(flatten)]
        inputs: MergeArgs,
    },
}

/// Inputs shared by every subcommand.
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Base settings namespace (JSON5 object)
    #[arg(long)]
    pub base: PathBuf,
    /// Overlay file applied after discovered layers; repeatable
    #[arg(long = "overlay")]
    pub overlays: Vec<PathBuf>,
    /// Locked settings (JSON5 object)
    #[arg(long)]
    pub requirements: Option<PathBuf>,
    /// Controller host; applies the contrib overlay when set
    #[arg(long)]
    pub contrib_host: Option<String>,
    /// Skip system, user, and cwd layer discovery
    #[arg(long)]
    pub no_layers: bool,
}

/// Result of a merge: frozen settings plus layer metadata.
#[derive(Debug)]
pub struct Merged {
    pub settings: Settings,
    pub layers: Vec<OverlayLayer>,
    pub report: ApplyReport,
}

/// Load the base namespace, apply the requirements, the contrib overlay, and
/// every file layer, and freeze the result.
///
/// `env` resolves credential variables for the contrib overlay.
pub fn merge<F>(args: &MergeArgs, cwd: &Path, env: F) -> anyhow::Result<Merged>
where
    F: Fn(&str) -> Option<String>,
{
    let namespace = Namespace::load_from_path(&args.base)
        .with_context(|| format!("failed to load base namespace {}", args.base.display()))?;

    let mut options = if args.no_layers {
        LayeredNamespaceOptions::isolated(cwd)
    } else {
        LayeredNamespaceOptions::new(cwd)
    };
    if let Some(requirements) = args.requirements.as_ref() {
        options = options.with_requirements_path(requirements);
    }
    for overlay in &args.overlays {
        options = options.with_runtime_path(overlay);
    }
    if let Some(host) = args.contrib_host.as_deref() {
        let contrib = contrib_settings(host, &env)?;
        info!("applying contrib overlay (host={host})");
        options = options.with_builtin_overlay(contrib_overlay(&contrib));
    }

    let layered = namespace
        .load_layered_with_options(options)
        .context("failed to apply overlay layers")?;
    debug!("merge finished (layers={})", layered.layers.len());
    Ok(Merged {
        settings: layered.namespace.freeze(),
        layers: layered.layers,
        report: layered.report,
    })
}

fn contrib_settings<F>(host: &str, env: &F) -> anyhow::Result<ContribSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |name: &str| {
        env(name).ok_or_else(|| anyhow!("{name} is required to apply the contrib overlay"))
    };
    Ok(ContribSettings::new(
        host,
        require(DB_PASSWORD_ENV)?,
        require(ADMIN_TOKEN_ENV)?,
        require(SERVICE_PASSWORD_ENV)?,
    ))
}

/// Execute a parsed command, writing its output to `out`.
pub fn run<W, F>(cli: Cli, cwd: &Path, out: &mut W, env: F) -> anyhow::Result<()>
where
    W: Write,
    F: Fn(&str) -> Option<String>,
{
    match cli.command {
        Command::Render { inputs, pretty } => {
            let merged = merge(&inputs, cwd, env)?;
            let rendered = merged.settings.to_redacted_value(&SecretPolicy::default());
            let text = if pretty {
                serde_json::to_string_pretty(&rendered)?
            } else {
                serde_json::to_string(&rendered)?
            };
            writeln!(out, "{text}")?;
        }
        Command::Check { inputs } => {
            let merged = merge(&inputs, cwd, env)?;
            writeln!(
                out,
                "ok: {} settings, {} layers, {} operations applied, {} skipped",
                merged.settings.len(),
                merged.layers.len(),
                merged.report.applied,
                merged.report.skipped
            )?;
        }
    }
    Ok(())
}
