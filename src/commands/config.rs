use anyhow::{Context as _, Result, bail};
use std::fs;
use std::path::PathBuf;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{AppConfig, default_toml};
use crate::{paths, ui};

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
        ConfigCommand::Init { force } => init(ctx, force),
    }
}

fn config_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.config {
        Some(path) => Ok(path.clone()),
        None => paths::config_file(),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let path = config_path(ctx)?;
    let config = AppConfig::load(Some(&path))?;

    if !ctx.quiet {
        let source = if path.exists() {
            path.display().to_string()
        } else {
            format!("{} (not found, using defaults)", path.display())
        };
        ui::kv("Config file", &source);
        println!();
    }

    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    println!("{}", config_path(ctx)?.display());
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = config_path(ctx)?;
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    fs::write(&path, default_toml())
        .with_context(|| format!("Could not write {}", path.display()))?;

    if !ctx.quiet {
        ui::success(&format!("Wrote {}", path.display()));
        ui::dim("Set [network] tags and [cluster] name, then run 'fargate-otel synth'");
    }
    Ok(())
}
