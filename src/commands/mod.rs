pub mod config;
pub mod show;
pub mod synth;
pub mod validate;

use anyhow::{Context as _, Result};

use crate::Context;
use crate::config::AppConfig;
use crate::stack::{Composition, compose};

/// Load and check the configuration, then compose the stack
///
/// Composition errors carry their category and advice as context.
pub(crate) fn compose_from_config(ctx: &Context, strict: bool) -> Result<(AppConfig, Composition)> {
    let config = AppConfig::load(ctx.config.as_deref())?;
    config.validate().context("Invalid configuration file")?;

    let inputs = config.stack_inputs(strict)?;
    let composition = compose(&inputs, &config.lookup()).map_err(|e| {
        let category = e.category();
        anyhow::Error::new(e).context(format!("{}. {}", category.description(), category.advice()))
    })?;
    Ok((config, composition))
}
