use anyhow::{Context as _, Result};

use crate::Context;
use crate::cli::SynthArgs;
use crate::ui;

pub fn run(ctx: &Context, args: SynthArgs) -> Result<()> {
    let (_, composition) = super::compose_from_config(ctx, args.strict)?;
    let template = construct::synthesize(&composition.stack)?;

    let Some(out) = args.out else {
        // Template goes to stdout; diagnostics stay in the log on stderr
        println!("{}", template.to_json_pretty()?);
        return Ok(());
    };

    template
        .write_to(&out)
        .with_context(|| format!("Could not write template to {}", out.display()))?;

    if !ctx.quiet {
        ui::success(&format!(
            "Synthesized {} ({} resources) to {}",
            composition.stack.name,
            template.resources.len(),
            out.display()
        ));
        ui::kv("Fingerprint", &template.fingerprint);
        for key in &template.missing_lookups {
            ui::warn(&format!("Unresolved lookup {key}; placeholder values were used"));
        }
    }
    Ok(())
}
