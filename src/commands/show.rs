use anyhow::Result;
use colored::Colorize;
use construct::{Resource, group_by_type};

use crate::Context;
use crate::cli::ShowArgs;
use crate::ui;

pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let (config, composition) = super::compose_from_config(ctx, false)?;
    let stack = &composition.stack;

    ui::header(&format!("Stack {}", stack.name));
    ui::kv("Cluster", &config.cluster.name);
    ui::kv("Network", &config.network_ref()?.lookup_key());
    let network = &composition.network;
    ui::kv("VPC", &network.vpc_id);
    ui::kv("Private subnets", &network.private_subnets.join(", "));
    if !network.availability_zones.is_empty() {
        ui::kv("Zones", &network.availability_zones.join(", "));
    }

    let resources = stack.filter_by_target(args.target.as_deref());
    if resources.is_empty() {
        println!();
        match args.target {
            Some(target) => ui::warn(&format!("No resources match '{target}'")),
            None => ui::warn("Stack declares no resources"),
        }
        return Ok(());
    }

    for (resource_type, group) in group_by_type(&resources) {
        ui::section(&format!("{} ({})", resource_type, group.len()));
        for resource in group {
            print_resource(resource);
        }
    }

    if args.target.is_none() && !stack.outputs().is_empty() {
        ui::section("Outputs");
        for output in stack.outputs() {
            println!("  {} {}", output.id.as_str().bold(), output.value);
            ui::dim(&format!("  {}", output.description));
        }
    }

    for key in stack.missing_lookups() {
        println!();
        ui::warn(&format!("Unresolved lookup {key}; placeholder values shown"));
    }
    Ok(())
}

fn print_resource(resource: &dyn Resource) {
    println!("  {} {}", "•".cyan(), resource.logical_id().as_str().bold());
    ui::dim(&format!("  {}", resource.description()));
}
