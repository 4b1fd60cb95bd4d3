use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::ValidateArgs;
use crate::stack::Composition;
use crate::ui;

pub fn run(ctx: &Context, args: ValidateArgs) -> Result<()> {
    let (_, composition) = super::compose_from_config(ctx, args.strict)?;
    let template = construct::synthesize(&composition.stack)?;
    if ctx.quiet {
        return Ok(());
    }

    ui::header(&format!("Stack {}", composition.stack.name));
    print_service(&composition);

    let summary = construct::summarize(&composition.stack);
    ui::section("Resources");
    for (resource_type, count) in &summary.by_type {
        println!("  {count:>3}  {resource_type}");
    }
    println!();
    ui::kv("Total", &summary.total().to_string());
    ui::kv("Outputs", &summary.outputs.to_string());
    ui::kv("Fingerprint", &template.fingerprint[..12]);

    println!();
    if summary.is_resolved() {
        ui::success("Stack is valid");
    } else {
        ui::success("Stack is valid with placeholder lookups");
        for key in composition.stack.missing_lookups() {
            println!("  {} {}", "!".yellow(), key);
        }
        ui::dim("Record the lookups under [[lookups.networks]] or run with --strict");
    }
    Ok(())
}

fn print_service(composition: &Composition) {
    let api = &composition.api;
    let service = api.service();
    let task = api.task_definition();
    let role = api.role();

    ui::section("Service");
    ui::kv("Name", &service.service_name);
    ui::kv("Cluster", &service.cluster);
    ui::kv("Security group", &api.security_group().name);
    ui::kv("Task size", &format!("{} CPU / {} MiB", task.cpu, task.memory));

    let split: Vec<String> = service
        .capacity_providers
        .iter()
        .map(|c| match c.base {
            Some(base) => format!("{} weight {} base {}", c.capacity_provider, c.weight, base),
            None => format!("{} weight {}", c.capacity_provider, c.weight),
        })
        .collect();
    ui::kv("Capacity", &split.join(", "));
    ui::kv(
        "Healthy percent",
        &format!(
            "{}..{}",
            service.deployment.min_healthy_percent, service.deployment.max_healthy_percent
        ),
    );

    ui::section("Containers");
    for container in task.containers() {
        let ports: Vec<String> = container
            .port_mappings
            .iter()
            .map(|m| format!("{}/{}", m.container_port, m.protocol.as_str()))
            .collect();
        println!("  {} {}", "•".cyan(), container.name.bold());
        ui::dim(&format!("  {}", container.image));
        ui::dim(&format!("  ports {}", ports.join(", ")));
    }

    ui::section("Task role");
    ui::kv("Managed policies", &role.managed_policies().len().to_string());
    ui::kv("Inline statements", &role.permissions().len().to_string());
}
