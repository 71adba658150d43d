use std::path::Path;

use enquote_core::graph::authoring::load_service_definition;

use crate::commands::CommandResult;

/// Eagerly validates one authored service definition. Every structural
/// fault (dangling transition, unknown choice key, unreachable question)
/// surfaces here, at authoring time, rather than mid-session.
pub fn run(path: &Path) -> CommandResult {
    let definition = match load_service_definition(path) {
        Ok(definition) => definition,
        Err(error) => {
            return CommandResult::failure("validate", "graph_load", error.to_string(), 2);
        }
    };

    let graph = &definition.graph;
    let plan = match &definition.quote_plan {
        Some(plan) => {
            format!("quote plan: `{}` ({})", plan.item_template, plan.calculation.as_str())
        }
        None => "quote plan: none".to_string(),
    };
    let service = definition
        .service_name
        .as_deref()
        .or_else(|| path.file_stem().and_then(|stem| stem.to_str()))
        .unwrap_or("service");

    CommandResult::success(
        "validate",
        format!(
            "`{service}` is valid: {} questions starting at `{}`; {}",
            graph.len(),
            graph.start_id(),
            plan
        ),
    )
}
