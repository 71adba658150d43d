use std::fs;
use std::path::Path;

use anyhow::Context;
use enquote_core::builder::QuoteBuilder;
use enquote_core::catalog::{InMemoryCatalog, PriceEntry};
use enquote_core::config::{AppConfig, LoadOptions};
use enquote_core::graph::authoring::load_service_definition;
use enquote_core::pricing::{load_adjustments, Adjustment};
use enquote_core::session::AnswerStore;
use enquote_core::traversal::{TraversalEngine, TraversalState};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct QuoteReport {
    command: &'static str,
    status: &'static str,
    summary: String,
    currency: String,
    quote: enquote_core::quote::Quote,
}

/// Runs one scripted session end to end: traverse the graph with the
/// provided answers, query the catalog, and emit the assembled quote.
pub fn run(
    graph_path: &Path,
    answers_path: &Path,
    catalog_path: &Path,
    adjustments_path: Option<&Path>,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("quote", "config_validation", error.to_string(), 2);
        }
    };

    let definition = match load_service_definition(graph_path) {
        Ok(definition) => definition,
        Err(error) => return CommandResult::failure("quote", "graph_load", error.to_string(), 2),
    };
    let Some(plan) = definition.quote_plan.as_ref() else {
        return CommandResult::failure(
            "quote",
            "graph_load",
            format!("`{}` declares no quote plan", graph_path.display()),
            2,
        );
    };

    let scripted = match read_answers(answers_path) {
        Ok(scripted) => scripted,
        Err(error) => {
            return CommandResult::failure("quote", "answers_load", format!("{error:#}"), 3);
        }
    };

    let engine = TraversalEngine::new(&definition.graph);
    let mut store = AnswerStore::new();
    let mut script = scripted.iter();

    loop {
        match engine.current_question(&store) {
            Ok(TraversalState::Done) => break,
            Ok(TraversalState::AwaitingAnswer(question)) => {
                let Some(raw) = script.next() else {
                    return CommandResult::failure(
                        "quote",
                        "session_incomplete",
                        format!("ran out of answers at question `{}`", question.id),
                        3,
                    );
                };
                store = match engine.submit_answer(store, raw) {
                    Ok(store) => store,
                    Err((_, error)) => {
                        return CommandResult::failure("quote", "validation", error.to_string(), 3);
                    }
                };
            }
            Err(error) => {
                return CommandResult::failure("quote", "validation", error.to_string(), 3);
            }
        }
    }

    if script.next().is_some() {
        return CommandResult::failure(
            "quote",
            "answers_load",
            "answer script continues past the end of the session".to_string(),
            3,
        );
    }

    let entries = match read_entries(catalog_path) {
        Ok(entries) => entries,
        Err(error) => {
            return CommandResult::failure("quote", "catalog_load", format!("{error:#}"), 4);
        }
    };
    let catalog =
        InMemoryCatalog::new(entries).with_search_limit(config.catalog.search_limit);

    let adjustments = match load_adjustment_list(
        adjustments_path,
        config.pricing.adjustments_file.as_deref(),
    ) {
        Ok(adjustments) => adjustments,
        Err(error) => {
            return CommandResult::failure("quote", "adjustments_load", format!("{error:#}"), 4);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                5,
            );
        }
    };

    let builder = QuoteBuilder::new(plan, &adjustments);
    let quote = match runtime.block_on(builder.build_via_port(&store, &catalog)) {
        Ok(quote) => quote,
        Err(error) => {
            return CommandResult::failure("quote", "quote_build", error.to_string(), 5);
        }
    };

    let report = QuoteReport {
        command: "quote",
        status: "ok",
        summary: format!(
            "{}: {} {} at {} = {} {}",
            quote.item_name,
            quote.quantity,
            quote.unit,
            quote.base_price,
            quote.total_price,
            config.pricing.currency
        ),
        currency: config.pricing.currency.clone(),
        quote,
    };

    let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"quote\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });
    CommandResult { exit_code: 0, output }
}

fn read_answers(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read answers file `{}`", path.display()))?;
    serde_json::from_str::<Vec<String>>(&raw)
        .context("answers file must be a JSON array of strings")
}

fn read_entries(path: &Path) -> anyhow::Result<Vec<PriceEntry>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read catalog file `{}`", path.display()))?;
    serde_json::from_str::<Vec<PriceEntry>>(&raw)
        .context("catalog file must be a JSON array of price entries")
}

fn load_adjustment_list(
    explicit: Option<&Path>,
    configured: Option<&Path>,
) -> anyhow::Result<Vec<Adjustment>> {
    let Some(path) = explicit.or(configured) else {
        return Ok(Vec::new());
    };
    let adjustments = load_adjustments(path)
        .with_context(|| format!("could not load adjustments from `{}`", path.display()))?;
    Ok(adjustments)
}
