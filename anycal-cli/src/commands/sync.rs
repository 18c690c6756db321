use anyhow::Result;
use owo_colors::OwoColorize;

use anycal_core::sync::{SyncDirection, SyncResult};
use anycal_core::{CalendarLink, SyncEngine};

use crate::utils::tui;

pub async fn run(
    engine: &SyncEngine,
    link_filter: Option<&str>,
    direction: SyncDirection,
    json: bool,
) -> Result<()> {
    let links = resolve_links(engine, link_filter)?;
    let mut results = Vec::new();

    for (i, link) in links.iter().enumerate() {
        let spinner = tui::create_spinner(format!("{} ({})", link.id, link.provider));
        let result = match direction {
            SyncDirection::Both => engine.sync(&link.id).await,
            SyncDirection::Pull => engine.pull(&link.id).await,
            SyncDirection::Push => engine.push(&link.id).await,
        };
        spinner.finish_and_clear();

        if !json {
            render(link, &result);
            if i < links.len() - 1 {
                println!();
            }
        }
        results.push(result);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} links failed to sync", results.len());
    }

    Ok(())
}

fn render(link: &CalendarLink, result: &SyncResult) {
    if result.success {
        println!("{} {}", link.id.bold(), "ok".green());
    } else {
        println!("{} {}", link.id.bold(), "failed".red());
        println!("   {}", result.message.red());
    }

    let pull = &result.pull_result;
    if pull.success {
        let stats = &pull.stats;
        println!(
            "   Pulled {} events: {} created, {} updated, {} skipped",
            stats.total_events, stats.created_count, stats.updated_count, stats.skipped_count
        );
    }

    let push = &result.push_result;
    if push.success {
        let stats = &push.stats;
        println!(
            "   Pushed {}/{} events, {} skipped",
            stats.success, stats.total, stats.skipped
        );
    }
}

fn resolve_links(engine: &SyncEngine, link_filter: Option<&str>) -> Result<Vec<CalendarLink>> {
    let all_links = engine.links();

    if all_links.is_empty() {
        anyhow::bail!(
            "No calendar links configured.\n\n\
            Add one to ~/.config/anycal/config.toml and try again."
        );
    }

    match link_filter {
        Some(id) => match all_links.iter().find(|l| l.id == id) {
            Some(link) => Ok(vec![link.clone()]),
            None => {
                let available: Vec<_> = all_links.iter().map(|l| l.id.clone()).collect();
                anyhow::bail!("Link '{}' not found. Available: {}", id, available.join(", "));
            }
        },
        None => Ok(all_links),
    }
}
