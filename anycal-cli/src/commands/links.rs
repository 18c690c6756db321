use anyhow::Result;
use owo_colors::OwoColorize;

use anycal_core::SyncEngine;

pub fn run(engine: &SyncEngine) -> Result<()> {
    let links = engine.links();

    if links.is_empty() {
        anyhow::bail!(
            "No calendar links configured.\n\n\
            Add one to ~/.config/anycal/config.toml:\n  \
            [[links]]\n  \
            id = \"sales\"\n  \
            provider = \"hubspot\"\n  \
            calendar_id = \"default\"\n  \
            access_token = \"...\""
        );
    }

    for link in links {
        let direction = match (link.pull_enabled, link.push_enabled) {
            (true, true) => "<->",
            (true, false) => "<--",
            (false, true) => "-->",
            (false, false) => "off",
        };
        println!(
            "{}  {}  {} {}",
            link.id.bold(),
            direction.dimmed(),
            link.provider,
            format!("({})", link.calendar_id).dimmed()
        );
    }

    Ok(())
}
