use anyhow::Result;

use runrelay_client::RunConfig;

use super::args::{Cli, Commands};
use super::handlers;

pub fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load_from(path)?,
        None => RunConfig::load()?,
    };
    config.apply_env();

    match cli.command {
        Commands::Post {
            events,
            output,
            remove_keywords,
            flatten_keywords,
            launch_name,
            log_html,
            report_html,
            xunit,
        } => {
            if !remove_keywords.is_empty() {
                config.remove_keywords = remove_keywords;
            }
            if !flatten_keywords.is_empty() {
                config.flatten_keywords = flatten_keywords;
            }
            if let Some(name) = launch_name {
                config.launch = Some(name);
            }
            if !config.enabled() {
                eprintln!(
                    "Warning: backend credentials incomplete; the call stream is captured locally only"
                );
            }
            handlers::post::handle(&config, &events, output, log_html, report_html, xunit)
        }
    }
}
