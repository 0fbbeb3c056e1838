use clap::Subcommand;
use serde_json::json;

use mindtap_core::error::Result;
use mindtap_core::Config;

#[derive(Subcommand)]
pub enum SitesAction {
    /// Check whether a URL counts as distracting
    Check {
        /// Full URL, scheme included
        url: String,
    },
    /// Print the configured pattern list
    List,
}

pub fn run(action: SitesAction) -> Result<()> {
    let config = Config::load()?;
    let classifier = config.classifier();
    match action {
        SitesAction::Check { url } => {
            println!(
                "{}",
                json!({
                    "url": url,
                    "distracting": classifier.is_distracting(&url),
                })
            );
        }
        SitesAction::List => {
            println!("{}", serde_json::to_string_pretty(classifier.patterns())?);
        }
    }
    Ok(())
}
