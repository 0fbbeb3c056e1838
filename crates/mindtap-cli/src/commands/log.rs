use clap::Subcommand;

use mindtap_core::error::Result;

#[derive(Subcommand)]
pub enum LogAction {
    /// Print completion entries as JSON, oldest first
    List,
}

pub fn run(action: LogAction) -> Result<()> {
    let store = super::open_store()?;
    match action {
        LogAction::List => {
            println!("{}", serde_json::to_string_pretty(&store.completions())?);
        }
    }
    Ok(())
}
