use clap::{Subcommand, ValueEnum};
use serde_json::json;

use mindtap_core::error::{CoreError, Result};
use mindtap_core::{now_ms, Config, Purpose};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PurposeArg {
    Work,
    Fun,
}

impl From<PurposeArg> for Purpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Work => Purpose::Work,
            PurposeArg::Fun => Purpose::Fun,
        }
    }
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or replace) a timer for a site
    Start {
        /// Site URL or hostname
        url: String,
        /// What this visit is for
        #[arg(long, value_enum)]
        purpose: PurposeArg,
        /// Minutes allotted (defaults per purpose: work 15, fun 5)
        #[arg(long)]
        minutes: Option<u64>,
    },
    /// Stop a timer without logging a completion
    Stop {
        /// Site URL or hostname
        url: String,
    },
    /// Add the snooze allowance and restart the window
    Snooze {
        /// Site URL or hostname
        url: String,
    },
    /// Print the current status as JSON
    Status {
        /// Site URL or hostname
        url: String,
    },
}

pub fn run(action: TimerAction) -> Result<()> {
    let store = super::open_store()?;
    let config = Config::load()?;

    match action {
        TimerAction::Start {
            url,
            purpose,
            minutes,
        } => {
            let purpose = Purpose::from(purpose);
            let mins = minutes.unwrap_or_else(|| config.default_minutes(purpose));
            // Reject before any state is touched.
            if mins == 0 {
                return Err(CoreError::Custom("minutes must be at least 1".into()));
            }
            let site = super::site_of(&url);
            let record = store.start_timer(&site, purpose, mins, now_ms())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "site": site,
                    "record": record,
                    "points": store.points(),
                }))?
            );
        }
        TimerAction::Stop { url } => {
            let site = super::site_of(&url);
            store.stop_timer(&site)?;
            // Idempotent: stopping an idle site is still a success.
            println!("{}", json!({ "success": true }));
        }
        TimerAction::Snooze { url } => {
            let site = super::site_of(&url);
            match store.snooze_timer(&site, config.timer.snooze_minutes, now_ms())? {
                Some(record) => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "site": site,
                        "record": record,
                    }))?
                ),
                None => println!("{}", json!({ "active": false })),
            }
        }
        TimerAction::Status { url } => {
            let site = super::site_of(&url);
            let status = store.timer_state(&site).status(now_ms());
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
