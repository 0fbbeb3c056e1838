pub mod log;
pub mod points;
pub mod run;
pub mod sites;
pub mod timer;

use mindtap_core::error::{CoreError, Result};
use mindtap_core::storage::{self, Store};

/// Open the shared store at `<data_dir>/store.json`.
pub fn open_store() -> Result<Store> {
    let path = storage::data_dir()
        .map_err(|e| CoreError::Custom(e.to_string()))?
        .join("store.json");
    Ok(Store::open(path)?)
}

/// Normalize a URL-or-hostname argument to the site key.
pub fn site_of(url: &str) -> String {
    mindtap_core::classifier::hostname(url).unwrap_or_else(|| url.to_string())
}
