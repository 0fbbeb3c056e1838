use serde_json::json;

use mindtap_core::error::Result;

pub fn run() -> Result<()> {
    let store = super::open_store()?;
    println!("{}", json!({ "points": store.points() }));
    Ok(())
}
