//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `healthstore_core` linkage without the mobile runtime.
//! - Optionally open a store file and print its table row counts.
//!
//! Usage: `healthstore [DB_PATH]`

use healthstore_core::{DbConfig, HealthStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("healthstore_core ping={}", healthstore_core::ping());
    println!("healthstore_core version={}", healthstore_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match report_store(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("healthstore open failed path={path} error={err}");
            ExitCode::FAILURE
        }
    }
}

fn report_store(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = HealthStore::open(path, &DbConfig::new())?;
    let profiles = store.load_profiles()?;
    println!("healthstore store={path} profiles={}", profiles.len());
    for profile in &profiles {
        let records = store.load_records_by_user(profile.id)?;
        println!(
            "healthstore user_id={} records={}",
            profile.id,
            records.len()
        );
    }
    Ok(())
}
