//! The `drillplan validate` command.

use std::path::PathBuf;

use anyhow::Result;

use drillplan_core::subject::SubjectTable;
use drillplan_store::{load_catalog_path, load_config_from, load_profiles, validate_catalog, validate_profiles};

pub fn execute(catalog: Option<PathBuf>, profiles: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let (catalog_path, profiles_path) = if catalog.is_none() && profiles.is_none() {
        let config = load_config_from(config.as_deref())?;
        (Some(config.catalog), Some(config.profiles))
    } else {
        (catalog, profiles)
    };
    let subjects = SubjectTable::default();
    let mut total_warnings = 0;

    if let Some(path) = catalog_path {
        let catalog = load_catalog_path(&path)?;
        for name in catalog.subject_names() {
            println!("Subject: {} ({} items)", name, catalog.items(name).len());
        }
        for w in validate_catalog(&catalog, &subjects) {
            let prefix = w
                .item_id
                .map(|id| format!("  [{}:{id}]", w.subject))
                .unwrap_or_else(|| format!("  [{}]", w.subject));
            println!("{prefix} WARNING: {}", w.message);
            total_warnings += 1;
        }
    }

    if let Some(path) = profiles_path {
        let profiles = load_profiles(&path)?;
        println!(
            "Profiles: {} classes, {} users",
            profiles.classes.len(),
            profiles.users.len()
        );
        for w in validate_profiles(&profiles, &subjects) {
            let prefix = w
                .username
                .as_ref()
                .map(|u| format!("  [{u}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
            total_warnings += 1;
        }
    }

    if total_warnings == 0 {
        println!("All files valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
