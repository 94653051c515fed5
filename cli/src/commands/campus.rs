use anyhow::Result;

use shadal_core::manager::StoreManager;

use crate::config::Config;

/// Show the selected campus, or select `name` and create its store.
pub(crate) fn cmd_campus(
    config: &Config,
    manager: &StoreManager,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let selected = match name {
        Some(name) => {
            let store = manager.switch_to(name)?;
            config.remember_campus(store.label())?;
            Some(store.label().to_string())
        }
        None => config.selected_campus()?,
    };

    let exists = selected
        .as_deref()
        .is_some_and(|campus| manager.store_exists(campus));

    if json {
        println!(
            "{}",
            serde_json::json!({ "campus": selected, "cached": exists })
        );
    } else {
        match selected {
            Some(campus) if exists => println!("Campus: {campus}"),
            Some(campus) => println!("Campus: {campus} (nothing cached yet, run `shadal sync`)"),
            None => println!("No campus selected. Run `shadal campus <name>`."),
        }
    }
    Ok(())
}
