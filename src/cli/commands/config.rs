//! Configuration inspection.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;

pub fn run_config(action: &ConfigAction, settings: Settings) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(&settings)?;
            println!("{}", content);
        }
        ConfigAction::Path => {
            let path = Settings::default_config_path();
            Output::kv("Config", &path.display().to_string());
        }
    }
    Ok(())
}
