use crate::GlobalOpts;
use clap::Subcommand;
use colored::Colorize;
use plugpack_config::{Config, ConfigError};
use plugpack_logger as logger;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every key that has a value
    Show,
    /// Set a key; list values are comma-separated, an empty value clears the key
    Set { key: String, value: String },
    /// Print the resolved config file path
    Path,
}

fn show(config: &Config, opts: &GlobalOpts) {
    println!("{}", "Configuration:".bold().green());
    if config.is_empty() {
        if opts.verbosity_level() > 0 {
            println!("  {}", "(empty)".yellow());
        }
        return;
    }
    for (key, value) in config.values_iter() {
        println!("  {}: {}", key.cyan(), value);
    }
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<(), ConfigError> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = Config::load()?;
            show(&config, opts);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            let path = Config::path();
            logger::debug(&format!("Config path: {}", path.display()));
            println!("{}", path.display());
        }
    }
    Ok(())
}
