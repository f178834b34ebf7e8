//! Show daemon status

use crate::{pidfile, util};
use anyhow::{Context, Result};
use fmon_core::Config;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(file: Option<PathBuf>) -> Result<()> {
    let file = util::resolve_config_file(file.as_deref())?;
    let main = Config::load_main(&file).with_context(|| format!("Failed to load {}", file.display()))?;

    println!("{}", "fmon status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Config:        {}", file.display().to_string().cyan());
    println!("Pid file:      {}", main.pid_file.display());

    print!("Daemon:        ");
    match pidfile::running(&main.pid_file) {
        Some(record) => {
            println!("{}", "Running ✓".green());
            println!("  PID:         {}", record.pid);
            println!("  Uptime:      {}", util::format_uptime(record.started_at, util::now_ms()));
        }
        None => {
            println!("{}", "Not running".yellow());
            println!("  {}", "Tip: Start with 'fmon start'".dimmed());
        }
    }

    Ok(())
}
