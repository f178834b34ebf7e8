//! Integration tests for the fmon binary
//!
//! Exit statuses, configuration handling and an end-to-end ad-hoc watcher.

mod common;

use anyhow::Result;
use common::write_config;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_example_parses() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = fmon!(temp_dir.path(), "config", "example").assert_success()?;
    assert!(result.contains_stdout("[main]"));
    assert!(result.contains_stdout("[watcher.tmp]"));

    // the printed example is itself a valid configuration
    let file = temp_dir.path().join("example.conf");
    fs::write(&file, &result.stdout)?;
    fmon!(temp_dir.path(), "config", "check", "-f", "example.conf").assert_success()?;
    Ok(())
}

#[test]
fn test_config_check_summarises_watchers() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_config(temp_dir.path(), "recursive = true\nmax_depth = 2\nevents = [\"created\"]");

    let result = fmon!(temp_dir.path(), "config", "check", "-f", "fmon.conf").assert_success()?;
    assert!(result.contains_stdout("Configuration OK"));
    assert!(result.contains_stdout("(recursive, depth 2) events=created"));
    Ok(())
}

#[test]
fn test_config_path_from_home() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let home_conf = temp_dir.path().join(".fmon");
    fs::create_dir_all(&home_conf)?;
    fs::write(home_conf.join("fmon.conf"), "")?;

    let result = fmon!(temp_dir.path(), "config", "path").assert_success()?;
    assert_eq!(result.stdout.trim(), home_conf.join("fmon.conf").display().to_string());
    Ok(())
}

#[test]
fn test_invalid_event_exits_3() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_config(temp_dir.path(), "events = [\"exploded\"]");

    let result = fmon!(temp_dir.path(), "config", "check", "-f", "fmon.conf").assert_exit(3)?;
    assert!(result.contains_stderr("invalid event 'exploded'"));
    Ok(())
}

#[test]
fn test_malformed_file_exits_2() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("fmon.conf"), "[main\n")?;

    fmon!(temp_dir.path(), "config", "check", "-f", "fmon.conf").assert_exit(2)?;
    Ok(())
}

#[test]
fn test_unknown_key_exits_2() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_config(temp_dir.path(), "recursiv = true");

    fmon!(temp_dir.path(), "config", "check", "-f", "fmon.conf").assert_exit(2)?;
    Ok(())
}

#[test]
fn test_missing_file_exits_2() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = fmon!(temp_dir.path(), "start", "-f", "absent.conf").assert_exit(2)?;
    assert!(result.contains_stderr("no configuration file found"));
    Ok(())
}

#[test]
fn test_watch_missing_path_exits_3() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = fmon!(temp_dir.path(), "watch", "--path", "does/not/exist", "--print").assert_exit(3)?;
    assert!(result.contains_stderr("doesn't exist"));
    Ok(())
}

#[test]
fn test_status_not_running() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_config(temp_dir.path(), "");

    let result = fmon!(temp_dir.path(), "status", "-f", "fmon.conf").assert_success()?;
    assert!(result.contains_stdout("Not running"));
    Ok(())
}

#[test]
fn test_stop_not_running_exits_1() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_config(temp_dir.path(), "");

    let result = fmon!(temp_dir.path(), "stop", "-f", "fmon.conf").assert_exit(1)?;
    assert!(result.contains_stderr("not running"));
    Ok(())
}

#[test]
fn test_watch_prints_created_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;

    let child = fmon!(&root, "watch", "--path", ".", "--event", "created", "--exclude", "*.tmp", "--print")
        .env("RUST_LOG", "off")
        .spawn()?;

    // let the watcher install its subscriptions
    sleep(Duration::from_millis(1000));
    fs::write(root.join("skipped.tmp"), b"x")?;
    fs::write(root.join("hello.txt"), b"x")?;
    sleep(Duration::from_millis(500));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM)?;
    let output = child.wait_with_output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec![root.join("hello.txt").display().to_string()]);
    Ok(())
}
