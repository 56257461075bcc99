use mcxb_launcher::{format_bytes, LauncherConfig};
use mcxb_runtime::RuntimeProbe;
use mcxb_types::LauncherResult;
use std::io::Write;
use std::path::{Path, PathBuf};

const OK: &str = "\x1b[38;5;46mOK\x1b[0m";
const WARN: &str = "\x1b[38;5;226mWARN\x1b[0m";
const FAIL: &str = "\x1b[38;5;196mFAIL\x1b[0m";

#[derive(Default)]
struct Tally {
    passed: u32,
    warnings: u32,
    failed: u32,
}

fn label(text: &str) {
    print!("{:<27}", text);
    let _ = std::io::stdout().flush();
}

pub async fn run_checks(config_path: &Path, work_dir: Option<PathBuf>) -> LauncherResult<()> {
    println!("\x1b[38;5;46mMCXboxBroadcast launcher diagnostics\x1b[0m");
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
    println!();

    let mut tally = Tally::default();

    label("[1/5] Configuration:");
    let mut config = if config_path.exists() {
        match LauncherConfig::load(config_path) {
            Ok(config) => {
                println!("{}", OK);
                tally.passed += 1;
                config
            }
            Err(e) => {
                println!("{} - {}", FAIL, e);
                tally.failed += 1;
                LauncherConfig::default()
            }
        }
    } else {
        println!("{} - {:?} not found, using defaults", WARN, config_path);
        tally.warnings += 1;
        LauncherConfig::default()
    };
    if let Some(dir) = work_dir {
        config.work_dir = dir;
    }

    label("[2/5] Working directory:");
    let work_dir = &config.work_dir;
    if work_dir.is_dir() {
        println!("{} ({})", OK, work_dir.display());
        tally.passed += 1;
    } else if work_dir.exists() {
        println!("{} - Not a directory", FAIL);
        tally.failed += 1;
    } else {
        println!("{} - Will be created on start", WARN);
        tally.warnings += 1;
    }

    label("[3/5] Java runtime:");
    match RuntimeProbe::new(config.runtime.command.clone()).locate().await {
        Some(path) => {
            println!("{} ({})", OK, path.display());
            tally.passed += 1;
        }
        None => {
            println!(
                "{} - '{}' not runnable, will be installed on start",
                WARN, config.runtime.command
            );
            tally.warnings += 1;
        }
    }

    label("[4/5] Broadcaster jar:");
    match std::fs::metadata(config.artifact_path()) {
        Ok(meta) if meta.is_file() => {
            println!("{} ({})", OK, format_bytes(meta.len()));
            tally.passed += 1;
        }
        _ => {
            println!("{} - Will be downloaded on start", WARN);
            tally.warnings += 1;
        }
    }

    let addr = config.api.socket_addr();
    label(&format!("[5/5] Status port ({}):", addr.port()));
    match std::net::TcpListener::bind(addr) {
        Ok(_) => {
            println!("{} (available)", OK);
            tally.passed += 1;
        }
        Err(e) => {
            println!("{} - {} (launcher may be running)", WARN, e);
            tally.warnings += 1;
        }
    }

    println!();
    println!("\x1b[38;5;245m{}\x1b[0m", "═".repeat(50));
    println!(
        "Results: \x1b[38;5;46m{} passed\x1b[0m, \x1b[38;5;226m{} warnings\x1b[0m, \x1b[38;5;196m{} failed\x1b[0m",
        tally.passed, tally.warnings, tally.failed
    );

    if tally.failed > 0 {
        println!("\n\x1b[38;5;196mSome checks failed. Fix issues before running.\x1b[0m");
    } else if tally.warnings > 0 {
        println!("\n\x1b[38;5;226mAll critical checks passed. Missing pieces are fetched on start.\x1b[0m");
    } else {
        println!("\n\x1b[38;5;46mAll checks passed! Ready to run.\x1b[0m");
    }

    Ok(())
}
