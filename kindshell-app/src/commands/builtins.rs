//! Thin wrappers over OS primitives: ls, cd, pwd, mkdir, rm, monitor, run.

use crate::config::home_dir;
use kindshell_core::FailureReason;
use kindshell_executor::filesystem;
use kindshell_executor::{CommandExecutor, CommandOutput, SystemSnapshot};
use kindshell_interfaces::{Interface, Tone};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

const MONITOR_SAMPLE: Duration = Duration::from_secs(1);

/// Names offered by tab completion.
pub const COMMANDS: &[&str] = &[
    "ls", "cd", "pwd", "mkdir", "rm", "monitor", "ai", "run", "schedule", "tasks", "cancel",
    "fetch", "exit", "quit", "help",
];

pub const HELP_LINES: &[(&str, &str)] = &[
    ("ls [path]", "list directory contents"),
    ("cd [path]", "change directory"),
    ("pwd", "print current directory"),
    ("mkdir <dir>...", "create directories"),
    ("rm <file/dir>...", "remove files or directories"),
    ("monitor", "show CPU and memory usage"),
    ("ai <sentence>", "run a plain-English file command"),
    ("run <script> [args]", "run Python, shell scripts or executables"),
    ("schedule at <time> <sentence>", "run a plain-English command later"),
    ("tasks", "show scheduled tasks"),
    ("cancel <id>", "cancel a scheduled task"),
    ("fetch weather in <city>", "current weather (needs an API key)"),
    ("exit", "exit the shell"),
    ("help", "show this help message"),
];

fn describe(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::NotFound => "No such file or directory",
        FailureReason::PermissionDenied => "Permission denied",
        FailureReason::AlreadyExists => "File exists",
        FailureReason::NotADirectory | FailureReason::DestinationNotDirectory => {
            "Not a directory"
        }
        FailureReason::InvalidPath => "Invalid path",
        FailureReason::Io => "I/O error",
    }
}

pub async fn ls(ui: &dyn Interface, args: &[&str]) {
    let path = args.first().copied().unwrap_or(".");
    match filesystem::list(path).await {
        Ok(entries) => {
            for entry in entries {
                let tone = if entry.is_dir { Tone::Directory } else { Tone::Plain };
                ui.emit(tone, &entry.name).await;
            }
        }
        Err(e) if e.reason() == FailureReason::PermissionDenied => {
            ui.send_error(&format!("ls: cannot open directory '{}': Permission denied", path))
                .await;
        }
        Err(e) => {
            ui.send_error(&format!(
                "ls: cannot access '{}': {}",
                path,
                describe(e.reason())
            ))
            .await;
        }
    }
}

pub async fn cd(ui: &dyn Interface, args: &[&str]) {
    let target = match args.first() {
        Some(path) => PathBuf::from(path),
        None => match home_dir() {
            Some(home) => home,
            None => {
                ui.send_error("cd: HOME not set").await;
                return;
            }
        },
    };

    if let Err(e) = std::env::set_current_dir(&target) {
        let shown = target.display();
        let message = match e.kind() {
            ErrorKind::NotFound => format!("cd: no such file or directory: {}", shown),
            ErrorKind::PermissionDenied => format!("cd: permission denied: {}", shown),
            _ if target.exists() && !target.is_dir() => format!("cd: not a directory: {}", shown),
            _ => format!("cd: {}: {}", shown, e),
        };
        ui.send_error(&message).await;
    }
}

pub async fn pwd(ui: &dyn Interface) {
    match std::env::current_dir() {
        Ok(dir) => ui.emit(Tone::Success, &dir.display().to_string()).await,
        Err(e) => ui.send_error(&format!("pwd: {}", e)).await,
    }
}

pub async fn mkdir(ui: &dyn Interface, args: &[&str]) {
    if args.is_empty() {
        ui.send_error("mkdir: missing operand").await;
        return;
    }
    for dir in args {
        match filesystem::create_dir(dir).await {
            Ok(()) => ui.send_success(&format!("Directory '{}' created.", dir)).await,
            Err(e) => {
                ui.send_error(&format!(
                    "mkdir: cannot create directory '{}': {}",
                    dir,
                    describe(e.reason())
                ))
                .await
            }
        }
    }
}

pub async fn rm(ui: &dyn Interface, args: &[&str]) {
    if args.is_empty() {
        ui.send_error("rm: missing operand").await;
        return;
    }
    // keep going after a failed target, like rm(1)
    for target in args {
        match filesystem::delete(target).await {
            Ok(()) => ui.send_success(&format!("Removed '{}'.", target)).await,
            Err(e) => {
                ui.send_error(&format!(
                    "rm: cannot remove '{}': {}",
                    target,
                    describe(e.reason())
                ))
                .await
            }
        }
    }
}

pub async fn monitor(ui: &dyn Interface) {
    match SystemSnapshot::capture_async(MONITOR_SAMPLE).await {
        Ok(snapshot) => {
            for line in snapshot.to_report().lines() {
                ui.send_output(line).await;
            }
        }
        Err(e) => ui.send_error(&format!("monitor: {}", e)).await,
    }
}

pub async fn run(ui: &dyn Interface, commands: &CommandExecutor, args: &[&str]) {
    let Some((target, rest)) = args.split_first() else {
        ui.send_error("run: missing script or executable name").await;
        return;
    };
    let rest: Vec<String> = rest.iter().map(|s| s.to_string()).collect();

    match commands.run_script(target, &rest).await {
        Ok(output) => print_output(ui, &output).await,
        Err(e) => ui.send_error(&format!("run: {}", e)).await,
    }
}

pub async fn external(ui: &dyn Interface, commands: &CommandExecutor, cmd: &str, args: &[&str]) {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    match commands.run_external(cmd, &args).await {
        Ok(output) => print_output(ui, &output).await,
        Err(e) => ui.send_error(&e.to_string()).await,
    }
}

pub async fn help(ui: &dyn Interface) {
    ui.show_status("Supported commands:").await;
    let width = HELP_LINES.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
    for (usage, description) in HELP_LINES {
        ui.send_output(&format!("  {:<width$}  - {}", usage, description, width = width))
            .await;
    }
}

async fn print_output(ui: &dyn Interface, output: &CommandOutput) {
    let stdout = output.stdout.trim_end_matches('\n');
    if !stdout.is_empty() {
        ui.send_output(stdout).await;
    }
    let stderr = output.stderr.trim_end_matches('\n');
    if !stderr.is_empty() {
        ui.emit(Tone::Error, stderr).await;
    }
}
