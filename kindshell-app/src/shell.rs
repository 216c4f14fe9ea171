//! Interactive loop: read a line, dispatch it, report the outcome.

use crate::commands::builtins;
use crate::commands::{parse_schedule_args, ScheduleSyntaxError};
use crate::config::{Config, PromptStyle};
use crate::fetch::{parse_query, FetchError, FetchQuery, WeatherClient};
use chrono::Local;
use kindshell_core::{ExecutionResult, IntentInterpreter, InterpretationResult};
use kindshell_executor::{ActionExecutor, CommandExecutor};
use kindshell_interfaces::{Interface, LineInput, Tone};
use kindshell_tasks::{ScheduledTask, TaskError, TaskId, TaskScheduler, TaskStatus};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
    #[error("couldn't understand: {0}")]
    NotUnderstood(String),
    #[error("schedule: {0}")]
    Schedule(#[from] ScheduleSyntaxError),
    #[error("{0}")]
    Task(#[from] TaskError),
    #[error("cancel: '{0}' is not a task id")]
    InvalidTaskId(String),
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),
}

/// Whether the loop keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell {
    interface: Arc<dyn Interface>,
    executor: Arc<dyn ActionExecutor>,
    scheduler: Arc<TaskScheduler>,
    interpreter: IntentInterpreter,
    commands: CommandExecutor,
    weather: WeatherClient,
    prompt: PromptStyle,
}

impl Shell {
    pub fn new(
        interface: Arc<dyn Interface>,
        executor: Arc<dyn ActionExecutor>,
        scheduler: Arc<TaskScheduler>,
        config: &Config,
    ) -> Self {
        Self {
            interface,
            executor,
            scheduler,
            interpreter: IntentInterpreter::with_default_rules(),
            commands: CommandExecutor::new(),
            weather: WeatherClient::new(config.fetch.clone()),
            prompt: config.prompt,
        }
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    pub fn prompt(&self) -> String {
        match self.prompt {
            PromptStyle::Plain => "$ ".to_string(),
            PromptStyle::Cwd => match std::env::current_dir() {
                Ok(cwd) => format!("{} $ ", cwd.display()),
                Err(_) => "$ ".to_string(),
            },
        }
    }

    /// Runs until `exit`/`quit` or end of input. Ctrl+C abandons the
    /// current line or command and shows a fresh prompt.
    pub async fn run(&self) {
        loop {
            let prompt = self.prompt();
            let input = tokio::select! {
                input = self.interface.read_line(&prompt) => input,
                Ok(()) = tokio::signal::ctrl_c() => LineInput::Interrupted,
            };

            match input {
                LineInput::Line(line) => {
                    let flow = tokio::select! {
                        flow = self.dispatch(&line) => flow,
                        Ok(()) = tokio::signal::ctrl_c() => {
                            self.interface.send_output("").await;
                            Flow::Continue
                        }
                    };
                    if flow == Flow::Exit {
                        break;
                    }
                }
                LineInput::Interrupted => self.interface.send_output("").await,
                LineInput::Eof => {
                    self.interface.send_output("").await;
                    break;
                }
            }
        }
        tracing::debug!("Shell loop finished");
    }

    pub async fn dispatch(&self, line: &str) -> Flow {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Flow::Continue;
        };
        let args: Vec<&str> = parts.collect();
        // argument text exactly as typed
        let rest = line[cmd.len()..].trim();
        let ui = self.interface.as_ref();

        let outcome = match cmd {
            "exit" | "quit" => return Flow::Exit,
            "help" => {
                builtins::help(ui).await;
                Ok(())
            }
            "ls" => {
                builtins::ls(ui, &args).await;
                Ok(())
            }
            "cd" => {
                builtins::cd(ui, &args).await;
                Ok(())
            }
            "pwd" => {
                builtins::pwd(ui).await;
                Ok(())
            }
            "mkdir" => {
                builtins::mkdir(ui, &args).await;
                Ok(())
            }
            "rm" => {
                builtins::rm(ui, &args).await;
                Ok(())
            }
            "monitor" => {
                builtins::monitor(ui).await;
                Ok(())
            }
            "run" => {
                builtins::run(ui, &self.commands, &args).await;
                Ok(())
            }
            "ai" => self.ai(rest).await,
            "schedule" => self.schedule(rest).await,
            "tasks" => {
                self.tasks().await;
                Ok(())
            }
            "cancel" => self.cancel(args.first().copied()).await,
            "fetch" => self.fetch(rest).await,
            _ => {
                builtins::external(ui, &self.commands, cmd, &args).await;
                Ok(())
            }
        };

        if let Err(e) = outcome {
            tracing::debug!(command = cmd, error = %e, "Command failed");
            ui.send_error(&e.to_string()).await;
        }
        Flow::Continue
    }

    async fn ai(&self, text: &str) -> Result<(), ShellError> {
        if text.trim().is_empty() {
            return Err(ShellError::MissingArgument("ai"));
        }
        let action = match self.interpreter.interpret(text) {
            InterpretationResult::Matched(action) => action,
            InterpretationResult::NoMatch(original) => {
                return Err(ShellError::NotUnderstood(original))
            }
        };

        match self.executor.execute(&action).await {
            ExecutionResult::Ok(output) => {
                self.interface.send_success(&output.summary).await;
                for entry in &output.entries {
                    let tone = if entry.is_dir { Tone::Directory } else { Tone::Plain };
                    self.interface.emit(tone, &entry.name).await;
                }
            }
            ExecutionResult::Failed(reason) => {
                self.interface
                    .send_error(&format!("could not {}: {}", action, reason))
                    .await;
            }
        }
        Ok(())
    }

    async fn schedule(&self, args: &str) -> Result<(), ShellError> {
        let request = parse_schedule_args(args, Local::now())?;
        let action = self
            .interpreter
            .interpret(&request.command_text)
            .into_action()
            .ok_or_else(|| ShellError::NotUnderstood(request.command_text.clone()))?;

        let task = self.scheduler.schedule_text(action, &request.time_text)?;
        self.interface
            .send_success(&format!(
                "Scheduled #{}: {} at {}",
                task.id,
                task.action,
                task.trigger_at.format("%Y-%m-%d %H:%M:%S")
            ))
            .await;
        Ok(())
    }

    async fn tasks(&self) {
        let pending = self.scheduler.pending();
        let history = self.scheduler.history();
        if pending.is_empty() && history.is_empty() {
            self.interface.show_status("No scheduled tasks.").await;
            return;
        }

        if !pending.is_empty() {
            self.interface.show_status("Pending:").await;
            for task in &pending {
                self.interface.send_output(&format!("  {}", task)).await;
            }
        }
        if !history.is_empty() {
            self.interface.show_status("History:").await;
            for task in &history {
                self.interface.send_output(&format!("  {}", task)).await;
            }
        }
    }

    async fn cancel(&self, arg: Option<&str>) -> Result<(), ShellError> {
        let arg = arg.ok_or(ShellError::MissingArgument("cancel"))?;
        let id: TaskId = arg
            .trim_start_matches('#')
            .parse()
            .map_err(|_| ShellError::InvalidTaskId(arg.to_string()))?;

        let task = self.scheduler.cancel(id)?;
        self.interface
            .send_success(&format!("Cancelled #{}: {}", task.id, task.action))
            .await;
        Ok(())
    }

    async fn fetch(&self, query: &str) -> Result<(), ShellError> {
        match parse_query(query)? {
            FetchQuery::Weather { city } => {
                let report = self.weather.current(&city).await?;
                self.interface.emit(Tone::Info, &report.to_string()).await;
            }
        }
        Ok(())
    }

    /// Print every finished scheduled task as it fires.
    pub fn spawn_announcer(&self) -> JoinHandle<()> {
        let mut events = self.scheduler.subscribe();
        let interface = Arc::clone(&self.interface);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(task) => {
                        for (tone, message) in describe_finished(&task) {
                            interface.emit(tone, &message).await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Announcer fell behind scheduler events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Announcement lines for a finished scheduled task; a listing is
/// followed by its entries.
pub fn describe_finished(task: &ScheduledTask) -> Vec<(Tone, String)> {
    let prefix = format!("[scheduled #{}]", task.id);
    match task.status {
        TaskStatus::Completed => {
            let summary = task
                .summary
                .clone()
                .unwrap_or_else(|| task.action.to_string());
            let mut lines = vec![(Tone::Success, format!("{} {}", prefix, summary))];
            lines.extend(task.entries.iter().map(|entry| {
                let tone = if entry.is_dir { Tone::Directory } else { Tone::Plain };
                (tone, entry.name.clone())
            }));
            lines
        }
        TaskStatus::Failed(reason) => vec![(
            Tone::Error,
            format!("{} could not {}: {}", prefix, task.action, reason),
        )],
        status => vec![(Tone::Info, format!("{} {} [{}]", prefix, task.action, status))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use kindshell_core::{Action, DirEntryInfo, FailureReason};

    fn task(status: TaskStatus, summary: Option<&str>) -> ScheduledTask {
        ScheduledTask {
            id: 7,
            action: Action::move_file("a.txt", "docs").unwrap(),
            trigger_at: Local::now(),
            registered_at: Local::now(),
            status,
            finished_at: Some(Local::now()),
            summary: summary.map(str::to_string),
            entries: Vec::new(),
        }
    }

    #[test]
    fn test_describe_completed_uses_summary() {
        let lines =
            describe_finished(&task(TaskStatus::Completed, Some("Moved 'a.txt' to 'docs'.")));
        assert_eq!(
            lines,
            vec![(Tone::Success, "[scheduled #7] Moved 'a.txt' to 'docs'.".to_string())]
        );
    }

    #[test]
    fn test_describe_listing_includes_entries() {
        let mut listing = task(TaskStatus::Completed, Some("Files in 'docs':"));
        listing.entries = vec![
            DirEntryInfo {
                name: "drafts".to_string(),
                is_dir: true,
            },
            DirEntryInfo {
                name: "notes.txt".to_string(),
                is_dir: false,
            },
        ];

        assert_eq!(
            describe_finished(&listing),
            vec![
                (Tone::Success, "[scheduled #7] Files in 'docs':".to_string()),
                (Tone::Directory, "drafts".to_string()),
                (Tone::Plain, "notes.txt".to_string()),
            ]
        );
    }

    #[test]
    fn test_describe_failed_names_reason() {
        let lines = describe_finished(&task(TaskStatus::Failed(FailureReason::NotFound), None));
        assert_eq!(
            lines,
            vec![(
                Tone::Error,
                "[scheduled #7] could not move 'a.txt' to 'docs': no such file or directory"
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_shell_error_messages() {
        assert_eq!(
            ShellError::NotUnderstood("dance".to_string()).to_string(),
            "couldn't understand: dance"
        );
        assert_eq!(
            ShellError::MissingArgument("ai").to_string(),
            "ai: missing argument"
        );
    }
}
