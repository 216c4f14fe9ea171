use crate::completion::ShellHelper;
use crate::traits::{Interface, LineInput, Tone};
use async_trait::async_trait;
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::io::IsTerminal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::{mpsc, oneshot, Mutex};

struct ReadRequest {
    prompt: String,
    reply: oneshot::Sender<LineInput>,
}

/// A rustyline editor owned by its own thread, since `readline` blocks.
struct LineEditor {
    requests: mpsc::UnboundedSender<ReadRequest>,
}

impl LineEditor {
    fn spawn(commands: &[&str]) -> Result<Self, ReadlineError> {
        let commands: Vec<String> = commands.iter().map(|c| c.to_string()).collect();
        let (ready, started) = std::sync::mpsc::channel();
        let (requests, mut incoming) = mpsc::unbounded_channel::<ReadRequest>();

        std::thread::Builder::new()
            .name("kindshell-readline".to_string())
            .spawn(move || {
                let names: Vec<&str> = commands.iter().map(String::as_str).collect();
                let mut editor = match build_editor(&names) {
                    Ok(editor) => {
                        let _ = ready.send(Ok(()));
                        editor
                    }
                    Err(e) => {
                        let _ = ready.send(Err(e));
                        return;
                    }
                };
                while let Some(request) = incoming.blocking_recv() {
                    let input = read_with_editor(&mut editor, &request.prompt);
                    let _ = request.reply.send(input);
                }
            })
            .map_err(ReadlineError::Io)?;

        started.recv().map_err(|_| ReadlineError::Eof)??;
        Ok(Self { requests })
    }

    async fn read_line(&self, prompt: &str) -> LineInput {
        let (reply, response) = oneshot::channel();
        let request = ReadRequest {
            prompt: prompt.to_string(),
            reply,
        };
        if self.requests.send(request).is_err() {
            return LineInput::Eof;
        }
        response.await.unwrap_or(LineInput::Eof)
    }
}

fn build_editor(commands: &[&str]) -> Result<Editor<ShellHelper, DefaultHistory>, ReadlineError> {
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();
    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(ShellHelper::new(commands)));
    Ok(editor)
}

fn read_with_editor(editor: &mut Editor<ShellHelper, DefaultHistory>, prompt: &str) -> LineInput {
    match editor.readline(prompt) {
        Ok(line) => {
            let line = line.trim().to_string();
            if !line.is_empty() {
                let _ = editor.add_history_entry(line.as_str());
            }
            LineInput::Line(line)
        }
        Err(ReadlineError::Interrupted) => LineInput::Interrupted,
        Err(ReadlineError::Eof) => LineInput::Eof,
        Err(ReadlineError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
            tracing::warn!(error = %e, "Discarding undecodable input line");
            LineInput::Interrupted
        }
        Err(e) => {
            tracing::error!(error = %e, "Line editor failed");
            LineInput::Eof
        }
    }
}

/// Read one line from a non-interactive source. Bytes that are not UTF-8
/// are replaced rather than ending the session.
async fn read_piped<R: AsyncBufRead + Unpin>(reader: &mut R) -> LineInput {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => LineInput::Eof,
        Ok(_) => LineInput::Line(String::from_utf8_lossy(&buf).trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => LineInput::Interrupted,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read input");
            LineInput::Eof
        }
    }
}

enum LineSource {
    Editor(LineEditor),
    // one reader for the whole session so buffered input is never lost
    Piped(Mutex<BufReader<Stdin>>),
}

pub struct TerminalInterface {
    source: LineSource,
    color: bool,
}

impl TerminalInterface {
    /// Line editing, history and completion of `commands` when stdin is a
    /// terminal; plain line reads otherwise.
    pub fn new(commands: &[&str]) -> Self {
        let source = if std::io::stdin().is_terminal() {
            match LineEditor::spawn(commands) {
                Ok(editor) => LineSource::Editor(editor),
                Err(e) => {
                    tracing::warn!(error = %e, "Line editor unavailable, reading plain stdin");
                    Self::stdin_source()
                }
            }
        } else {
            Self::stdin_source()
        };

        Self {
            source,
            color: std::env::var_os("NO_COLOR").is_none(),
        }
    }

    /// Plain stdin without line editing or color.
    pub fn plain() -> Self {
        Self {
            source: Self::stdin_source(),
            color: false,
        }
    }

    fn stdin_source() -> LineSource {
        LineSource::Piped(Mutex::new(BufReader::new(tokio::io::stdin())))
    }

    fn style(&self, tone: Tone, message: &str) -> String {
        if !self.color {
            return message.to_string();
        }
        match tone {
            Tone::Plain => message.to_string(),
            Tone::Success => message.green().to_string(),
            Tone::Error => message.red().bold().to_string(),
            Tone::Info => message.cyan().bold().to_string(),
            Tone::Directory => message.blue().bold().to_string(),
        }
    }
}

#[async_trait]
impl Interface for TerminalInterface {
    async fn read_line(&self, prompt: &str) -> LineInput {
        let prompt = if self.color {
            prompt.green().bold().to_string()
        } else {
            prompt.to_string()
        };

        match &self.source {
            LineSource::Editor(editor) => editor.read_line(&prompt).await,
            LineSource::Piped(reader) => {
                let mut stdout = tokio::io::stdout();
                let _ = stdout.write_all(prompt.as_bytes()).await;
                let _ = stdout.flush().await;
                read_piped(&mut *reader.lock().await).await
            }
        }
    }

    async fn emit(&self, tone: Tone, message: &str) {
        let styled = self.style(tone, message);
        if tone == Tone::Error {
            let mut stderr = tokio::io::stderr();
            let _ = stderr.write_all(styled.as_bytes()).await;
            let _ = stderr.write_all(b"\n").await;
            let _ = stderr.flush().await;
        } else {
            let mut stdout = tokio::io::stdout();
            let _ = stdout.write_all(styled.as_bytes()).await;
            let _ = stdout.write_all(b"\n").await;
            let _ = stdout.flush().await;
        }
    }
}
