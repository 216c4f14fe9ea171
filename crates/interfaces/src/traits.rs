use async_trait::async_trait;

/// How a line of output should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Success,
    Error,
    Info,
    Directory,
}

/// What one read from the user produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Line(String),
    /// Ctrl+C at the prompt; the partial line is discarded.
    Interrupted,
    /// Ctrl+D or closed input.
    Eof,
}

#[async_trait]
pub trait Interface: Send + Sync {
    /// Show `prompt` and wait for one line.
    async fn read_line(&self, prompt: &str) -> LineInput;

    async fn emit(&self, tone: Tone, message: &str);

    async fn send_output(&self, message: &str) {
        self.emit(Tone::Plain, message).await;
    }

    async fn send_success(&self, message: &str) {
        self.emit(Tone::Success, message).await;
    }

    async fn send_error(&self, message: &str) {
        self.emit(Tone::Error, &format!("Error: {}", message)).await;
    }

    async fn show_status(&self, status: &str) {
        self.emit(Tone::Info, status).await;
    }
}
