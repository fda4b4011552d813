//! Terminal input and output for the chat session

use async_trait::async_trait;
use crossterm::style::Stylize;
use filechat_agent::{AgentOutput, ToolResult, UserInput};
use serde_json::Value as JsonValue;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// A Ctrl-C listener registered once, up front. A press that lands while the
/// model or a tool is running stays pending until the next prompt.
struct Interrupt {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
    #[cfg(windows)]
    signal: tokio::signal::windows::CtrlC,
}

impl Interrupt {
    fn register() -> std::io::Result<Self> {
        #[cfg(unix)]
        let signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        #[cfg(windows)]
        let signal = tokio::signal::windows::ctrl_c()?;
        Ok(Self { signal })
    }

    async fn recv(&mut self) {
        self.signal.recv().await;
    }
}

/// Reads one message per line, printing a `You:` prompt before each read.
///
/// End of the stream ends the session, and so does Ctrl-C once
/// [`ConsoleInput::listen_for_ctrl_c`] has been called.
pub struct ConsoleInput<R, W> {
    lines: Lines<R>,
    prompt: W,
    interrupt: Option<Interrupt>,
}

impl ConsoleInput<BufReader<Stdin>, std::io::Stdout> {
    /// Read from the process's stdin, prompting on stdout. Must be called
    /// inside the runtime.
    pub fn stdin() -> std::io::Result<Self> {
        Self::new(BufReader::new(tokio::io::stdin()), std::io::stdout()).listen_for_ctrl_c()
    }
}

impl<R, W> ConsoleInput<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(reader: R, prompt: W) -> Self {
        Self {
            lines: reader.lines(),
            prompt,
            interrupt: None,
        }
    }

    /// Treat Ctrl-C as end of input. This replaces the default SIGINT
    /// handling for the rest of the process.
    pub fn listen_for_ctrl_c(mut self) -> std::io::Result<Self> {
        self.interrupt = Some(Interrupt::register()?);
        Ok(self)
    }

    fn show_prompt(&mut self) -> std::io::Result<()> {
        write!(self.prompt, "{} ", "You:".blue())?;
        self.prompt.flush()
    }

    fn show_exit(&mut self) -> std::io::Result<()> {
        writeln!(self.prompt, "\nExiting.")?;
        self.prompt.flush()
    }
}

#[async_trait]
impl<R, W> UserInput for ConsoleInput<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn next_message(&mut self) -> std::io::Result<Option<String>> {
        self.show_prompt()?;

        let line = match self.interrupt.as_mut() {
            // A pending press wins over a line that is already buffered
            Some(interrupt) => tokio::select! {
                biased;
                _ = interrupt.recv() => {
                    tracing::debug!("Interrupted by Ctrl-C");
                    None
                }
                line = self.lines.next_line() => line?,
            },
            None => self.lines.next_line().await?,
        };

        if line.is_none() {
            self.show_exit()?;
        }
        Ok(line)
    }
}

/// Prints the transcript with colored labels
pub struct ConsoleOutput<W> {
    out: W,
}

impl ConsoleOutput<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a line, dropping write failures; a closed terminal must not
    /// interrupt the session
    fn line(&mut self, line: std::fmt::Arguments<'_>) {
        if writeln!(self.out, "{}", line).and_then(|_| self.out.flush()).is_err() {
            tracing::warn!("Failed to write to console");
        }
    }

    /// Print the startup banner
    pub fn banner(&mut self) {
        self.line(format_args!("Chat with Claude (Ctrl-C to quit)"));
    }
}

impl<W: Write> AgentOutput for ConsoleOutput<W> {
    fn assistant_text(&mut self, text: &str) {
        self.line(format_args!("{} {}", "Assistant:".yellow(), text));
    }

    fn tool_call(&mut self, tool_name: &str, arguments: &JsonValue) {
        self.line(format_args!("{} {}({})", "tool:".green(), tool_name, arguments));
    }

    fn tool_result(&mut self, result: &ToolResult) {
        if result.is_error {
            self.line(format_args!("{} {}", "tool error:".red(), result.content));
        }
    }

    fn diagnostic(&mut self, message: &str) {
        self.line(format_args!("{} {}", "Error:".red(), message));
    }
}
