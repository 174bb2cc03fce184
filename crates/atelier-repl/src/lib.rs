//! atelier REPL: an interactive shell over one studio workspace.
//!
//! Plain input is sent to the assistant as a prompt. Everything else is a
//! meta-command:
//!
//! - Files: `/tree`, `/ls`, `/open`, `/cat`, `/write`, `/rm`, `/mv`, `/new`
//! - Editor: `/edit` (buffer for the active file), `/save`
//! - Assistant: `/prompt`, `/ai`, `/preview`, `/apply`, `/reject`, `/undo`, `/cancel`
//! - Misc: `/status`, `/notices`, `/action <name>`, `/help`, `/quit`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;

use atelier_kernel::notice::{Notice, NoticeLevel};
use atelier_kernel::patch::{Change, FileDiff};
use atelier_kernel::state::paths;
use atelier_kernel::vfs::render_tree;
use atelier_kernel::{
    Action, ActionOutcome, CodeGenerator, CodePatch, Studio, StudioConfig, SubmitOutcome,
    WorkspaceStore,
};

/// Resolves when the user asks to stop a running generation request.
pub type Interrupt = Pin<Box<dyn Future<Output = ()>>>;

/// REPL state: a studio plus the runtime that drives it.
pub struct Repl {
    runtime: Runtime,
    studio: Studio,
    interrupt: Box<dyn Fn() -> Interrupt>,
    color: bool,
    quit: bool,
}

impl Repl {
    /// A REPL over a throwaway in-memory workspace.
    pub fn new() -> Result<Self> {
        Self::with_config(StudioConfig::transient())
    }

    /// Open the workspace described by `config`.
    pub fn with_config(config: StudioConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let studio = runtime
            .block_on(Studio::from_config(config))
            .context("Failed to open workspace")?;
        Ok(Self::from_parts(runtime, studio))
    }

    /// Open a studio over explicit collaborators.
    pub fn with_collaborators(
        config: StudioConfig,
        store: Arc<dyn WorkspaceStore>,
        generator: Arc<dyn CodeGenerator>,
    ) -> Result<Self> {
        let runtime = build_runtime()?;
        let studio = runtime
            .block_on(Studio::open(config, store, generator))
            .context("Failed to open workspace")?;
        Ok(Self::from_parts(runtime, studio))
    }

    fn from_parts(runtime: Runtime, studio: Studio) -> Self {
        Self {
            runtime,
            studio,
            interrupt: Box::new(ctrl_c),
            color: false,
            quit: false,
        }
    }

    /// Replace the ctrl-c listener that stops in-flight generation requests.
    pub fn set_interrupt(&mut self, interrupt: impl Fn() -> Interrupt + 'static) {
        self.interrupt = Box::new(interrupt);
    }

    /// Colorize notices and diffs.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// True once `/quit` has been entered.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    /// Process a single line of input.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        let output = if trimmed.starts_with('/') {
            self.handle_meta_command(trimmed)?
        } else if trimmed.is_empty() {
            None
        } else {
            let outcome = self.interruptible(self.studio.generate(trimmed))?;
            Some(format_submit(&outcome))
        };

        Ok(self.with_notices(output))
    }

    fn handle_meta_command(&mut self, cmd: &str) -> Result<Option<String>> {
        let (command, rest) = match cmd.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (cmd, ""),
        };
        let studio = &self.studio;
        let rt = &self.runtime;

        match command {
            "/quit" | "/q" | "/exit" => {
                self.quit = true;
                Ok(None)
            }
            "/help" | "/h" | "/?" => Ok(Some(HELP_TEXT.to_string())),
            "/tree" => {
                let tree = rt.block_on(studio.tree());
                if tree.is_empty() {
                    Ok(Some("(empty workspace)".to_string()))
                } else {
                    Ok(Some(render_tree(&tree).trim_end().to_string()))
                }
            }
            "/ls" => {
                let ws = rt.block_on(studio.workspace());
                if ws.is_empty() {
                    return Ok(Some("(empty workspace)".to_string()));
                }
                let active = ws.active_file();
                let lines: Vec<String> = ws
                    .files()
                    .iter()
                    .map(|f| {
                        let marker = if Some(f.path.as_str()) == active { "*" } else { " " };
                        format!("{marker} {} ({} bytes)", f.path, f.content.len())
                    })
                    .collect();
                Ok(Some(lines.join("\n")))
            }
            "/open" => {
                let path = require(rest, "/open <path>")?;
                if rt.block_on(studio.open_file(path)) {
                    Ok(Some(format!("Opened {path}")))
                } else {
                    Ok(Some(format!("No such file: {path}")))
                }
            }
            "/cat" => {
                let path = match rest {
                    "" => rt
                        .block_on(studio.active_file())
                        .context("No file is open; use /cat <path>")?,
                    path => path.to_string(),
                };
                let ws = rt.block_on(studio.workspace());
                match ws.file(&path) {
                    Some(file) => Ok(Some(file.content.clone())),
                    None => Ok(Some(format!("No such file: {path}"))),
                }
            }
            "/write" => {
                let (path, content) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let path = require(path, "/write <path> [content]")?;
                let content = unescape(content.trim_start());
                if rt.block_on(studio.create_file(path, &content)) {
                    Ok(Some(format!("Wrote {path} ({} bytes)", content.len())))
                } else {
                    Ok(Some(format!("Invalid path: {path}")))
                }
            }
            "/edit" => {
                if rt.block_on(studio.set_buffer(unescape(rest))) {
                    Ok(Some("Buffer updated; /save to write it".to_string()))
                } else {
                    Ok(Some("No file is open".to_string()))
                }
            }
            "/save" => self.run_action(Action::Save),
            "/new" => self.run_action(Action::NewFile),
            "/rm" => {
                let path = require(rest, "/rm <path>")?;
                if rt.block_on(studio.delete_file(path)) {
                    Ok(Some(format!("Deleted {path}")))
                } else {
                    Ok(Some(format!("No such file: {path}")))
                }
            }
            "/mv" => {
                let mut args = rest.split_whitespace();
                let (Some(from), Some(to), None) = (args.next(), args.next(), args.next()) else {
                    anyhow::bail!("usage: /mv <from> <to>");
                };
                if rt.block_on(studio.rename_file(from, to)) {
                    Ok(Some(format!("Renamed {from} -> {to}")))
                } else {
                    Ok(Some(format!(
                        "Cannot rename {from} -> {to}: source missing or target exists"
                    )))
                }
            }
            "/prompt" => {
                rt.block_on(studio.set_prompt(rest));
                if rest.is_empty() {
                    Ok(Some("Prompt cleared".to_string()))
                } else {
                    Ok(Some("Prompt set; /ai to send it".to_string()))
                }
            }
            "/ai" => {
                if !rest.is_empty() {
                    rt.block_on(studio.set_prompt(rest));
                }
                self.run_action(Action::AiGenerate)
            }
            "/preview" => match rt.block_on(studio.preview()) {
                Some(diffs) => Ok(Some(self.format_preview(&diffs))),
                None => Ok(Some("No patch is waiting for review".to_string())),
            },
            "/apply" => self.run_action(Action::ApplyPatch),
            "/reject" => self.run_action(Action::RejectPatch),
            "/undo" => self.run_action(Action::Undo),
            "/cancel" => self.run_action(Action::CancelGeneration),
            "/action" => {
                let action: Action = require(rest, "/action <name>")?.parse()?;
                self.run_action(action)
            }
            "/status" => Ok(Some(self.status())),
            "/notices" => {
                let notices = rt.block_on(studio.take_notices());
                if notices.is_empty() {
                    Ok(Some("(no notices)".to_string()))
                } else {
                    Ok(Some(self.format_notices(&notices)))
                }
            }
            _ => Ok(Some(format!(
                "Unknown command: {command}\nType /help for available commands."
            ))),
        }
    }

    fn run_action(&self, action: Action) -> Result<Option<String>> {
        let dispatch = self.studio.dispatch(action);
        let outcome = match action {
            Action::AiGenerate => self.interruptible(dispatch)?,
            _ => self.runtime.block_on(dispatch)?,
        };
        Ok(Some(match outcome {
            ActionOutcome::FileCreated(path) => format!("Created {path}"),
            ActionOutcome::Saved(Some(path)) => format!("Saved {path}"),
            ActionOutcome::Saved(None) => "Nothing to save".to_string(),
            ActionOutcome::Submitted(outcome) => format_submit(&outcome),
            ActionOutcome::Applied(summary) => format!("Applied: {summary}"),
            ActionOutcome::Rejected => "Patch rejected; prompt kept for editing".to_string(),
            ActionOutcome::Undone => "Restored the workspace from before the last apply".to_string(),
            ActionOutcome::Cancelled(true) => "Generation cancelled".to_string(),
            ActionOutcome::Cancelled(false) => "No generation in flight".to_string(),
        }))
    }

    /// Drive a generation request, cancelling it if the interrupt fires first.
    ///
    /// The request future still runs to completion so it can report the
    /// cancellation itself.
    fn interruptible<T>(&self, request: impl Future<Output = T>) -> T {
        self.runtime.block_on(async {
            let interrupt = (self.interrupt)();
            tokio::pin!(request);
            tokio::select! {
                out = &mut request => out,
                () = interrupt => {
                    tracing::info!("interrupted, cancelling generation");
                    self.studio.cancel_generation().await;
                    request.await
                }
            }
        })
    }

    fn status(&self) -> String {
        let rt = &self.runtime;
        let ws = rt.block_on(self.studio.workspace());
        let editor = rt.block_on(self.studio.editor());
        let state = rt.block_on(self.studio.assist_state());
        let can_undo = rt.block_on(self.studio.can_undo());

        let mut out = format!("Workspace: {} ({}), {} file(s)\n", ws.name, ws.id, ws.len());
        out.push_str(&format!(
            "Active:    {}{}\n",
            ws.active_file().unwrap_or("(none)"),
            if editor.buffer.is_some() { " [modified]" } else { "" }
        ));
        out.push_str(&format!("Assist:    {}\n", state.name()));
        if !editor.prompt.is_empty() {
            out.push_str(&format!("Prompt:    {}\n", editor.prompt));
        }
        out.push_str(&format!("Undo:      {}", if can_undo { "available" } else { "empty" }));
        out
    }

    /// Append any notices posted while handling the line.
    fn with_notices(&self, output: Option<String>) -> Option<String> {
        let notices = self.runtime.block_on(self.studio.take_notices());
        if notices.is_empty() {
            return output;
        }
        let rendered = self.format_notices(&notices);
        Some(match output {
            Some(out) => format!("{out}\n{rendered}"),
            None => rendered,
        })
    }

    fn format_notices(&self, notices: &[Notice]) -> String {
        notices
            .iter()
            .map(|n| {
                let tag = format!("[{}]", n.level);
                let tag = match (self.color, n.level) {
                    (false, _) => tag,
                    (true, NoticeLevel::Info) => tag.cyan().to_string(),
                    (true, NoticeLevel::Success) => tag.green().to_string(),
                    (true, NoticeLevel::Error) => tag.red().bold().to_string(),
                };
                format!("{tag} {n}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_preview(&self, diffs: &[FileDiff]) -> String {
        let mut out = String::new();
        for diff in diffs {
            out.push_str(&diff.summary_line());
            out.push('\n');
            if matches!(diff.change, Change::Added | Change::Modified | Change::Deleted) {
                for line in diff.unified.lines() {
                    let line = match (self.color, line.chars().next()) {
                        (true, Some('+')) if !line.starts_with("+++") => line.green().to_string(),
                        (true, Some('-')) if !line.starts_with("---") => line.red().to_string(),
                        (true, Some('@')) => line.cyan().to_string(),
                        _ => line.to_string(),
                    };
                    out.push_str("    ");
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        }
        out.trim_end().to_string()
    }
}

fn ctrl_c() -> Interrupt {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")
}

fn require<'a>(arg: &'a str, usage: &str) -> Result<&'a str> {
    if arg.is_empty() {
        anyhow::bail!("usage: {usage}");
    }
    Ok(arg)
}

/// Expand `\n`, `\t` and `\\` so multi-line content fits on one input line.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn format_patch(patch: &CodePatch) -> String {
    let mut out = String::from("Patch ready");
    if !patch.plan.is_empty() {
        out.push_str(&format!(": {}", patch.plan));
    }
    for op in &patch.operations {
        out.push_str(&format!("\n  {op}"));
    }
    out.push_str("\nUse /preview to inspect, /apply or /reject to decide.");
    out
}

fn format_submit(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::EmptyPrompt => "Nothing to send: the prompt is empty".to_string(),
        SubmitOutcome::PatchReady(patch) => format_patch(patch),
        SubmitOutcome::Failed(e) => format!("Generation failed: {e}"),
        SubmitOutcome::Superseded => "Result dropped: a newer request replaced it".to_string(),
    }
}

const HELP_TEXT: &str = r#"atelier: AI-assisted code studio

Files:
  /tree                 Show the folder tree
  /ls                   List files (* marks the open one)
  /open <path>          Open a file
  /cat [path]           Print a file (default: the open one)
  /write <path> [text]  Create or overwrite a file (\n for newlines)
  /rm <path>            Delete a file
  /mv <from> <to>       Rename a file
  /new                  Create untitled.txt and open it

Editor:
  /edit <text>          Replace the open file's unsaved buffer
  /save                 Write the buffer to the open file

Assistant:
  <text>                Send text as a prompt
  /prompt [text]        Set the prompt without sending
  /ai [text]            Send the prompt (or text)
  /preview              Diff the pending patch
  /apply, /reject       Decide on the pending patch
  /undo                 Revert the last apply (one level)
  /cancel               Stop an in-flight request (or press ctrl-c while waiting)

Other:
  /status               Workspace and assistant state
  /notices              Show pending notices
  /action <name>        Run a named action (new-file, save, ai-generate, ...)
  /help, /h, /?         Show this help
  /quit, /q, /exit      Exit
"#;

/// Run the interactive loop.
pub fn run(config: StudioConfig) -> Result<()> {
    println!("atelier v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.\n");

    let mut repl = Repl::with_config(config)?;
    repl.set_color(true);

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    let history_path = paths::history_file();
    if let Err(e) = rl.load_history(&history_path) {
        tracing::debug!(path = %history_path.display(), error = %e, "no history loaded");
    }

    loop {
        match rl.readline("atelier> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match repl.process_line(&line) {
                    Ok(Some(output)) => println!("{output}"),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
                if repl.should_quit() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = rl.save_history(&history_path) {
        tracing::warn!(path = %history_path.display(), error = %e, "failed to save history");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"tab\there"), "tab\there");
        assert_eq!(unescape(r"keep \x and \\n"), "keep \\x and \\n");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_require() {
        assert_eq!(require("a.ts", "/rm <path>").unwrap(), "a.ts");
        let err = require("", "/rm <path>").unwrap_err();
        assert_eq!(err.to_string(), "usage: /rm <path>");
    }
}
