use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use lumen_application::{
    ContextReady, ConversationController, GenerationOutcome, Notice, SendOutcome,
};
use lumen_core::config::WidgetConfig;
use lumen_core::error::LumenError;

use crate::terminal_view::TerminalView;

const COMMANDS: [&str; 6] = ["/clear", "/suggest", "/reload", "/1", "/2", "/3"];

/// Slash commands that extend `prefix`; empty unless it starts with '/'.
fn commands_extending(prefix: &str) -> impl Iterator<Item = &'static str> + '_ {
    COMMANDS
        .into_iter()
        .filter(move |cmd| prefix.starts_with('/') && cmd.starts_with(prefix))
}

/// Completes and hints the chat slash commands.
struct CliHelper;

impl Helper for CliHelper {}
impl Validator for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = commands_extending(&line[..pos])
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let typed = &line[..pos];
        commands_extending(typed)
            .find(|cmd| cmd.len() > typed.len())
            .map(|cmd| cmd[typed.len()..].to_string())
    }
}

impl Highlighter for CliHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.bright_black().to_string())
    }
}

/// Line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Clear,
    Suggest,
    Reload,
    Pick(usize),
    Message(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line {
        "quit" | "exit" => Command::Quit,
        "/clear" => Command::Clear,
        "/suggest" => Command::Suggest,
        "/reload" => Command::Reload,
        _ => match line.strip_prefix('/').and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 => Command::Pick(n),
            _ => Command::Message(line),
        },
    }
}

/// Runs the unlock prompts followed by the chat REPL.
pub async fn run_chat(config: WidgetConfig, api_key: Option<String>) -> Result<()> {
    let view = Arc::new(TerminalView::new());
    let controller = ConversationController::from_config(config, view.clone())?;

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", "=== Lumen ===".bright_magenta().bold());

    if !unlock(&controller, &mut rl, api_key).await? {
        return Ok(());
    }

    if !controller.config().supports_cancel {
        println!(
            "{}",
            "Stopping replies is disabled; Ctrl-C during a reply exits.".bright_black()
        );
    }
    println!(
        "{}",
        "Ask a question, '/1'..'/3' to pick a suggestion, '/suggest', '/reload', '/clear', or 'quit' to exit."
            .bright_black()
    );
    println!();

    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match parse_command(trimmed) {
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Clear => {
                        if !controller.clear().await {
                            println!("{}", "Clearing is disabled.".bright_black());
                        }
                    }
                    Command::Suggest => {
                        let suggestions = controller.suggestions().await;
                        if suggestions.is_empty() {
                            println!("{}", "No suggestions yet.".bright_black());
                        } else {
                            for (index, suggestion) in suggestions.iter().enumerate() {
                                println!("  {}", format!("/{} {}", index + 1, suggestion).magenta());
                            }
                        }
                    }
                    Command::Reload => match controller.load_context().await {
                        Ok(ContextReady::Loaded { chars }) => {
                            println!("{}", format!("Context reloaded ({chars} characters).").bright_black());
                        }
                        Ok(ContextReady::Skipped) => {
                            println!("{}", "Context is already loading.".bright_black());
                        }
                        // Already surfaced through the status line
                        Err(_) => {}
                    },
                    Command::Pick(n) => {
                        let suggestions = controller.suggestions().await;
                        match suggestions.get(n - 1) {
                            Some(suggestion) => {
                                let outcome = with_interrupt(
                                    &controller,
                                    controller.choose_suggestion(suggestion),
                                )
                                .await;
                                report(&view, outcome);
                            }
                            None => println!("{}", format!("No suggestion #{n}").bright_black()),
                        }
                    }
                    Command::Message(text) => {
                        view.set_input(text);
                        let outcome = with_interrupt(&controller, controller.send_input()).await;
                        report(&view, outcome);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

/// Prompts for credentials until the gate opens. Returns false on Ctrl-D.
async fn unlock(
    controller: &ConversationController,
    rl: &mut Editor<CliHelper, DefaultHistory>,
    mut api_key: Option<String>,
) -> Result<bool> {
    let passkey_required = controller.config().passkey_gate_enabled;

    loop {
        let key = match api_key.take() {
            Some(key) => key,
            None => match prompt(rl, "API key: ")? {
                Some(key) => key,
                None => return Ok(false),
            },
        };
        let passkey = if passkey_required {
            match prompt(rl, "Passkey: ")? {
                Some(passkey) => passkey,
                None => return Ok(false),
            }
        } else {
            String::new()
        };

        match controller.submit_credentials(&key, &passkey).await {
            Ok(_) => return Ok(true),
            Err(LumenError::InvalidPasskey) => {
                // Keep the key, only the passkey was wrong
                api_key = Some(key);
            }
            Err(_) => {}
        }
    }
}

fn prompt(rl: &mut Editor<CliHelper, DefaultHistory>, label: &str) -> Result<Option<String>> {
    match rl.readline(label) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Drives a send to completion, turning Ctrl-C into a cancel request.
///
/// Without cancel support Ctrl-C is left to its default handler, so it
/// still ends the process.
async fn with_interrupt<F>(controller: &ConversationController, sending: F) -> SendOutcome
where
    F: Future<Output = SendOutcome>,
{
    if !controller.config().supports_cancel {
        return sending.await;
    }

    tokio::pin!(sending);
    loop {
        tokio::select! {
            outcome = &mut sending => return outcome,
            _ = tokio::signal::ctrl_c() => {
                controller.cancel().await;
            }
        }
    }
}

fn report(view: &TerminalView, outcome: SendOutcome) {
    view.finish_lines();
    match outcome {
        SendOutcome::Ignored => {
            println!("{}", "A reply is still being generated.".bright_black());
        }
        SendOutcome::Rejected(Notice::ContextNotLoaded) => {
            println!("{}", "Use '/reload' to retry loading the context.".bright_black());
        }
        SendOutcome::Finished(GenerationOutcome::Failed(err)) => {
            tracing::debug!(error = %err, "reply failed");
        }
        SendOutcome::Rejected(_) | SendOutcome::Finished(_) => {}
    }
}
