//! Line-oriented terminal driver.
//!
//! Stdin is read on a dedicated thread and handed over a channel, so a
//! prompt abandoned at settlement never keeps the runtime alive. Prompts and
//! input errors go through the session's render gate, like every other line
//! the session prints.

use std::io::BufRead;
use std::sync::Arc;

use async_trait::async_trait;
use dealroom_db::TermSnapshot;
use dealroom_protocol::Role;
use dealroom_session::{Action, ActionSource, Notice, Prompt, RenderGate, Result};
use tokio::sync::mpsc;
use tracing::debug;

/// Parsed menu choice.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuChoice {
    Term(usize),
    Refresh,
    Exit,
}

pub fn parse_menu_choice(input: &str, term_count: usize) -> Option<MenuChoice> {
    let input = input.trim();
    match input.to_ascii_lowercase().as_str() {
        "r" | "refresh" => return Some(MenuChoice::Refresh),
        "x" | "q" | "exit" | "quit" => return Some(MenuChoice::Exit),
        _ => {}
    }
    let n: usize = input.parse().ok()?;
    (1..=term_count).contains(&n).then(|| MenuChoice::Term(n - 1))
}

/// Accepts `1234.5`, `1,234.5`, `$1,234.5` and `10%` style input.
pub fn parse_number(input: &str) -> Option<f64> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "" => Some(false),
        _ => None,
    }
}

pub struct TerminalDriver {
    lines: mpsc::UnboundedReceiver<String>,
    gate: Arc<RenderGate>,
}

impl TerminalDriver {
    pub fn new(lines: mpsc::UnboundedReceiver<String>, gate: Arc<RenderGate>) -> Self {
        Self { lines, gate }
    }

    /// Start the stdin reader thread.
    pub fn spawn(gate: Arc<RenderGate>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });
        Self::new(rx, gate)
    }

    /// Print `prompt` and wait for one line. `None` means stdin closed.
    async fn ask(&mut self, prompt: &str) -> Option<String> {
        self.gate.render(|r| r.prompt(prompt));
        self.lines.recv().await
    }

    fn invalid(&self, message: String) {
        self.gate
            .render(|r| r.notice(&Notice::InvalidInput(message.clone())));
    }

    async fn confirm_exit(&mut self) -> bool {
        loop {
            match self.ask("Exit now? You can return later. [y/N]").await {
                None => return true,
                Some(line) => match parse_yes_no(&line) {
                    Some(answer) => return answer,
                    None => self.invalid("Please answer y or n.".to_string()),
                },
            }
        }
    }

    async fn read_number(&mut self, prompt: &str) -> Option<Option<f64>> {
        loop {
            let line = self.ask(prompt).await?;
            if matches!(line.trim(), "x" | "exit") {
                return Some(None);
            }
            match parse_number(&line) {
                Some(v) => return Some(Some(v)),
                None => self.invalid(format!("Invalid number: '{}'", line.trim())),
            }
        }
    }

    async fn menu(&mut self, role: Role, snapshot: &TermSnapshot) -> Action {
        let count = snapshot.len();
        let prompt = match role {
            Role::Proposer => format!("Edit term [1-{count}], 'r' refresh, 'x' exit:"),
            Role::Counterparty => format!("Review term [1-{count}], 'r' refresh, 'x' exit:"),
        };

        loop {
            let Some(line) = self.ask(&prompt).await else {
                return Action::Exit;
            };
            let Some(choice) = parse_menu_choice(&line, count) else {
                self.invalid(format!("Invalid choice: '{}'", line.trim()));
                continue;
            };

            let index = match choice {
                MenuChoice::Refresh => return Action::Refresh,
                MenuChoice::Exit => {
                    if self.confirm_exit().await {
                        return Action::Exit;
                    }
                    continue;
                }
                MenuChoice::Term(index) => index,
            };
            let Some(term) = snapshot.iter().nth(index) else {
                continue;
            };
            let name = term.name.clone();

            match role {
                Role::Proposer => {
                    let prompt = format!("New value for {} ({}):", name, term.unit);
                    match self.read_number(&prompt).await {
                        None => return Action::Exit,
                        Some(None) => continue,
                        Some(Some(value)) => return Action::edit(name, value),
                    }
                }
                Role::Counterparty => {
                    let prompt = format!("Approve {}? [y = approve / n = reject]", name);
                    let Some(line) = self.ask(&prompt).await else {
                        return Action::Exit;
                    };
                    match parse_yes_no(&line) {
                        Some(true) => return Action::approve(name),
                        Some(false) => return Action::reject(name),
                        None => self.invalid("Please answer y or n.".to_string()),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ActionSource for TerminalDriver {
    async fn next_action(&mut self, prompt: &Prompt) -> Result<Action> {
        match prompt {
            Prompt::InitialValue { term, unit } => {
                let text = format!("Enter initial value for {} ({}), or 'x' to exit:", term, unit);
                match self.read_number(&text).await {
                    Some(Some(value)) => Ok(Action::initialize(term.clone(), value)),
                    Some(None) | None => Ok(Action::Exit),
                }
            }
            Prompt::Menu { role, snapshot } => Ok(self.menu(*role, snapshot).await),
        }
    }
}
