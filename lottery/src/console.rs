//! Line-oriented operator console.
//!
//! The console never blocks: confirmations and multi-line paste are kept as
//! pending input state, so fired timers and draw events keep flowing while
//! the operator is typing.

use anyhow::Result;
use log::{debug, warn};
use shared::LotteryEvent;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

use crate::backend::domain::commands::roster::{AddParticipantCommand, EditParticipantCommand};
use crate::backend::domain::models::{Participant, Tag};
use crate::backend::domain::{StartOutcome, StopOutcome, TagResolver};
use crate::backend::scheduling::{Scheduler, TimerId};
use crate::backend::Backend;

pub const HELP: &str = "\
Commands:
  add <name> [tag]            add a participant at the door (checked in)
  import <file>               import one `name [tag]` per line (checked out)
  paste                       import lines typed until a lone `.`
  checkin <no|id>             toggle check-in
  edit <no|id> <name> [tag]   change name and tag
  note <no|id> [text]         set or clear the note
  delete <no|id>              remove a participant
  reset                       remove everyone
  list [query]                show the roster, optionally filtered
  stats                       show counters
  winners                     show winners
  draw                        start a draw
  stop                        stop the draw and pick the winner
  export [dir]                write the roster as CSV
  help                        show this text
  quit                        leave";

/// How a participant is addressed on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Number(u32),
    Id(String),
}

impl Target {
    fn parse(token: &str) -> Self {
        match token.parse::<u32>() {
            Ok(number) => Target::Number(number),
            Err(_) => Target::Id(token.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Name followed by an optional trailing tag token
    Add { text: String },
    Import { path: PathBuf },
    Paste,
    CheckIn(Target),
    Edit { target: Target, text: String },
    Note { target: Target, text: String },
    Delete(Target),
    Reset,
    List { query: String },
    Stats,
    Winners,
    Draw,
    Stop,
    Export { dir: Option<String> },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    if word.is_empty() {
        return Ok(None);
    }

    let target_and_text = |usage: &'static str| -> Result<(Target, String), ParseError> {
        let (target, text) = match rest.split_once(char::is_whitespace) {
            Some((target, text)) => (target, text.trim()),
            None => (rest, ""),
        };
        if target.is_empty() {
            return Err(ParseError::Usage(usage));
        }
        Ok((Target::parse(target), text.to_string()))
    };

    let command = match word.to_lowercase().as_str() {
        "add" if rest.is_empty() => return Err(ParseError::Usage("add <name> [tag]")),
        "add" => Command::Add {
            text: rest.to_string(),
        },
        "import" if rest.is_empty() => return Err(ParseError::Usage("import <file>")),
        "import" => Command::Import {
            path: PathBuf::from(rest),
        },
        "paste" => Command::Paste,
        "checkin" | "check" => Command::CheckIn(target_and_text("checkin <no|id>")?.0),
        "edit" => {
            let (target, text) = target_and_text("edit <no|id> <name> [tag]")?;
            if text.is_empty() {
                return Err(ParseError::Usage("edit <no|id> <name> [tag]"));
            }
            Command::Edit { target, text }
        }
        "note" => {
            let (target, text) = target_and_text("note <no|id> [text]")?;
            Command::Note { target, text }
        }
        "delete" | "del" => Command::Delete(target_and_text("delete <no|id>")?.0),
        "reset" => Command::Reset,
        "list" | "ls" => Command::List {
            query: rest.to_string(),
        },
        "stats" => Command::Stats,
        "winners" => Command::Winners,
        "draw" | "start" => Command::Draw,
        "stop" => Command::Stop,
        "export" => Command::Export {
            dir: (!rest.is_empty()).then(|| rest.to_string()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Split `name words [tag]`: the last token is the tag when it resolves and
/// there is something left over for the name.
pub fn split_name_and_tag(text: &str, resolver: &TagResolver) -> (String, Option<Tag>) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if let [name @ .., last] = tokens.as_slice() {
        if !name.is_empty() {
            if let Some(tag) = resolver.resolve(last) {
                return (name.join(" "), Some(tag));
            }
        }
    }
    (tokens.join(" "), None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingInput {
    Paste(String),
    ConfirmDelete { id: String },
    ConfirmReset,
}

pub struct Console<S: Scheduler> {
    backend: Backend<S>,
    pending: Option<PendingInput>,
    /// A candidate line is on screen without a trailing newline
    ticker_open: bool,
}

impl<S: Scheduler> Console<S> {
    pub fn new(backend: Backend<S>) -> Self {
        Self {
            backend,
            pending: None,
            ticker_open: false,
        }
    }

    pub fn backend(&self) -> &Backend<S> {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut Backend<S> {
        &mut self.backend
    }

    pub fn prompt(&self) -> &'static str {
        match self.pending {
            Some(PendingInput::Paste(_)) => "paste> ",
            Some(_) => "[y/N] ",
            None => "> ",
        }
    }

    pub fn print_banner(&mut self, out: &mut impl Write) -> Result<()> {
        let stats = self.backend.roster_service.stats();
        writeln!(out, "Event lottery. Type 'help' for commands.")?;
        writeln!(
            out,
            "{} participants, {} checked in, {} winners",
            stats.total, stats.checked_in, stats.winners
        )?;
        Ok(())
    }

    pub fn on_timer(&mut self, id: TimerId) {
        self.backend.on_timer(id);
    }

    /// Abandon any draw in flight
    pub fn shutdown(&mut self) {
        self.backend.draw_controller.teardown();
    }

    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<Flow> {
        self.close_ticker(out)?;

        match self.pending.take() {
            Some(PendingInput::Paste(mut buffer)) => {
                if line.trim() == "." {
                    let imported = self.backend.roster_service.import_batch(&buffer);
                    writeln!(out, "Imported {} participants", imported.len())?;
                } else {
                    buffer.push_str(line);
                    buffer.push('\n');
                    self.pending = Some(PendingInput::Paste(buffer));
                }
                return Ok(Flow::Continue);
            }
            Some(PendingInput::ConfirmDelete { id }) => {
                if is_yes(line) {
                    match self.backend.roster_service.delete_participant(&id) {
                        Some(removed) => writeln!(out, "Deleted {}", describe(&removed))?,
                        None => writeln!(out, "Participant is already gone")?,
                    }
                } else {
                    writeln!(out, "Cancelled")?;
                }
                return Ok(Flow::Continue);
            }
            Some(PendingInput::ConfirmReset) => {
                if is_yes(line) {
                    self.backend.roster_service.reset();
                    writeln!(out, "Roster cleared")?;
                } else {
                    writeln!(out, "Cancelled")?;
                }
                return Ok(Flow::Continue);
            }
            None => {}
        }

        match parse_command(line) {
            Ok(Some(command)) => self.dispatch(command, out),
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                writeln!(out, "{}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, command: Command, out: &mut impl Write) -> Result<Flow> {
        debug!("Console command: {:?}", command);
        let roster = &mut self.backend.roster_service;

        match command {
            Command::Add { text } => {
                let (name, tag) = split_name_and_tag(&text, roster.resolver());
                match roster.add_participant(AddParticipantCommand { name, tag }) {
                    Some(added) => writeln!(out, "Added {}", describe(&added))?,
                    None => writeln!(out, "Name must not be empty")?,
                }
            }
            Command::Import { path } => match fs::read_to_string(&path) {
                Ok(text) => {
                    let imported = roster.import_batch(&text);
                    writeln!(out, "Imported {} participants", imported.len())?;
                }
                Err(e) => {
                    warn!("Failed to read import file {}: {}", path.display(), e);
                    writeln!(out, "Cannot read {}: {}", path.display(), e)?;
                }
            },
            Command::Paste => {
                writeln!(out, "Paste one `name [tag]` per line, finish with a lone '.'")?;
                self.pending = Some(PendingInput::Paste(String::new()));
            }
            Command::CheckIn(target) => match self.resolve(&target) {
                Some(id) => {
                    if let Some(updated) = self.backend.roster_service.toggle_check_in(&id) {
                        let state = if updated.is_checked_in { "in" } else { "out" };
                        writeln!(out, "{} checked {}", describe(&updated), state)?;
                    }
                }
                None => writeln!(out, "No participant {}", show_target(&target))?,
            },
            Command::Edit { target, text } => match self.resolve(&target) {
                Some(participant_id) => {
                    let roster = &mut self.backend.roster_service;
                    let (name, tag) = split_name_and_tag(&text, roster.resolver());
                    match roster.edit_participant(EditParticipantCommand {
                        participant_id,
                        name,
                        tag,
                    }) {
                        Some(updated) => writeln!(out, "Updated {}", describe(&updated))?,
                        None => writeln!(out, "Name must not be empty")?,
                    }
                }
                None => writeln!(out, "No participant {}", show_target(&target))?,
            },
            Command::Note { target, text } => match self.resolve(&target) {
                Some(id) => {
                    if let Some(updated) = self.backend.roster_service.set_note(&id, &text) {
                        writeln!(out, "Note saved for {}", describe(&updated))?;
                    }
                }
                None => writeln!(out, "No participant {}", show_target(&target))?,
            },
            Command::Delete(target) => match self.resolve(&target) {
                Some(id) => {
                    if let Some(participant) = self.backend.roster_service.get(&id) {
                        write!(out, "Delete {}? ", describe(participant))?;
                        writeln!(out, "[y/N]")?;
                        self.pending = Some(PendingInput::ConfirmDelete { id });
                    }
                }
                None => writeln!(out, "No participant {}", show_target(&target))?,
            },
            Command::Reset => {
                let total = roster.participants().len();
                writeln!(out, "Remove all {} participants? [y/N]", total)?;
                self.pending = Some(PendingInput::ConfirmReset);
            }
            Command::List { query } => {
                let stats = roster.stats();
                writeln!(out, "Checked in {}/{}", stats.checked_in, stats.total)?;
                for participant in roster.filter(&query) {
                    writeln!(out, "{}", list_row(participant))?;
                }
            }
            Command::Stats => {
                let stats = roster.stats();
                writeln!(
                    out,
                    "total {}  checked in {}  winners {}  eligible {}",
                    stats.total, stats.checked_in, stats.winners, stats.eligible
                )?;
            }
            Command::Winners => {
                let winners = roster.winners();
                if winners.is_empty() {
                    writeln!(out, "No winners yet")?;
                }
                for winner in winners {
                    writeln!(out, "{}", describe(winner))?;
                }
            }
            Command::Draw => {
                if self.backend.start_draw() == StartOutcome::AlreadyRunning {
                    writeln!(out, "A draw is already running")?;
                }
            }
            Command::Stop => match self.backend.draw_controller.stop() {
                StopOutcome::Stopping => {}
                StopOutcome::Abandoned => writeln!(out, "Draw abandoned")?,
                StopOutcome::NotDrawing => writeln!(out, "No draw is running")?,
            },
            Command::Export { dir } => {
                let response = self
                    .backend
                    .export_service
                    .export_to_path(&self.backend.roster_service, dir.as_deref())?;
                writeln!(out, "{}", response.message)?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Print a presentation event
    pub fn render_event(&mut self, event: &LotteryEvent, out: &mut impl Write) -> Result<()> {
        match event {
            LotteryEvent::RosterChanged => {}
            LotteryEvent::DrawStarted { pool_size } => {
                self.close_ticker(out)?;
                writeln!(out, "Drawing from {} participants, type 'stop' to pick", pool_size)?;
            }
            LotteryEvent::CandidateUpdated { number, name } => {
                write!(out, "\r  #{}  {:<24}", number, name)?;
                self.ticker_open = true;
            }
            LotteryEvent::DrawStopping => {}
            LotteryEvent::WinnerCommitted(_) => {}
            LotteryEvent::WinnerRevealed(record) => {
                self.close_ticker(out)?;
                let number = shared::format_display_number(record.number);
                writeln!(out, "*** Winner: #{}  {} ***", number, record.name)?;
            }
            LotteryEvent::NoEligibleParticipants => {
                self.close_ticker(out)?;
                writeln!(out, "No eligible participants: check someone in first")?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn close_ticker(&mut self, out: &mut impl Write) -> Result<()> {
        if self.ticker_open {
            writeln!(out)?;
            self.ticker_open = false;
        }
        Ok(())
    }

    fn resolve(&self, target: &Target) -> Option<String> {
        let roster = &self.backend.roster_service;
        let found = match target {
            Target::Number(number) => roster.find_by_number(*number),
            Target::Id(id) => roster.get(id),
        };
        found.map(|participant| participant.id.clone())
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

fn show_target(target: &Target) -> String {
    match target {
        Target::Number(number) => format!("#{}", shared::format_display_number(*number)),
        Target::Id(id) => id.clone(),
    }
}

fn describe(participant: &Participant) -> String {
    format!("#{} {}", participant.display_number(), participant.name)
}

fn list_row(participant: &Participant) -> String {
    let mut row = format!(
        "#{}  {:<16} {:<6} {}",
        participant.display_number(),
        participant.name,
        participant.tag_label(),
        if participant.is_checked_in { "in " } else { "out" }
    );
    if let Some(time) = &participant.checkin_time {
        row.push_str(&format!("  {}", time));
    }
    if participant.is_winner {
        row.push_str("  [winner]");
    }
    if !participant.note.is_empty() {
        row.push_str(&format!("  ({})", participant.note));
    }
    row
}
