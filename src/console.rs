//! Line based terminal front end

use std::fmt::Write;
use std::str::FromStr;

use strum::IntoEnumIterator;

use crate::components::session::{SessionAction, SessionState};
use crate::components::talks::{FormField, TalkAction, TalkState};

pub const HELP: &str = "\
commands:
  name <text> | description <text> | speakerName <text> | speakerBio <text>
  create            create a talk from the form
  clear             clear the form
  delete <number>   delete a talk
  refresh           reload all talks
  signin | code <code> | signout
  show | help | quit";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Command {
    Set(FormField, String),
    Clear,
    Create,
    /// 1-based, as listed
    Delete(usize),
    Refresh,
    SignIn,
    Code(String),
    SignOut,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let field = match word {
            "speaker" => Some(FormField::SpeakerName),
            "bio" => Some(FormField::SpeakerBio),
            other => FormField::from_str(other).ok(),
        };
        if let Some(field) = field {
            return Ok(Command::Set(field, rest.to_string()));
        }
        match word {
            "create" => Ok(Command::Create),
            "clear" => Ok(Command::Clear),
            "delete" => rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Command::Delete)
                .ok_or_else(|| format!("Not a talk number: {rest:?}")),
            "refresh" => Ok(Command::Refresh),
            "signin" => Ok(Command::SignIn),
            "code" if !rest.is_empty() => Ok(Command::Code(rest.to_string())),
            "code" => Err("Missing code".to_string()),
            "signout" => Ok(Command::SignOut),
            "show" | "" => Ok(Command::Show),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command {other:?}")),
        }
    }
}

#[derive(Debug)]
pub enum Dispatch {
    Session(SessionAction),
    Talks(TalkAction),
    Show,
    Help,
    Quit,
    Invalid(String),
}

pub fn dispatch(command: Command, talks: &TalkState) -> Dispatch {
    match command {
        Command::Set(field, value) => Dispatch::Talks(TalkAction::SetField(field, value)),
        Command::Clear => Dispatch::Talks(TalkAction::ClearForm),
        Command::Create => Dispatch::Talks(TalkAction::Submit),
        Command::Delete(number) => match number.checked_sub(1).and_then(|i| talks.talks.at(i)) {
            Some(talk) => Dispatch::Talks(TalkAction::Remove(talk.id.clone())),
            None => Dispatch::Invalid(format!("There is no talk {number}")),
        },
        // a feed that ended is only restarted by mounting again
        Command::Refresh if !talks.mounted => Dispatch::Talks(TalkAction::Mount),
        Command::Refresh => Dispatch::Talks(TalkAction::Load),
        Command::SignIn => Dispatch::Session(SessionAction::SignIn),
        Command::Code(code) => Dispatch::Session(SessionAction::EnteredCode(code)),
        Command::SignOut => Dispatch::Session(SessionAction::SignOut),
        Command::Show => Dispatch::Show,
        Command::Help => Dispatch::Help,
        Command::Quit => Dispatch::Quit,
    }
}

pub fn render(session: &SessionState, talks: &TalkState) -> String {
    let mut out = String::new();
    if session.is_signed_in() {
        let greeting = session.greeting().unwrap_or_default();
        let _ = writeln!(out, "{greeting} (signout)");
    } else {
        let _ = writeln!(out, "Not signed in (signin)");
    }
    if let Some(ref error) = session.error_message {
        let _ = writeln!(out, "! {error}");
    }
    for field in FormField::iter() {
        let _ = writeln!(out, "  {field}: {}", talks.form.get(field));
    }
    if talks.loading {
        let _ = writeln!(out, "loading...");
    }
    for (index, talk) in talks.talks.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, talk.name);
        let _ = writeln!(out, "   {}", talk.speaker_bio);
        let _ = writeln!(out, "   {}", talk.description);
    }
    out
}
