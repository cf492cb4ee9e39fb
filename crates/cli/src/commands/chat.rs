//! Interactive interview on stdin/stdout, wired to the in-process runtime
//! with the deterministic template phrasing.

use std::io::{self, BufRead, Write};

use cotiza_agent::collaborators::{PendingQuestion, PhrasingService, TemplatePhrasing};
use cotiza_agent::runtime::{IntakeRuntime, TurnReply};
use cotiza_agent::session::SessionId;

use crate::commands::CommandResult;

const EXIT_WORDS: [&str; 3] = ["salir", "adios", "exit"];

pub fn run() -> CommandResult {
    let runtime = IntakeRuntime::new();
    let phrasing = TemplatePhrasing;

    let blocking = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(blocking) => blocking,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            )
        }
    };

    let opened = match runtime.open_session() {
        Ok(opened) => opened,
        Err(error) => return CommandResult::failure("chat", "session_open", error.to_string(), 4),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "Cotiza Arquitectos — cotización guiada (escriba `salir` para terminar)");
    say(&mut out, &phrase(&blocking, &phrasing, &runtime, &opened.session_id, &opened.pending));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => return CommandResult::failure("chat", "stdin", error.to_string(), 4),
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&text.to_lowercase().as_str()) {
            break;
        }

        match runtime.submit_turn(&opened.session_id, text) {
            Ok(TurnReply::NextQuestion { pending }) => {
                say(
                    &mut out,
                    &phrase(&blocking, &phrasing, &runtime, &opened.session_id, &pending),
                );
            }
            Ok(TurnReply::StillPending { pending, clarification }) => {
                say(&mut out, &clarification);
                say(&mut out, &pending.prompt);
            }
            Ok(TurnReply::Redirected { redirect, pending }) => {
                say(&mut out, &redirect);
                say(&mut out, &pending.prompt);
            }
            Ok(TurnReply::Completed { closing, .. }) => {
                say(&mut out, &closing);
            }
            Err(error) => return CommandResult::failure("chat", "turn", error.to_string(), 5),
        }
    }

    CommandResult::success("chat", "interview session closed")
}

fn phrase(
    blocking: &tokio::runtime::Runtime,
    phrasing: &TemplatePhrasing,
    runtime: &IntakeRuntime,
    session_id: &SessionId,
    pending: &PendingQuestion,
) -> String {
    let record = match runtime.record(session_id) {
        Ok(snapshot) => snapshot.record,
        Err(_) => return pending.prompt.clone(),
    };
    blocking
        .block_on(phrasing.phrase(pending, &record))
        .unwrap_or_else(|_| pending.prompt.clone())
}

fn say(out: &mut impl Write, text: &str) {
    let _ = writeln!(out, "> {text}");
}
