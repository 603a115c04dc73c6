use rustyline::{DefaultEditor, error::ReadlineError};

use crate::session::Session;

fn print_repl_help() {
    eprintln!("Commands: :quit | :exit | :q, :help (session commands: help)");
}

/// Interactive loop over one session. Errors are reported and the session
/// keeps its state.
pub fn run(mut session: Session, show_banner: bool) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;

    if show_banner {
        println!("tagvm REPL. Type :help for help.");
    }

    loop {
        let prompt = format!("tagvm[{}]> ", session.state().get_top());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C clears the line
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                return Ok(());
            }
            Err(e) => {
                eprintln!("Readline error: {}", e);
                continue;
            }
        };

        let trimmed = line.trim();
        match trimmed {
            "" => continue,
            ":quit" | ":exit" | ":q" => return Ok(()),
            ":help" => {
                print_repl_help();
                continue;
            }
            _ => {}
        }
        let _ = rl.add_history_entry(trimmed);

        match session.exec_line(trimmed) {
            Ok(Some(out)) => println!("{out}"),
            Ok(None) => {}
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }
}
