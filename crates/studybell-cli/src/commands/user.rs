use std::io::BufRead;

use clap::Subcommand;
use studybell_core::audio::Cue;
use studybell_core::storage::{Config, Database};
use tracing::info;

use super::{build_synth, require_user, CliResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create an account
    Register {
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in and remember the session
    Login {
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the current session
    Logout,
    /// Print the logged-in user
    Whoami,
}

fn password_or_stdin(password: Option<String>) -> CliResult<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    eprint!("password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn play(cue: Cue) {
    let Ok(config) = Config::load() else {
        return;
    };
    if let Ok(mut synth) = build_synth(&config) {
        synth.play(cue);
    }
}

pub fn run(action: UserAction) -> CliResult {
    let db = Database::open()?;
    match action {
        UserAction::Register { username, password } => {
            let password = password_or_stdin(password)?;
            db.register_user(&username, &password)?;
            db.set_current_user(username.trim())?;
            println!("registered {}", username.trim());
        }
        UserAction::Login { username, password } => {
            let password = password_or_stdin(password)?;
            if !db.authenticate(&username, &password)? {
                play(Cue::Error);
                return Err("wrong username or password".into());
            }
            db.set_current_user(username.trim())?;
            play(Cue::LoginSuccess);
            info!(username = username.trim(), "logged in");
            println!("logged in as {}", username.trim());
        }
        UserAction::Logout => {
            db.clear_current_user()?;
            println!("logged out");
        }
        UserAction::Whoami => {
            println!("{}", require_user(&db)?);
        }
    }
    Ok(())
}
