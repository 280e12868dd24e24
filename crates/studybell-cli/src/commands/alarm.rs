use clap::Subcommand;
use studybell_core::audio::{AlarmStyle, Cue};
use studybell_core::storage::{data_dir, Config};

use super::{build_synth, CliResult};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Render and play an alarm (the configured style by default)
    Play { style: Option<AlarmStyle> },
    /// Choose the alarm style used by reminders
    Set { style: AlarmStyle },
    /// List alarm styles, marking the current one
    List,
}

pub fn run(action: AlarmAction) -> CliResult {
    let mut config = Config::load()?;
    match action {
        AlarmAction::Play { style } => {
            let style = style.unwrap_or(config.alarm.style);
            let mut synth = build_synth(&config)?;
            synth.try_play(Cue::Alarm(style))?;
            println!(
                "{} ({:.1}s) -> {}",
                style,
                Cue::Alarm(style).duration_s(),
                config.alarm_output_path(&data_dir()?).display()
            );
        }
        AlarmAction::Set { style } => {
            config.alarm.style = style;
            config.save()?;
            println!("alarm style: {style}");
        }
        AlarmAction::List => {
            for style in AlarmStyle::ALL {
                let mark = if style == config.alarm.style { "*" } else { " " };
                println!("{mark} {style}");
            }
        }
    }
    Ok(())
}
