use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::Args;
use studybell_core::dispatch::NotificationPermission;
use studybell_core::reminder::AlarmStyleHandle;
use studybell_core::storage::{Config, Database, UserScheduleSource};
use studybell_core::{
    AlertDispatcher, AlertEvent, AlertKind, IntervalScheduler, ReminderEngine, SystemClock,
    ThreadScheduler,
};
use tracing::info;

use super::{build_synth, require_user, CliResult};
use crate::notifier::TerminalNotifier;

/// How often the active alert is checked for printing.
const RENDER_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Args)]
pub struct WatchArgs {
    /// Tick interval override in milliseconds (1-60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=60_000))]
    interval_ms: Option<u64>,
}

/// What identifies a printed alert. A pre-alert and the start alert of the
/// same class share a dedup tag, so the kind and firing time count too.
type AlertId = (String, AlertKind, NaiveDateTime);

fn alert_id(event: &AlertEvent) -> AlertId {
    (event.dedup_tag.clone(), event.kind, event.fired_at)
}

/// Text to print for the slot's current alert, if it has not been printed.
fn next_render(shown: &mut Option<AlertId>, current: Option<&AlertEvent>) -> Option<String> {
    let Some(event) = current else {
        *shown = None;
        return None;
    };
    let id = alert_id(event);
    if shown.as_ref() == Some(&id) {
        return None;
    }
    *shown = Some(id);
    Some(render(event))
}

fn render(event: &AlertEvent) -> String {
    format!(
        "[{}] {}\n  {}\n  (Enter to dismiss, q to quit)",
        event.fired_at.format("%H:%M"),
        event.title,
        event.message
    )
}

pub fn run(args: WatchArgs) -> CliResult {
    let mut config = Config::load()?;
    let db = Database::open()?;
    let username = require_user(&db)?;

    let permission = if config.notifications.enabled {
        config.notifications.permission
    } else {
        NotificationPermission::Denied
    };
    let mut dispatcher = AlertDispatcher::new(
        Box::new(build_synth(&config)?),
        Box::new(TerminalNotifier::new(permission)),
    );
    if let Some(icon) = &config.notifications.icon {
        dispatcher = dispatcher.with_icon(icon.clone());
    }

    let engine = ReminderEngine::new(
        Arc::new(SystemClock),
        Box::new(UserScheduleSource::new(db, username.clone())),
        dispatcher,
    )
    .with_alarm_style(AlarmStyleHandle::new(config.alarm.style));

    let interval = Duration::from_millis(args.interval_ms.unwrap_or(config.reminders.tick_interval_ms));
    let running = engine.start(&ThreadScheduler, interval)?;

    let answered = running.with_engine(|e| e.dispatcher().permission());
    if config.notifications.enabled && answered != config.notifications.permission {
        config.notifications.permission = answered;
        config.save()?;
    }

    let slot = running.slot();
    let mut shown = None;
    let renderer = ThreadScheduler.every(
        RENDER_INTERVAL,
        Box::new(move || {
            if let Some(text) = next_render(&mut shown, slot.current().as_ref()) {
                println!("{text}");
            }
        }),
    )?;

    info!(user = %username, ?interval, "watching schedule");
    println!("watching schedule for {username}; q to quit");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) if line.trim() == "q" => break,
            Ok(_) => running.dismiss(),
        }
    }

    renderer.cancel();
    running.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use studybell_core::reminder::DedupKey;
    use studybell_core::testing::{entry, monday_at};
    use studybell_core::Weekday;

    #[derive(Parser)]
    struct Cmd {
        #[command(flatten)]
        args: WatchArgs,
    }

    fn alert(kind: AlertKind, h: u32, m: u32) -> AlertEvent {
        let e = entry("a", "Math", Weekday::Monday, "07:00", "08:00");
        AlertEvent::new(kind, &e, &DedupKey::for_entry(&e), monday_at(h, m, 0))
    }

    #[test]
    fn render_shows_time_title_and_message() {
        let text = render(&alert(AlertKind::Start, 7, 0));
        assert!(text.starts_with("[07:00] ĐÃ ĐẾN GIỜ HỌC!"));
        assert!(text.contains("Môn học: Math"));
    }

    #[test]
    fn start_alert_replacing_pre_alert_is_printed() {
        let pre = alert(AlertKind::PreAlert, 6, 55);
        let start = alert(AlertKind::Start, 7, 0);
        assert_eq!(pre.dedup_tag, start.dedup_tag);

        let mut shown = None;
        assert!(next_render(&mut shown, Some(&pre)).unwrap().contains("SẮP ĐẾN GIỜ HỌC"));
        assert!(next_render(&mut shown, Some(&pre)).is_none());
        assert!(next_render(&mut shown, Some(&start)).unwrap().contains("ĐÃ ĐẾN GIỜ HỌC!"));
        assert!(next_render(&mut shown, Some(&start)).is_none());
    }

    #[test]
    fn dismissed_alert_forgets_what_was_shown() {
        let start = alert(AlertKind::Start, 7, 0);
        let mut shown = None;
        next_render(&mut shown, Some(&start));
        assert!(next_render(&mut shown, None).is_none());
        assert!(shown.is_none());
    }

    #[test]
    fn interval_must_be_within_a_minute() {
        assert!(Cmd::try_parse_from(["watch", "--interval-ms", "0"]).is_err());
        assert!(Cmd::try_parse_from(["watch", "--interval-ms", "60001"]).is_err());
        let ok = Cmd::try_parse_from(["watch", "--interval-ms", "500"]).unwrap();
        assert_eq!(ok.args.interval_ms, Some(500));
    }
}
