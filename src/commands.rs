//! Line-oriented command surface for the terminal front end.

use crate::app::PagePause;
use crate::error::{PagePauseError, Result};
use crate::scheduler::Scheduler;
use crate::utils::format::{breaks_info, format_clock};

pub const HELP: &str = "\
commands:
  start | pause | resume | stop | status
  total <min> | focus <min> | break <min> | skip-breaks on|off
  remind <min> <text> | cancel <id> | dismiss | snooze | reminders
  task <text> | toggle <id> | delete <id> | tasks
  visits | visits reset | visits export | visits import <json>
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Status,
    Total(u32),
    Focus(u32),
    Break(u32),
    SkipBreaks(bool),
    Remind { minutes: u32, text: String },
    Cancel(i64),
    Dismiss,
    Snooze,
    Task(String),
    Toggle(i64),
    Delete(i64),
    Tasks,
    Reminders,
    Visits,
    ResetVisits,
    ExportVisits,
    ImportVisits(String),
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<T> {
    raw.and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| PagePauseError::InvalidInput(format!("expected a number for {what}")))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then_some(rest);

        let command = match word.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "status" => Command::Status,
            "total" => Command::Total(number(arg, "total")?),
            "focus" => Command::Focus(number(arg, "focus")?),
            "break" => Command::Break(number(arg, "break")?),
            "skip-breaks" => match rest {
                "on" => Command::SkipBreaks(true),
                "off" => Command::SkipBreaks(false),
                _ => {
                    return Err(PagePauseError::InvalidInput(
                        "skip-breaks takes on or off".into(),
                    ))
                }
            },
            "remind" => {
                let (minutes, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Remind {
                    minutes: number(Some(minutes), "remind")?,
                    text: text.trim().to_string(),
                }
            }
            "cancel" => Command::Cancel(number(arg, "cancel")?),
            "dismiss" => Command::Dismiss,
            "snooze" => Command::Snooze,
            "task" => Command::Task(rest.to_string()),
            "toggle" => Command::Toggle(number(arg, "toggle")?),
            "delete" => Command::Delete(number(arg, "delete")?),
            "tasks" => Command::Tasks,
            "reminders" => Command::Reminders,
            "visits" => {
                let (action, payload) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match action.to_ascii_lowercase().as_str() {
                    "" => Command::Visits,
                    "reset" => Command::ResetVisits,
                    "export" => Command::ExportVisits,
                    "import" if !payload.trim().is_empty() => {
                        Command::ImportVisits(payload.trim().to_string())
                    }
                    "import" => {
                        return Err(PagePauseError::InvalidInput(
                            "visits import takes the exported JSON".into(),
                        ))
                    }
                    other => {
                        return Err(PagePauseError::InvalidInput(format!(
                            "unknown visits action '{other}'"
                        )))
                    }
                }
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(PagePauseError::InvalidInput("empty command".into())),
            other => {
                return Err(PagePauseError::InvalidInput(format!(
                    "unknown command '{other}', try help"
                )))
            }
        };
        Ok(command)
    }
}

/// Run one command and render the reply.
pub fn execute<S: Scheduler>(app: &mut PagePause<S>, command: Command) -> std::result::Result<String, String> {
    let reply = match command {
        Command::Start => {
            app.start().map_err(|e| e.to_string())?;
            status(app)
        }
        Command::Pause => flag_reply(app.pause(), "paused", "timer is not running"),
        Command::Resume => flag_reply(app.resume(), "resumed", "timer is not paused"),
        Command::Stop => {
            app.stop();
            "stopped".to_string()
        }
        Command::Status => status(app),
        Command::Total(minutes) => reconfigure(app, |config| config.total_minutes = minutes),
        Command::Focus(minutes) => reconfigure(app, |config| config.focus_period_minutes = minutes),
        Command::Break(minutes) => reconfigure(app, |config| config.break_period_minutes = minutes),
        Command::SkipBreaks(on) => reconfigure(app, |config| config.skip_breaks = on),
        Command::Remind { minutes, text } => {
            let id = app.remind(&text, minutes).map_err(|e| e.to_string())?;
            format!("reminder {id} in {}", format_clock(u64::from(minutes) * 60))
        }
        Command::Cancel(id) => {
            app.cancel_reminder(id).map_err(|e| e.to_string())?;
            format!("reminder {id} cancelled")
        }
        Command::Dismiss => {
            app.dismiss().map_err(|e| e.to_string())?;
            "dismissed".to_string()
        }
        Command::Snooze => {
            let id = app.snooze().map_err(|e| e.to_string())?;
            format!("snoozed as reminder {id}")
        }
        Command::Task(text) => {
            let id = app.add_task(&text).map_err(|e| e.to_string())?;
            format!("task {id} added")
        }
        Command::Toggle(id) => {
            let done = app.toggle_task(id).map_err(|e| e.to_string())?;
            format!("task {id} {}", if done { "done" } else { "reopened" })
        }
        Command::Delete(id) => {
            app.delete_task(id).map_err(|e| e.to_string())?;
            format!("task {id} deleted")
        }
        Command::Tasks => list_tasks(app),
        Command::Reminders => list_reminders(app),
        Command::Visits => format!("page hits: {}", app.counter().count()),
        Command::ResetVisits => {
            app.reset_visits();
            "page hits reset".to_string()
        }
        Command::ExportVisits => app.export_visits().map_err(|e| e.to_string())?,
        Command::ImportVisits(raw) => {
            let count = app.import_visits(&raw).map_err(|e| e.to_string())?;
            format!("page hits: {count}")
        }
        Command::Help => HELP.to_string(),
        Command::Quit => "bye".to_string(),
    };
    Ok(reply)
}

fn flag_reply(changed: bool, ok: &str, noop: &str) -> String {
    let reply = if changed { ok } else { noop };
    reply.to_string()
}

fn reconfigure<S: Scheduler>(
    app: &mut PagePause<S>,
    edit: impl FnOnce(&mut crate::timer::TimerConfig),
) -> String {
    let mut config = *app.timer_config();
    edit(&mut config);
    let report = app.configure(config);
    let mut lines = vec![format!(
        "total {} min, focus {} min, break {} min: {} session(s). {}",
        report.config.total_minutes,
        report.config.focus_period_minutes,
        report.config.break_period_minutes,
        report.schedule.sessions,
        breaks_info(report.schedule.breaks)
    )];
    lines.extend(report.warnings.iter().map(|warning| format!("note: {warning}")));
    lines.join("\n")
}

fn status<S: Scheduler>(app: &PagePause<S>) -> String {
    let snapshot = app.snapshot();
    let counts = app.status_counts();
    let paused = if snapshot.is_paused { " (paused)" } else { "" };
    format!(
        "{} {}{} - {} | {} reminder(s), {} open task(s)",
        snapshot.clock,
        snapshot.segment_label,
        paused,
        snapshot.session_label,
        counts.reminders,
        counts.tasks
    )
}

fn list_tasks<S: Scheduler>(app: &PagePause<S>) -> String {
    if app.tasks().is_empty() {
        return "no tasks".to_string();
    }
    app.tasks()
        .iter()
        .map(|task| {
            let mark = if task.completed { "x" } else { " " };
            format!("[{mark}] {} {}", task.id, task.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_reminders<S: Scheduler>(app: &PagePause<S>) -> String {
    let reminders = app.reminders();
    if reminders.is_empty() {
        return "no reminders".to_string();
    }
    let now = app.now();
    reminders
        .reminders()
        .iter()
        .map(|reminder| {
            let state = if reminders.queue().contains(reminder.id) {
                "due".to_string()
            } else {
                format_clock(reminder.remaining_secs(now))
            };
            format!("{} [{state}] {}", reminder.id, reminder.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::NoopEffects;
    use crate::host::testing::t0;
    use crate::store::Storage;

    #[test]
    fn parses_arguments() {
        assert_eq!(Command::parse("  START "), Ok(Command::Start));
        assert_eq!(Command::parse("total 45"), Ok(Command::Total(45)));
        assert_eq!(
            Command::parse("remind 10 call   mum"),
            Ok(Command::Remind {
                minutes: 10,
                text: "call   mum".into()
            })
        );
        assert_eq!(Command::parse("skip-breaks on"), Ok(Command::SkipBreaks(true)));
        assert_eq!(Command::parse("toggle 1700000000000"), Ok(Command::Toggle(1_700_000_000_000)));
        assert_eq!(Command::parse("visits"), Ok(Command::Visits));
        assert_eq!(Command::parse("visits Reset"), Ok(Command::ResetVisits));
        assert_eq!(
            Command::parse("visits import {\"hitCount\": 4}"),
            Ok(Command::ImportVisits("{\"hitCount\": 4}".into()))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("focus").is_err());
        assert!(Command::parse("focus soon").is_err());
        assert!(Command::parse("skip-breaks maybe").is_err());
        assert!(Command::parse("fly").is_err());
        assert!(Command::parse("visits import").is_err());
        assert!(Command::parse("visits twice").is_err());
    }

    #[test]
    fn executes_against_the_app() {
        let (mut app, _clock) = PagePause::manual(t0(), Box::new(NoopEffects), Storage::in_memory());

        let reply = execute(&mut app, Command::Total(25)).unwrap();
        assert!(reply.contains("1 session(s)"), "{reply}");

        let reply = execute(&mut app, Command::Start).unwrap();
        assert!(reply.starts_with("20:00 Focus Session"), "{reply}");
        assert!(execute(&mut app, Command::Start).is_err());

        assert_eq!(execute(&mut app, Command::Pause).unwrap(), "paused");
        assert_eq!(execute(&mut app, Command::Pause).unwrap(), "timer is not running");

        assert!(execute(&mut app, Command::Remind { minutes: 0, text: "x".into() }).is_err());
        assert!(execute(&mut app, Command::Dismiss).is_err());
        assert_eq!(execute(&mut app, Command::Tasks).unwrap(), "no tasks");
    }

    #[test]
    fn oversized_total_is_clamped_not_fatal() {
        let (mut app, _clock) = PagePause::manual(t0(), Box::new(NoopEffects), Storage::in_memory());
        let reply = execute(&mut app, Command::parse("total 4294967295").unwrap()).unwrap();
        assert!(reply.starts_with("total 240 min"), "{reply}");
        assert_eq!(app.timer_config().total_minutes, 240);
    }

    #[test]
    fn visit_counter_commands() {
        let (mut app, _clock) = PagePause::manual(t0(), Box::new(NoopEffects), Storage::in_memory());
        app.record_visit();
        app.record_visit();

        let exported = execute(&mut app, Command::ExportVisits).unwrap();
        assert!(exported.contains("\"hitCount\": 2"), "{exported}");

        assert_eq!(execute(&mut app, Command::ResetVisits).unwrap(), "page hits reset");
        assert_eq!(execute(&mut app, Command::Visits).unwrap(), "page hits: 0");

        let reply = execute(&mut app, Command::parse(&format!("visits import {exported}")).unwrap()).unwrap();
        assert_eq!(reply, "page hits: 2");
        assert!(execute(&mut app, Command::ImportVisits("[]".into())).is_err());
    }
}
