use std::time::Duration;

use chrono::Utc;
use notify_rust::{Notification, Timeout};
use respite_core::reminder::{Presentation, ReminderEngine, ReminderEvent, ReminderResponse};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::{App, AppError, report};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WatchCommand {
    Respond(ReminderResponse),
    Start,
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<WatchCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "rest" => Some(WatchCommand::Respond(ReminderResponse::TakeBreak)),
        "s" | "snooze" => Some(WatchCommand::Respond(ReminderResponse::Snooze)),
        "p" | "pause" => Some(WatchCommand::Respond(ReminderResponse::Pause)),
        "start" => Some(WatchCommand::Start),
        "" | "status" => Some(WatchCommand::Status),
        "q" | "quit" | "exit" => Some(WatchCommand::Quit),
        _ => None,
    }
}

fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Why the watch loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WatchExit {
    Quit,
    Shutdown,
}

pub fn run(app: &App) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let exit = runtime.block_on(watch_loop(app, input, shutdown))?;
    tracing::debug!(?exit, "watch loop finished");
    Ok(())
}

/// Ticks the reminder engine every second until `shutdown` resolves or a
/// quit command arrives. Closed input only stops command reading.
async fn watch_loop<R, F>(app: &App, input: R, shutdown: F) -> Result<WatchExit, AppError>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut engine = ReminderEngine::new(app.settings.clone());
    if app.settings.auto_start {
        let events = engine.start(now_unix());
        handle_events(app, &engine, events)?;
    } else {
        println!("Reminders are not running. Type 'start' to begin.");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    let exit = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let events = engine.tick(now_unix());
                handle_events(app, &engine, events)?;
            }
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    tracing::debug!("input closed, reminders keep running until Ctrl-C");
                    input_open = false;
                    continue;
                };
                let events = match parse_command(&line) {
                    Some(WatchCommand::Respond(response)) => {
                        let events = engine.respond(response, now_unix());
                        if events.is_empty() && response == ReminderResponse::TakeBreak {
                            println!("No reminder is waiting for a break.");
                        }
                        events
                    }
                    Some(WatchCommand::Start) => engine.start(now_unix()),
                    Some(WatchCommand::Status) => {
                        print_status(app, &engine)?;
                        Vec::new()
                    }
                    Some(WatchCommand::Quit) => break WatchExit::Quit,
                    None => {
                        println!("Commands: r(est), s(nooze), p(ause), start, status, q(uit)");
                        Vec::new()
                    }
                };
                handle_events(app, &engine, events)?;
            }
            _ = &mut shutdown => break WatchExit::Shutdown,
        }
    };

    let _ = engine.stop();
    Ok(exit)
}

fn handle_events(
    app: &App,
    engine: &ReminderEngine,
    events: Vec<ReminderEvent>,
) -> Result<(), AppError> {
    for event in events {
        match event {
            ReminderEvent::Started => {
                tracing::info!(interval = engine.settings().interval_minutes, "reminders started");
                print_status(app, engine)?;
            }
            ReminderEvent::Stopped => println!("Reminders paused. Type 'start' to resume."),
            ReminderEvent::Due {
                message,
                presentation,
            } => {
                println!("{message}");
                println!("  [r] take a break   [s] snooze   [p] pause");
                notify(&message, &presentation);
            }
            ReminderEvent::RestTaken { minutes } => {
                if app.settings.enable_statistics {
                    app.manager.record_rest(minutes)?;
                } else {
                    tracing::debug!("statistics disabled, rest not recorded");
                }
                print_status(app, engine)?;
            }
            ReminderEvent::Snoozed { until } => {
                let minutes = until.saturating_sub(now_unix()).div_ceil(60);
                println!("Next reminder in {minutes} min.");
            }
        }
    }
    Ok(())
}

fn print_status(app: &App, engine: &ReminderEngine) -> Result<(), AppError> {
    let today = app.manager.summary()?.today.count;
    println!(
        "{}",
        report::status_line(today, engine.remaining_seconds(now_unix()))
    );
    Ok(())
}

fn notify(message: &str, presentation: &Presentation) {
    let mut notification = Notification::new();
    notification.summary("Respite").body(message);
    if let Presentation::ImagePopup {
        image_url,
        auto_close_seconds,
        ..
    } = presentation
    {
        notification.body(&format!("{message}\n{image_url}"));
        if *auto_close_seconds > 0 {
            notification.timeout(Timeout::Milliseconds(auto_close_seconds.saturating_mul(1000)));
        }
    }
    if let Err(e) = notification.show() {
        tracing::warn!(error = %e, "desktop notification failed");
    }
}
