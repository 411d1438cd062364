use crate::config::{ReminderStyle, Settings, WindowSize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderResponse {
    TakeBreak,
    Snooze,
    Pause,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Presentation {
    Notification,
    ImagePopup {
        image_url: String,
        style: ReminderStyle,
        window: WindowSize,
        auto_close_seconds: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReminderEvent {
    Started,
    Stopped,
    Due {
        message: String,
        presentation: Presentation,
    },
    RestTaken {
        minutes: u32,
    },
    Snoozed {
        until: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { cycle_start: u64 },
    Snoozed { until: u64 },
}

/// Repeating reminder timer driven by the caller's clock.
///
/// All timestamps are unix seconds. The engine never sleeps; the host
/// calls [`ReminderEngine::tick`] periodically and acts on the events.
#[derive(Clone, Debug)]
pub struct ReminderEngine {
    settings: Settings,
    phase: Phase,
    /// Set while a `Due` reminder is waiting for a response.
    pending: bool,
}

impl ReminderEngine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            phase: Phase::Idle,
            pending: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    pub fn snoozed_until(&self) -> Option<u64> {
        match self.phase {
            Phase::Snoozed { until } => Some(until),
            _ => None,
        }
    }

    pub fn start(&mut self, now_unix: u64) -> Vec<ReminderEvent> {
        self.phase = Phase::Running {
            cycle_start: now_unix,
        };
        self.pending = false;
        vec![ReminderEvent::Started]
    }

    pub fn stop(&mut self) -> Vec<ReminderEvent> {
        if self.phase == Phase::Idle {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        self.pending = false;
        vec![ReminderEvent::Stopped]
    }

    /// Replaces the settings; a running engine restarts its cycle so a new
    /// interval takes effect immediately.
    pub fn apply_settings(&mut self, settings: Settings, now_unix: u64) -> Vec<ReminderEvent> {
        self.settings = settings;
        if self.is_running() {
            self.start(now_unix)
        } else {
            Vec::new()
        }
    }

    pub fn tick(&mut self, now_unix: u64) -> Vec<ReminderEvent> {
        match self.phase {
            Phase::Idle => Vec::new(),
            Phase::Snoozed { until } => {
                if now_unix >= until {
                    self.start(now_unix)
                } else {
                    Vec::new()
                }
            }
            Phase::Running { cycle_start } => {
                if now_unix.saturating_sub(cycle_start) < self.settings.interval_seconds() {
                    return Vec::new();
                }
                self.phase = Phase::Running {
                    cycle_start: now_unix,
                };
                self.pending = true;
                vec![self.due_event()]
            }
        }
    }

    /// A break is only counted in answer to a reminder that fired; with
    /// nothing pending `TakeBreak` yields no events.
    pub fn respond(&mut self, response: ReminderResponse, now_unix: u64) -> Vec<ReminderEvent> {
        match response {
            ReminderResponse::TakeBreak => {
                if !self.pending {
                    return Vec::new();
                }
                self.pending = false;
                if self.is_running() {
                    self.phase = Phase::Running {
                        cycle_start: now_unix,
                    };
                }
                vec![ReminderEvent::RestTaken {
                    minutes: self.settings.interval_minutes,
                }]
            }
            ReminderResponse::Snooze => {
                let until = now_unix.saturating_add(self.settings.snooze_seconds());
                self.phase = Phase::Snoozed { until };
                self.pending = false;
                vec![ReminderEvent::Snoozed { until }]
            }
            ReminderResponse::Pause => self.stop(),
        }
    }

    /// Seconds until the next reminder, `None` when not running.
    pub fn remaining_seconds(&self, now_unix: u64) -> Option<u64> {
        match self.phase {
            Phase::Running { cycle_start } => Some(
                self.settings
                    .interval_seconds()
                    .saturating_sub(now_unix.saturating_sub(cycle_start)),
            ),
            _ => None,
        }
    }

    fn due_event(&self) -> ReminderEvent {
        let presentation = if self.settings.wants_image_popup() {
            Presentation::ImagePopup {
                image_url: self.settings.image_url.clone(),
                style: self.settings.reminder_style,
                window: self.settings.window_size,
                auto_close_seconds: self.settings.auto_close_seconds,
            }
        } else {
            Presentation::Notification
        };
        ReminderEvent::Due {
            message: self.settings.render_message(),
            presentation,
        }
    }
}
