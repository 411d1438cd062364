use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TIME_PLACEHOLDER: &str = "{time}";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStyle {
    #[default]
    Compact,
    Full,
    Notification,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl WindowSize {
    /// Popup width and height in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            WindowSize::Small => (400, 300),
            WindowSize::Medium => (600, 400),
            WindowSize::Large => (800, 600),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interval_minutes: u32,
    pub snooze_minutes: u32,
    pub message: String,
    pub show_image: bool,
    pub image_url: String,
    pub reminder_style: ReminderStyle,
    pub auto_close_seconds: u32,
    pub window_size: WindowSize,
    pub enable_statistics: bool,
    pub auto_start: bool,
    /// Offset used to decide which calendar day and week a rest falls in.
    pub utc_offset_minutes: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            snooze_minutes: 5,
            message: "Time for a break! You have been working for {time} minutes".to_string(),
            show_image: true,
            image_url: String::new(),
            reminder_style: ReminderStyle::Compact,
            auto_close_seconds: 10,
            window_size: WindowSize::Medium,
            enable_statistics: true,
            auto_start: true,
            utc_offset_minutes: 0,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        validate_interval(i64::from(self.interval_minutes))?;
        if self.snooze_minutes == 0 {
            return Err(Error::invalid("snooze_minutes must be greater than 0"));
        }
        validate_image_url(&self.image_url)?;
        self.bucket_offset()?;
        Ok(())
    }

    pub fn interval_seconds(&self) -> u64 {
        u64::from(self.interval_minutes) * 60
    }

    pub fn snooze_seconds(&self) -> u64 {
        u64::from(self.snooze_minutes) * 60
    }

    /// Reminder text with `{time}` replaced by the interval.
    pub fn render_message(&self) -> String {
        self.message
            .replacen(TIME_PLACEHOLDER, &self.interval_minutes.to_string(), 1)
    }

    /// Whether a due reminder should open an image popup rather than a
    /// plain notification.
    pub fn wants_image_popup(&self) -> bool {
        self.reminder_style != ReminderStyle::Notification
            && self.show_image
            && !self.image_url.is_empty()
    }

    pub fn bucket_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(|| {
            Error::invalid(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

pub fn validate_interval(minutes: i64) -> Result<u32> {
    if minutes <= 0 {
        return Err(Error::invalid("interval must be a number greater than 0"));
    }
    u32::try_from(minutes).map_err(|_| Error::invalid(format!("interval too large: {minutes}")))
}

/// An empty URL clears the image; anything else must be http(s).
pub fn validate_image_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() => Ok(()),
        _ => Err(Error::invalid(format!(
            "image url must start with http:// or https://: {url}"
        ))),
    }
}
