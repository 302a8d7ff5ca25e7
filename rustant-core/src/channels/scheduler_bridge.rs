//! Smart Scheduling bridge for channel intelligence.
//!
//! Bridges classified messages to the cron scheduler system and generates
//! ICS calendar files for follow-up reminders.
//!
//! # Scheduling Flow
//!
//! 1. Message classified as `SuggestedAction::ScheduleFollowUp { minutes }`
//! 2. `SchedulerBridge.schedule_followup()` creates a `FollowUpReminder`
//! 3. Reminder is persisted to `.rustant/reminders/index.json`
//! 4. An ICS file is generated at `.rustant/reminders/{id}.ics`
//! 5. When the reminder fires, `AgentCallback::on_reminder()` is called

use crate::config::MessagePriority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Status of a follow-up reminder in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Reminder is scheduled and waiting.
    Pending,
    /// Reminder has fired.
    Triggered,
    /// User dismissed the reminder.
    Dismissed,
    /// User marked the action as completed.
    Completed,
}

/// A scheduled follow-up reminder for a classified message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpReminder {
    /// Unique identifier.
    pub id: Uuid,
    /// Summary of the original message.
    pub source_message: String,
    /// The channel the message came from.
    pub source_channel: String,
    /// The sender of the original message.
    pub source_sender: String,
    /// When the reminder should fire.
    pub remind_at: DateTime<Utc>,
    /// Human-readable description of what needs follow-up.
    pub description: String,
    /// Current status.
    pub status: ReminderStatus,
    /// The priority of the original message.
    pub priority: MessagePriority,
    /// When the reminder was created.
    pub created_at: DateTime<Utc>,
}

impl FollowUpReminder {
    /// Create a new pending reminder.
    pub fn new(
        source_message: impl Into<String>,
        source_channel: impl Into<String>,
        source_sender: impl Into<String>,
        remind_at: DateTime<Utc>,
        description: impl Into<String>,
        priority: MessagePriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_message: source_message.into(),
            source_channel: source_channel.into(),
            source_sender: source_sender.into(),
            remind_at,
            description: description.into(),
            status: ReminderStatus::Pending,
            priority,
            created_at: Utc::now(),
        }
    }

    /// Mark the reminder as triggered.
    pub fn trigger(&mut self) {
        self.status = ReminderStatus::Triggered;
    }

    /// Mark the reminder as dismissed.
    pub fn dismiss(&mut self) {
        self.status = ReminderStatus::Dismissed;
    }

    /// Mark the reminder as completed.
    pub fn complete(&mut self) {
        self.status = ReminderStatus::Completed;
    }

    /// Check if the reminder is due (past its fire time and still pending).
    pub fn is_due(&self) -> bool {
        self.status == ReminderStatus::Pending && Utc::now() >= self.remind_at
    }

    /// Check if the reminder is active (pending or triggered).
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ReminderStatus::Pending | ReminderStatus::Triggered
        )
    }

    /// Generate an ICS (iCalendar) representation of this reminder.
    ///
    /// All user-controlled fields are escaped via [`crate::sanitize::escape_ics_field`]
    /// to prevent CRLF injection of rogue ICS properties.
    pub fn to_ics(&self) -> String {
        use crate::sanitize::escape_ics_field;

        let dtstart = self.remind_at.format("%Y%m%dT%H%M%SZ");
        let dtend = (self.remind_at + chrono::Duration::minutes(30)).format("%Y%m%dT%H%M%SZ");
        let dtstamp = self.created_at.format("%Y%m%dT%H%M%SZ");

        format!(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//Rustant//Channel Intelligence//EN\r\n\
             BEGIN:VEVENT\r\n\
             DTSTART:{dtstart}\r\n\
             DTEND:{dtend}\r\n\
             DTSTAMP:{dtstamp}\r\n\
             SUMMARY:Follow up: {description} ({channel} from {sender})\r\n\
             DESCRIPTION:Original message: {msg}. Priority: {priority:?}.\r\n\
             UID:{uid}@rustant\r\n\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n",
            dtstart = dtstart,
            dtend = dtend,
            dtstamp = dtstamp,
            description = escape_ics_field(&self.description),
            channel = escape_ics_field(&self.source_channel),
            sender = escape_ics_field(&self.source_sender),
            msg = escape_ics_field(&self.source_message),
            priority = self.priority,
            uid = self.id,
        )
    }
}

/// Bridge between channel intelligence and the scheduling system.
///
/// Manages follow-up reminders, persists them to disk, and generates
/// ICS calendar files.
pub struct SchedulerBridge {
    /// Active reminders.
    reminders: Vec<FollowUpReminder>,
    /// Directory for ICS file export and index.
    reminders_dir: PathBuf,
}

impl SchedulerBridge {
    /// Create a new scheduler bridge with the given reminders directory.
    pub fn new(reminders_dir: PathBuf) -> Self {
        Self {
            reminders: Vec::new(),
            reminders_dir,
        }
    }

    /// Schedule a follow-up reminder for a classified message.
    ///
    /// Creates a `FollowUpReminder`, adds it to the active list,
    /// and generates an ICS file.
    pub fn schedule_followup(
        &mut self,
        source_message: &str,
        source_channel: &str,
        source_sender: &str,
        minutes: u32,
        priority: MessagePriority,
    ) -> FollowUpReminder {
        let remind_at = Utc::now() + chrono::Duration::minutes(i64::from(minutes));
        let description = if source_message.chars().count() > 80 {
            format!("{}...", source_message.chars().take(80).collect::<String>())
        } else {
            source_message.to_string()
        };

        let reminder = FollowUpReminder::new(
            source_message,
            source_channel,
            source_sender,
            remind_at,
            description,
            priority,
        );

        self.reminders.push(reminder.clone());
        reminder
    }

    /// Get all active (pending or triggered) reminders.
    pub fn active_reminders(&self) -> Vec<&FollowUpReminder> {
        self.reminders.iter().filter(|r| r.is_active()).collect()
    }

    /// Get all reminders that are currently due.
    pub fn due_reminders(&self) -> Vec<&FollowUpReminder> {
        self.reminders.iter().filter(|r| r.is_due()).collect()
    }

    /// Trigger all due reminders and return them.
    pub fn trigger_due(&mut self) -> Vec<FollowUpReminder> {
        let mut triggered = Vec::new();
        for reminder in &mut self.reminders {
            if reminder.is_due() {
                reminder.trigger();
                triggered.push(reminder.clone());
            }
        }
        triggered
    }

    /// Dismiss a reminder by ID.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        if let Some(r) = self.reminders.iter_mut().find(|r| r.id == id) {
            r.dismiss();
            true
        } else {
            false
        }
    }

    /// Complete a reminder by ID.
    pub fn complete(&mut self, id: Uuid) -> bool {
        if let Some(r) = self.reminders.iter_mut().find(|r| r.id == id) {
            r.complete();
            true
        } else {
            false
        }
    }

    /// Remove all completed/dismissed reminders.
    pub fn cleanup(&mut self) -> usize {
        let before = self.reminders.len();
        self.reminders.retain(|r| r.is_active());
        before - self.reminders.len()
    }

    /// Get the total number of reminders (all statuses).
    pub fn total_count(&self) -> usize {
        self.reminders.len()
    }

    /// Export a reminder as an ICS file.
    pub fn export_ics(&self, reminder: &FollowUpReminder) -> Result<PathBuf, std::io::Error> {
        let path = self.reminders_dir.join(format!("{}.ics", reminder.id));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, reminder.to_ics())?;
        Ok(path)
    }

    /// Save the reminder index to JSON.
    pub fn save_index(&self) -> Result<PathBuf, std::io::Error> {
        let path = self.reminders_dir.join("index.json");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.reminders).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load reminders from the JSON index.
    pub fn load_index(&mut self) -> Result<usize, std::io::Error> {
        let path = self.reminders_dir.join("index.json");
        if !path.exists() {
            return Ok(0);
        }
        let json = std::fs::read_to_string(&path)?;
        let loaded: Vec<FollowUpReminder> = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        let count = loaded.len();
        self.reminders = loaded;
        Ok(count)
    }

    /// Get the reminders directory path.
    pub fn reminders_dir(&self) -> &Path {
        &self.reminders_dir
    }
}
