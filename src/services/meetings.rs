//! Meeting bookings

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncWriteExt;

use crate::Result;

use super::MeetingScheduler;

/// How the sales team will meet the customer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    #[default]
    VideoCall,
    PhoneCall,
}

impl MeetingType {
    /// Accepts canonical names plus the legacy Spanish labels.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "video_call" | "video call" | "videocall" | "video" | "videollamada" => Some(MeetingType::VideoCall),
            "phone_call" | "phone call" | "phone" | "call" | "llamada" | "llamada telefónica"
            | "llamada telefonica" => Some(MeetingType::PhoneCall),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MeetingType::VideoCall => "video call",
            MeetingType::PhoneCall => "phone call",
        }
    }
}

/// A meeting request coming from `schedule_meeting`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingRequest {
    pub phone: String,
    pub email: String,
    pub preferred_time: String,
    pub meeting_type: MeetingType,
}

/// Appends bookings to a JSONL file for the sales team to pick up
pub struct JsonMeetingBook {
    path: PathBuf,
}

impl JsonMeetingBook {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MeetingScheduler for JsonMeetingBook {
    async fn schedule(&self, request: &MeetingRequest) -> Result<bool> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(&json!({
            "phone": request.phone,
            "email": request.email,
            "preferred_time": request.preferred_time,
            "meeting_type": request.meeting_type,
            "booked_at": Utc::now(),
        }))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(true)
    }
}
