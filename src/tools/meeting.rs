//! Meeting tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::Error;
use crate::services::{MeetingRequest, MeetingScheduler, MeetingType};
use crate::Result;

use super::{ArgSpec, SessionContext, Tool, ToolArgs, ToolOutput};

/// Book a video or phone call with the sales team
pub struct ScheduleMeetingTool {
    meetings: Arc<dyn MeetingScheduler>,
}

impl ScheduleMeetingTool {
    pub fn new(meetings: Arc<dyn MeetingScheduler>) -> Self {
        Self { meetings }
    }
}

const MEETING_ARGS: &[ArgSpec] = &[
    ArgSpec::text("customer_email", "Customer email for the invitation").aliases(&["email", "cliente_email"]),
    ArgSpec::text("preferred_time", "Day and time the customer prefers, as they said it")
        .aliases(&["horario_preferido"]),
    ArgSpec::choice("meeting_type", &["video_call", "phone_call"], "Defaults to video_call")
        .optional()
        .aliases(&["tipo_reunion"]),
];

pub(super) fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((user, domain)) => {
            !user.is_empty() && !domain.starts_with('.') && domain.contains('.') && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[async_trait]
impl Tool for ScheduleMeetingTool {
    fn name(&self) -> &str {
        "schedule_meeting"
    }

    fn description(&self) -> &str {
        "Schedule a meeting with a sales advisor once the customer has given an email and a preferred time."
    }

    fn args(&self) -> &[ArgSpec] {
        MEETING_ARGS
    }

    async fn execute(&self, args: ToolArgs, session: &SessionContext) -> Result<ToolOutput> {
        let email = args.text("customer_email").unwrap_or_default();
        if !looks_like_email(email) {
            return Err(Error::Tool(format!("'{}' is not a valid email address", email)));
        }

        let meeting_type = args
            .text("meeting_type")
            .and_then(MeetingType::parse)
            .unwrap_or_default();

        let request = MeetingRequest {
            phone: session.session_id.clone(),
            email: email.to_string(),
            preferred_time: args.text("preferred_time").unwrap_or_default().to_string(),
            meeting_type,
        };

        if !self.meetings.schedule(&request).await? {
            return Err(Error::Tool(
                "the meeting could not be scheduled, please try again".to_string(),
            ));
        }

        info!("Meeting booked for {} ({})", request.phone, meeting_type.label());
        Ok(ToolOutput::new(json!({
            "email": request.email,
            "phone": request.phone,
            "preferred_time": request.preferred_time,
            "meeting_type": meeting_type,
            "message": format!("{} scheduled for {}", meeting_type.label(), request.preferred_time),
        })))
    }
}
