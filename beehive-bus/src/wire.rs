//! The fixed inter-bee wire payload format (§6). The markup is fixed by the
//! spec because the hosted LLMs are prompted against it — never reformat.

use beehive_shared::model::{BeeName, MessageType};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[allow(clippy::too_many_arguments)]
pub fn format_payload(
    sender: BeeName,
    message_type: &MessageType,
    subject: Option<&str>,
    task_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
    content: &str,
) -> String {
    let subject = subject.unwrap_or("N/A");
    let task_ref = task_id.map(|t| t.to_string()).unwrap_or_else(|| "N/A".to_string());

    format!(
        "## \u{1F4E8} MESSAGE FROM {sender}\n\n\
         **Type:** {message_type}\n\
         **Subject:** {subject}\n\
         **Task ID:** {task_ref}\n\
         **Timestamp:** {timestamp}\n\n\
         **Content:**\n\
         {content}\n\n\
         ---",
        sender = sender.to_string().to_uppercase(),
        message_type = message_type,
        subject = subject,
        task_ref = task_ref,
        timestamp = timestamp.to_rfc3339(),
        content = content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_every_fixed_section() {
        let now = Utc::now();
        let payload = format_payload(
            BeeName::Queen,
            &MessageType::Instruction,
            Some("kickoff"),
            None,
            now,
            "begin the login task",
        );
        assert!(payload.starts_with("## \u{1F4E8} MESSAGE FROM QUEEN"));
        assert!(payload.contains("**Type:** instruction"));
        assert!(payload.contains("**Subject:** kickoff"));
        assert!(payload.contains("**Task ID:** N/A"));
        assert!(payload.contains("begin the login task"));
        assert!(payload.trim_end().ends_with("---"));
    }

    #[test]
    fn missing_subject_renders_as_not_available() {
        let payload = format_payload(
            BeeName::System,
            &MessageType::Alert,
            None,
            None,
            Utc::now(),
            "developer went offline",
        );
        assert!(payload.contains("**Subject:** N/A"));
    }
}
