//! Digest message rendering.

use serde::{Deserialize, Serialize};
use taskdeck_store::StatusCounts;

/// An outgoing message as handed to a [`Mailer`](crate::Mailer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// From address.
    pub sender: String,
    /// To address.
    pub recipient: String,
}

/// Render the digest body: greeting, the four counts in fixed order, sign-off.
pub fn render_digest(username: &str, counts: &StatusCounts) -> String {
    format!(
        "Hi {username},\n\
         \n\
         Your tasks report:\n\
         \n\
         Pending tasks = {}\n\
         In-progress tasks = {}\n\
         Completed tasks = {}\n\
         Cancelled tasks = {}\n\
         \n\
         Regards,\n\
         Your Task Manager\n",
        counts.pending, counts.in_progress, counts.completed, counts.cancelled,
    )
}

/// Build the full message for one recipient.
pub fn digest_message(
    username: &str,
    recipient: &str,
    counts: &StatusCounts,
    subject: &str,
    sender: &str,
) -> MailMessage {
    MailMessage {
        subject: subject.to_string(),
        body: render_digest(username, counts),
        sender: sender.to_string(),
        recipient: recipient.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_appear_in_fixed_order() {
        let counts = StatusCounts {
            pending: 2,
            in_progress: 1,
            completed: 1,
            cancelled: 0,
        };
        let body = render_digest("alice", &counts);
        assert_eq!(
            body,
            "Hi alice,\n\nYour tasks report:\n\n\
             Pending tasks = 2\n\
             In-progress tasks = 1\n\
             Completed tasks = 1\n\
             Cancelled tasks = 0\n\n\
             Regards,\nYour Task Manager\n"
        );
    }

    #[test]
    fn message_fields() {
        let msg = digest_message(
            "bob",
            "bob@example.com",
            &StatusCounts::default(),
            "Tasks Report",
            "reports@taskdeck.local",
        );
        assert_eq!(msg.subject, "Tasks Report");
        assert_eq!(msg.recipient, "bob@example.com");
        assert_eq!(msg.sender, "reports@taskdeck.local");
        assert!(msg.body.starts_with("Hi bob,"));
    }
}
