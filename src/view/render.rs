// src/view/render.rs
use chrono::Local;

use crate::services::conversation::{Delivery, Message, MessageRole};

pub const TYPING_INDICATOR: &str = "  assistant is typing...";

fn label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    }
}

/// One message as `[HH:MM:SS] who: text`, in local time.
pub fn render_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    format!("[{}] {}: {}", time, label(message.role), message.content)
}

/// Marker shown under a user message that never got a reply.
pub fn render_delivery(delivery: &Delivery) -> Option<String> {
    match delivery {
        Delivery::Failed { reason } => Some(format!(
            "  ! not delivered ({}). Type /retry to send it again.",
            reason
        )),
        Delivery::Pending | Delivery::Delivered => None,
    }
}

/// The whole conversation, failure markers included.
pub fn render_transcript<'a>(
    messages: &'a [Message],
    delivery: impl Fn(&Message) -> Option<&'a Delivery>,
) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&render_message(message));
        out.push('\n');
        if let Some(marker) = delivery(message).and_then(render_delivery) {
            out.push_str(&marker);
            out.push('\n');
        }
    }
    out
}
