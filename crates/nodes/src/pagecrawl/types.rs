//! Fixed catalogues shared by the node and the trigger.

/// A check frequency the service accepts, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Frequency {
    pub minutes: u64,
    pub label: &'static str,
}

pub const FREQUENCIES: &[Frequency] = &[
    Frequency { minutes: 1, label: "Every 1 Minute" },
    Frequency { minutes: 2, label: "Every 2 Minutes" },
    Frequency { minutes: 3, label: "Every 3 Minutes" },
    Frequency { minutes: 5, label: "Every 5 Minutes" },
    Frequency { minutes: 10, label: "Every 10 Minutes" },
    Frequency { minutes: 15, label: "Every 15 Minutes" },
    Frequency { minutes: 30, label: "Every 30 Minutes" },
    Frequency { minutes: 45, label: "Every 45 Minutes" },
    Frequency { minutes: 60, label: "Hourly" },
    Frequency { minutes: 120, label: "Every 2 Hours" },
    Frequency { minutes: 180, label: "Every 3 Hours" },
    Frequency { minutes: 360, label: "Every 6 Hours" },
    Frequency { minutes: 720, label: "Every 12 Hours" },
    Frequency { minutes: 1440, label: "Daily" },
    Frequency { minutes: 2880, label: "Every 2 Days" },
    Frequency { minutes: 4320, label: "Every 3 Days" },
    Frequency { minutes: 10080, label: "Weekly" },
    Frequency { minutes: 20160, label: "Every 2 Weeks" },
    Frequency { minutes: 40320, label: "Monthly" },
];

pub fn is_known_frequency(minutes: u64) -> bool {
    FREQUENCIES.iter().any(|f| f.minutes == minutes)
}

/// Fields a webhook delivery may carry.
pub const WEBHOOK_PAYLOAD_FIELDS: &[&str] = &[
    "id",
    "title",
    "status",
    "event_type",
    "content_type",
    "visual_diff",
    "changed_at",
    "contents",
    "difference",
    "human_difference",
    "page_screenshot_image",
    "text_difference_image",
    "html_difference",
    "markdown_difference",
    "page",
    "page_elements",
    "json",
    "json_patch",
    "previous_check",
    "ai_summary",
    "ai_priority_score",
];

/// Requested when the trigger simplifies its output.
pub const SIMPLIFIED_PAYLOAD_FIELDS: &[&str] = &[
    "id",
    "title",
    "status",
    "changed_at",
    "difference",
    "human_difference",
    "page",
    "contents",
];

/// Default selection when the trigger passes deliveries through untouched.
pub const DEFAULT_PAYLOAD_FIELDS: &[&str] = &[
    "id",
    "title",
    "status",
    "changed_at",
    "difference",
    "page",
    "contents",
    "html_difference",
];

pub fn is_payload_field(name: &str) -> bool {
    WEBHOOK_PAYLOAD_FIELDS.contains(&name)
}
