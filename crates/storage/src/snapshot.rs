use serde::{Deserialize, Serialize};

/// Speaker recorded in the snapshot, decoupled from the live chat enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotAuthor {
    User,
    Assistant,
}

/// One persisted message record.
///
/// Non-text content is normalized to an empty string before it gets here, so
/// `content` is always a plain string. There is no schema version field;
/// anything that fails to parse is treated as no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    /// Backend-assigned exchange id; `None` when the exchange never resolved.
    pub id: Option<u64>,
    pub author: SnapshotAuthor,
    pub display_name: String,
    pub avatar_ref: String,
    pub content: String,
    pub is_user: bool,
}

impl MessageSnapshot {
    pub fn new(
        id: Option<u64>,
        author: SnapshotAuthor,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            author,
            display_name: display_name.into(),
            avatar_ref: avatar_ref.into(),
            content: content.into(),
            is_user: matches!(author, SnapshotAuthor::User),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_serialize_with_widget_compatible_field_names() {
        let record = MessageSnapshot::new(
            Some(3),
            SnapshotAuthor::User,
            "You",
            "bot_img.png",
            "hello",
        );

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["author"], "user");
        assert_eq!(json["displayName"], "You");
        assert_eq!(json["avatarRef"], "bot_img.png");
        assert_eq!(json["isUser"], true);
    }

    #[test]
    fn unresolved_exchange_id_round_trips_as_null() {
        let record = MessageSnapshot::new(
            None,
            SnapshotAuthor::Assistant,
            "Ava",
            "bot_img.png",
            "",
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: MessageSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, record);
        assert_eq!(parsed.id, None);
    }
}
