//! Inbound payload decoding and notification building
//!
//! Payloads are JSON objects published by arbitrary clients. Decoding is
//! lenient: unknown fields are ignored and missing or `null` fields fall back
//! to their empty values.

use crate::config::BridgeConfig;
use crate::error::BridgeResult;
use serde::{Deserialize, Deserializer, Serialize};

/// Message as published on the subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// 0 means "not set"
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default)]
    pub markdown: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display content type hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "text/markdown")]
    Markdown,
    #[serde(rename = "text/plain")]
    Plain,
}

impl ContentType {
    pub fn as_mime(&self) -> &'static str {
        match self {
            ContentType::Markdown => "text/markdown",
            ContentType::Plain => "text/plain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayExtra {
    #[serde(rename = "contentType")]
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickExtra {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationExtra {
    pub click: Option<ClickExtra>,
    #[serde(rename = "bigImageUrl")]
    pub big_image_url: Option<String>,
}

/// Extras attached to a notification, serialized in this field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    #[serde(
        rename = "client::display",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display: Option<DisplayExtra>,
    #[serde(rename = "client::notification")]
    pub notification: NotificationExtra,
}

/// Normalized notification handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub priority: i64,
    pub extras: Extras,
}

/// Config values the translation depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationPolicy {
    pub default_priority: i64,
    pub markdown: bool,
}

impl Default for TranslationPolicy {
    fn default() -> Self {
        TranslationPolicy::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for TranslationPolicy {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            default_priority: config.default_message_priority,
            markdown: config.markdown,
        }
    }
}

/// Pure translation from raw payloads to notifications
pub struct MessageTranslator;

impl MessageTranslator {
    /// Decode a raw payload and build the notification for it
    pub fn translate(payload: &[u8], policy: &TranslationPolicy) -> BridgeResult<Notification> {
        let inbound: InboundMessage = serde_json::from_slice(payload)?;
        Ok(Self::build(inbound, policy))
    }

    pub fn build(inbound: InboundMessage, policy: &TranslationPolicy) -> Notification {
        let display = Self::resolve_content_type(policy.markdown, inbound.markdown)
            .map(|content_type| DisplayExtra { content_type });

        Notification {
            priority: Self::resolve_priority(inbound.priority, policy.default_priority),
            title: inbound.title,
            message: inbound.message,
            extras: Extras {
                display,
                notification: NotificationExtra {
                    click: inbound.url.map(|url| ClickExtra { url }),
                    big_image_url: None,
                },
            },
        }
    }

    /// A message priority of 0 cannot be told apart from an unset one
    pub fn resolve_priority(message_priority: i64, default_priority: i64) -> i64 {
        if message_priority != 0 {
            message_priority
        } else {
            default_priority
        }
    }

    /// An explicit per-message flag wins. Without one, markdown-by-default adds
    /// a markdown hint, otherwise no hint is attached and the client decides.
    pub fn resolve_content_type(
        markdown_by_default: bool,
        message_markdown: Option<bool>,
    ) -> Option<ContentType> {
        match message_markdown {
            Some(true) => Some(ContentType::Markdown),
            Some(false) => Some(ContentType::Plain),
            None if markdown_by_default => Some(ContentType::Markdown),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn policy(default_priority: i64, markdown: bool) -> TranslationPolicy {
        TranslationPolicy {
            default_priority,
            markdown,
        }
    }

    #[test]
    fn test_fully_specified_message() {
        let payload =
            br#"{"title":"t","message":"m","priority":10,"markdown":false,"url":"https://x"}"#;
        let notification = MessageTranslator::translate(payload, &policy(5, true)).unwrap();

        assert_eq!(notification.title, "t");
        assert_eq!(notification.message, "m");
        assert_eq!(notification.priority, 10);
        assert_eq!(
            notification.extras.display,
            Some(DisplayExtra {
                content_type: ContentType::Plain
            })
        );
        assert_eq!(
            notification.extras.notification.click,
            Some(ClickExtra {
                url: "https://x".to_string()
            })
        );
    }

    #[test]
    fn test_minimal_message_uses_defaults() {
        let notification =
            MessageTranslator::translate(br#"{"title":"t","message":"m"}"#, &policy(5, true))
                .unwrap();

        assert_eq!(notification.priority, 5);
        assert_eq!(
            notification.extras.display.map(|d| d.content_type),
            Some(ContentType::Markdown)
        );
        assert_eq!(notification.extras.notification.click, None);
    }

    #[test]
    fn test_explicit_zero_priority_falls_back_to_default() {
        // Known boundary: 0 is indistinguishable from "unset"
        let notification =
            MessageTranslator::translate(br#"{"priority":0,"title":"t"}"#, &policy(7, true))
                .unwrap();
        assert_eq!(notification.priority, 7);
    }

    #[test]
    fn test_markdown_off_without_override_attaches_no_hint() {
        let notification =
            MessageTranslator::translate(br#"{"title":"t"}"#, &policy(5, false)).unwrap();
        assert_eq!(notification.extras.display, None);

        let notification =
            MessageTranslator::translate(br#"{"title":"t","markdown":true}"#, &policy(5, false))
                .unwrap();
        assert_eq!(
            notification.extras.display.map(|d| d.content_type),
            Some(ContentType::Markdown)
        );
    }

    #[test]
    fn test_nulls_and_unknown_fields_are_tolerated() {
        let payload = br#"{"title":null,"message":"m","priority":null,"markdown":null,"url":null,"extra":[1,2]}"#;
        let notification = MessageTranslator::translate(payload, &policy(3, false)).unwrap();

        assert_eq!(notification.title, "");
        assert_eq!(notification.priority, 3);
        assert_eq!(notification.extras.display, None);
        assert_eq!(notification.extras.notification.click, None);
    }

    #[test]
    fn test_malformed_payloads_are_decode_errors() {
        let payloads: [&[u8]; 5] = [
            b"not json",
            br#"{"title":"t""#,
            br#"{"priority":"high"}"#,
            br#"["title"]"#,
            b"",
        ];

        for payload in payloads {
            let result = MessageTranslator::translate(payload, &policy(5, true));
            assert!(
                matches!(result, Err(crate::error::BridgeError::Decode(_))),
                "payload {:?} should fail to decode",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_notification_wire_shape() {
        let notification = MessageTranslator::translate(
            br#"{"title":"t","message":"m","priority":10,"url":"https://x"}"#,
            &policy(5, true),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({
                "title": "t",
                "message": "m",
                "priority": 10,
                "extras": {
                    "client::display": {"contentType": "text/markdown"},
                    "client::notification": {
                        "click": {"url": "https://x"},
                        "bigImageUrl": null
                    }
                }
            })
        );
    }

    #[test]
    fn test_notification_entry_present_without_url() {
        let notification =
            MessageTranslator::translate(br#"{"title":"t"}"#, &policy(5, false)).unwrap();
        let value = serde_json::to_value(&notification).unwrap();

        assert_eq!(
            value["extras"],
            json!({"client::notification": {"click": null, "bigImageUrl": null}})
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = BridgeConfig {
            default_message_priority: 9,
            markdown: false,
            ..Default::default()
        };
        assert_eq!(TranslationPolicy::from(&config), policy(9, false));
    }

    proptest! {
        #[test]
        fn prop_nonzero_priority_is_kept(priority in any::<i64>().prop_filter("nonzero", |p| *p != 0), default in any::<i64>()) {
            prop_assert_eq!(MessageTranslator::resolve_priority(priority, default), priority);
        }

        #[test]
        fn prop_zero_priority_uses_default(default in any::<i64>()) {
            let payload = json!({"title": "t", "priority": 0}).to_string();
            let notification = MessageTranslator::translate(payload.as_bytes(), &policy(default, true)).unwrap();
            prop_assert_eq!(notification.priority, default);
        }

        #[test]
        fn prop_explicit_markdown_flag_always_wins(flag in any::<bool>(), by_default in any::<bool>()) {
            let expected = if flag { ContentType::Markdown } else { ContentType::Plain };
            prop_assert_eq!(MessageTranslator::resolve_content_type(by_default, Some(flag)), Some(expected));
        }
    }
}
