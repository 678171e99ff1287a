// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evolution API webhook payloads.

use serde_json::Value;

use wagate_core::ConnectionStatus;

/// A webhook delivery, reduced to what the gateway acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// Text from an end user.
    Message {
        instance: Option<String>,
        id: Option<String>,
        from: String,
        text: String,
    },
    ConnectionUpdate {
        instance: Option<String>,
        status: ConnectionStatus,
    },
    QrCode {
        instance: Option<String>,
        qr_code: String,
    },
    /// Anything else, including our own outbound echoes and non-text messages.
    Ignored { event: String },
}

/// `messages.upsert` and `MESSAGES_UPSERT` name the same event.
pub fn normalize_event(name: &str) -> String {
    name.to_uppercase().replace('.', "_")
}

/// Phone number part of a WhatsApp JID (`5215550001@s.whatsapp.net`).
pub fn strip_jid(jid: &str) -> &str {
    jid.split_once('@').map_or(jid, |(user, _)| user)
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn instance_of(body: &Value) -> Option<String> {
    str_at(body, "/instance")
        .or_else(|| str_at(body, "/instanceName"))
        .or_else(|| str_at(body, "/data/instance/instanceName"))
        .map(str::to_string)
}

/// Interpret a raw webhook body.
pub fn parse_webhook(body: &Value) -> WebhookEvent {
    let raw_event = str_at(body, "/event").unwrap_or_default();
    let event = normalize_event(raw_event);
    let instance = instance_of(body);
    let ignored = || WebhookEvent::Ignored {
        event: event.clone(),
    };

    match event.as_str() {
        "MESSAGES_UPSERT" => parse_message(body, instance).unwrap_or_else(ignored),
        "CONNECTION_UPDATE" => {
            let state =
                str_at(body, "/data/state").or_else(|| str_at(body, "/data/instance/state"));
            let status = match state {
                Some("open") => ConnectionStatus::Connected,
                Some("connecting") => ConnectionStatus::Connecting,
                _ => ConnectionStatus::Disconnected,
            };
            WebhookEvent::ConnectionUpdate { instance, status }
        }
        "QRCODE_UPDATED" => {
            match str_at(body, "/data/qrcode/base64").or_else(|| str_at(body, "/data/base64")) {
                Some(qr) => WebhookEvent::QrCode {
                    instance,
                    qr_code: qr.to_string(),
                },
                None => ignored(),
            }
        }
        _ => ignored(),
    }
}

fn parse_message(body: &Value, instance: Option<String>) -> Option<WebhookEvent> {
    // Older bridge versions wrap messages in an array.
    let data = match body.pointer("/data/messages/0") {
        Some(first) => first,
        None => body.get("data")?,
    };

    if data.pointer("/key/fromMe").and_then(Value::as_bool) == Some(true) {
        return None;
    }
    let jid = str_at(data, "/key/remoteJid")?;
    if jid.ends_with("@g.us") || jid == "status@broadcast" {
        return None;
    }
    let text = str_at(data, "/message/conversation")
        .or_else(|| str_at(data, "/message/extendedTextMessage/text"))?;

    Some(WebhookEvent::Message {
        instance,
        id: str_at(data, "/key/id").map(str::to_string),
        from: strip_jid(jid).to_string(),
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_names_are_normalized() {
        assert_eq!(normalize_event("messages.upsert"), "MESSAGES_UPSERT");
        assert_eq!(normalize_event("CONNECTION_UPDATE"), "CONNECTION_UPDATE");
    }

    #[test]
    fn text_message_is_extracted() {
        let body = json!({
            "event": "messages.upsert",
            "instance": "wa-mvp",
            "data": {
                "key": {"remoteJid": "5215550001@s.whatsapp.net", "fromMe": false, "id": "ABC"},
                "message": {"conversation": "hola"}
            }
        });
        assert_eq!(
            parse_webhook(&body),
            WebhookEvent::Message {
                instance: Some("wa-mvp".into()),
                id: Some("ABC".into()),
                from: "5215550001".into(),
                text: "hola".into(),
            }
        );
    }

    #[test]
    fn extended_text_and_wrapped_messages_are_supported() {
        let body = json!({
            "event": "MESSAGES_UPSERT",
            "data": {"messages": [{
                "key": {"remoteJid": "5215550002@s.whatsapp.net"},
                "message": {"extendedTextMessage": {"text": "A"}}
            }]}
        });
        match parse_webhook(&body) {
            WebhookEvent::Message { from, text, .. } => {
                assert_eq!(from, "5215550002");
                assert_eq!(text, "A");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn own_group_and_media_messages_are_ignored() {
        let from_me = json!({
            "event": "messages.upsert",
            "data": {"key": {"remoteJid": "1@s.whatsapp.net", "fromMe": true}, "message": {"conversation": "x"}}
        });
        let group = json!({
            "event": "messages.upsert",
            "data": {"key": {"remoteJid": "123-456@g.us"}, "message": {"conversation": "x"}}
        });
        let image = json!({
            "event": "messages.upsert",
            "data": {"key": {"remoteJid": "1@s.whatsapp.net"}, "message": {"imageMessage": {}}}
        });
        for body in [from_me, group, image] {
            assert!(matches!(parse_webhook(&body), WebhookEvent::Ignored { .. }));
        }
    }

    #[test]
    fn connection_states_map_to_status() {
        let update = |state: &str| {
            parse_webhook(&json!({"event": "connection.update", "instance": "wa", "data": {"state": state}}))
        };
        assert_eq!(
            update("open"),
            WebhookEvent::ConnectionUpdate {
                instance: Some("wa".into()),
                status: ConnectionStatus::Connected
            }
        );
        assert!(matches!(
            update("close"),
            WebhookEvent::ConnectionUpdate {
                status: ConnectionStatus::Disconnected,
                ..
            }
        ));
    }

    #[test]
    fn qr_update_carries_base64() {
        let body = json!({"event": "qrcode.updated", "data": {"qrcode": {"base64": "data:image/png;base64,AAA"}}});
        assert_eq!(
            parse_webhook(&body),
            WebhookEvent::QrCode {
                instance: None,
                qr_code: "data:image/png;base64,AAA".into()
            }
        );
    }
}
