//! Confirmation-request handler (spec.md §4.6.8): "what X do you have?"
//! during booking reads back the stored value instead of re-asking for it.

use receptionist_sessions::SlotMeta;

pub struct ConfirmationQuery<'a> {
    pub slot_id: &'a str,
    pub stored_value: Option<&'a str>,
}

/// Detect which slot (if any) the caller is asking to have read back, and
/// produce the reply. Special-cases "what is my last name?" when no
/// reliable last name is stored — re-ask instead of echoing the first name.
pub fn handle<'a>(text: &str, query: &ConfirmationQuery<'a>, name_meta: Option<&SlotMeta>) -> Option<String> {
    let lower = text.to_lowercase();
    let asks_for = [
        ("name", "name"),
        ("phone", "phone"),
        ("number", "phone"),
        ("address", "address"),
        ("time", "time"),
    ]
    .iter()
    .find(|(kw, _)| lower.contains(kw))
    .map(|(_, slot)| *slot)?;

    if asks_for != query.slot_id {
        return None;
    }

    if asks_for == "name" && lower.contains("last name") {
        if let Some(meta) = name_meta {
            if meta.last.is_none() {
                return Some("I don't have a reliable last name on file yet — could you give it to me again?".to_string());
            }
            return meta.last.clone().map(|l| format!("I have your last name as {l}."));
        }
    }

    query
        .stored_value
        .map(|v| format!("I have your {asks_for} as {v}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_stored_phone_when_asked() {
        let q = ConfirmationQuery {
            slot_id: "phone",
            stored_value: Some("2395551234"),
        };
        let reply = handle("what phone number do you have?", &q, None).unwrap();
        assert!(reply.contains("2395551234"));
    }

    #[test]
    fn missing_last_name_reasks_instead_of_echoing_first() {
        let q = ConfirmationQuery {
            slot_id: "name",
            stored_value: Some("Mark"),
        };
        let meta = SlotMeta {
            first: Some("Mark".to_string()),
            last: None,
            ..Default::default()
        };
        let reply = handle("what is my last name?", &q, Some(&meta)).unwrap();
        assert!(reply.contains("could you give it to me again"));
    }
}
