//! Slot completion gates (spec.md §4.2). "The golden rule: if a slot has a
//! valid value and the confirmation flow is resolved, the slot is
//! complete. Meta state never overrides a present value."

use receptionist_core::config::SlotType;
use receptionist_sessions::SlotMeta;

/// Is the name slot complete?
///
/// Complete iff (a) both first and last are known, OR (b) the stored value
/// contains a space, OR (c) it's a single-word value and every applicable
/// confirmation/full-name requirement has already been satisfied and we are
/// not mid spelling-variant check.
pub fn name_is_complete(
    value: Option<&str>,
    meta: &SlotMeta,
    confirm_back_required: bool,
    ask_full_name_required: bool,
) -> bool {
    let Some(value) = value else { return false };

    if meta.first.is_some() && meta.last.is_some() {
        return true;
    }
    if value.contains(' ') {
        return true;
    }
    if meta.asked_spelling_variant && meta.spelling_variant_answer.is_none() {
        return false;
    }
    let confirm_ok = !confirm_back_required || meta.last_confirmed;
    let full_name_ok = !ask_full_name_required || meta.asked_missing_part_once;
    confirm_ok && full_name_ok
}

/// Generic confirm-back completion for phone/address/time/email slots.
///
/// Deliberately does NOT treat "not currently pending" as "resolved" —
/// `pending_confirm` defaults to `false` before a slot has ever been
/// through its confirm step, which is indistinguishable from "answered
/// and cleared" if that were the test. Only `confirmed` means resolved.
pub fn confirm_back_slot_is_complete(value: Option<&str>, meta: &SlotMeta, confirm_back_required: bool) -> bool {
    let Some(_value) = value else { return false };
    !confirm_back_required || meta.confirmed
}

/// Dispatch completion check by slot type (spec.md §9 "polymorphism over
/// slot type" — adding a variant here plus a branch is the whole cost of a
/// new slot kind).
pub fn slot_is_complete(
    slot_type: &SlotType,
    value: Option<&str>,
    meta: &SlotMeta,
    confirm_back_required: bool,
    ask_full_name_required: bool,
) -> bool {
    match slot_type {
        SlotType::Name => name_is_complete(value, meta, confirm_back_required, ask_full_name_required),
        SlotType::Phone | SlotType::Address | SlotType::Time | SlotType::Email | SlotType::Custom { .. } => {
            confirm_back_slot_is_complete(value, meta, confirm_back_required)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_with_space_is_complete_regardless_of_meta() {
        let meta = SlotMeta::default();
        assert!(name_is_complete(Some("Mark Smith"), &meta, true, true));
    }

    #[test]
    fn name_single_word_needs_confirm_and_full_name() {
        let mut meta = SlotMeta::default();
        assert!(!name_is_complete(Some("Mark"), &meta, true, true));
        meta.last_confirmed = true;
        assert!(!name_is_complete(Some("Mark"), &meta, true, true));
        meta.asked_missing_part_once = true;
        assert!(name_is_complete(Some("Mark"), &meta, true, true));
    }

    #[test]
    fn confirm_back_slot_waits_for_pending_confirm_to_clear() {
        let mut meta = SlotMeta::default();
        meta.pending_confirm = true;
        assert!(!confirm_back_slot_is_complete(Some("2395551234"), &meta, true));
        meta.confirmed = true;
        assert!(confirm_back_slot_is_complete(Some("2395551234"), &meta, true));
    }

    #[test]
    fn a_prefilled_value_never_confirmed_is_not_complete() {
        // Regression: a value can arrive via opportunistic extraction before
        // the slot's own confirm step ever runs, leaving `pending_confirm`
        // at its default `false`. That must not read as "already resolved".
        let meta = SlotMeta::default();
        assert!(!confirm_back_slot_is_complete(Some("2395551234"), &meta, true));
    }

    #[test]
    fn no_value_is_never_complete() {
        let meta = SlotMeta::default();
        assert!(!confirm_back_slot_is_complete(None, &meta, false));
    }
}
