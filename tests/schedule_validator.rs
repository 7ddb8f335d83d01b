// tests/schedule_validator.rs

use mailmerge::schedule::{
    EventKind, MERGE_ENTRY_POINT, Trigger, TriggerRegistry, validate_trigger, validate_triggers,
};
use mailmerge_test_utils::init_tracing;

#[test]
fn single_clock_trigger_on_entry_point_is_valid() {
    init_tracing();
    assert!(validate_triggers(&[Trigger::clock("contacts")]));
}

#[test]
fn zero_or_many_triggers_are_invalid() {
    init_tracing();
    assert!(!validate_triggers(&[]));
    assert!(!validate_triggers(&[
        Trigger::clock("contacts"),
        Trigger::clock("contacts"),
    ]));
}

#[test]
fn wrong_event_kind_is_invalid() {
    let mut trigger = Trigger::clock("contacts");
    trigger.event_kind = EventKind::OnEdit;
    assert!(!validate_trigger(&trigger));
    assert!(!validate_triggers(&[trigger]));
}

#[test]
fn wrong_handler_is_invalid() {
    let mut trigger = Trigger::clock("contacts");
    trigger.handler = format!("{MERGE_ENTRY_POINT}_v2");
    assert!(!validate_triggers(&[trigger]));
}

#[test]
fn registry_validates_per_document() {
    init_tracing();
    let mut form = Trigger::clock("signups");
    form.event_kind = EventKind::OnFormSubmit;

    let registry = TriggerRegistry::from_triggers([
        Trigger::clock("contacts"),
        form,
        Trigger::clock("leads"),
        Trigger::clock("leads"),
    ]);

    assert_eq!(registry.documents(), vec!["contacts", "leads", "signups"]);
    assert!(registry.validate_document("contacts"));
    assert!(!registry.validate_document("signups"));
    assert!(!registry.validate_document("leads"));
    assert!(!registry.validate_document("nobody"));
}

#[test]
fn delete_all_clears_a_document() {
    let registry = TriggerRegistry::new();
    registry.bind(Trigger::clock("leads"));
    registry.bind(Trigger::clock("leads"));
    registry.bind(Trigger::clock("contacts"));

    assert_eq!(registry.delete_all("leads"), 2);
    assert_eq!(registry.delete_all("leads"), 0);
    assert!(registry.triggers_for("leads").is_empty());

    registry.bind(Trigger::clock("leads"));
    assert!(registry.validate_document("leads"));
    assert_eq!(registry.triggers_for("contacts").len(), 1);
}

#[test]
fn triggers_deserialize_from_toml() {
    #[derive(serde::Deserialize)]
    struct Doc {
        trigger: Vec<Trigger>,
    }

    let doc: Doc = toml::from_str(
        r#"
[[trigger]]
document = "contacts"
event = "clock"
handler = "run_merge"
template = "welcome"
every = "1h"

[[trigger]]
document = "signups"
event = "on_form_submit"
handler = "run_merge"
"#,
    )
    .unwrap();

    assert_eq!(doc.trigger.len(), 2);
    assert!(validate_trigger(&doc.trigger[0]));
    assert_eq!(doc.trigger[0].template.as_deref(), Some("welcome"));
    assert_eq!(doc.trigger[1].event_kind, EventKind::OnFormSubmit);
    assert!(!validate_trigger(&doc.trigger[1]));
}
