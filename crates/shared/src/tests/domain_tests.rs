use super::*;
use chrono::TimeZone;

fn response(wedding: Attendance, entree: Option<EntreeChoice>, note: Option<&str>) -> RsvpResponse {
    RsvpResponse {
        guest_id: GuestId("1".into()),
        guest_name: "John Smith".into(),
        guest_email: "john.smith@email.com".into(),
        welcome_event: Attendance::Accept,
        wedding,
        farewell_event: Attendance::Decline,
        entree_choice: entree,
        note: note.map(str::to_string),
        timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 12, 30, 0).unwrap(),
    }
}

#[test]
fn response_serializes_with_camel_case_fields_and_lowercase_answers() {
    let value = serde_json::to_value(response(
        Attendance::Accept,
        Some(EntreeChoice::Fish),
        None,
    ))
    .expect("json");

    assert_eq!(value["guestId"], "1");
    assert_eq!(value["welcomeEvent"], "accept");
    assert_eq!(value["farewellEvent"], "decline");
    assert_eq!(value["entreeChoice"], "fish");
    assert!(value.get("note").is_none());
    assert_eq!(value["timestamp"], "2026-05-01T12:30:00Z");
}

#[test]
fn guest_plus_one_is_optional_on_the_wire() {
    let guest: Guest = serde_json::from_str(
        r#"{"id":"4","name":"Sarah Wilson","email":"sarah.wilson@email.com"}"#,
    )
    .expect("guest");
    assert_eq!(guest.plus_one, None);

    let with_plus_one: Guest = serde_json::from_str(
        r#"{"id":"5","name":"David Brown","email":"david.brown@email.com","plusOne":"Ann Brown"}"#,
    )
    .expect("guest");
    assert_eq!(with_plus_one.plus_one.as_deref(), Some("Ann Brown"));
}

#[test]
fn validate_accepts_both_branches() {
    response(Attendance::Accept, Some(EntreeChoice::Chicken), None)
        .validate()
        .expect("attending branch");
    response(Attendance::Decline, None, Some("Sorry, can't make it"))
        .validate()
        .expect("declining branch with note");
    response(Attendance::Decline, None, None)
        .validate()
        .expect("declining branch without note");
}

#[test]
fn validate_rejects_entree_mismatches() {
    let missing = response(Attendance::Accept, None, None).validate();
    assert!(matches!(missing, Err(RsvpError::InvalidResponse(_))));

    let unexpected = response(Attendance::Decline, Some(EntreeChoice::Fish), None).validate();
    assert!(matches!(unexpected, Err(RsvpError::InvalidResponse(_))));
}

#[test]
fn validate_rejects_note_on_attending_or_blank_note() {
    let attending = response(Attendance::Accept, Some(EntreeChoice::Fish), Some("hi")).validate();
    assert!(matches!(attending, Err(RsvpError::InvalidResponse(_))));

    let blank = response(Attendance::Decline, None, Some("   ")).validate();
    assert!(matches!(blank, Err(RsvpError::InvalidResponse(_))));
}

#[test]
fn confirmation_lines_follow_the_chosen_branch() {
    let attending = response(Attendance::Accept, Some(EntreeChoice::Vegetable), None);
    let lines = attending.confirmation_lines();
    assert_eq!(
        lines,
        vec![
            ("Welcome Event", "Attending".to_string()),
            ("Wedding", "Attending".to_string()),
            ("Entree", "vegetable".to_string()),
            ("Farewell Event", "Not Attending".to_string()),
        ]
    );

    let declining = response(Attendance::Decline, None, Some("Congrats!"));
    let lines = declining.confirmation_lines();
    assert_eq!(lines.last(), Some(&("Note", "Congrats!".to_string())));
    assert!(!lines.iter().any(|(label, _)| *label == "Entree"));
}

#[test]
fn rsvp_errors_map_to_wire_codes() {
    let api: crate::error::ApiError = RsvpError::guest_not_found().into();
    assert_eq!(api.code, crate::error::ErrorCode::NotFound);
    assert!(api.message.contains("check the spelling"));

    assert_eq!(
        RsvpError::lookup_unavailable().code(),
        crate::error::ErrorCode::Unavailable
    );
    assert_eq!(
        RsvpError::SessionExpired.code(),
        crate::error::ErrorCode::SessionExpired
    );
    assert!(RsvpError::submission_failed().is_transient());
    assert!(!RsvpError::guest_not_found().is_transient());
}

#[test]
fn answers_parse_case_insensitively() {
    assert_eq!(Attendance::parse(" Accept "), Some(Attendance::Accept));
    assert_eq!(Attendance::parse("maybe"), None);
    assert_eq!(EntreeChoice::parse("FISH"), Some(EntreeChoice::Fish));
}
