use super::*;
use chrono::TimeZone;
use shared::domain::{Attendance, EntreeChoice, GuestId};

fn wedding() -> StepPrompt {
    WizardStep::Wedding.prompt()
}

#[test]
fn numbers_and_labels_select_choices() {
    assert_eq!(
        parse_command(&wedding(), "1"),
        Command::Choose(Choice::Attendance(Attendance::Accept))
    );
    assert_eq!(
        parse_command(&wedding(), " regretfully decline "),
        Command::Choose(Choice::Attendance(Attendance::Decline))
    );
    assert_eq!(
        parse_command(&WizardStep::Entree.prompt(), "fish"),
        Command::Choose(Choice::Entree(EntreeChoice::Fish))
    );
}

#[test]
fn out_of_range_input_is_invalid() {
    assert!(matches!(parse_command(&wedding(), "0"), Command::Invalid(_)));
    assert!(matches!(parse_command(&wedding(), "3"), Command::Invalid(_)));
    assert!(matches!(parse_command(&wedding(), "maybe"), Command::Invalid(_)));
}

#[test]
fn navigation_commands_work_on_every_step() {
    let note = WizardStep::Note.prompt();
    assert_eq!(parse_command(&note, "/back"), Command::Back);
    assert_eq!(parse_command(&wedding(), "/restart"), Command::Restart);
    assert_eq!(parse_command(&note, ""), Command::Proceed);
    assert_eq!(
        parse_command(&note, "  Sorry, can't make it "),
        Command::Note("Sorry, can't make it".into())
    );
}

#[test]
fn clear_empties_the_note_only_on_the_note_step() {
    let note = WizardStep::Note.prompt();
    assert_eq!(parse_command(&note, " /clear "), Command::Note(String::new()));
    assert!(matches!(parse_command(&wedding(), "/clear"), Command::Invalid(_)));

    let form = RsvpFormData {
        wedding: Some(Attendance::Decline),
        note: "Sorry, can't make it".into(),
        ..Default::default()
    };
    let text = render_prompt(&note, &form);
    assert!(text.contains("Current note: Sorry, can't make it"));
    assert!(text.contains("/clear to remove it"));
}

#[test]
fn written_note_can_be_cleared_before_continuing() {
    let guest = Guest {
        id: GuestId("2".into()),
        name: "Sarah Johnson".into(),
        email: "sarah.j@email.com".into(),
        plus_one: None,
    };
    let mut session = RsvpSession::new(guest);
    session
        .choose(Choice::Attendance(Attendance::Decline))
        .expect("welcome");
    session.advance().expect("continue");
    session
        .choose(Choice::Attendance(Attendance::Decline))
        .expect("wedding");
    session.advance().expect("continue");
    session.write_note("Sorry, can't make it").expect("note");

    let Command::Note(cleared) = parse_command(&WizardStep::Note.prompt(), "/clear") else {
        panic!("expected a note command");
    };
    session.write_note(cleared).expect("clear");
    assert_eq!(session.form().map(|form| form.note.as_str()), Some(""));
    session.advance().expect("note is optional");
}

#[test]
fn prompt_marks_the_current_answer() {
    let form = RsvpFormData {
        wedding: Some(Attendance::Decline),
        ..Default::default()
    };
    let text = render_prompt(&wedding(), &form);
    assert!(text.contains("Step 2 of 4: Wedding Ceremony"));
    assert!(text.contains("  1. Joyfully Accept"));
    assert!(text.contains("* 2. Regretfully Decline"));
    assert!(text.contains("Kindly reply by September 1, 2025"));
}

#[test]
fn confirmation_lists_answers() {
    let guest = Guest {
        id: GuestId("1".into()),
        name: "John Smith".into(),
        email: "john.smith@email.com".into(),
        plus_one: None,
    };
    let response = RsvpResponse {
        guest_id: guest.id.clone(),
        guest_name: guest.name.clone(),
        guest_email: guest.email.clone(),
        welcome_event: Attendance::Accept,
        wedding: Attendance::Accept,
        farewell_event: Attendance::Decline,
        entree_choice: Some(EntreeChoice::Fish),
        note: None,
        timestamp: Utc.with_ymd_and_hms(2025, 8, 20, 18, 45, 0).unwrap(),
    };
    let text = render_confirmation(&guest, &response);
    assert!(text.starts_with("\nThank you, John Smith!"));
    assert!(text.contains("Not Attending"));
}
