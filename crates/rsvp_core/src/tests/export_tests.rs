use super::*;
use chrono::TimeZone;
use shared::domain::{Attendance, EntreeChoice, GuestId};

const HEADER: &str = r#""Guest Name","Email","Welcome Event","Wedding","Farewell Event","Entree Choice","Note","Timestamp""#;

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, 18, 45, 0).unwrap()
}

fn decline_with_note(note: &str) -> RsvpResponse {
    RsvpResponse {
        guest_id: GuestId("2".into()),
        guest_name: "Sarah Johnson".into(),
        guest_email: "sarah.j@email.com".into(),
        welcome_event: Attendance::Accept,
        wedding: Attendance::Decline,
        farewell_event: Attendance::Decline,
        entree_choice: None,
        note: Some(note.into()),
        timestamp: at(),
    }
}

#[test]
fn empty_export_is_header_only() {
    assert_eq!(export_csv(&[], &ExportOptions::default()), HEADER);
}

#[test]
fn renders_one_quoted_row_per_response() {
    let attending = RsvpResponse {
        guest_id: GuestId("1".into()),
        guest_name: "John Smith".into(),
        guest_email: "john.smith@email.com".into(),
        welcome_event: Attendance::Accept,
        wedding: Attendance::Accept,
        farewell_event: Attendance::Decline,
        entree_choice: Some(EntreeChoice::Fish),
        note: None,
        timestamp: at(),
    };
    let csv = export_csv(
        &[attending, decline_with_note("See you soon")],
        &ExportOptions::default(),
    );
    let lines: Vec<&str> = csv.split('\n').collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER);
    assert_eq!(
        lines[1],
        r#""John Smith","john.smith@email.com","accept","accept","decline","fish","","8/20/2025, 6:45:00 PM""#
    );
    assert_eq!(
        lines[2],
        r#""Sarah Johnson","sarah.j@email.com","accept","decline","decline","","See you soon","8/20/2025, 6:45:00 PM""#
    );
    assert!(!csv.ends_with('\n'));
}

#[test]
fn embedded_quotes_are_doubled() {
    let csv = export_csv(
        &[decline_with_note(r#"We "really" wish we could"#)],
        &ExportOptions::default(),
    );
    assert!(csv.contains(r#","We ""really"" wish we could","#));
}

#[test]
fn timestamps_follow_configured_offset() {
    let options = ExportOptions {
        utc_offset_minutes: -7 * 60,
    };
    assert_eq!(
        local_timestamp(at(), options.offset()),
        "8/20/2025, 11:45:00 AM"
    );
}

#[test]
fn out_of_range_offset_falls_back_to_utc() {
    let options = ExportOptions {
        utc_offset_minutes: 48 * 60,
    };
    assert_eq!(options.offset().local_minus_utc(), 0);
}
