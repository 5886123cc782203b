use super::*;
use anyhow::anyhow;
use shared::domain::GuestId;

struct StaticDirectory {
    guests: Vec<Guest>,
    unreachable: bool,
}

#[async_trait]
impl GuestDirectory for StaticDirectory {
    async fn candidates(&self, _name: &str, _email: &str) -> anyhow::Result<Vec<Guest>> {
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.guests.clone())
    }
}

fn guest(id: &str, name: &str, email: &str) -> Guest {
    Guest {
        id: GuestId(id.into()),
        name: name.into(),
        email: email.into(),
        plus_one: None,
    }
}

fn sample_directory() -> StaticDirectory {
    StaticDirectory {
        guests: vec![
            guest("1", "John Smith", "john.smith@email.com"),
            guest("2", "Jane Doe", "jane.doe@email.com"),
            guest("3", "Michael Johnson", "michael.j@email.com"),
        ],
        unreachable: false,
    }
}

#[tokio::test]
async fn matches_name_ignoring_case_and_blank_email() {
    let found = lookup_guest(&sample_directory(), "john smith", "")
        .await
        .expect("guest");
    assert_eq!(found.id, GuestId("1".into()));
}

#[tokio::test]
async fn matches_email_with_surrounding_whitespace() {
    let found = lookup_guest(&sample_directory(), "", "  Jane.Doe@Email.com ")
        .await
        .expect("guest");
    assert_eq!(found.id, GuestId("2".into()));
}

#[tokio::test]
async fn unknown_guest_is_not_found_with_guidance() {
    let err = lookup_guest(&sample_directory(), "Nobody Here", "nobody@x.com")
        .await
        .expect_err("should fail");
    match err {
        RsvpError::GuestNotFound(message) => assert!(message.contains("check the spelling")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn partial_names_are_not_accepted() {
    let err = lookup_guest(&sample_directory(), "John", "")
        .await
        .expect_err("substring must not verify");
    assert!(matches!(err, RsvpError::GuestNotFound(_)));
}

#[tokio::test]
async fn blank_inputs_never_match_blank_fields() {
    let directory = StaticDirectory {
        guests: vec![guest("9", "Walk In", "")],
        unreachable: false,
    };
    let err = lookup_guest(&directory, "", "")
        .await
        .expect_err("blank input");
    assert!(matches!(err, RsvpError::GuestNotFound(_)));
}

#[tokio::test]
async fn unreachable_directory_is_distinct_from_not_found() {
    let directory = StaticDirectory {
        guests: Vec::new(),
        unreachable: true,
    };
    let err = lookup_guest(&directory, "John Smith", "")
        .await
        .expect_err("should fail");
    assert!(matches!(err, RsvpError::LookupUnavailable(_)));
}

#[test]
fn name_and_email_of_the_same_guest_is_not_ambiguous() {
    let directory = sample_directory();
    let found = match_guest(&directory.guests, "John Smith", "john.smith@email.com")
        .expect("guest");
    assert_eq!(found.id, GuestId("1".into()));
}

#[test]
fn name_and_email_of_different_guests_is_ambiguous() {
    let directory = sample_directory();
    let err = match_guest(&directory.guests, "John Smith", "jane.doe@email.com")
        .expect_err("ambiguous");
    assert!(matches!(err, RsvpError::LookupAmbiguous(_)));
}

#[test]
fn shared_name_is_resolved_by_email() {
    let guests = vec![
        guest("1", "Alex Kim", "alex.k@email.com"),
        guest("2", "Alex Kim", "alex.kim@email.com"),
    ];
    let err = match_guest(&guests, "alex kim", "").expect_err("ambiguous by name alone");
    assert!(matches!(err, RsvpError::LookupAmbiguous(_)));

    let found = match_guest(&guests, "alex kim", "alex.kim@email.com").expect("guest");
    assert_eq!(found.id, GuestId("2".into()));
}

#[test]
fn duplicate_candidate_rows_collapse_to_one_guest() {
    let john = guest("1", "John Smith", "john.smith@email.com");
    let found = match_guest(&[john.clone(), john], "John Smith", "").expect("guest");
    assert_eq!(found.id, GuestId("1".into()));
}

#[test]
fn guest_records_need_every_identifying_field() {
    assert!(validate_guest_record(&guest("9", "Pat Doe", "pat@email.com")).is_ok());
    let err = validate_guest_record(&guest("9", "Pat Doe", "  ")).expect_err("blank email");
    assert!(err.contains("email"));
    assert!(validate_guest_record(&guest("", "Pat Doe", "pat@email.com")).is_err());
}
