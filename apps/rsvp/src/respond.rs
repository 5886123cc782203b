use std::io::{self, Write};

use anyhow::Result;
use chrono::Utc;
use client_core::RsvpClient;
use rsvp_core::wizard::{Choice, RsvpFormData, RsvpSession, StepPrompt, WizardStep, TOTAL_STEPS};
use shared::domain::{Guest, RsvpResponse};
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::RespondArgs;

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Back,
    Restart,
    /// Keep the current answer and move forward.
    Proceed,
    Choose(Choice),
    Note(String),
    Invalid(String),
}

pub(crate) fn parse_command(prompt: &StepPrompt, line: &str) -> Command {
    let trimmed = line.trim();
    match trimmed {
        "/back" => return Command::Back,
        "/restart" => return Command::Restart,
        "" => return Command::Proceed,
        _ => {}
    }
    if prompt.takes_free_text() {
        if trimmed == "/clear" {
            return Command::Note(String::new());
        }
        return Command::Note(trimmed.to_string());
    }

    let by_number = trimmed
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| prompt.choices.get(index));
    let by_label = || {
        prompt
            .choices
            .iter()
            .find(|option| option.label.eq_ignore_ascii_case(trimmed))
    };
    match by_number.or_else(by_label) {
        Some(option) => Command::Choose(option.choice),
        None => Command::Invalid(format!(
            "Please pick 1-{} or type an option name.",
            prompt.choices.len()
        )),
    }
}

pub(crate) fn render_prompt(prompt: &StepPrompt, form: &RsvpFormData) -> String {
    let mut out = format!(
        "\nStep {} of {TOTAL_STEPS}: {}\n{}\n",
        prompt.step.position(),
        prompt.title,
        prompt.question
    );
    if let Some(hint) = prompt.hint {
        out.push_str(&format!("({hint})\n"));
    }
    if prompt.takes_free_text() {
        if form.note.trim().is_empty() {
            out.push_str("Type your note, or press Enter to skip.\n");
        } else {
            out.push_str(&format!("Current note: {}\n", form.note.trim()));
            out.push_str("Type a new note, press Enter to keep it, or /clear to remove it.\n");
        }
    } else {
        let current = form.answer(prompt.step);
        for (index, option) in prompt.choices.iter().enumerate() {
            let marker = if current == Some(option.choice) { "*" } else { " " };
            out.push_str(&format!("{marker} {}. {}\n", index + 1, option.label));
        }
    }
    if prompt.step != WizardStep::WelcomeEvent {
        out.push_str("(/back for the previous question, /restart to start over)\n");
    }
    out
}

pub(crate) fn render_confirmation(guest: &Guest, response: &RsvpResponse) -> String {
    let mut out = format!("\nThank you, {}! Your RSVP has been received.\n", guest.name);
    for (label, value) in response.confirmation_lines() {
        out.push_str(&format!("  {label}: {value}\n"));
    }
    out
}

async fn ask(input: &mut Input, question: &str) -> Result<Option<String>> {
    print!("{question}");
    io::stdout().flush()?;
    Ok(input.next_line().await?)
}

async fn verify(
    client: &RsvpClient,
    input: &mut Input,
    args: RespondArgs,
) -> Result<Option<Guest>> {
    let mut name = args.name;
    let mut email = args.email;
    loop {
        let name_value = match name.take() {
            Some(v) => v,
            None => match ask(input, "Full name (as on your invitation): ").await? {
                Some(v) => v,
                None => return Ok(None),
            },
        };
        let email_value = match email.take() {
            Some(v) => v,
            None => match ask(input, "Email (optional if name given): ").await? {
                Some(v) => v,
                None => return Ok(None),
            },
        };
        if name_value.trim().is_empty() && email_value.trim().is_empty() {
            println!("Please enter your full name or email address.");
            continue;
        }
        match client.verify_guest(&name_value, &email_value).await {
            Ok(guest) => return Ok(Some(guest)),
            Err(error) => println!("{error}"),
        }
    }
}

pub(crate) async fn run(server_url: &str, args: RespondArgs) -> Result<()> {
    let client = RsvpClient::new(server_url);
    let mut input = BufReader::new(stdin()).lines();

    let Some(guest) = verify(&client, &mut input, args).await? else {
        return Ok(());
    };
    println!("\nWelcome, {}!", guest.name);
    if let Some(plus_one) = &guest.plus_one {
        println!("Your invitation includes {plus_one}.");
    }

    let mut session = RsvpSession::new(guest);
    while let Some(prompt) = session.prompt() {
        let Some(form) = session.form() else { break };
        print!("{}", render_prompt(&prompt, form));
        let Some(line) = ask(&mut input, "> ").await? else {
            return Ok(());
        };

        let moved = match parse_command(&prompt, &line) {
            Command::Back => session.back().map(|_| false),
            Command::Restart => session.start_over().map(|_| false),
            Command::Proceed => Ok(true),
            Command::Choose(choice) => session.choose(choice).map(|_| true),
            Command::Note(note) => session.write_note(note).map(|_| true),
            Command::Invalid(message) => {
                println!("{message}");
                Ok(false)
            }
        };
        match moved {
            Ok(true) => {}
            Ok(false) => continue,
            Err(error) => {
                println!("{error}");
                continue;
            }
        }

        if !prompt.step.is_final() {
            if let Err(error) = session.advance() {
                println!("{error}");
            }
            continue;
        }

        println!("Submitting your RSVP...");
        match session.submit(&client, Utc::now()).await {
            Ok(response) => {
                print!("{}", render_confirmation(session.guest(), &response));
                return Ok(());
            }
            Err(error) => println!("{error}"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/respond_tests.rs"]
mod tests;
