use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Executor, Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{
    fold_case, Attendance, EntreeChoice, Guest, GuestId, ResponseId, RsvpResponse,
};

/// SQLite-backed guest directory and append-only response log.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub response_id: ResponseId,
    pub response: RsvpResponse,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts a guest, replacing name/email/plus-one when the id already exists.
    pub async fn upsert_guest(&self, guest: &Guest) -> Result<()> {
        upsert_guest_with(&self.pool, guest).await
    }

    /// Upserts every guest in one transaction; a failure leaves the
    /// directory unchanged.
    pub async fn upsert_guests(&self, guests: &[Guest]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for guest in guests {
            upsert_guest_with(&mut *tx, guest).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_guest(&self, guest_id: &GuestId) -> Result<Option<Guest>> {
        let row = sqlx::query("SELECT id, name, email, plus_one_name FROM guests WHERE id = ?")
            .bind(guest_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| guest_from_row(&r)))
    }

    pub async fn list_guests(&self) -> Result<Vec<Guest>> {
        let rows = sqlx::query(
            "SELECT id, name, email, plus_one_name FROM guests ORDER BY name_folded ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(guest_from_row).collect())
    }

    /// Coarse pre-filter for directory lookups: guests whose name contains
    /// `name` or whose email contains `email`, compared on the case-folded
    /// columns. Blank inputs contribute no candidates. Callers apply the
    /// exact match.
    pub async fn find_guest_candidates(&self, name: &str, email: &str) -> Result<Vec<Guest>> {
        let name = fold_case(name);
        let email = fold_case(email);
        if name.is_empty() && email.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, name, email, plus_one_name
            FROM guests
            WHERE (?1 <> '' AND name_folded LIKE ?2 ESCAPE '\')
               OR (?3 <> '' AND email_folded LIKE ?4 ESCAPE '\')
            ORDER BY id ASC
            "#,
        )
        .bind(&name)
        .bind(contains_pattern(&name))
        .bind(&email)
        .bind(contains_pattern(&email))
        .fetch_all(&self.pool)
        .await
        .context("guest directory query failed")?;

        debug!(candidates = rows.len(), "guest directory pre-filter");
        Ok(rows.iter().map(guest_from_row).collect())
    }

    pub async fn insert_response(&self, response: &RsvpResponse) -> Result<ResponseId> {
        let rec = sqlx::query(
            "INSERT INTO rsvp_responses (guest_id, guest_name, guest_email, welcome_event_response, wedding_response, farewell_event_response, entree_choice, note, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(response.guest_id.as_str())
        .bind(&response.guest_name)
        .bind(&response.guest_email)
        .bind(response.welcome_event.as_str())
        .bind(response.wedding.as_str())
        .bind(response.farewell_event.as_str())
        .bind(response.entree_choice.map(EntreeChoice::as_str))
        .bind(response.note.as_deref())
        .bind(response.timestamp)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to store response for guest '{}'", response.guest_id))?;
        Ok(ResponseId(rec.get::<i64, _>(0)))
    }

    /// Every stored response, most recent first by response timestamp.
    pub async fn list_responses(&self) -> Result<Vec<StoredResponse>> {
        let rows = sqlx::query(
            "SELECT id, guest_id, guest_name, guest_email, welcome_event_response, wedding_response, farewell_event_response, entree_choice, note, timestamp
             FROM rsvp_responses
             ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list responses")?;

        let mut stored = rows
            .iter()
            .map(stored_response_from_row)
            .collect::<Result<Vec<_>>>()?;
        // Text ordering of mixed-precision timestamps is not strictly chronological.
        stored.sort_by(|a, b| {
            b.response
                .timestamp
                .cmp(&a.response.timestamp)
                .then(b.response_id.0.cmp(&a.response_id.0))
        });
        Ok(stored)
    }
}

async fn upsert_guest_with<'e, E>(executor: E, guest: &Guest) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO guests (id, name, email, plus_one_name, name_folded, email_folded) VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name, email=excluded.email, plus_one_name=excluded.plus_one_name,
             name_folded=excluded.name_folded, email_folded=excluded.email_folded",
    )
    .bind(guest.id.as_str())
    .bind(guest.name.trim())
    .bind(guest.email.trim())
    .bind(guest.plus_one.as_deref())
    .bind(fold_case(&guest.name))
    .bind(fold_case(&guest.email))
    .execute(executor)
    .await
    .with_context(|| format!("failed to store guest '{}'", guest.id))?;
    Ok(())
}

fn guest_from_row(r: &SqliteRow) -> Guest {
    Guest {
        id: GuestId(r.get::<String, _>(0)),
        name: r.get::<String, _>(1),
        email: r.get::<String, _>(2),
        plus_one: r.get::<Option<String>, _>(3),
    }
}

fn stored_response_from_row(r: &SqliteRow) -> Result<StoredResponse> {
    let attendance = |column: &str| -> Result<Attendance> {
        let raw: String = r.try_get(column)?;
        Attendance::parse(&raw).ok_or_else(|| anyhow!("invalid {column} value '{raw}'"))
    };
    let entree_choice = match r.try_get::<Option<String>, _>("entree_choice")? {
        Some(raw) => Some(
            EntreeChoice::parse(&raw).ok_or_else(|| anyhow!("invalid entree_choice '{raw}'"))?,
        ),
        None => None,
    };
    let timestamp: DateTime<Utc> = r.try_get("timestamp")?;

    Ok(StoredResponse {
        response_id: ResponseId(r.try_get::<i64, _>("id")?),
        response: RsvpResponse {
            guest_id: GuestId(r.try_get("guest_id")?),
            guest_name: r.try_get("guest_name")?,
            guest_email: r.try_get("guest_email")?,
            welcome_event: attendance("welcome_event_response")?,
            wedding: attendance("wedding_response")?,
            farewell_event: attendance("farewell_event_response")?,
            entree_choice,
            note: r.try_get("note")?,
            timestamp,
        },
    })
}

fn contains_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
