//! Database operations for the study scheduler
//!
//! SQLite storage for cards, their persisted schedule state and a log of
//! review events. This is the default persistence collaborator for a
//! study session: `save_schedule_state` backs the autosave observer and
//! `get_due_card_specs` builds the session queue.

use crate::models::{CardSpec, PersistedScheduleState, ReviewEvent, TopicContext};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

/// Opens (or creates) the database at `path` and makes sure all tables exist.
///
/// Pass `":memory:"` for a throwaway database.
pub fn init_database(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;

    // Cards with an optional topic used to bias scheduling
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            topic_id TEXT,
            topic_weight REAL
        )",
        (),
    )?;

    // One row per card, same fields as the wire layout
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedule_states (
            card_id INTEGER PRIMARY KEY,
            version INTEGER NOT NULL,
            mode INTEGER NOT NULL,
            consecutive_correct INTEGER NOT NULL,
            due_unix INTEGER NOT NULL,
            last_review_unix INTEGER NOT NULL,
            ease_factor REAL NOT NULL,
            interval_days REAL NOT NULL,
            cram_interval_minutes REAL NOT NULL,
            cram_bleed_minutes REAL NOT NULL,
            topic_adjustment REAL NOT NULL,
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
        )",
        (),
    )?;

    // Append-only analytics log
    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id INTEGER NOT NULL,
            rating TEXT NOT NULL,
            session_mode TEXT NOT NULL,
            simulated INTEGER NOT NULL,
            reviewed_at INTEGER NOT NULL,
            due_unix INTEGER NOT NULL,
            interval_days REAL NOT NULL,
            ease_factor REAL NOT NULL,
            used_cram INTEGER NOT NULL,
            exam_override INTEGER NOT NULL
        )",
        (),
    )?;

    Ok(conn)
}

/// Adds a card and returns its id. The card has no schedule state until its
/// first review is saved.
pub fn add_card(label: &str, topic: Option<&TopicContext>, conn: &Connection) -> Result<i64> {
    conn.execute(
        "INSERT INTO cards (label, topic_id, topic_weight) VALUES (?1, ?2, ?3)",
        params![label, topic.map(|t| t.id.as_str()), topic.map(|t| t.weight)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn count_cards(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
}

/// Inserts or replaces the persisted schedule of a card.
pub fn save_schedule_state(
    card_id: i64,
    state: &PersistedScheduleState,
    conn: &Connection,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schedule_states
         (card_id, version, mode, consecutive_correct, due_unix, last_review_unix,
          ease_factor, interval_days, cram_interval_minutes, cram_bleed_minutes, topic_adjustment)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            card_id,
            state.version,
            state.mode,
            state.consecutive_correct,
            state.due_unix,
            state.last_review_unix,
            state.ease_factor,
            state.interval_days,
            state.cram_interval_minutes,
            state.cram_bleed_minutes,
            state.topic_adjustment
        ],
    )?;

    Ok(())
}

fn persisted_from_row(row: &Row<'_>, offset: usize) -> Result<PersistedScheduleState> {
    Ok(PersistedScheduleState {
        version: row.get(offset)?,
        mode: row.get(offset + 1)?,
        consecutive_correct: row.get(offset + 2)?,
        due_unix: row.get(offset + 3)?,
        last_review_unix: row.get(offset + 4)?,
        ease_factor: row.get(offset + 5)?,
        interval_days: row.get(offset + 6)?,
        cram_interval_minutes: row.get(offset + 7)?,
        cram_bleed_minutes: row.get(offset + 8)?,
        topic_adjustment: row.get(offset + 9)?,
    })
}

pub fn load_schedule_state(
    card_id: i64,
    conn: &Connection,
) -> Result<Option<PersistedScheduleState>> {
    conn.query_row(
        "SELECT version, mode, consecutive_correct, due_unix, last_review_unix,
                ease_factor, interval_days, cram_interval_minutes, cram_bleed_minutes, topic_adjustment
         FROM schedule_states WHERE card_id = ?1",
        params![card_id],
        |row| persisted_from_row(row, 0),
    )
    .optional()
}

/// Retrieves cards due for review at `now`
///
/// Cards never reviewed have no schedule row and are always due. The label
/// becomes `CardSpec::user_data`. Ordered by due time, then id.
pub fn get_due_card_specs(now: i64, conn: &Connection) -> Result<Vec<CardSpec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.label, c.topic_id, c.topic_weight, s.card_id,
                s.version, s.mode, s.consecutive_correct, s.due_unix, s.last_review_unix,
                s.ease_factor, s.interval_days, s.cram_interval_minutes, s.cram_bleed_minutes,
                s.topic_adjustment
         FROM cards c
         LEFT JOIN schedule_states s ON c.id = s.card_id
         WHERE s.card_id IS NULL OR s.due_unix <= ?1
         ORDER BY COALESCE(s.due_unix, 0) ASC, c.id ASC",
    )?;

    let specs = stmt
        .query_map(params![now], |row| {
            let card_id: i64 = row.get(0)?;
            let label: String = row.get(1)?;
            let topic_id: Option<String> = row.get(2)?;
            let topic_weight: Option<f64> = row.get(3)?;
            let scheduled: Option<i64> = row.get(4)?;

            let mut spec = CardSpec {
                card_id,
                user_data: label,
                topic: topic_id.map(|id| TopicContext::new(id, topic_weight.unwrap_or(1.0))),
                initial: Default::default(),
                context: None,
            };
            if scheduled.is_some() {
                spec = spec.with_persisted(persisted_from_row(row, 5)?);
            }
            Ok(spec)
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(specs)
}

/// Appends a graded review to the analytics log.
pub fn log_review_event(event: &ReviewEvent, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO review_log
         (card_id, rating, session_mode, simulated, reviewed_at, due_unix,
          interval_days, ease_factor, used_cram, exam_override)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.card_id,
            event.rating.as_str(),
            event.mode.as_str(),
            event.simulated,
            event.result.reviewed_at,
            event.result.due_unix,
            event.result.interval_days,
            event.result.ease_factor,
            event.result.used_cram,
            event.result.exam_override
        ],
    )?;

    Ok(())
}

pub fn count_review_events(card_id: i64, conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM review_log WHERE card_id = ?1",
        params![card_id],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        InitialState, Rating, ReviewContext, SessionMode, SessionObservers, SessionOrchestrator,
        TraceMode, default_config, init_state, pack,
    };
    use std::rc::Rc;

    const NOW: i64 = 1_700_000_000;

    fn test_db() -> Connection {
        init_database(":memory:").unwrap()
    }

    #[test]
    fn test_add_card_without_state_is_due() {
        let conn = test_db();
        let id = add_card("hello", Some(&TopicContext::new("greetings", 0.8)), &conn).unwrap();

        let specs = get_due_card_specs(NOW, &conn).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].card_id, id);
        assert_eq!(specs[0].user_data, "hello");
        assert_eq!(specs[0].topic, Some(TopicContext::new("greetings", 0.8)));
        assert_eq!(specs[0].initial, InitialState::Fresh);
        assert!(load_schedule_state(id, &conn).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_schedule_state() {
        let conn = test_db();
        let id = add_card("card", None, &conn).unwrap();
        let mut state = init_state(&default_config());
        state.due_unix = NOW + 3600;
        state.ease_factor = 2.15;
        state.consecutive_correct = 2;
        let persisted = pack(&state);

        save_schedule_state(id, &persisted, &conn).unwrap();
        assert_eq!(load_schedule_state(id, &conn).unwrap(), Some(persisted.clone()));

        // Overwrites rather than duplicating
        save_schedule_state(id, &persisted, &conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schedule_states", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_due_query_filters_and_orders() {
        let conn = test_db();
        let later = add_card("later", None, &conn).unwrap();
        let soon = add_card("soon", None, &conn).unwrap();
        let future = add_card("future", None, &conn).unwrap();
        let fresh = add_card("fresh", None, &conn).unwrap();

        for (id, due) in [(later, NOW - 10), (soon, NOW - 100), (future, NOW + 100)] {
            let mut state = init_state(&default_config());
            state.due_unix = due;
            save_schedule_state(id, &pack(&state), &conn).unwrap();
        }

        let specs = get_due_card_specs(NOW, &conn).unwrap();
        let ids: Vec<i64> = specs.iter().map(|spec| spec.card_id).collect();
        assert_eq!(ids, vec![fresh, soon, later]);
        assert!(matches!(specs[1].initial, InitialState::Persisted(_)));
    }

    #[test]
    fn test_session_autosaves_and_logs() {
        let conn = Rc::new(test_db());
        let id = add_card("card", None, &conn).unwrap();

        let save_conn = Rc::clone(&conn);
        let log_conn = Rc::clone(&conn);
        let mut session: SessionOrchestrator<String> = SessionOrchestrator::new(default_config())
            .with_trace(TraceMode::Disabled)
            .with_observers(SessionObservers {
                autosave: Some(Box::new(
                    move |event: &ReviewEvent, persisted: &PersistedScheduleState| {
                        save_schedule_state(event.card_id, persisted, &save_conn).is_ok()
                    },
                )),
                analytics: Some(Box::new(move |event: &ReviewEvent| {
                    let _ = log_review_event(event, &log_conn);
                })),
                ..Default::default()
            });

        let specs = get_due_card_specs(NOW, &conn).unwrap();
        assert!(session.begin(SessionMode::Mastery, specs));
        let result = session
            .grade(Rating::Good, Some(&ReviewContext::at(NOW)))
            .unwrap();

        let stored = load_schedule_state(id, &conn).unwrap().unwrap();
        assert_eq!(stored.due_unix, result.due_unix);
        assert_eq!(stored.last_review_unix, NOW);
        assert_eq!(count_review_events(id, &conn).unwrap(), 1);

        // Scheduled into the future, so no longer due
        assert!(get_due_card_specs(NOW, &conn).unwrap().is_empty());
    }
}
