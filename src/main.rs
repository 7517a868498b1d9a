use study_scheduler::*;

use chrono::{DateTime, Local};
use database::db::{
    add_card, count_cards, get_due_card_specs, init_database, log_review_event,
    save_schedule_state,
};
use export::json::load_config_from_path;
use models::{PersistedScheduleState, SessionObservers, TopicContext};
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Formats the due time of a review as local date and time
fn format_due(result: &ReviewResult) -> String {
    match result.due_at() {
        Some(due) => {
            let local: DateTime<Local> = due.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => "unknown".to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(|| "study.sqlite3".to_string());
    let config = match args.next() {
        Some(path) => load_config_from_path(path)?,
        None => default_config(),
    };

    let conn = Rc::new(init_database(&db_path)?);

    if count_cards(&conn)? == 0 {
        let vocabulary = TopicContext::new("vocabulary", 1.0);
        let grammar = TopicContext::new("grammar", 0.8);

        add_card("cześć - hello", Some(&vocabulary), &conn)?;
        add_card("dziękuję - thank you", Some(&vocabulary), &conn)?;
        add_card("proszę - please", Some(&vocabulary), &conn)?;
        add_card("instrumental case after 'z'", Some(&grammar), &conn)?;

        println!("Sample cards created!");
    }

    let now = chrono::Utc::now().timestamp();
    let specs = get_due_card_specs(now, &conn)?;
    println!("{} cards due for review", specs.len());

    let save_conn = Rc::clone(&conn);
    let log_conn = Rc::clone(&conn);
    let observers = SessionObservers {
        autosave: Some(Box::new(
            move |event: &ReviewEvent, persisted: &PersistedScheduleState| {
                match save_schedule_state(event.card_id, persisted, &save_conn) {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("Failed to save card {}: {}", event.card_id, e);
                        false
                    }
                }
            },
        )),
        analytics: Some(Box::new(move |event: &ReviewEvent| {
            if let Err(e) = log_review_event(event, &log_conn) {
                log::warn!("Failed to log review of card {}: {}", event.card_id, e);
            }
        })),
        ..Default::default()
    };

    let mut session: SessionOrchestrator<String> =
        SessionOrchestrator::new(config).with_observers(observers);
    session.begin(SessionMode::Mastery, specs);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(card) = session.current() {
        print!(
            "[{} left] {} (fail/hard/good/easy/cram, q to quit): ",
            session.remaining(),
            card.user_data
        );
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim() == "q" {
            break;
        }

        let rating: Rating = match line.parse() {
            Ok(rating) => rating,
            Err(e) => {
                println!("  {}", e);
                continue;
            }
        };

        match session.grade(rating, None) {
            Some(result) => println!(
                "  next review {} ({:.2} days, ease {:.2})",
                format_due(&result),
                result.interval_days,
                result.ease_factor
            ),
            None => println!("  could not save the review, try again"),
        }
    }

    session.end();
    Ok(())
}
