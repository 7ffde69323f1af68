//! Calendar event commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use planboard_core::validation::{parse_attendees, parse_reminders, parse_timestamp};
use planboard_core::{
    AttendeeResponse, CalendarEvent, Config, ConflictChecker, EventStatus, PlanDb, SaveOutcome,
    TimeWindow,
};
use serde::Serialize;

use super::print_json;

#[derive(Subcommand)]
pub enum EventAction {
    /// Create a calendar event and report conflicts
    Add {
        /// Event title
        title: String,
        /// Start time (RFC 3339, YYYY-MM-DDTHH:MM or YYYY-MM-DD, UTC)
        #[arg(long)]
        start: String,
        /// End time; defaults to start plus calendar.default_meeting_minutes
        #[arg(long)]
        end: Option<String>,
        /// Comma-separated attendee ids
        #[arg(long)]
        attendees: String,
        /// Owning project id
        #[arg(long)]
        project_id: Option<String>,
        /// Owning task id
        #[arg(long)]
        task_id: Option<String>,
        /// Owning milestone id
        #[arg(long)]
        milestone_id: Option<String>,
        /// confirmed or tentative
        #[arg(long, default_value = "confirmed")]
        status: String,
        /// Comma-separated reminder leads in minutes; defaults to calendar.reminder_minutes
        #[arg(long)]
        reminders: Option<String>,
        /// Refuse to store the event if it conflicts
        #[arg(long)]
        strict: bool,
    },
    /// Update an event and report conflicts for its new version
    Update {
        /// Event ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Comma-separated attendee ids (replaces the list)
        #[arg(long)]
        attendees: Option<String>,
        /// confirmed, tentative or cancelled
        #[arg(long)]
        status: Option<String>,
        /// Comma-separated reminder leads in minutes (replaces the list)
        #[arg(long)]
        reminders: Option<String>,
        /// Refuse to save the update if it conflicts
        #[arg(long)]
        strict: bool,
    },
    /// Record an attendee's response
    Respond {
        /// Event ID
        id: String,
        /// Attendee id
        attendee: String,
        /// accepted, declined, tentative or needs_action
        response: String,
    },
    /// Show one event
    Get {
        /// Event ID
        id: String,
    },
    /// List events that are not deleted
    List,
    /// Soft-delete an event
    Delete {
        /// Event ID
        id: String,
    },
    /// Check a stored event against the rest of the calendar
    Check {
        /// Event ID
        id: String,
    },
}

#[derive(Serialize)]
struct EventReport<'a> {
    event: &'a CalendarEvent,
    conflicts: Vec<planboard_core::Conflict>,
}

fn parse_status(raw: &str) -> Result<EventStatus, Box<dyn std::error::Error>> {
    match raw {
        "confirmed" => Ok(EventStatus::Confirmed),
        "tentative" => Ok(EventStatus::Tentative),
        "cancelled" => Ok(EventStatus::Cancelled),
        other => Err(format!("unknown event status: {other}").into()),
    }
}

fn parse_response(raw: &str) -> Result<AttendeeResponse, Box<dyn std::error::Error>> {
    match raw {
        "accepted" => Ok(AttendeeResponse::Accepted),
        "declined" => Ok(AttendeeResponse::Declined),
        "tentative" => Ok(AttendeeResponse::Tentative),
        "needs_action" => Ok(AttendeeResponse::NeedsAction),
        other => Err(format!("unknown response: {other}").into()),
    }
}

/// Print the report and turn a refused strict save into an error.
fn finish(
    outcome: SaveOutcome,
    candidate: &CalendarEvent,
    refused: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        SaveOutcome::Saved { event, conflicts } => print_json(&EventReport {
            event: &event,
            conflicts,
        }),
        SaveOutcome::Rejected { conflicts } => {
            print_json(&EventReport {
                event: candidate,
                conflicts,
            })?;
            Err(refused.into())
        }
    }
}

fn load_event(db: &PlanDb, id: &str) -> Result<CalendarEvent, Box<dyn std::error::Error>> {
    match db.get_event(id)? {
        Some(event) if !event.deleted => Ok(event),
        _ => Err(format!("Event not found: {id}").into()),
    }
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = PlanDb::open()?;
    let checker = ConflictChecker::from_config(&config);

    match action {
        EventAction::Add {
            title,
            start,
            end,
            attendees,
            project_id,
            task_id,
            milestone_id,
            status,
            reminders,
            strict,
        } => {
            let start = parse_timestamp(&start)?;
            let window = match end {
                Some(end) => TimeWindow::new(start, parse_timestamp(&end)?)?,
                None => TimeWindow::starting_at(
                    start,
                    i64::from(config.calendar.default_meeting_minutes),
                )?,
            };
            let mut event = CalendarEvent::new(title, window, parse_attendees(&attendees));
            event.project_id = project_id;
            event.task_id = task_id;
            event.milestone_id = milestone_id;
            event.status = parse_status(&status)?;
            event.reminder_minutes = match reminders {
                Some(raw) => parse_reminders(&raw, &event.id)?,
                None => config.reminder_minutes(),
            };

            let outcome = checker.create(&db, &event, strict)?;
            finish(outcome, &event, "event conflicts with existing events; not saved")?;
        }
        EventAction::Update {
            id,
            title,
            start,
            end,
            attendees,
            status,
            reminders,
            strict,
        } => {
            let mut event = load_event(&db, &id)?;
            if let Some(t) = title {
                event.title = t;
            }
            let start = start.map(|s| parse_timestamp(&s)).transpose()?;
            let end = end.map(|s| parse_timestamp(&s)).transpose()?;
            if start.is_some() || end.is_some() {
                // Moving only the start keeps the previous length.
                let length = event.window.duration();
                let new_start = start.unwrap_or(event.window.start);
                event.window = match (start, end) {
                    (_, Some(end)) => TimeWindow::new(new_start, end)?,
                    _ => TimeWindow::lasting(new_start, length)?,
                };
            }
            if let Some(a) = attendees {
                event.attendees = parse_attendees(&a);
            }
            if let Some(s) = status {
                event.status = parse_status(&s)?;
            }
            if let Some(raw) = reminders {
                event.reminder_minutes = parse_reminders(&raw, &event.id)?;
            }

            let outcome = checker.update(&db, &event, strict)?;
            finish(outcome, &event, "update conflicts with existing events; not saved")?;
        }
        EventAction::Respond {
            id,
            attendee,
            response,
        } => {
            let mut event = load_event(&db, &id)?;
            if !event.attendees.contains(&attendee) {
                return Err(format!("{attendee} is not invited to {id}").into());
            }
            event.responses.insert(attendee, parse_response(&response)?);
            let saved = db.update_event(&event)?;
            print_json(&saved)?;
        }
        EventAction::Get { id } => {
            let event = load_event(&db, &id)?;
            print_json(&event)?;
        }
        EventAction::List => {
            print_json(&db.list_events()?)?;
        }
        EventAction::Delete { id } => {
            db.delete_event(&id)?;
            println!("Event deleted: {id}");
        }
        EventAction::Check { id } => {
            let event = load_event(&db, &id)?;
            match checker.check_event(&db, &event, Utc::now())? {
                Some(detected) => print_json(&detected)?,
                None => println!("[]"),
            }
        }
    }
    Ok(())
}
