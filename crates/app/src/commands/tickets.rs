use chrono::Utc;
use ticketbook_core::{Principal, Result, TicketQuery, WorkTicket};
use uuid::Uuid;

use super::{page_footer, to_json};
use crate::cli::{TicketCommand, TicketFields};
use crate::state::AppState;

pub fn run(state: &AppState, command: TicketCommand) -> Result<String> {
    match command {
        TicketCommand::Create { session, fields } => {
            let principal = signed_in(state, session)?;
            // Without --start/--end the interval is "now"
            let now = Utc::now();
            let mut ticket = WorkTicket {
                created_by: Some(principal.identity),
                start_date_time: now,
                end_date_time: now,
                ..Default::default()
            };
            fields.apply_to(&mut ticket);

            let created = state.tickets.create_ticket(ticket)?;
            Ok(format!("Created ticket {}", created.id))
        }

        TicketCommand::Show { id, session, json } => {
            signed_in(state, session)?;
            match state.tickets.get_ticket(id)? {
                Some(ticket) if json => to_json(&ticket),
                Some(ticket) => Ok(detail(&ticket)),
                None => Ok(format!("No ticket {}", id)),
            }
        }

        TicketCommand::List {
            session,
            page,
            from,
            to,
            updated_from,
            updated_to,
            json,
        } => {
            signed_in(state, session)?;
            let query = TicketQuery {
                page: page.into(),
                start_date: from,
                end_date: to,
                updated_start: updated_from,
                updated_end: updated_to,
            };
            let result = state.tickets.list_tickets(&query)?;

            if json {
                return to_json(&result);
            }

            let mut out: Vec<String> = result.items.iter().map(summary_line).collect();
            out.push(page_footer(
                query.page.page,
                query.page.page_size,
                result.items.len(),
                result.total_count,
            ));
            Ok(out.join("\n"))
        }

        TicketCommand::Update {
            id,
            session,
            fields,
        } => {
            signed_in(state, session)?;
            let Some(mut ticket) = state.tickets.get_ticket(id)? else {
                return Ok(format!("No ticket {}", id));
            };
            fields.apply_to(&mut ticket);

            if state.tickets.update_ticket(&ticket)? {
                Ok(format!("Updated ticket {}", id))
            } else {
                Ok(format!("No ticket {}", id))
            }
        }

        TicketCommand::Delete { id, session } => {
            signed_in(state, session)?;
            if state.tickets.delete_ticket(id)? {
                Ok(format!("Deleted ticket {}", id))
            } else {
                Ok(format!("No ticket {}", id))
            }
        }
    }
}

fn signed_in(state: &AppState, session: Uuid) -> Result<Principal> {
    state.auth.require_authenticated(Some(session))
}

impl TicketFields {
    fn apply_to(self, ticket: &mut WorkTicket) {
        if let Some(v) = self.number {
            ticket.ticket_number = Some(v);
        }
        if let Some(v) = self.cost_centre {
            ticket.cost_centre = Some(v);
        }
        if let Some(v) = self.activity {
            ticket.activity = Some(v);
        }
        if let Some(v) = self.operator {
            ticket.operator_name = Some(v);
        }
        if let Some(v) = self.operators {
            ticket.num_operators = v;
        }
        if let Some(v) = self.start {
            ticket.start_date_time = v;
        }
        if let Some(v) = self.end {
            ticket.end_date_time = v;
        }
        if let Some(v) = self.start_counter {
            ticket.start_counter = v;
        }
        if let Some(v) = self.end_counter {
            ticket.end_counter = v;
        }
        if let Some(v) = self.quantity_in {
            ticket.quantity_in = v;
        }
        if let Some(v) = self.quantity_out {
            ticket.quantity_out = v;
        }
        if let Some(v) = self.material {
            ticket.material_used = Some(v);
        }
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn summary_line(t: &WorkTicket) -> String {
    format!(
        "{:>6}  {:<12} {:<20} {:<20} {}",
        t.id,
        text(&t.ticket_number),
        text(&t.operator_name),
        text(&t.activity),
        t.start_date_time.format("%Y-%m-%d %H:%M"),
    )
}

fn detail(t: &WorkTicket) -> String {
    let updated = t
        .updated_at
        .map(|u| u.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    [
        format!("id:             {}", t.id),
        format!("ticket number:  {}", text(&t.ticket_number)),
        format!("cost centre:    {}", text(&t.cost_centre)),
        format!("activity:       {}", text(&t.activity)),
        format!("operator:       {}", text(&t.operator_name)),
        format!("operators:      {}", t.num_operators),
        format!("start:          {} (counter {})", t.start_date_time.to_rfc3339(), t.start_counter),
        format!("end:            {} (counter {})", t.end_date_time.to_rfc3339(), t.end_counter),
        format!("quantity:       {} in, {} out", t.quantity_in, t.quantity_out),
        format!("material:       {}", text(&t.material_used)),
        format!("created:        {} by {}", t.created_at.to_rfc3339(), text(&t.created_by)),
        format!("updated:        {}", updated),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{parse_timestamp, PageArgs};
    use crate::state::tests::test_state;
    use ticketbook_core::Error;

    fn admin_session(state: &AppState) -> Uuid {
        state
            .auth
            .sign_in("admin", "admin-pw")
            .unwrap()
            .unwrap()
            .session_id
    }

    fn fields(number: &str, operator: &str, start: &str) -> TicketFields {
        TicketFields {
            number: Some(number.to_string()),
            operator: Some(operator.to_string()),
            activity: Some("Cutting".to_string()),
            start: Some(parse_timestamp(start).unwrap()),
            ..Default::default()
        }
    }

    fn list(state: &AppState, session: Uuid, search: Option<&str>, to: Option<&str>) -> String {
        run(
            state,
            TicketCommand::List {
                session,
                page: PageArgs {
                    page: 1,
                    page_size: 10,
                    search: search.map(str::to_string),
                    sort: Some("ticketNumber".to_string()),
                    desc: false,
                },
                from: None,
                to: to.map(|t| parse_timestamp(t).unwrap()),
                updated_from: None,
                updated_to: None,
                json: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_requires_session() {
        let state = test_state();
        let result = run(
            &state,
            TicketCommand::Delete {
                id: 1,
                session: Uuid::new_v4(),
            },
        );
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[test]
    fn test_create_show_update_delete() {
        let state = test_state();
        let session = admin_session(&state);

        let out = run(
            &state,
            TicketCommand::Create {
                session,
                fields: fields("T1", "Alice Smith", "2024-01-05T08:00:00Z"),
            },
        )
        .unwrap();
        assert_eq!(out, "Created ticket 1");

        let stored = state.tickets.get_ticket(1).unwrap().unwrap();
        assert_eq!(stored.created_by.as_deref(), Some("admin"));

        let out = run(
            &state,
            TicketCommand::Update {
                id: 1,
                session,
                fields: TicketFields {
                    quantity_out: Some(42),
                    ..Default::default()
                },
            },
        )
        .unwrap();
        assert_eq!(out, "Updated ticket 1");

        let stored = state.tickets.get_ticket(1).unwrap().unwrap();
        assert_eq!(stored.quantity_out, 42);
        assert_eq!(stored.ticket_number.as_deref(), Some("T1"));
        assert!(stored.updated_at.is_some());

        let shown = run(&state, TicketCommand::Show { id: 1, session, json: false }).unwrap();
        assert!(shown.contains("ticket number:  T1"));
        assert!(shown.contains("0 in, 42 out"));

        let json = run(&state, TicketCommand::Show { id: 1, session, json: true }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["quantity_out"], 42);

        assert_eq!(
            run(&state, TicketCommand::Delete { id: 1, session }).unwrap(),
            "Deleted ticket 1"
        );
        assert_eq!(
            run(&state, TicketCommand::Delete { id: 1, session }).unwrap(),
            "No ticket 1"
        );
        assert_eq!(
            run(
                &state,
                TicketCommand::Update {
                    id: 1,
                    session,
                    fields: TicketFields::default()
                }
            )
            .unwrap(),
            "No ticket 1"
        );
    }

    #[test]
    fn test_create_without_interval_uses_now() {
        let state = test_state();
        let session = admin_session(&state);
        let before = Utc::now();

        run(
            &state,
            TicketCommand::Create {
                session,
                fields: TicketFields {
                    number: Some("T1".to_string()),
                    ..Default::default()
                },
            },
        )
        .unwrap();

        let stored = state.tickets.get_ticket(1).unwrap().unwrap();
        assert!(stored.start_date_time >= before);
        assert!(stored.end_date_time >= before);
        assert!(stored.start_date_time <= stored.created_at);
    }

    #[test]
    fn test_list_filters() {
        let state = test_state();
        let session = admin_session(&state);
        for (n, op, start) in [
            ("T1", "Alice Smith", "2024-01-05T23:59:00Z"),
            ("T2", "Bob", "2024-01-06T08:00:00Z"),
        ] {
            run(
                &state,
                TicketCommand::Create {
                    session,
                    fields: fields(n, op, start),
                },
            )
            .unwrap();
        }

        let out = list(&state, session, Some("smith"), None);
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().next().unwrap().contains("T1"));

        let out = list(&state, session, None, Some("2024-01-05"));
        assert!(out.ends_with("(1 shown, 1 total, page size 10)"));

        let out = list(&state, session, None, Some("2024-01-04"));
        assert_eq!(out, "page 1 (0 shown, 0 total, page size 10)");
    }
}
