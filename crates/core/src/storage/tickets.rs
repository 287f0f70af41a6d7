//! Work ticket storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::constraint_error;
use super::parse::{format_datetime, parse_datetime, parse_datetime_opt, OptionalExt};
use crate::error::Result;
use crate::models::WorkTicket;

const TICKET_COLUMNS: &str = "id, ticket_number, cost_centre, activity, operator_name, \
     num_operators, start_date_time, start_counter, end_date_time, end_counter, quantity_in, \
     quantity_out, material_used, created_at, updated_at, created_by";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<WorkTicket> {
    Ok(WorkTicket {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        cost_centre: row.get(2)?,
        activity: row.get(3)?,
        operator_name: row.get(4)?,
        num_operators: row.get(5)?,
        start_date_time: parse_datetime(&row.get::<_, String>(6)?)?,
        start_counter: row.get(7)?,
        end_date_time: parse_datetime(&row.get::<_, String>(8)?)?,
        end_counter: row.get(9)?,
        quantity_in: row.get(10)?,
        quantity_out: row.get(11)?,
        material_used: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?)?,
        updated_at: parse_datetime_opt(row.get::<_, Option<String>>(14)?)?,
        created_by: row.get(15)?,
    })
}

pub struct TicketStore<'a> {
    conn: &'a Connection,
}

impl<'a> TicketStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a ticket and return its row ID
    #[instrument(skip(self, ticket), fields(ticket_number = ?ticket.ticket_number))]
    pub fn create(&self, ticket: &WorkTicket) -> Result<i64> {
        ticket.check_field_lengths()?;
        self.conn
            .execute(
                "INSERT INTO work_tickets (ticket_number, cost_centre, activity, operator_name,
                     num_operators, start_date_time, start_counter, end_date_time, end_counter,
                     quantity_in, quantity_out, material_used, created_at, updated_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    ticket.ticket_number,
                    ticket.cost_centre,
                    ticket.activity,
                    ticket.operator_name,
                    ticket.num_operators,
                    format_datetime(&ticket.start_date_time),
                    ticket.start_counter,
                    format_datetime(&ticket.end_date_time),
                    ticket.end_counter,
                    ticket.quantity_in,
                    ticket.quantity_out,
                    ticket.material_used,
                    format_datetime(&ticket.created_at),
                    ticket.updated_at.as_ref().map(format_datetime),
                    ticket.created_by,
                ],
            )
            .map_err(constraint_error)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Find ticket by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: i64) -> Result<Option<WorkTicket>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM work_tickets WHERE id = ?1",
            TICKET_COLUMNS
        ))?;

        let ticket = stmt.query_row(params![id], ticket_from_row).optional()?;

        Ok(ticket)
    }

    /// Overwrite every column except id and created_at
    #[instrument(skip(self, ticket), fields(ticket_id = ticket.id))]
    pub fn update(&self, ticket: &WorkTicket) -> Result<bool> {
        ticket.check_field_lengths()?;
        let changed = self
            .conn
            .execute(
                "UPDATE work_tickets SET ticket_number = ?1, cost_centre = ?2, activity = ?3,
                     operator_name = ?4, num_operators = ?5, start_date_time = ?6,
                     start_counter = ?7, end_date_time = ?8,
                     end_counter = ?9, quantity_in = ?10, quantity_out = ?11, material_used = ?12,
                     updated_at = ?13, created_by = ?14
                 WHERE id = ?15",
                params![
                    ticket.ticket_number,
                    ticket.cost_centre,
                    ticket.activity,
                    ticket.operator_name,
                    ticket.num_operators,
                    format_datetime(&ticket.start_date_time),
                    ticket.start_counter,
                    format_datetime(&ticket.end_date_time),
                    ticket.end_counter,
                    ticket.quantity_in,
                    ticket.quantity_out,
                    ticket.material_used,
                    ticket.updated_at.as_ref().map(format_datetime),
                    ticket.created_by,
                    ticket.id,
                ],
            )
            .map_err(constraint_error)?;
        Ok(changed > 0)
    }

    /// Delete ticket
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM work_tickets WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// List all tickets in insertion order
    pub fn list(&self) -> Result<Vec<WorkTicket>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM work_tickets ORDER BY id",
            TICKET_COLUMNS
        ))?;

        let tickets = stmt
            .query_map([], ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }
}
