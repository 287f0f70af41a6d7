//! Ticket service
//!
//! CRUD over work tickets plus the filtered, sorted, paged listing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::invariants::{assert_page_invariants, assert_ticket_invariants};
use crate::models::WorkTicket;
use crate::query::{
    contains_ignore_case, paginate, stable_sort_by, within_day_range, PagedResult, TicketQuery,
    TicketSortKey,
};
use crate::storage::TicketRepository;

pub struct TicketService<R: TicketRepository + ?Sized> {
    repo: Arc<R>,
}

impl<R: TicketRepository + ?Sized> TicketService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Stamp `created_at`, persist, and return the stored record
    #[instrument(skip(self, ticket), fields(ticket_number = ?ticket.ticket_number))]
    pub fn create_ticket(&self, mut ticket: WorkTicket) -> Result<WorkTicket> {
        ticket.created_at = Utc::now();
        ticket.updated_at = None;
        ticket.id = self.repo.insert_ticket(&ticket)?;

        info!(id = ticket.id, "Ticket created");
        Ok(ticket)
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<WorkTicket>> {
        let ticket = self.repo.get_ticket(id)?;
        if let Some(t) = &ticket {
            assert_ticket_invariants(t);
        }
        Ok(ticket)
    }

    /// Overwrite every editable field and stamp `updated_at`
    ///
    /// Returns `false` when no ticket carries `ticket.id`.
    #[instrument(skip(self, ticket), fields(id = ticket.id))]
    pub fn update_ticket(&self, ticket: &WorkTicket) -> Result<bool> {
        let mut ticket = ticket.clone();
        ticket.updated_at = Some(Utc::now());

        let updated = self.repo.update_ticket(&ticket)?;
        if updated {
            info!("Ticket updated");
        } else {
            debug!("Update skipped: no such ticket");
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub fn delete_ticket(&self, id: i64) -> Result<bool> {
        let deleted = self.repo.delete_ticket(id)?;
        if deleted {
            info!("Ticket deleted");
        }
        Ok(deleted)
    }

    /// Search, date-range filter, sort, then page
    #[instrument(skip(self))]
    pub fn list_tickets(&self, query: &TicketQuery) -> Result<PagedResult<WorkTicket>> {
        let request = &query.page;
        let mut tickets = self.repo.list_tickets()?;

        if let Some(needle) = request.search_needle() {
            tickets.retain(|t| {
                contains_ignore_case(t.ticket_number.as_deref(), &needle)
                    || contains_ignore_case(t.operator_name.as_deref(), &needle)
                    || contains_ignore_case(t.activity.as_deref(), &needle)
            });
        }

        if query.start_date.is_some() || query.end_date.is_some() {
            tickets.retain(|t| {
                within_day_range(t.start_date_time, query.start_date, query.end_date)
            });
        }

        if query.updated_start.is_some() || query.updated_end.is_some() {
            tickets.retain(|t| {
                t.updated_at
                    .is_some_and(|u| within_day_range(u, query.updated_start, query.updated_end))
            });
        }

        match TicketSortKey::parse(request.sort_by.as_deref()) {
            Some(key) => {
                stable_sort_by(&mut tickets, request.sort_ascending, |a, b| key.compare(a, b))
            }
            None => stable_sort_by(&mut tickets, false, |a, b| {
                TicketSortKey::CreatedAt.compare(a, b)
            }),
        }

        let result = paginate(tickets, request.page, request.page_size);
        assert_page_invariants(&result, request.page_size);
        Ok(result)
    }
}
