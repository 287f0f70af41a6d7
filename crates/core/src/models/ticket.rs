//! Work ticket model

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TICKET_NUMBER_MAX_LEN: usize = 50;
pub const COST_CENTRE_MAX_LEN: usize = 100;
pub const ACTIVITY_MAX_LEN: usize = 200;
pub const OPERATOR_NAME_MAX_LEN: usize = 100;
pub const MATERIAL_USED_MAX_LEN: usize = 500;
pub const CREATED_BY_MAX_LEN: usize = 100;

/// Latest year an RFC 3339 timestamp can carry
pub const MAX_TIMESTAMP_YEAR: i32 = 9999;

fn check_timestamp(name: &str, value: &DateTime<Utc>) -> Result<()> {
    if (0..=MAX_TIMESTAMP_YEAR).contains(&value.year()) {
        Ok(())
    } else {
        Err(Error::Constraint(format!(
            "{} year {} is outside 0..={}",
            name,
            value.year(),
            MAX_TIMESTAMP_YEAR
        )))
    }
}

/// A shift/operator production record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkTicket {
    /// Assigned by the store on insert
    pub id: i64,
    pub ticket_number: Option<String>,
    pub cost_centre: Option<String>,
    pub activity: Option<String>,
    pub operator_name: Option<String>,
    pub num_operators: i32,
    pub start_date_time: DateTime<Utc>,
    pub start_counter: i32,
    pub end_date_time: DateTime<Utc>,
    pub end_counter: i32,
    pub quantity_in: i32,
    pub quantity_out: i32,
    pub material_used: Option<String>,
    /// Stamped by the ticket service on create, never changed afterwards
    pub created_at: DateTime<Utc>,
    /// Stamped by the ticket service on every update
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl WorkTicket {
    /// Reject text fields longer than the store schema allows and
    /// timestamps outside the four-digit-year range
    pub fn check_field_lengths(&self) -> Result<()> {
        check_timestamp("start_date_time", &self.start_date_time)?;
        check_timestamp("end_date_time", &self.end_date_time)?;
        check_timestamp("created_at", &self.created_at)?;
        if let Some(updated) = &self.updated_at {
            check_timestamp("updated_at", updated)?;
        }

        let fields: [(&str, &Option<String>, usize); 6] = [
            ("ticket_number", &self.ticket_number, TICKET_NUMBER_MAX_LEN),
            ("cost_centre", &self.cost_centre, COST_CENTRE_MAX_LEN),
            ("activity", &self.activity, ACTIVITY_MAX_LEN),
            ("operator_name", &self.operator_name, OPERATOR_NAME_MAX_LEN),
            ("material_used", &self.material_used, MATERIAL_USED_MAX_LEN),
            ("created_by", &self.created_by, CREATED_BY_MAX_LEN),
        ];

        for (name, value, max) in fields {
            if let Some(v) = value {
                let len = v.chars().count();
                if len > max {
                    return Err(Error::Constraint(format!(
                        "{} is {} characters, maximum is {}",
                        name, len, max
                    )));
                }
            }
        }

        Ok(())
    }

    /// Copy every caller-editable field from `other`, leaving id and
    /// timestamps alone
    pub fn overwrite_from(&mut self, other: &WorkTicket) {
        self.ticket_number = other.ticket_number.clone();
        self.cost_centre = other.cost_centre.clone();
        self.activity = other.activity.clone();
        self.operator_name = other.operator_name.clone();
        self.num_operators = other.num_operators;
        self.start_date_time = other.start_date_time;
        self.start_counter = other.start_counter;
        self.end_date_time = other.end_date_time;
        self.end_counter = other.end_counter;
        self.quantity_in = other.quantity_in;
        self.quantity_out = other.quantity_out;
        self.material_used = other.material_used.clone();
        self.created_by = other.created_by.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lengths_ok() {
        let ticket = WorkTicket {
            ticket_number: Some("T".repeat(TICKET_NUMBER_MAX_LEN)),
            material_used: Some("m".repeat(MATERIAL_USED_MAX_LEN)),
            ..Default::default()
        };
        assert!(ticket.check_field_lengths().is_ok());
    }

    #[test]
    fn test_field_lengths_too_long() {
        let ticket = WorkTicket {
            activity: Some("a".repeat(ACTIVITY_MAX_LEN + 1)),
            ..Default::default()
        };
        match ticket.check_field_lengths() {
            Err(Error::Constraint(msg)) => assert!(msg.contains("activity")),
            other => panic!("expected constraint error, got {:?}", other),
        }
    }

    #[test]
    fn test_field_lengths_count_chars() {
        // 50 multi-byte characters is still within the limit
        let ticket = WorkTicket {
            ticket_number: Some("é".repeat(TICKET_NUMBER_MAX_LEN)),
            ..Default::default()
        };
        assert!(ticket.check_field_lengths().is_ok());
    }

    #[test]
    fn test_timestamps_beyond_year_9999_rejected() {
        use chrono::TimeZone;

        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let ticket = WorkTicket {
            start_date_time: far,
            ..Default::default()
        };
        match ticket.check_field_lengths() {
            Err(Error::Constraint(msg)) => assert!(msg.contains("start_date_time")),
            other => panic!("expected constraint error, got {:?}", other),
        }

        let ticket = WorkTicket {
            end_date_time: Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap(),
            ..Default::default()
        };
        assert!(ticket.check_field_lengths().is_ok());
    }

    #[test]
    fn test_overwrite_keeps_identity_and_timestamps() {
        let created = Utc::now();
        let mut stored = WorkTicket {
            id: 3,
            ticket_number: Some("T1".into()),
            created_at: created,
            ..Default::default()
        };
        let incoming = WorkTicket {
            id: 99,
            ticket_number: Some("T2".into()),
            quantity_out: -4,
            ..Default::default()
        };

        stored.overwrite_from(&incoming);
        assert_eq!(stored.id, 3);
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.ticket_number.as_deref(), Some("T2"));
        assert_eq!(stored.quantity_out, -4);
    }
}
