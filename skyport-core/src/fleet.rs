use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub id: Uuid,
    pub name: String,
    pub closest_big_city: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirplaneType {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airplane {
    pub id: Uuid,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub airplane_type_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Airplane {
    pub fn total_seats(&self) -> i32 {
        self.rows * self.seats_in_row
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrewMember {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A seat grid must have at least one row and one seat per row. The upper
/// bound guards against nonsense payloads; no commercial airframe comes
/// close to it.
pub const MAX_SEAT_DIMENSION: i32 = 100;

pub fn validate_seat_grid(rows: i32, seats_in_row: i32) -> CoreResult<()> {
    for (value, field) in [(rows, "rows"), (seats_in_row, "seats_in_row")] {
        if !(1..=MAX_SEAT_DIMENSION).contains(&value) {
            return Err(CoreError::ValidationError(format!(
                "{} must be between 1 and {}",
                field, MAX_SEAT_DIMENSION
            )));
        }
    }
    Ok(())
}

pub fn validate_name(field: &str, value: &str) -> CoreResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(format!("{} is required", field)));
    }
    if trimmed.len() > 255 {
        return Err(CoreError::ValidationError(format!(
            "{} cannot exceed 255 characters",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airplane(rows: i32, seats_in_row: i32) -> Airplane {
        Airplane {
            id: Uuid::new_v4(),
            name: "Dreamliner".to_string(),
            rows,
            seats_in_row,
            airplane_type_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn total_seats_is_grid_product() {
        assert_eq!(airplane(30, 6).total_seats(), 180);
    }

    #[test]
    fn seat_grid_rejects_zero_and_oversize() {
        assert!(validate_seat_grid(0, 6).is_err());
        assert!(validate_seat_grid(30, 0).is_err());
        assert!(validate_seat_grid(101, 6).is_err());
        assert!(validate_seat_grid(30, 6).is_ok());
    }

    #[test]
    fn crew_full_name_joins_parts() {
        let member = CrewMember {
            id: Uuid::new_v4(),
            first_name: "Amelia".to_string(),
            last_name: "Earhart".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(member.full_name(), "Amelia Earhart");
    }

    #[test]
    fn name_validation_bounds() {
        assert!(validate_name("name", "Heathrow").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"x".repeat(256)).is_err());
    }
}
