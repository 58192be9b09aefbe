//! Cabin pre-reservations

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::Result;

use super::lodging::Stay;
use super::{Customer, ReservationBook};

/// Where a reservation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Held until the deposit arrives
    PendingPayment,
    Confirmed,
    Cancelled,
}

/// What the guest asked to book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub cabin: String,
    pub stay: Stay,
    pub customer: Customer,
}

/// A stored reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub code: String,
    pub cabin: String,
    pub stay: Stay,
    pub customer: Customer,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Reservation codes look like `RES-7K2Q`.
    pub fn new_code() -> String {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(4).collect();
        format!("RES-{}", suffix.to_uppercase())
    }

    fn same_booking(&self, request: &ReservationRequest) -> bool {
        self.cabin.eq_ignore_ascii_case(&request.cabin)
            && self.stay == request.stay
            && self.customer.phone == request.customer.phone
    }
}

/// Result of asking for a reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Booking {
    Created(Reservation),
    /// The same guest booked the same cabin and dates recently
    AlreadyBooked(Reservation),
}

/// Reservations kept in memory, optionally mirrored to a JSON file
pub struct JsonReservationBook {
    path: Option<PathBuf>,
    reservations: Mutex<Vec<Reservation>>,
    duplicate_window: Duration,
}

impl JsonReservationBook {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            reservations: Mutex::new(vec![]),
            duplicate_window: Duration::hours(24),
        }
    }

    /// Open (or start) the reservation file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let reservations = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            vec![]
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            reservations: Mutex::new(reservations),
            ..Self::in_memory()
        })
    }

    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }

    async fn persist(&self, reservations: &[Reservation]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_string_pretty(reservations)?).await?;
        Ok(())
    }
}

#[async_trait]
impl ReservationBook for JsonReservationBook {
    async fn reserve(&self, request: ReservationRequest) -> Result<Booking> {
        let cutoff = Utc::now() - self.duplicate_window;
        let mut reservations = self.reservations.lock().await;

        let existing = reservations
            .iter()
            .rev()
            .find(|r| r.created_at >= cutoff && r.same_booking(&request));
        if let Some(existing) = existing {
            info!("Duplicate reservation request, reusing {}", existing.code);
            return Ok(Booking::AlreadyBooked(existing.clone()));
        }

        let reservation = Reservation {
            code: Reservation::new_code(),
            cabin: request.cabin,
            stay: request.stay,
            customer: request.customer,
            status: ReservationStatus::PendingPayment,
            created_at: Utc::now(),
        };
        debug!("Saving reservation {} for {}", reservation.code, reservation.customer.phone);
        reservations.push(reservation.clone());
        self.persist(&reservations).await?;
        Ok(Booking::Created(reservation))
    }

    async fn recent_for(&self, phone: &str, limit: usize) -> Result<Vec<Reservation>> {
        let reservations = self.reservations.lock().await;
        let mut mine: Vec<Reservation> = reservations
            .iter()
            .filter(|r| r.customer.phone == phone)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(phone: &str, check_in: &str) -> ReservationRequest {
        ReservationRequest {
            cabin: "Cabaña Laurel".into(),
            stay: Stay::parse(check_in, "20/01/2027").unwrap(),
            customer: Customer {
                name: "Ana Soto".into(),
                email: "ana@example.com".into(),
                phone: phone.into(),
            },
        }
    }

    #[test]
    fn test_code_format() {
        let code = Reservation::new_code();
        assert!(code.starts_with("RES-"));
        assert_eq!(code.len(), 8);
    }

    #[tokio::test]
    async fn test_same_booking_is_not_duplicated() {
        let book = JsonReservationBook::in_memory();

        let Booking::Created(first) = book.reserve(request("+569", "17/01/2027")).await.unwrap() else {
            panic!("first booking should be created");
        };
        assert_eq!(first.status, ReservationStatus::PendingPayment);

        let again = book.reserve(request("+569", "17/01/2027")).await.unwrap();
        assert_eq!(again, Booking::AlreadyBooked(first.clone()));

        assert!(matches!(
            book.reserve(request("+569", "18/01/2027")).await.unwrap(),
            Booking::Created(_)
        ));
        assert!(matches!(
            book.reserve(request("+570", "17/01/2027")).await.unwrap(),
            Booking::Created(_)
        ));
        assert_eq!(book.recent_for("+569", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_window_expires() {
        let book = JsonReservationBook::in_memory().with_duplicate_window(Duration::zero());
        book.reserve(request("+569", "17/01/2027")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(matches!(
            book.reserve(request("+569", "17/01/2027")).await.unwrap(),
            Booking::Created(_)
        ));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reservations.json");

        let book = JsonReservationBook::open(&path).unwrap();
        book.reserve(request("+569", "17/01/2027")).await.unwrap();

        let reopened = JsonReservationBook::open(&path).unwrap();
        let mine = reopened.recent_for("+569", 5).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].cabin, "Cabaña Laurel");
        assert_eq!(mine[0].stay.nights(), 3);
    }
}
