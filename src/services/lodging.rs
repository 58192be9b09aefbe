//! Cabin inventory, nightly pricing and availability

use std::path::Path;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Error;
use crate::Result;

use super::catalog::normalize_text;
use super::LodgingService;

/// Weekend nights cost this many percent more
const WEEKEND_SURCHARGE_PERCENT: u64 = 20;

/// An optional service a guest can add to a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A rentable cabin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cabin {
    /// Stable identifier, also matched against queries
    pub key: String,
    pub name: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// Guests it sleeps
    #[serde(default)]
    pub capacity: u32,

    #[serde(default)]
    pub amenities: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub image_urls: Vec<String>,

    /// Base price of a weekday night
    #[serde(default)]
    pub nightly_price: u64,

    /// Premium cabins sell out on high-season weekends
    #[serde(default)]
    pub premium: bool,

    #[serde(default)]
    pub extras: Vec<Extra>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Cabin {
    pub fn new(key: impl Into<String>, name: impl Into<String>, capacity: u32, nightly_price: u64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            aliases: vec![],
            capacity,
            amenities: String::new(),
            description: String::new(),
            image_urls: vec![],
            nightly_price,
            premium: false,
            extras: vec![],
            active: true,
        }
    }

    fn matches(&self, normalized_query: &str) -> bool {
        std::iter::once(&self.key)
            .chain(std::iter::once(&self.name))
            .chain(self.aliases.iter())
            .map(|k| normalize_text(k))
            .any(|k| !k.is_empty() && normalized_query.contains(&k))
    }

    /// Price of the night starting on `date`.
    pub fn night_price(&self, date: NaiveDate) -> u64 {
        match date.weekday() {
            Weekday::Fri | Weekday::Sat => self.nightly_price * (100 + WEEKEND_SURCHARGE_PERCENT) / 100,
            _ => self.nightly_price,
        }
    }
}

/// Arrival and departure dates of a stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    /// Dates as customers write them.
    pub const DATE_FORMAT: &'static str = "%d/%m/%Y";

    /// Parse `DD/MM/YYYY` dates; the stay must last at least one night.
    pub fn parse(check_in: &str, check_out: &str) -> Result<Self> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), Self::DATE_FORMAT)
                .map_err(|_| Error::Tool(format!("'{}' is not a DD/MM/YYYY date (e.g. 10/01/2027)", raw)))
        };
        let stay = Self {
            check_in: parse(check_in)?,
            check_out: parse(check_out)?,
        };
        if stay.nights() < 1 {
            return Err(Error::Tool("the departure date must be after the arrival date".to_string()));
        }
        Ok(stay)
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.nights()).map(move |i| self.check_in + Duration::days(i))
    }

    pub fn describe(&self) -> String {
        format!(
            "{} to {}",
            self.check_in.format(Self::DATE_FORMAT),
            self.check_out.format(Self::DATE_FORMAT)
        )
    }
}

/// One cabin's price and availability for a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CabinAvailability {
    pub cabin: String,
    pub capacity: u32,
    pub available: bool,
    pub total_price: u64,
    pub nightly_average: u64,
}

/// Cabins loaded once from a JSON array
pub struct JsonLodging {
    cabins: Vec<Cabin>,
}

impl JsonLodging {
    pub fn new(cabins: Vec<Cabin>) -> Self {
        Self { cabins }
    }

    /// Load `cabins.json`. A missing file yields no cabins.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No cabins at {:?}", path);
            return Ok(Self::new(vec![]));
        }
        let content = std::fs::read_to_string(path)?;
        let cabins: Vec<Cabin> = serde_json::from_str(&content)?;
        debug!("Loaded {} cabins from {:?}", cabins.len(), path);
        Ok(Self::new(cabins))
    }

    fn active(&self) -> impl Iterator<Item = &Cabin> {
        self.cabins.iter().filter(|c| c.active)
    }

    /// February weekends are high season; premium cabins are taken.
    fn booked_out(cabin: &Cabin, stay: &Stay) -> bool {
        cabin.premium
            && stay.check_in.month() == 2
            && stay.dates().any(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
    }
}

#[async_trait]
impl LodgingService for JsonLodging {
    async fn cabins(&self) -> Result<Vec<Cabin>> {
        Ok(self.active().cloned().collect())
    }

    async fn find_cabin(&self, query: &str) -> Result<Option<Cabin>> {
        let normalized = normalize_text(query);
        if normalized.is_empty() {
            return Ok(None);
        }
        let found = self.active().find(|c| c.matches(&normalized)).cloned();
        if found.is_none() {
            warn!("No cabin matches '{}'", query);
        }
        Ok(found)
    }

    async fn availability(&self, stay: &Stay) -> Result<Vec<CabinAvailability>> {
        let nights = stay.nights().max(1) as u64;
        Ok(self
            .active()
            .map(|cabin| {
                let total_price: u64 = stay.dates().map(|d| cabin.night_price(d)).sum();
                CabinAvailability {
                    cabin: cabin.name.clone(),
                    capacity: cabin.capacity,
                    available: !Self::booked_out(cabin, stay),
                    total_price,
                    nightly_average: total_price / nights,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lodging() -> JsonLodging {
        let mut laurel = Cabin::new("laurel", "Cabaña Laurel", 4, 100_000);
        laurel.aliases = vec!["familiar".into()];
        laurel.extras = vec![Extra {
            name: "Hot tub".into(),
            description: "Wood-fired, evenings only".into(),
        }];

        let mut domo = Cabin::new("domo", "Domo Mirador", 2, 150_000);
        domo.premium = true;

        let mut closed = Cabin::new("castano", "Castaño", 6, 90_000);
        closed.active = false;

        JsonLodging::new(vec![laurel, domo, closed])
    }

    #[test]
    fn test_stay_parsing() {
        let stay = Stay::parse("10/01/2027", "13/01/2027").unwrap();
        assert_eq!(stay.nights(), 3);
        assert_eq!(stay.describe(), "10/01/2027 to 13/01/2027");

        assert!(matches!(Stay::parse("2027-01-10", "13/01/2027"), Err(Error::Tool(_))));
        assert!(matches!(Stay::parse("13/01/2027", "13/01/2027"), Err(Error::Tool(_))));
    }

    #[test]
    fn test_weekend_surcharge() {
        let cabin = Cabin::new("laurel", "Laurel", 4, 100_000);
        // 2027-01-08 is a Friday
        let friday = NaiveDate::from_ymd_opt(2027, 1, 8).unwrap();
        assert_eq!(cabin.night_price(friday), 120_000);
        assert_eq!(cabin.night_price(friday + Duration::days(2)), 100_000);
    }

    #[tokio::test]
    async fn test_find_by_key_name_or_alias() {
        let lodging = lodging();
        assert_eq!(lodging.find_cabin("the laurel one").await.unwrap().unwrap().key, "laurel");
        assert_eq!(lodging.find_cabin("algo FAMILIAR").await.unwrap().unwrap().key, "laurel");
        assert_eq!(lodging.find_cabin("domo mirador").await.unwrap().unwrap().key, "domo");
        assert!(lodging.find_cabin("castaño").await.unwrap().is_none());
        assert!(lodging.find_cabin("  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_availability_prices_each_night() {
        // Thursday to Sunday: Thu, Fri (+20%), Sat (+20%)
        let stay = Stay::parse("07/01/2027", "10/01/2027").unwrap();
        let rows = lodging().availability(&stay).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cabin, "Cabaña Laurel");
        assert_eq!(rows[0].total_price, 340_000);
        assert_eq!(rows[0].nightly_average, 113_333);
        assert!(rows.iter().all(|r| r.available));
    }

    #[tokio::test]
    async fn test_premium_booked_out_on_february_weekends() {
        let stay = Stay::parse("12/02/2027", "15/02/2027").unwrap();
        let rows = lodging().availability(&stay).await.unwrap();
        let domo = rows.iter().find(|r| r.cabin == "Domo Mirador").unwrap();
        assert!(!domo.available);
        assert!(rows.iter().find(|r| r.cabin == "Cabaña Laurel").unwrap().available);
    }
}
