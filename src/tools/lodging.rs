//! Cabin tools - availability, details, extras and pre-reservations

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::Error;
use crate::services::{format_price, Booking, Cabin, Customer, LodgingService, ReservationBook, ReservationRequest, Stay};
use crate::Result;

use super::meeting::looks_like_email;
use super::{ArgSpec, SessionContext, Tool, ToolArgs, ToolOutput};

/// Max photos delivered per cabin
const MAX_CABIN_PHOTOS: usize = 3;

/// Up to this many spare beds still counts as a good fit
const SPARE_BEDS: u32 = 2;

async fn resolve_cabin(lodging: &dyn LodgingService, query: &str) -> Result<Cabin> {
    if let Some(cabin) = lodging.find_cabin(query).await? {
        return Ok(cabin);
    }
    let names: Vec<String> = lodging.cabins().await?.into_iter().map(|c| c.name).collect();
    Err(Error::Tool(format!(
        "no cabin matched '{}'. Our cabins are: {}",
        query,
        names.join(", ")
    )))
}

/// Prices and availability of every cabin for a stay
pub struct CheckAvailabilityTool {
    lodging: Arc<dyn LodgingService>,
}

impl CheckAvailabilityTool {
    pub fn new(lodging: Arc<dyn LodgingService>) -> Self {
        Self { lodging }
    }
}

const AVAILABILITY_ARGS: &[ArgSpec] = &[
    ArgSpec::text("check_in", "Arrival date, DD/MM/YYYY").aliases(&["fecha_inicio"]),
    ArgSpec::text("check_out", "Departure date, DD/MM/YYYY").aliases(&["fecha_fin"]),
    ArgSpec::text("guests", "Number of guests, used to recommend cabins")
        .optional()
        .aliases(&["num_personas"]),
];

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &str {
        "check_availability"
    }

    fn description(&self) -> &str {
        "Check availability and exact prices for specific dates. Returns every cabin with its total and nightly price."
    }

    fn args(&self) -> &[ArgSpec] {
        AVAILABILITY_ARGS
    }

    async fn execute(&self, args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        let stay = Stay::parse(
            args.text("check_in").unwrap_or_default(),
            args.text("check_out").unwrap_or_default(),
        )?;
        let guests = match args.text("guests") {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| Error::Tool(format!("'{}' is not a number of guests", raw)))?,
            ),
            None => None,
        };

        let rows = self.lodging.availability(&stay).await?;
        if !rows.iter().any(|r| r.available) {
            return Err(Error::Tool(format!(
                "no cabins are available for those {} nights ({}); suggest other dates",
                stay.nights(),
                stay.describe()
            )));
        }

        let cabins: Vec<_> = rows
            .iter()
            .map(|row| {
                let recommended = guests.is_some_and(|g| row.capacity >= g && row.capacity <= g + SPARE_BEDS);
                json!({
                    "cabin": row.cabin,
                    "capacity": row.capacity,
                    "available": row.available,
                    "recommended": row.available && recommended,
                    "total_price": format_price(row.total_price),
                    "nightly_price": format_price(row.nightly_average),
                })
            })
            .collect();

        Ok(ToolOutput::new(json!({
            "stay": stay.describe(),
            "nights": stay.nights(),
            "guests": guests,
            "cabins": cabins,
        })))
    }
}

/// Description, amenities and photos of one cabin
pub struct GetCabinInfoTool {
    lodging: Arc<dyn LodgingService>,
}

impl GetCabinInfoTool {
    pub fn new(lodging: Arc<dyn LodgingService>) -> Self {
        Self { lodging }
    }
}

const CABIN_ARGS: &[ArgSpec] = &[ArgSpec::text("cabin", "Cabin name or reference, e.g. 'dome' or 'laurel'")
    .aliases(&["nombre_cabana_query", "nombre_cabana"])];

#[async_trait]
impl Tool for GetCabinInfoTool {
    fn name(&self) -> &str {
        "get_cabin_info"
    }

    fn description(&self) -> &str {
        "Get details, amenities and photos of a specific cabin. Photos are delivered automatically."
    }

    fn args(&self) -> &[ArgSpec] {
        CABIN_ARGS
    }

    async fn execute(&self, args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        let cabin = resolve_cabin(self.lodging.as_ref(), args.text("cabin").unwrap_or_default()).await?;
        let photos: Vec<String> = cabin.image_urls.iter().take(MAX_CABIN_PHOTOS).cloned().collect();

        Ok(ToolOutput::new(json!({
            "name": cabin.name,
            "capacity": cabin.capacity,
            "amenities": cabin.amenities,
            "description": cabin.description,
            "weekday_night_price": format_price(cabin.nightly_price),
            "photos_sent": photos.len(),
        }))
        .with_images(photos))
    }
}

/// Optional extras offered with a cabin
pub struct GetCabinServicesTool {
    lodging: Arc<dyn LodgingService>,
}

impl GetCabinServicesTool {
    pub fn new(lodging: Arc<dyn LodgingService>) -> Self {
        Self { lodging }
    }
}

#[async_trait]
impl Tool for GetCabinServicesTool {
    fn name(&self) -> &str {
        "get_cabin_services"
    }

    fn description(&self) -> &str {
        "List the extra services (hot tub, sauna, pets...) available for a cabin. \
         Use after the guest picks a cabin to offer extras."
    }

    fn args(&self) -> &[ArgSpec] {
        CABIN_ARGS
    }

    async fn execute(&self, args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        let cabin = resolve_cabin(self.lodging.as_ref(), args.text("cabin").unwrap_or_default()).await?;
        if cabin.extras.is_empty() {
            return Err(Error::Tool(format!("{} has no extra services", cabin.name)));
        }

        Ok(ToolOutput::new(json!({
            "cabin": cabin.name,
            "services": cabin.extras,
        })))
    }
}

/// Hold a cabin for a guest until the deposit is paid
pub struct CreateReservationTool {
    lodging: Arc<dyn LodgingService>,
    reservations: Arc<dyn ReservationBook>,
}

impl CreateReservationTool {
    pub fn new(lodging: Arc<dyn LodgingService>, reservations: Arc<dyn ReservationBook>) -> Self {
        Self { lodging, reservations }
    }
}

const RESERVATION_ARGS: &[ArgSpec] = &[
    ArgSpec::text("cabin", "Exact cabin name").aliases(&["nombre_cabana"]),
    ArgSpec::text("check_in", "Arrival date, DD/MM/YYYY").aliases(&["fecha_inicio"]),
    ArgSpec::text("check_out", "Departure date, DD/MM/YYYY").aliases(&["fecha_fin"]),
    ArgSpec::text("customer_name", "Full name of the main guest").aliases(&["nombre_cliente"]),
    ArgSpec::text("customer_email", "Email for the confirmation").aliases(&["email_cliente"]),
];

#[async_trait]
impl Tool for CreateReservationTool {
    fn name(&self) -> &str {
        "create_reservation"
    }

    fn description(&self) -> &str {
        "Create a pre-reservation. Only call it once you have the cabin, the dates and the guest's full name and email."
    }

    fn args(&self) -> &[ArgSpec] {
        RESERVATION_ARGS
    }

    async fn execute(&self, args: ToolArgs, session: &SessionContext) -> Result<ToolOutput> {
        let email = args.text("customer_email").unwrap_or_default();
        if !looks_like_email(email) {
            return Err(Error::Tool(format!("'{}' is not a valid email address", email)));
        }
        let stay = Stay::parse(
            args.text("check_in").unwrap_or_default(),
            args.text("check_out").unwrap_or_default(),
        )?;
        let cabin = resolve_cabin(self.lodging.as_ref(), args.text("cabin").unwrap_or_default()).await?;

        let request = ReservationRequest {
            cabin: cabin.name,
            stay,
            customer: Customer {
                name: args.text("customer_name").unwrap_or_default().to_string(),
                email: email.to_string(),
                phone: session.session_id.clone(),
            },
        };

        let (reservation, already_booked) = match self.reservations.reserve(request).await? {
            Booking::Created(reservation) => {
                info!("Reservation {} created for {}", reservation.code, reservation.customer.phone);
                (reservation, false)
            }
            Booking::AlreadyBooked(reservation) => (reservation, true),
        };

        let message = if already_booked {
            "The guest already holds this reservation; share the existing code instead of a new one."
        } else {
            "Pre-reservation created. Payment details go to the guest's email; the deposit is due within 24 hours."
        };

        Ok(ToolOutput::new(json!({
            "code": reservation.code,
            "cabin": reservation.cabin,
            "stay": reservation.stay.describe(),
            "status": reservation.status,
            "already_booked": already_booked,
            "message": message,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Extra, JsonLodging, JsonReservationBook};

    fn lodging() -> Arc<JsonLodging> {
        let mut laurel = Cabin::new("laurel", "Cabaña Laurel", 6, 100_000);
        laurel.image_urls = (1..=5).map(|i| format!("https://img.example/laurel-{i}.jpg")).collect();
        laurel.extras = vec![Extra {
            name: "Hot tub".into(),
            description: "Wood-fired".into(),
        }];
        let yurt = Cabin::new("yurta", "Yurta Mirador", 2, 80_000);
        Arc::new(JsonLodging::new(vec![laurel, yurt]))
    }

    fn args(tool: &dyn Tool, raw: serde_json::Value) -> ToolArgs {
        crate::tools::args::normalize(tool.args(), &raw).unwrap()
    }

    #[tokio::test]
    async fn test_availability_recommends_by_party_size() {
        let tool = CheckAvailabilityTool::new(lodging());
        let out = tool
            .execute(
                args(&tool, json!({"fecha_inicio": "11/01/2027", "fecha_fin": "13/01/2027", "num_personas": 2})),
                &SessionContext::new("+569"),
            )
            .await
            .unwrap();

        assert_eq!(out.payload["nights"], 2);
        let cabins = out.payload["cabins"].as_array().unwrap();
        assert_eq!(cabins[0]["recommended"], false);
        assert_eq!(cabins[1]["cabin"], "Yurta Mirador");
        assert_eq!(cabins[1]["recommended"], true);
        assert_eq!(cabins[1]["total_price"], "$160.000");
    }

    #[tokio::test]
    async fn test_availability_rejects_bad_dates() {
        let tool = CheckAvailabilityTool::new(lodging());
        let result = tool
            .execute(
                args(&tool, json!({"check_in": "13/01/2027", "check_out": "11/01/2027"})),
                &SessionContext::new("+569"),
            )
            .await;
        assert!(matches!(result, Err(Error::Tool(msg)) if msg.contains("after the arrival")));
    }

    #[tokio::test]
    async fn test_cabin_info_sends_three_photos() {
        let tool = GetCabinInfoTool::new(lodging());
        let out = tool
            .execute(args(&tool, json!({"nombre_cabana_query": "laurel"})), &SessionContext::new("+569"))
            .await
            .unwrap();
        assert_eq!(out.images.len(), 3);
        assert_eq!(out.payload["name"], "Cabaña Laurel");

        let missing = tool
            .execute(args(&tool, json!({"cabin": "igloo"})), &SessionContext::new("+569"))
            .await;
        assert!(matches!(missing, Err(Error::Tool(msg)) if msg.contains("Cabaña Laurel, Yurta Mirador")));
    }

    #[tokio::test]
    async fn test_cabin_services() {
        let tool = GetCabinServicesTool::new(lodging());
        let out = tool
            .execute(args(&tool, json!({"cabin": "laurel"})), &SessionContext::new("+569"))
            .await
            .unwrap();
        assert_eq!(out.payload["services"][0]["name"], "Hot tub");

        let none = tool.execute(args(&tool, json!({"cabin": "yurta"})), &SessionContext::new("+569")).await;
        assert!(matches!(none, Err(Error::Tool(_))));
    }

    #[tokio::test]
    async fn test_reservation_uses_session_phone_and_is_not_repeated() {
        let book = Arc::new(JsonReservationBook::in_memory());
        let tool = CreateReservationTool::new(lodging(), book.clone());
        let raw = json!({
            "nombre_cabana": "laurel",
            "fecha_inicio": "11/01/2027",
            "fecha_fin": "13/01/2027",
            "nombre_cliente": "Ana Soto",
            "email_cliente": "ana@example.com"
        });
        let session = SessionContext::new("+56911112222");

        let first = tool.execute(args(&tool, raw.clone()), &session).await.unwrap();
        assert_eq!(first.payload["already_booked"], false);
        assert_eq!(first.payload["cabin"], "Cabaña Laurel");
        assert_eq!(first.payload["status"], "PENDING_PAYMENT");

        let second = tool.execute(args(&tool, raw), &session).await.unwrap();
        assert_eq!(second.payload["already_booked"], true);
        assert_eq!(second.payload["code"], first.payload["code"]);

        let stored = book.recent_for("+56911112222", 5).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].customer.name, "Ana Soto");
    }

    #[tokio::test]
    async fn test_reservation_requires_valid_email() {
        let book = Arc::new(JsonReservationBook::in_memory());
        let tool = CreateReservationTool::new(lodging(), book.clone());
        let raw = json!({
            "cabin": "laurel",
            "check_in": "11/01/2027",
            "check_out": "13/01/2027",
            "customer_name": "Ana",
            "customer_email": "ana at example"
        });

        let result = tool.execute(args(&tool, raw), &SessionContext::new("+569")).await;
        assert!(matches!(result, Err(Error::Tool(_))));
        assert!(book.recent_for("+569", 5).await.unwrap().is_empty());
    }
}
