use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::location::Location;
use crate::time_window::TimeWindow;

/// Field-less discriminator for the six event variants. Rules declare the
/// subset of kinds they accept; the engine filters by kind before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Taxi,
    Hotel,
    Flight,
    Railway,
    Fuel,
    DailyCheckIn,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Taxi => write!(f, "Taxi"),
            EventKind::Hotel => write!(f, "Hotel"),
            EventKind::Flight => write!(f, "Flight"),
            EventKind::Railway => write!(f, "Railway"),
            EventKind::Fuel => write!(f, "Fuel"),
            EventKind::DailyCheckIn => write!(f, "DailyCheckIn"),
        }
    }
}

/// Variant-specific payload of a trajectory event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventDetails {
    Taxi {
        from_location: Location,
        to_location: Location,
        is_self_paid: bool,
    },
    Hotel {
        hotel_name: String,
        room_type: String,
    },
    Flight {
        departure_location: Location,
        to_location: Location,
        flight_number: String,
    },
    Railway {
        from_location: Location,
        to_location: Location,
        train_number: String,
        seat_class: String,
    },
    Fuel {
        station_location: Location,
        vehicle_id: String,
    },
    DailyCheckIn {
        customer_location: Location,
        activity: String,
    },
}

impl EventDetails {
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetails::Taxi { .. } => EventKind::Taxi,
            EventDetails::Hotel { .. } => EventKind::Hotel,
            EventDetails::Flight { .. } => EventKind::Flight,
            EventDetails::Railway { .. } => EventKind::Railway,
            EventDetails::Fuel { .. } => EventKind::Fuel,
            EventDetails::DailyCheckIn { .. } => EventKind::DailyCheckIn,
        }
    }
}

/// Base fields shared by every event variant, minus the derived `location`.
///
/// Ingestion builds one of these per record and hands it to the variant
/// constructor, which validates the amount and derives the primary location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBase {
    pub event_id: String,
    pub user_id: String,
    pub user_name: String,
    pub department: String,
    pub amount: f64,
    #[serde(default)]
    pub remark: String,
    pub time_window: TimeWindow,
}

/// A single recorded business activity: who, where, when (with uncertainty),
/// and how much it cost.
///
/// Events are immutable facts ingested once per evaluation batch; the engine
/// only reads and groups them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEvent {
    pub event_id: String,
    pub user_id: String,
    pub user_name: String,
    pub department: String,
    pub amount: f64,
    pub remark: String,
    pub time_window: TimeWindow,
    /// Primary location of the event (origin for transport variants).
    pub location: Location,
    pub details: EventDetails,
}

fn check_amount(amount: f64) -> Result<(), CoreError> {
    if amount < 0.0 {
        return Err(CoreError::NegativeAmount(amount));
    }
    Ok(())
}

impl TrajectoryEvent {
    fn build(base: EventBase, location: Location, details: EventDetails) -> Result<Self, CoreError> {
        check_amount(base.amount)?;
        Ok(Self {
            event_id: base.event_id,
            user_id: base.user_id,
            user_name: base.user_name,
            department: base.department,
            amount: base.amount,
            remark: base.remark,
            time_window: base.time_window,
            location,
            details,
        })
    }

    pub fn taxi(
        base: EventBase,
        from_location: Location,
        to_location: Location,
        is_self_paid: bool,
    ) -> Result<Self, CoreError> {
        Self::build(
            base,
            from_location.clone(),
            EventDetails::Taxi {
                from_location,
                to_location,
                is_self_paid,
            },
        )
    }

    pub fn hotel(
        base: EventBase,
        location: Location,
        hotel_name: impl Into<String>,
        room_type: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Self::build(
            base,
            location,
            EventDetails::Hotel {
                hotel_name: hotel_name.into(),
                room_type: room_type.into(),
            },
        )
    }

    pub fn flight(
        base: EventBase,
        departure_location: Location,
        to_location: Location,
        flight_number: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Self::build(
            base,
            departure_location.clone(),
            EventDetails::Flight {
                departure_location,
                to_location,
                flight_number: flight_number.into(),
            },
        )
    }

    pub fn railway(
        base: EventBase,
        from_location: Location,
        to_location: Location,
        train_number: impl Into<String>,
        seat_class: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Self::build(
            base,
            from_location.clone(),
            EventDetails::Railway {
                from_location,
                to_location,
                train_number: train_number.into(),
                seat_class: seat_class.into(),
            },
        )
    }

    pub fn fuel(
        base: EventBase,
        station_location: Location,
        vehicle_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Self::build(
            base,
            station_location.clone(),
            EventDetails::Fuel {
                station_location,
                vehicle_id: vehicle_id.into(),
            },
        )
    }

    pub fn daily_check_in(
        base: EventBase,
        customer_location: Location,
        activity: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Self::build(
            base,
            customer_location.clone(),
            EventDetails::DailyCheckIn {
                customer_location,
                activity: activity.into(),
            },
        )
    }

    pub fn kind(&self) -> EventKind {
        self.details.kind()
    }

    /// Origin and destination for transport variants (taxi, flight, railway).
    /// `None` for stationary events.
    pub fn route(&self) -> Option<(&Location, &Location)> {
        match &self.details {
            EventDetails::Taxi {
                from_location,
                to_location,
                ..
            }
            | EventDetails::Railway {
                from_location,
                to_location,
                ..
            } => Some((from_location, to_location)),
            EventDetails::Flight {
                departure_location,
                to_location,
                ..
            } => Some((departure_location, to_location)),
            _ => None,
        }
    }
}
