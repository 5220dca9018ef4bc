use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status lifecycle. Wire values match the historical API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    #[serde(rename = "pendiente_pago")]
    PendingPayment,
    #[serde(rename = "pagado")]
    Paid,
    #[serde(rename = "aprobado")]
    Approved,
    #[serde(rename = "entregado")]
    Delivered,
    #[serde(rename = "recogido")]
    Collected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::PendingPayment,
        OrderStatus::Paid,
        OrderStatus::Approved,
        OrderStatus::Delivered,
        OrderStatus::Collected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pendiente_pago",
            OrderStatus::Paid => "pagado",
            OrderStatus::Approved => "aprobado",
            OrderStatus::Delivered => "entregado",
            OrderStatus::Collected => "recogido",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value.trim())
    }

    /// Allowed-transition table. Every move is currently permitted; the table
    /// exists so tightening a transition is a one-line change here rather than
    /// a hunt through call sites.
    pub fn can_transition(self, _to: OrderStatus) -> bool {
        match self {
            OrderStatus::PendingPayment
            | OrderStatus::Paid
            | OrderStatus::Approved
            | OrderStatus::Delivered
            | OrderStatus::Collected => true,
        }
    }
}

/// Kind of service requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceKind {
    #[serde(rename = "mediodia")]
    HalfDay,
    #[serde(rename = "dia_Completo")]
    FullDay,
    #[serde(rename = "circuito")]
    Circuit,
    #[serde(rename = "crucero")]
    Cruise,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::HalfDay => "mediodia",
            ServiceKind::FullDay => "dia_Completo",
            ServiceKind::Circuit => "circuito",
            ServiceKind::Cruise => "crucero",
        }
    }

    /// Accepts the stored wire values plus the frontend-friendly spellings
    /// that used to reach the old API.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mediodia" | "medio_dia" | "medio-dia" => Some(ServiceKind::HalfDay),
            "dia_completo" | "día completo" | "dia completo" => Some(ServiceKind::FullDay),
            "circuito" => Some(ServiceKind::Circuit),
            "crucero" => Some(ServiceKind::Cruise),
            _ => None,
        }
    }
}

/// What happened to an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Delivered,
    Collected,
}

/// One entry of the append-only order event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub ts: DateTime<Utc>,
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pax: Option<i32>,
}

/// One excursion purchase request and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub excursion: String,
    pub service_kind: ServiceKind,
    pub status: OrderStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub delivery_place: String,
    pub pickup_place: String,
    pub notes: String,
    pub voucher: String,
    pub guide: String,
    pub issuers: Option<i32>,
    pub pax: i32,
    pub events: Vec<OrderEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: Uuid, company_id: Uuid, start_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            company_id,
            excursion: String::new(),
            service_kind: ServiceKind::HalfDay,
            status: OrderStatus::PendingPayment,
            start_date,
            end_date: None,
            delivery_place: String::new(),
            pickup_place: String::new(),
            notes: String::new(),
            voucher: String::new(),
            guide: String::new(),
            issuers: None,
            pax: 0,
            events: vec![OrderEvent {
                ts: now,
                event: EventKind::Created,
                actor_id: None,
                actor: None,
                note: None,
                pax: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    fn log_event(
        &mut self,
        event: EventKind,
        actor_id: Option<Uuid>,
        actor: Option<String>,
        note: Option<String>,
        pax: Option<i32>,
    ) {
        self.events.push(OrderEvent {
            ts: Utc::now(),
            event,
            actor_id,
            actor,
            note,
            pax,
        });
        self.updated_at = Utc::now();
    }

    /// Mark the order delivered. When `override_pax` is set and a headcount
    /// is supplied, it replaces the stored pax and is recorded in the event.
    pub fn set_delivered(
        &mut self,
        actor_id: Option<Uuid>,
        actor: Option<String>,
        note: Option<String>,
        delivered_pax: Option<i32>,
        override_pax: bool,
    ) {
        if override_pax {
            if let Some(p) = delivered_pax {
                self.pax = p;
            }
        }
        self.status = OrderStatus::Delivered;
        self.log_event(EventKind::Delivered, actor_id, actor, note, delivered_pax);
    }

    /// Mark the order collected (picked up).
    pub fn set_collected(
        &mut self,
        actor_id: Option<Uuid>,
        actor: Option<String>,
        note: Option<String>,
    ) {
        self.status = OrderStatus::Collected;
        self.log_event(EventKind::Collected, actor_id, actor, note, None);
    }
}

/// End date, when present, must not precede the start date.
pub fn validate_date_range(
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<(), OrderValidationError> {
    if let Some(end) = end {
        if end < start {
            return Err(OrderValidationError::EndBeforeStart { start, end });
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum OrderValidationError {
    #[error("fecha_fin {end} is before fecha_inicio {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("unknown estado: {0}")]
    UnknownStatus(String),

    #[error("unknown tipo_servicio: {0}")]
    UnknownServiceKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_seeds_created_event() {
        let order = Order::new(Uuid::new_v4(), Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.events.len(), 1);
        assert_eq!(order.events[0].event, EventKind::Created);
    }

    #[test]
    fn test_delivered_then_collected_log_order() {
        let mut order = Order::new(Uuid::new_v4(), Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let staff = Uuid::new_v4();

        order.set_delivered(Some(staff), Some("ops".into()), Some("left at pier".into()), None, false);
        order.set_collected(Some(staff), Some("ops".into()), None);

        assert_eq!(order.status, OrderStatus::Collected);
        let kinds: Vec<EventKind> = order.events.iter().map(|e| e.event).collect();
        assert_eq!(kinds, vec![EventKind::Created, EventKind::Delivered, EventKind::Collected]);
        assert!(order.events[1].ts <= order.events[2].ts);
    }

    #[test]
    fn test_delivered_pax_override() {
        let mut order = Order::new(Uuid::new_v4(), Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        order.pax = 40;

        // Recorded but not applied without the override flag
        order.set_delivered(None, None, None, Some(35), false);
        assert_eq!(order.pax, 40);
        assert_eq!(order.events.last().unwrap().pax, Some(35));

        order.set_delivered(None, None, None, Some(35), true);
        assert_eq!(order.pax, 35);
    }

    #[test]
    fn test_date_range_validation() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        assert!(validate_date_range(start, None).is_ok());
        assert!(validate_date_range(start, Some(start)).is_ok());
        assert!(validate_date_range(start, start.succ_opt()).is_ok());
        assert!(validate_date_range(start, start.pred_opt()).is_err());
    }

    #[test]
    fn test_service_kind_aliases() {
        assert_eq!(ServiceKind::parse("mediodia"), Some(ServiceKind::HalfDay));
        assert_eq!(ServiceKind::parse("medio-dia"), Some(ServiceKind::HalfDay));
        assert_eq!(ServiceKind::parse("dia_Completo"), Some(ServiceKind::FullDay));
        assert_eq!(ServiceKind::parse("dia completo"), Some(ServiceKind::FullDay));
        assert_eq!(ServiceKind::parse(" crucero "), Some(ServiceKind::Cruise));
        assert_eq!(ServiceKind::parse("submarino"), None);
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(OrderStatus::parse("pendiente_pago"), Some(OrderStatus::PendingPayment));
        assert_eq!(OrderStatus::parse("recogido"), Some(OrderStatus::Collected));
        assert_eq!(OrderStatus::parse("shipped"), None);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Delivered).unwrap(),
            "\"entregado\""
        );
    }

    #[test]
    fn test_all_transitions_currently_allowed() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert!(from.can_transition(to));
            }
        }
    }
}
