//! Orders and their embedded records, as served by the delivery API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of an order; decides which detail fields it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Sale,
    SendAfterRepair,
    ReceiveForRepair,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Sale => "sale",
            ServiceType::SendAfterRepair => "send_after_repair",
            ServiceType::ReceiveForRepair => "receive_for_repair",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Sale => "Sale",
            ServiceType::SendAfterRepair => "Send after repair",
            ServiceType::ReceiveForRepair => "Receive for repair",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "sale" => Ok(ServiceType::Sale),
            "send_after_repair" | "send-after-repair" => Ok(ServiceType::SendAfterRepair),
            "receive_for_repair" | "receive-for-repair" => Ok(ServiceType::ReceiveForRepair),
            other => Err(format!(
                "unknown service type '{other}' (expected sale, send_after_repair or receive_for_repair)"
            )),
        }
    }
}

/// Position of an order in its delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Preparing,
    Assigned,
    InDelivery,
    Delivered,
    DeviceReceived,
    Cancelled,
}

impl OrderStatus {
    /// The six statuses the manual override accepts, in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Preparing,
        OrderStatus::Assigned,
        OrderStatus::InDelivery,
        OrderStatus::Delivered,
        OrderStatus::DeviceReceived,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "preparing",
            OrderStatus::Assigned => "assigned",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::DeviceReceived => "device_received",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Assigned => "Assigned",
            OrderStatus::InDelivery => "In delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::DeviceReceived => "Device received",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Delivered, device-received and cancelled orders see no further actions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::DeviceReceived | OrderStatus::Cancelled
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.replace('-', "_");
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown status '{raw}' (expected one of: {})",
                    OrderStatus::ALL
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Channel a sale order came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    Phone,
    Whatsapp,
    SocialMedia,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Phone => "phone",
            OrderSource::Whatsapp => "whatsapp",
            OrderSource::SocialMedia => "social_media",
        }
    }
}

impl FromStr for OrderSource {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "phone" => Ok(OrderSource::Phone),
            "whatsapp" => Ok(OrderSource::Whatsapp),
            "social_media" | "social-media" => Ok(OrderSource::SocialMedia),
            other => Err(format!(
                "unknown order source '{other}' (expected phone, whatsapp or social_media)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Data-URL encoded drawing (`data:image/png;base64,...`).
    pub signature_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderImage {
    pub id: i64,
    pub image_path: String,
}

/// One customer service request.
///
/// The list endpoint serves the core fields; the detail endpoint additionally
/// embeds payments, the signature and uploaded images, so those collections
/// default to empty here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub service_type: ServiceType,
    pub status: OrderStatus,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    /// Service-type-specific fields; opaque to the client.
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default)]
    pub images: Vec<OrderImage>,
}

impl Order {
    /// Whether the given courier is the one this order is bound to.
    pub fn is_assigned_to(&self, courier_id: i64) -> bool {
        self.assigned_to == Some(courier_id)
    }

    /// Product or device name from the detail map, whichever is present.
    /// List views use this as the "item" column.
    pub fn item_name(&self) -> Option<&str> {
        self.details
            .get("product_name")
            .or_else(|| self.details.get("device_name"))
            .and_then(|value| value.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// Variant field set for order creation; exactly one per service type, so a
/// request never leaks another variant's fields onto the wire. Optional text
/// fields ride along as empty strings, matching what the API already accepts
/// from the web client.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServiceDetails {
    Sale {
        product_name: String,
        barcode: String,
        price: f64,
        order_source: String,
        delivery_time: String,
    },
    SendAfterRepair {
        device_name: String,
        repair_report: String,
        repair_cost: f64,
        repair_order_number: String,
        accessories: String,
        delivery_time: String,
    },
    ReceiveForRepair {
        device_name: String,
        device_condition: String,
        initial_report: String,
        repair_order_number: String,
    },
}

impl ServiceDetails {
    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceDetails::Sale { .. } => ServiceType::Sale,
            ServiceDetails::SendAfterRepair { .. } => ServiceType::SendAfterRepair,
            ServiceDetails::ReceiveForRepair { .. } => ServiceType::ReceiveForRepair,
        }
    }
}

/// Body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub service_type: ServiceType,
    /// Immediate courier assignment, when chosen at creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    #[serde(flatten)]
    pub details: ServiceDetails,
}

impl CreateOrderRequest {
    pub fn new(
        customer_name: String,
        customer_phone: String,
        address: String,
        assigned_to: Option<i64>,
        details: ServiceDetails,
    ) -> Self {
        Self {
            customer_name,
            customer_phone,
            address,
            service_type: details.service_type(),
            assigned_to,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sale_request() -> CreateOrderRequest {
        CreateOrderRequest::new(
            "Ali Hassan".into(),
            "07901112233".into(),
            "Karrada, Baghdad".into(),
            None,
            ServiceDetails::Sale {
                product_name: "Laptop charger".into(),
                barcode: "889911".into(),
                price: 25000.0,
                order_source: "whatsapp".into(),
                delivery_time: "2026-03-01T14:30".into(),
            },
        )
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::InDelivery).unwrap(),
            "\"in_delivery\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"device_received\"").unwrap();
        assert_eq!(parsed, OrderStatus::DeviceReceived);
    }

    #[test]
    fn test_status_from_str_accepts_dashed_form() {
        assert_eq!(
            OrderStatus::from_str("device-received").unwrap(),
            OrderStatus::DeviceReceived
        );
        assert!(OrderStatus::from_str("shipped").is_err());
    }

    #[test]
    fn test_override_offers_exactly_six_statuses() {
        assert_eq!(OrderStatus::ALL.len(), 6);
        let unique: std::collections::HashSet<&str> =
            OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_sale_body_carries_only_sale_fields() {
        let value = serde_json::to_value(sale_request()).unwrap();
        for key in [
            "customer_name",
            "customer_phone",
            "address",
            "service_type",
            "product_name",
            "barcode",
            "price",
            "order_source",
            "delivery_time",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        for key in [
            "device_name",
            "repair_report",
            "repair_cost",
            "repair_order_number",
            "accessories",
            "device_condition",
            "initial_report",
            "assigned_to",
        ] {
            assert!(value.get(key).is_none(), "unexpected {key}");
        }
        assert_eq!(value["service_type"], "sale");
        assert_eq!(value["price"], 25000.0);
    }

    #[test]
    fn test_receive_body_carries_only_receive_fields() {
        let req = CreateOrderRequest::new(
            "Zainab".into(),
            "07811119999".into(),
            "Mansour, Baghdad".into(),
            Some(4),
            ServiceDetails::ReceiveForRepair {
                device_name: "iPhone 13".into(),
                device_condition: "cracked screen".into(),
                initial_report: "does not power on".into(),
                repair_order_number: String::new(),
            },
        );
        let value = serde_json::to_value(req).unwrap();
        assert_eq!(value["service_type"], "receive_for_repair");
        assert_eq!(value["assigned_to"], 4);
        assert!(value.get("device_condition").is_some());
        assert!(value.get("product_name").is_none());
        assert!(value.get("price").is_none());
        assert!(value.get("accessories").is_none());
    }

    #[test]
    fn test_order_decodes_without_embedded_records() {
        let order: Order = serde_json::from_value(json!({
            "id": 12,
            "customer_name": "Ali",
            "customer_phone": "0790",
            "address": "Baghdad",
            "service_type": "sale",
            "status": "preparing",
            "created_at": "2026-02-10T08:30:00Z"
        }))
        .unwrap();
        assert!(order.payments.is_empty());
        assert!(order.signature.is_none());
        assert!(order.assigned_to.is_none());
        assert!(order.item_name().is_none());
    }

    #[test]
    fn test_item_name_prefers_product_then_device() {
        let mut order: Order = serde_json::from_value(json!({
            "id": 1,
            "customer_name": "Ali",
            "customer_phone": "0790",
            "address": "Baghdad",
            "service_type": "sale",
            "status": "preparing",
            "created_at": "2026-02-10T08:30:00Z",
            "details": {"product_name": "Router", "device_name": "ignored"}
        }))
        .unwrap();
        assert_eq!(order.item_name(), Some("Router"));
        order.details.remove("product_name");
        assert_eq!(order.item_name(), Some("ignored"));
    }
}
