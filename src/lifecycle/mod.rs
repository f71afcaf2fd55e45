//! Order lifecycle rules.
//!
//! One table decides which actions an account may take on an order in its
//! current state; command handlers consult it before issuing the write and
//! `orders show` uses it to print what is possible next. The server applies
//! the same rules authoritatively, so a refusal here is a friendlier version
//! of the 4xx the API would return anyway.
//!
//! Guided transitions:
//!
//! preparing --assign--> assigned --receive--> in_delivery --deliver--> delivered
//!                                                         \-device-received-> device_received
//!
//! Staff additionally hold a status override that can set any of the six
//! statuses directly, outside this table.

use crate::models::{Order, OrderStatus, Role, ServiceType, User};
use thiserror::Error;

/// An action taken on one specific order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Bind a courier; `preparing` -> `assigned`.
    Assign,
    /// Courier accepts the order; `assigned` -> `in_delivery`.
    Receive,
    /// Courier hands the goods over; `in_delivery` -> `delivered`.
    MarkDelivered,
    /// Courier collects the device for repair; `in_delivery` -> `device_received`.
    MarkDeviceReceived,
    RecordPayment,
    CaptureSignature,
    AttachPhoto,
    /// Staff escape hatch: set any of the six statuses directly.
    OverrideStatus,
}

impl OrderAction {
    fn phrase(&self) -> &'static str {
        match self {
            OrderAction::Assign => "assigning a courier",
            OrderAction::Receive => "receiving",
            OrderAction::MarkDelivered => "marking delivered",
            OrderAction::MarkDeviceReceived => "marking the device received",
            OrderAction::RecordPayment => "recording a payment",
            OrderAction::CaptureSignature => "attaching a signature",
            OrderAction::AttachPhoto => "attaching a photo",
            OrderAction::OverrideStatus => "a status override",
        }
    }

    /// Subcommand that performs this action, for "what next" hints.
    pub fn command(&self) -> &'static str {
        match self {
            OrderAction::Assign => "orders assign",
            OrderAction::Receive => "orders receive",
            OrderAction::MarkDelivered => "orders deliver",
            OrderAction::MarkDeviceReceived => "orders device-received",
            OrderAction::RecordPayment => "orders pay",
            OrderAction::CaptureSignature => "orders sign",
            OrderAction::AttachPhoto => "orders photo",
            OrderAction::OverrideStatus => "orders set-status",
        }
    }
}

/// Everything `user` may do to `order` right now.
pub fn available_actions(user: &User, order: &Order) -> Vec<OrderAction> {
    let mut actions = Vec::new();
    match user.role {
        Role::Admin | Role::Employee => {
            if order.status == OrderStatus::Preparing && order.assigned_to.is_none() {
                actions.push(OrderAction::Assign);
            }
            actions.push(OrderAction::OverrideStatus);
        }
        Role::Courier => {
            if !order.is_assigned_to(user.id) {
                return actions;
            }
            match order.status {
                OrderStatus::Assigned => actions.push(OrderAction::Receive),
                OrderStatus::InDelivery => {
                    if order.service_type == ServiceType::ReceiveForRepair {
                        actions.push(OrderAction::MarkDeviceReceived);
                    } else {
                        actions.push(OrderAction::MarkDelivered);
                    }
                    actions.push(OrderAction::RecordPayment);
                    actions.push(OrderAction::CaptureSignature);
                    actions.push(OrderAction::AttachPhoto);
                }
                _ => {}
            }
        }
    }
    actions
}

#[derive(Debug, Error)]
pub enum ActionRefused {
    #[error("{role} accounts cannot take delivery actions; {phrase} is for couriers")]
    StaffOnlyAction { role: &'static str, phrase: &'static str },

    #[error("courier accounts cannot do {phrase}")]
    CourierCannot { phrase: &'static str },

    #[error("order #{order_id} is not assigned to you")]
    NotAssignee { order_id: i64 },

    #[error("order #{order_id} already has a courier assigned")]
    AlreadyAssigned { order_id: i64 },

    #[error("order #{order_id} is a repair pickup; use `orders device-received` instead")]
    DeliverOnPickup { order_id: i64 },

    #[error("order #{order_id} is not a repair pickup; use `orders deliver` instead")]
    DeviceReceiveOnDelivery { order_id: i64 },

    #[error("order #{order_id} is {status}; {phrase} requires status {required}")]
    WrongStatus {
        order_id: i64,
        status: OrderStatus,
        phrase: &'static str,
        required: OrderStatus,
    },
}

/// Check `action` against the table, refusing with the most specific reason.
pub fn ensure(user: &User, order: &Order, action: OrderAction) -> Result<(), ActionRefused> {
    if available_actions(user, order).contains(&action) {
        return Ok(());
    }
    Err(refusal(user, order, action))
}

fn refusal(user: &User, order: &Order, action: OrderAction) -> ActionRefused {
    let phrase = action.phrase();
    match action {
        OrderAction::Assign | OrderAction::OverrideStatus => {
            if user.role == Role::Courier {
                return ActionRefused::CourierCannot { phrase };
            }
            // Staff asking to assign: either the slot is taken or the order
            // has moved past preparing.
            if order.status == OrderStatus::Preparing {
                ActionRefused::AlreadyAssigned { order_id: order.id }
            } else {
                ActionRefused::WrongStatus {
                    order_id: order.id,
                    status: order.status,
                    phrase,
                    required: OrderStatus::Preparing,
                }
            }
        }
        _ => {
            if user.role != Role::Courier {
                return ActionRefused::StaffOnlyAction {
                    role: user.role.as_str(),
                    phrase,
                };
            }
            if !order.is_assigned_to(user.id) {
                return ActionRefused::NotAssignee { order_id: order.id };
            }
            if order.status == OrderStatus::InDelivery {
                // Right state, wrong terminal action for the service type.
                if action == OrderAction::MarkDelivered {
                    return ActionRefused::DeliverOnPickup { order_id: order.id };
                }
                if action == OrderAction::MarkDeviceReceived {
                    return ActionRefused::DeviceReceiveOnDelivery { order_id: order.id };
                }
            }
            let required = match action {
                OrderAction::Receive => OrderStatus::Assigned,
                _ => OrderStatus::InDelivery,
            };
            ActionRefused::WrongStatus {
                order_id: order.id,
                status: order.status,
                phrase,
                required,
            }
        }
    }
}

/// Status written by a guided transition, where the action maps to one.
pub fn target_status(action: OrderAction) -> Option<OrderStatus> {
    match action {
        OrderAction::Receive => Some(OrderStatus::InDelivery),
        OrderAction::MarkDelivered => Some(OrderStatus::Delivered),
        OrderAction::MarkDeviceReceived => Some(OrderStatus::DeviceReceived),
        _ => None,
    }
}
