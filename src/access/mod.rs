//! Role capabilities.
//!
//! One static table per role, checked at command dispatch. Keeping the whole
//! permission model in one place makes it auditable; the server still
//! enforces its own rules, so a gap here can refuse too little but never
//! grant anything the API would not.

use crate::models::Role;
use thiserror::Error;

/// Things a signed-in account can do through this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Open a single order's detail view.
    ViewOrder,
    CreateOrders,
    /// Browse the preparing / sent / to-receive boards.
    ViewOrderBoards,
    AssignCouriers,
    /// Set any order to any status, outside the guided transitions.
    OverrideStatus,
    /// Browse the full order board with courier and status filters.
    ViewAllOrders,
    ManageUsers,
    /// Receive, deliver and record payment/signature/photo on own orders.
    ExecuteDeliveries,
}

impl Capability {
    fn action(&self) -> &'static str {
        match self {
            Capability::ViewOrder => "view orders",
            Capability::CreateOrders => "create orders",
            Capability::ViewOrderBoards => "browse the order boards",
            Capability::AssignCouriers => "assign couriers",
            Capability::OverrideStatus => "override order status",
            Capability::ViewAllOrders => "browse the full order board",
            Capability::ManageUsers => "manage users",
            Capability::ExecuteDeliveries => "run deliveries",
        }
    }
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ViewOrder,
    Capability::CreateOrders,
    Capability::ViewOrderBoards,
    Capability::AssignCouriers,
    Capability::OverrideStatus,
    Capability::ViewAllOrders,
    Capability::ManageUsers,
];

const EMPLOYEE_CAPABILITIES: &[Capability] = &[
    Capability::ViewOrder,
    Capability::CreateOrders,
    Capability::ViewOrderBoards,
    Capability::AssignCouriers,
    Capability::OverrideStatus,
];

const COURIER_CAPABILITIES: &[Capability] =
    &[Capability::ViewOrder, Capability::ExecuteDeliveries];

pub fn capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::Admin => ADMIN_CAPABILITIES,
        Role::Employee => EMPLOYEE_CAPABILITIES,
        Role::Courier => COURIER_CAPABILITIES,
    }
}

pub fn allows(role: Role, capability: Capability) -> bool {
    capabilities(role).contains(&capability)
}

#[derive(Debug, Error)]
#[error("{role} accounts cannot {action}")]
pub struct AccessDenied {
    role: &'static str,
    action: &'static str,
}

/// Refuse with a readable message when `role` lacks `capability`.
pub fn ensure(role: Role, capability: Capability) -> Result<(), AccessDenied> {
    if allows(role, capability) {
        return Ok(());
    }
    Err(AccessDenied {
        role: role.as_str(),
        action: capability.action(),
    })
}
