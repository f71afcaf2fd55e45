//! Wire types for the Tawseel delivery API.
//!
//! Entities are owned by the server; the client decodes them as-is and never
//! derives state locally beyond what a single command run needs.

pub mod order;
pub mod user;

pub use order::{
    CreateOrderRequest, Order, OrderImage, OrderSource, OrderStatus, Payment, ServiceDetails,
    ServiceType, Signature,
};
pub use user::{CreateUserRequest, LoginRequest, LoginResponse, Role, UpdateUserRequest, User};
