//! Order commands: boards, intake, lifecycle moves and delivery records.
//!
//! Every state-changing handler follows the same order: capability gate,
//! fetch the order, check the lifecycle table, confirm, write, then
//! re-fetch so the output shows what the server actually did.

use super::{output, watch_loop, Ctx, CreateCommands, OrdersCommands};
use crate::access::{self, Capability};
use crate::api::OrderFilter;
use crate::lifecycle::{self, OrderAction};
use crate::models::{
    CreateOrderRequest, Order, OrderStatus, Role, ServiceDetails, ServiceType,
};
use anyhow::{Context, Result};
use base64::Engine;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub(crate) async fn run(ctx: &Ctx, command: &OrdersCommands) -> Result<()> {
    match command {
        OrdersCommands::Create(create) => cmd_create(ctx, create).await,
        OrdersCommands::Preparing { watch } => cmd_preparing(ctx, *watch).await,
        OrdersCommands::Sent {
            search,
            service_type,
            status,
            courier,
            watch,
        } => {
            let filter = BoardFilter {
                search: search.clone(),
                service_type: *service_type,
                status: *status,
                courier: *courier,
            };
            cmd_sent(ctx, &filter, *watch).await
        }
        OrdersCommands::ToReceive { watch } => cmd_to_receive(ctx, *watch).await,
        OrdersCommands::Mine { watch } => cmd_mine(ctx, *watch).await,
        OrdersCommands::Board {
            search,
            service_type,
            status,
            courier,
            watch,
        } => {
            let filter = BoardFilter {
                search: search.clone(),
                service_type: *service_type,
                status: *status,
                courier: *courier,
            };
            cmd_board(ctx, &filter, *watch).await
        }
        OrdersCommands::Show { id } => cmd_show(ctx, *id).await,
        OrdersCommands::Couriers => cmd_couriers(ctx).await,
        OrdersCommands::Assign {
            id,
            courier_id,
            yes,
        } => cmd_assign(ctx, *id, *courier_id, *yes).await,
        OrdersCommands::Receive { id, yes } => cmd_receive(ctx, *id, *yes).await,
        OrdersCommands::Deliver { id, yes } => {
            complete_order(ctx, *id, OrderAction::MarkDelivered, *yes).await
        }
        OrdersCommands::DeviceReceived { id, yes } => {
            complete_order(ctx, *id, OrderAction::MarkDeviceReceived, *yes).await
        }
        OrdersCommands::SetStatus { id, status, yes } => {
            cmd_set_status(ctx, *id, *status, *yes).await
        }
        OrdersCommands::Pay { id, amount } => cmd_pay(ctx, *id, *amount).await,
        OrdersCommands::Sign { id, file } => cmd_sign(ctx, *id, file).await,
        OrdersCommands::Photo {
            id,
            file,
            image_type,
        } => cmd_photo(ctx, *id, file, image_type).await,
        OrdersCommands::DownloadImage { id, image_id, out } => {
            cmd_download_image(ctx, *id, *image_id, out.as_deref()).await
        }
    }
}

/// Filters shared by the sent board and the admin board. The two views send
/// the courier under different query params, so this stays param-agnostic.
struct BoardFilter {
    search: Option<String>,
    service_type: Option<ServiceType>,
    status: Option<OrderStatus>,
    courier: Option<i64>,
}

impl BoardFilter {
    fn is_empty(&self) -> bool {
        self.search
            .as_deref()
            .map_or(true, |search| search.trim().is_empty())
            && self.service_type.is_none()
            && self.status.is_none()
            && self.courier.is_none()
    }
}

// ============================================================================
// Boards
// ============================================================================

async fn cmd_preparing(ctx: &Ctx, watch: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ViewOrderBoards)?;
    if watch {
        return watch_loop(ctx.settings.watch_interval, || render_preparing(ctx)).await;
    }
    render_preparing(ctx).await
}

async fn render_preparing(ctx: &Ctx) -> Result<()> {
    let filter = OrderFilter {
        status: Some(OrderStatus::Preparing),
        ..Default::default()
    };
    let orders = ctx.client.list_orders(&filter).await?;

    println!();
    println!("=== Preparing Orders ===");
    if orders.is_empty() {
        println!();
        println!("No orders in preparation.");
        println!();
        return Ok(());
    }

    output::print_orders_table(&orders);
    println!(
        "{} order(s) waiting. Assign with `tawseel orders assign <id> <courier-id>`.",
        orders.len()
    );
    println!();
    Ok(())
}

async fn cmd_sent(ctx: &Ctx, filter: &BoardFilter, watch: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ViewOrderBoards)?;
    if watch {
        return watch_loop(ctx.settings.watch_interval, || render_sent(ctx, filter)).await;
    }
    render_sent(ctx, filter).await
}

async fn render_sent(ctx: &Ctx, filter: &BoardFilter) -> Result<()> {
    let query = OrderFilter {
        search: filter.search.clone(),
        service_type: filter.service_type,
        status: filter.status,
        assigned_to: filter.courier,
        ..Default::default()
    };
    let mut orders = ctx.client.list_orders(&query).await?;
    // This board is everything past preparation.
    orders.retain(|order| order.status != OrderStatus::Preparing);

    println!();
    println!("=== Sent Orders ===");
    if orders.is_empty() {
        println!();
        println!("No sent orders match.");
        println!();
        return Ok(());
    }

    output::print_orders_table(&orders);
    println!("{} order(s).", orders.len());
    println!();
    Ok(())
}

async fn cmd_to_receive(ctx: &Ctx, watch: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ViewOrderBoards)?;
    if watch {
        return watch_loop(ctx.settings.watch_interval, || render_to_receive(ctx)).await;
    }
    render_to_receive(ctx).await
}

async fn render_to_receive(ctx: &Ctx) -> Result<()> {
    let query = OrderFilter {
        service_type: Some(ServiceType::ReceiveForRepair),
        ..Default::default()
    };
    let mut orders = ctx.client.list_orders(&query).await?;
    // Pickups that are underway or just collected; preparing and cancelled
    // ones have no courier activity to track yet.
    orders.retain(|order| {
        matches!(
            order.status,
            OrderStatus::Assigned | OrderStatus::InDelivery | OrderStatus::DeviceReceived
        )
    });

    println!();
    println!("=== Devices To Receive ===");
    if orders.is_empty() {
        println!();
        println!("No repair pickups underway.");
        println!();
        return Ok(());
    }

    output::print_orders_table(&orders);
    println!("{} pickup(s).", orders.len());
    println!();
    Ok(())
}

async fn cmd_mine(ctx: &Ctx, watch: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ExecuteDeliveries)?;
    if watch {
        return watch_loop(ctx.settings.watch_interval, || render_mine(ctx)).await;
    }
    render_mine(ctx).await
}

/// The courier's queue: fresh assignments first, then runs underway. Both
/// reads filter to the signed-in courier; the status param narrows the
/// fetch and the client-side check guards against server-side laxity.
async fn render_mine(ctx: &Ctx) -> Result<()> {
    let me = ctx.user().id;

    let assigned_query = OrderFilter {
        status: Some(OrderStatus::Assigned),
        ..Default::default()
    };
    let mut new_orders = ctx.client.list_orders(&assigned_query).await?;
    new_orders.retain(|order| order.is_assigned_to(me));

    let delivery_query = OrderFilter {
        status: Some(OrderStatus::InDelivery),
        ..Default::default()
    };
    let mut in_delivery = ctx.client.list_orders(&delivery_query).await?;
    in_delivery.retain(|order| order.is_assigned_to(me));

    println!();
    println!("=== My Deliveries ===");
    println!();
    println!("New orders assigned to you ({})", new_orders.len());
    if new_orders.is_empty() {
        println!("  none");
    } else {
        output::print_orders_table(&new_orders);
        println!("Accept one with `tawseel orders receive <id>`.");
    }

    println!();
    println!("In delivery ({})", in_delivery.len());
    if in_delivery.is_empty() {
        println!("  none");
    } else {
        output::print_orders_table(&in_delivery);
        println!("Finish with `tawseel orders deliver <id>` or `tawseel orders device-received <id>`.");
    }
    println!();
    Ok(())
}

async fn cmd_board(ctx: &Ctx, filter: &BoardFilter, watch: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ViewAllOrders)?;
    if watch {
        return watch_loop(ctx.settings.watch_interval, || render_board(ctx, filter)).await;
    }
    render_board(ctx, filter).await
}

async fn render_board(ctx: &Ctx, filter: &BoardFilter) -> Result<()> {
    let query = OrderFilter {
        search: filter.search.clone(),
        service_type: filter.service_type,
        status: filter.status,
        courier_id: filter.courier,
        ..Default::default()
    };
    let orders = ctx.client.list_orders(&query).await?;

    // Totals always cover the whole board, not just the filtered view.
    let unfiltered;
    let stats_source = if filter.is_empty() {
        &orders
    } else {
        unfiltered = ctx.client.list_orders(&OrderFilter::default()).await?;
        &unfiltered
    };

    println!();
    println!("=== Order Board ===");
    print_board_stats(stats_source);

    if orders.is_empty() {
        println!();
        println!("No orders match.");
        println!();
        return Ok(());
    }

    output::print_orders_table(&orders);
    println!("{} order(s) shown.", orders.len());
    println!();
    Ok(())
}

fn print_board_stats(orders: &[Order]) {
    println!();
    println!("Total orders: {}", orders.len());

    println!();
    println!("By status:");
    for status in OrderStatus::ALL {
        let count = orders.iter().filter(|order| order.status == status).count();
        println!("  {:<16} {}", status.label(), count);
    }

    println!();
    println!("By service type:");
    for service_type in [
        ServiceType::Sale,
        ServiceType::SendAfterRepair,
        ServiceType::ReceiveForRepair,
    ] {
        let count = orders
            .iter()
            .filter(|order| order.service_type == service_type)
            .count();
        println!("  {:<18} {}", service_type.label(), count);
    }

    let mut by_courier: BTreeMap<&str, usize> = BTreeMap::new();
    for order in orders {
        if let Some(name) = order.assigned_to_name.as_deref() {
            *by_courier.entry(name).or_insert(0) += 1;
        }
    }
    if !by_courier.is_empty() {
        println!();
        println!("By courier:");
        for (name, count) in by_courier {
            println!("  {:<20} {}", name, count);
        }
    }
}

// ============================================================================
// Detail and intake
// ============================================================================

async fn cmd_show(ctx: &Ctx, id: i64) -> Result<()> {
    access::ensure(ctx.role(), Capability::ViewOrder)?;
    let order = ctx.client.get_order(id).await?;
    output::print_order_details(&order, ctx.user());
    Ok(())
}

async fn cmd_couriers(ctx: &Ctx) -> Result<()> {
    access::ensure(ctx.role(), Capability::AssignCouriers)?;
    let couriers = ctx.client.list_users(Some(Role::Courier)).await?;

    if couriers.is_empty() {
        println!("No courier accounts found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<5}  {:<20}  {:<16}  {:<14}  {:<8}",
        "ID", "NAME", "USERNAME", "PHONE", "ACTIVE"
    );
    println!("{}", "-".repeat(71));
    for courier in &couriers {
        println!(
            "{:<5}  {:<20}  {:<16}  {:<14}  {:<8}",
            courier.id,
            output::truncate(&courier.full_name, 20),
            output::truncate(&courier.username, 16),
            courier.phone.as_deref().unwrap_or("-"),
            if courier.is_active { "yes" } else { "no" }
        );
    }
    println!();
    Ok(())
}

async fn cmd_create(ctx: &Ctx, command: &CreateCommands) -> Result<()> {
    access::ensure(ctx.role(), Capability::CreateOrders)?;

    let (common, details) = match command {
        CreateCommands::Sale {
            common,
            product,
            price,
            barcode,
            source,
            delivery_time,
        } => (
            common,
            ServiceDetails::Sale {
                product_name: product.clone(),
                barcode: barcode.clone().unwrap_or_default(),
                price: *price,
                order_source: source.map(|s| s.as_str().to_string()).unwrap_or_default(),
                delivery_time: delivery_time.clone().unwrap_or_default(),
            },
        ),
        CreateCommands::SendAfterRepair {
            common,
            device,
            repair_report,
            repair_cost,
            repair_order_number,
            accessories,
            delivery_time,
        } => (
            common,
            ServiceDetails::SendAfterRepair {
                device_name: device.clone(),
                repair_report: repair_report.clone(),
                repair_cost: *repair_cost,
                repair_order_number: repair_order_number.clone().unwrap_or_default(),
                accessories: accessories.clone().unwrap_or_default(),
                delivery_time: delivery_time.clone().unwrap_or_default(),
            },
        ),
        CreateCommands::ReceiveForRepair {
            common,
            device,
            condition,
            initial_report,
            repair_order_number,
        } => (
            common,
            ServiceDetails::ReceiveForRepair {
                device_name: device.clone(),
                device_condition: condition.clone(),
                initial_report: initial_report.clone(),
                repair_order_number: repair_order_number.clone().unwrap_or_default(),
            },
        ),
    };

    let request = CreateOrderRequest::new(
        common.customer.clone(),
        common.phone.clone(),
        common.address.clone(),
        common.assign,
        details,
    );
    ctx.client.create_order(&request).await?;

    println!("[OK] Order created for {}.", common.customer);
    if common.assign.is_some() {
        println!("See it with `tawseel orders sent`.");
    } else {
        println!("See it with `tawseel orders preparing`.");
    }
    Ok(())
}

// ============================================================================
// Lifecycle moves
// ============================================================================

async fn cmd_assign(ctx: &Ctx, id: i64, courier_id: i64, yes: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::AssignCouriers)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, OrderAction::Assign)?;

    let couriers = ctx.client.list_users(Some(Role::Courier)).await?;
    let courier = couriers
        .iter()
        .find(|user| user.id == courier_id && user.is_active)
        .with_context(|| format!("No active courier with ID {}", courier_id))?;

    if !yes {
        let prompt = format!("Assign order #{} to {}?", id, courier.full_name);
        if !output::confirm(&prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.client.assign_courier(id, courier_id).await?;
    let order = ctx.client.get_order(id).await?;
    println!("[OK] Order #{} assigned to {}.", id, courier.full_name);
    println!("Status is now: {}", order.status.label());
    Ok(())
}

async fn cmd_receive(ctx: &Ctx, id: i64, yes: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ExecuteDeliveries)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, OrderAction::Receive)?;

    if !yes {
        let prompt = format!("Receive order #{} and start the delivery?", id);
        if !output::confirm(&prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.client.receive_order(id).await?;
    let order = ctx.client.get_order(id).await?;
    println!(
        "[OK] Order #{} received. Status is now: {}",
        id,
        order.status.label()
    );
    println!(
        "Record the handover with `tawseel orders pay/sign/photo` before closing it out."
    );
    Ok(())
}

/// Shared tail of `deliver` and `device-received`: both set a terminal
/// status through the same endpoint.
async fn complete_order(ctx: &Ctx, id: i64, action: OrderAction, yes: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::ExecuteDeliveries)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, action)?;

    let target = match lifecycle::target_status(action) {
        Some(target) => target,
        None => anyhow::bail!("`{}` does not complete an order", action.command()),
    };

    if !yes {
        let prompt = format!("Mark order #{} as {}?", id, target.label().to_lowercase());
        if !output::confirm(&prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.client.update_status(id, target).await?;
    println!("[OK] Order #{} is now {}.", id, target.label().to_lowercase());
    Ok(())
}

async fn cmd_set_status(ctx: &Ctx, id: i64, status: OrderStatus, yes: bool) -> Result<()> {
    access::ensure(ctx.role(), Capability::OverrideStatus)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, OrderAction::OverrideStatus)?;

    if order.status == status {
        println!("Order #{} is already {}.", id, status.label().to_lowercase());
        return Ok(());
    }

    if !yes {
        let prompt = format!(
            "Set order #{} from {} to {}?",
            id,
            order.status.label().to_lowercase(),
            status.label().to_lowercase()
        );
        if !output::confirm(&prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.client.update_status(id, status).await?;
    println!("[OK] Order #{} is now {}.", id, status.label().to_lowercase());
    Ok(())
}

// ============================================================================
// Delivery records
// ============================================================================

async fn cmd_pay(ctx: &Ctx, id: i64, amount: f64) -> Result<()> {
    access::ensure(ctx.role(), Capability::ExecuteDeliveries)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, OrderAction::RecordPayment)?;

    ctx.client.add_payment(id, amount).await?;

    let order = ctx.client.get_order(id).await?;
    let total: f64 = order.payments.iter().map(|payment| payment.amount).sum();
    println!("[OK] Recorded {} on order #{}.", output::amount(amount), id);
    println!("Total collected: {}", output::amount(total));
    Ok(())
}

async fn cmd_sign(ctx: &Ctx, id: i64, file: &Path) -> Result<()> {
    access::ensure(ctx.role(), Capability::ExecuteDeliveries)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, OrderAction::CaptureSignature)?;

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read signature file: {}", file.display()))?;
    let mime = mime_guess::from_path(file).first_or(mime_guess::mime::IMAGE_PNG);
    let signature_data = format!(
        "data:{};base64,{}",
        mime.essence_str(),
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    );

    ctx.client.upload_signature(id, signature_data).await?;
    println!("[OK] Signature attached to order #{}.", id);
    Ok(())
}

async fn cmd_photo(ctx: &Ctx, id: i64, file: &Path, image_type: &str) -> Result<()> {
    access::ensure(ctx.role(), Capability::ExecuteDeliveries)?;
    let order = ctx.client.get_order(id).await?;
    lifecycle::ensure(ctx.user(), &order, OrderAction::AttachPhoto)?;

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read image file: {}", file.display()))?;
    let mime = mime_guess::from_path(file).first_or(mime_guess::mime::IMAGE_JPEG);
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("order-{}.jpg", id));

    ctx.client
        .upload_image(id, file_name, mime.essence_str(), bytes, image_type)
        .await?;
    println!("[OK] Photo attached to order #{}.", id);
    Ok(())
}

async fn cmd_download_image(
    ctx: &Ctx,
    id: i64,
    image_id: i64,
    out: Option<&Path>,
) -> Result<()> {
    access::ensure(ctx.role(), Capability::ViewOrder)?;
    let order = ctx.client.get_order(id).await?;
    let image = order
        .images
        .iter()
        .find(|image| image.id == image_id)
        .with_context(|| format!("Order #{} has no image with ID {}", id, image_id))?;

    let bytes = ctx.client.download_image(&image.image_path).await?;
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => default_image_name(id, image_id, &image.image_path),
    };
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write image to {}", path.display()))?;
    println!("[OK] Saved {} byte(s) to {}.", bytes.len(), path.display());
    Ok(())
}

fn default_image_name(order_id: i64, image_id: i64, image_path: &str) -> PathBuf {
    let ext = Path::new(image_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg");
    PathBuf::from(format!("order-{}-image-{}.{}", order_id, image_id, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_filter_empty_ignores_blank_search() {
        let filter = BoardFilter {
            search: Some("   ".to_string()),
            service_type: None,
            status: None,
            courier: None,
        };
        assert!(filter.is_empty());
    }

    #[test]
    fn test_board_filter_with_courier_is_not_empty() {
        let filter = BoardFilter {
            search: None,
            service_type: None,
            status: None,
            courier: Some(4),
        };
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_default_image_name_keeps_extension() {
        assert_eq!(
            default_image_name(12, 3, "uploads/orders/12/photo.png"),
            PathBuf::from("order-12-image-3.png")
        );
        assert_eq!(
            default_image_name(12, 3, "uploads/orders/12/photo"),
            PathBuf::from("order-12-image-3.jpg")
        );
    }
}
