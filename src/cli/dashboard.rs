//! The signed-in landing view: counts plus the latest orders.

use super::{output, watch_loop, Ctx};
use crate::api::OrderFilter;
use crate::models::OrderStatus;
use anyhow::Result;

pub(crate) async fn cmd_dashboard(ctx: &Ctx, watch: bool) -> Result<()> {
    if watch {
        return watch_loop(ctx.settings.watch_interval, || render_dashboard(ctx)).await;
    }
    render_dashboard(ctx).await
}

/// Staff see totals across the shop; couriers see how many orders are on
/// them. The recent strip is the same for everyone.
async fn render_dashboard(ctx: &Ctx) -> Result<()> {
    let orders = ctx.client.list_orders(&OrderFilter::default()).await?;

    println!();
    println!("=== Tawseel Dashboard ===");
    println!();
    println!(
        "Signed in as: {} ({})",
        ctx.user().full_name,
        ctx.role().label()
    );
    println!();

    if ctx.role().is_staff() {
        let count =
            |status: OrderStatus| orders.iter().filter(|order| order.status == status).count();
        println!("Total orders:  {}", orders.len());
        println!("Preparing:     {}", count(OrderStatus::Preparing));
        println!("Assigned:      {}", count(OrderStatus::Assigned));
        println!("In delivery:   {}", count(OrderStatus::InDelivery));
        println!("Delivered:     {}", count(OrderStatus::Delivered));
    } else {
        let mine = orders
            .iter()
            .filter(|order| order.is_assigned_to(ctx.user().id))
            .count();
        println!("My orders: {}", mine);
        println!("See them with `tawseel orders mine`.");
    }

    // The API serves orders newest first.
    let recent = &orders[..orders.len().min(5)];
    if !recent.is_empty() {
        println!();
        println!("Recent orders:");
        println!();
        output::print_recent_orders(recent);
    }

    println!();
    Ok(())
}
