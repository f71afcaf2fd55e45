//! Table and detail rendering shared by the command handlers.

use crate::lifecycle::{self, OrderAction};
use crate::models::{Order, User};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::Write;

/// Truncate a string to max length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn short_date(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

pub fn long_date(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// Amounts are whole Iraqi dinars in practice; fractions print as-is.
pub fn amount(value: f64) -> String {
    format!("{} IQD", value)
}

/// Full-width order table used by the boards.
pub fn print_orders_table(orders: &[Order]) {
    println!();
    println!(
        "{:<5}  {:<20}  {:<13}  {:<18}  {:<20}  {:<24}  {:<16}  {:<15}  {:<10}",
        "ID", "CUSTOMER", "PHONE", "SERVICE", "ITEM", "ADDRESS", "COURIER", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(157));

    for order in orders {
        println!(
            "{:<5}  {:<20}  {:<13}  {:<18}  {:<20}  {:<24}  {:<16}  {:<15}  {:<10}",
            order.id,
            truncate(&order.customer_name, 20),
            truncate(&order.customer_phone, 13),
            order.service_type.label(),
            truncate(order.item_name().unwrap_or("-"), 20),
            truncate(&order.address, 24),
            truncate(order.assigned_to_name.as_deref().unwrap_or("-"), 16),
            order.status.label(),
            short_date(&order.created_at)
        );
    }

    println!();
}

/// Short table for the dashboard's recent-orders strip.
pub fn print_recent_orders(orders: &[Order]) {
    println!(
        "{:<5}  {:<22}  {:<18}  {:<15}  {:<10}",
        "ID", "CUSTOMER", "SERVICE", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(78));

    for order in orders {
        println!(
            "{:<5}  {:<22}  {:<18}  {:<15}  {:<10}",
            order.id,
            truncate(&order.customer_name, 22),
            order.service_type.label(),
            order.status.label(),
            short_date(&order.created_at)
        );
    }
}

/// Everything the detail endpoint serves for one order, plus what `user`
/// can do with it next.
pub fn print_order_details(order: &Order, user: &User) {
    println!();
    println!("=== Order #{} ===", order.id);
    println!();
    println!("Customer:  {}", order.customer_name);
    println!("Phone:     {}", order.customer_phone);
    println!("Address:   {}", order.address);
    println!("Service:   {}", order.service_type.label());
    println!("Status:    {}", order.status.label());
    println!(
        "Courier:   {}",
        order.assigned_to_name.as_deref().unwrap_or("unassigned")
    );
    println!("Created:   {}", long_date(&order.created_at));

    let details: Vec<(String, String)> = order
        .details
        .iter()
        .filter_map(|(key, value)| detail_row(key, value))
        .collect();
    if !details.is_empty() {
        let width = details.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        println!();
        println!("Details:");
        for (key, value) in &details {
            println!("  {:<width$}  {}", key, value, width = width);
        }
    }

    if !order.payments.is_empty() {
        println!();
        println!("Payments:");
        for payment in &order.payments {
            println!(
                "  {}  {}",
                long_date(&payment.payment_date),
                amount(payment.amount)
            );
        }
        let total: f64 = order.payments.iter().map(|payment| payment.amount).sum();
        println!("  Total: {}", amount(total));
    }

    if !order.images.is_empty() {
        println!();
        println!("Images:");
        for image in &order.images {
            println!("  [{}] {}", image.id, image.image_path);
        }
        println!(
            "  Fetch with `tawseel orders download-image {} <image-id>`.",
            order.id
        );
    }

    if order.signature.is_some() {
        println!();
        println!("Signature: captured");
    }

    let actions = lifecycle::available_actions(user, order);
    if !actions.is_empty() {
        println!();
        println!("Available actions:");
        for action in actions {
            match action {
                OrderAction::Assign => {
                    println!("  tawseel orders assign {} <courier-id>", order.id)
                }
                OrderAction::OverrideStatus => {
                    println!("  tawseel orders set-status {} <status>", order.id)
                }
                OrderAction::RecordPayment => {
                    println!("  tawseel orders pay {} <amount>", order.id)
                }
                OrderAction::CaptureSignature => {
                    println!("  tawseel orders sign {} <file>", order.id)
                }
                OrderAction::AttachPhoto => {
                    println!("  tawseel orders photo {} <file>", order.id)
                }
                _ => println!("  tawseel {} {}", action.command(), order.id),
            }
        }
    }

    println!();
}

/// One printable detail row; blank and null values are dropped, money
/// fields get the currency suffix.
fn detail_row(key: &str, value: &serde_json::Value) -> Option<(String, String)> {
    let text = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) if s.trim().is_empty() => return None,
        serde_json::Value::String(s) => s.clone(),
        // Value::to_string keeps a trailing ".0" on whole floats.
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) => format!("{}", f),
            None => n.to_string(),
        },
        other => other.to_string(),
    };
    let text = if key == "price" || key == "repair_cost" {
        format!("{} IQD", text)
    } else {
        text
    };
    Some((key.replace('_', " "), text))
}

/// Ask before a state-changing command goes through. Anything but y/yes
/// counts as no.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read confirmation")?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_keeps_short_strings() {
        assert_eq!(truncate("Ali", 10), "Ali");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate("Mohammed Al-Baghdadi", 10), "Mohamme...");
    }

    #[test]
    fn test_truncate_is_safe_on_arabic_text() {
        let name = "محمد عبد الكريم الساعدي";
        let short = truncate(name, 10);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 10);
    }

    #[test]
    fn test_amount_formats_whole_dinars_without_decimals() {
        assert_eq!(amount(25000.0), "25000 IQD");
        assert_eq!(amount(2500.5), "2500.5 IQD");
    }

    #[test]
    fn test_detail_row_drops_blanks_and_tags_money() {
        assert!(detail_row("barcode", &json!("")).is_none());
        assert!(detail_row("accessories", &json!(null)).is_none());
        assert_eq!(
            detail_row("repair_cost", &json!(15000.0)),
            Some(("repair cost".to_string(), "15000 IQD".to_string()))
        );
        assert_eq!(
            detail_row("device_name", &json!("iPhone 13")),
            Some(("device name".to_string(), "iPhone 13".to_string()))
        );
    }
}
