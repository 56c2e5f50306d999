//! Terminal rendering for command results.

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use vitrine_core::api::{AuthSession, Category, Product};
use vitrine_core::session::User;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("render JSON")?;
    println!("{rendered}");
    Ok(())
}

pub fn products_table(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }

    let mut table = table(&["ID", "Name", "SKU", "Price", "Stock", "Category", "Active"]);
    for product in products {
        let category = product
            .category
            .as_ref()
            .map_or(product.category_id.as_str(), |c| c.name.as_str());
        table.add_row(vec![
            product.id.clone(),
            product.name.clone(),
            product.sku.clone(),
            format!("{:.2}", product.price),
            product.stock.to_string(),
            category.to_string(),
            if product.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn categories_table(categories: &[Category]) {
    if categories.is_empty() {
        println!("No categories found.");
        return;
    }

    let mut table = table(&["ID", "Name"]);
    for category in categories {
        table.add_row(vec![category.id.clone(), category.name.clone()]);
    }
    println!("{table}");
}

pub fn users_table(users: &[User]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }

    let mut table = table(&["ID", "Name", "Email", "Role"]);
    for user in users {
        table.add_row(vec![
            user.id.clone(),
            user.display_name(),
            user.email.clone(),
            user.role.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn sessions_table(sessions: &[AuthSession]) {
    if sessions.is_empty() {
        println!("No active sessions.");
        return;
    }

    let mut table = table(&["ID", "Device", "IP", "Created", "Expires"]);
    for session in sessions {
        table.add_row(vec![
            session.id.clone(),
            session.user_agent.clone().unwrap_or_default(),
            session.ip_address.clone().unwrap_or_default(),
            session.created_at.clone().unwrap_or_default(),
            session.expires_at.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}
