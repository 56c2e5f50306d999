//! Product and category commands.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use vitrine_core::api::{ProductInput, ProductQuery};

use crate::cli::App;
use crate::cli::output;

pub async fn list(app: &App, query: &ProductQuery) -> Result<()> {
    app.require_session().await?;
    let products = app.client().list_products(query).await?;
    output::products_table(&products);
    Ok(())
}

pub async fn show(app: &App, id: &str) -> Result<()> {
    app.require_session().await?;
    let product = app.client().get_product(id).await?;
    output::json(&product)
}

pub async fn create(app: &App, file: &Path) -> Result<()> {
    let input = read_input(file)?;
    if input.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        anyhow::bail!("Product name is required");
    }

    app.require_session().await?;
    let product = app.client().create_product(&input).await?;
    eprintln!("Created product {}", product.id);
    output::json(&product)
}

pub async fn update(app: &App, id: &str, file: &Path) -> Result<()> {
    let changes = read_input(file)?;

    app.require_session().await?;
    let product = app.client().update_product(id, &changes).await?;
    eprintln!("Updated product {}", product.id);
    output::json(&product)
}

pub async fn delete(app: &App, id: &str) -> Result<()> {
    app.require_session().await?;
    app.client().delete_product(id).await?;
    println!("Deleted product {id}");
    Ok(())
}

pub async fn categories(app: &App) -> Result<()> {
    app.require_session().await?;
    let categories = app.client().list_categories().await?;
    output::categories_table(&categories);
    Ok(())
}

/// Reads product fields from a JSON file, or stdin for `-`.
fn read_input(file: &Path) -> Result<ProductInput> {
    let contents = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read product JSON from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("read product JSON from {}", file.display()))?
    };

    serde_json::from_str(&contents).context("parse product JSON")
}
