//! `products` and `product`.

use std::fmt::Write as _;

use redseam_core::ProductId;
use redseam_storefront::api::{Product, ProductPage, ProductQuery};

use super::{CliError, Context};

#[allow(clippy::print_stdout)]
pub async fn products(ctx: &Context, query: &ProductQuery) -> Result<(), CliError> {
    let page = ctx.client.get_products(query).await?;
    print!("{}", render_page(&page));
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn product(ctx: &Context, id: i32) -> Result<(), CliError> {
    let product = ctx.client.get_product(ProductId::new(id)).await?;
    print!("{}", render_product(&product));
    Ok(())
}

fn render_page(page: &ProductPage) -> String {
    let mut out = String::new();
    if page.data.is_empty() {
        out.push_str("No products found\n");
    }
    for product in &page.data {
        let _ = writeln!(out, "#{:<5} {:<40} {}", product.id, product.name, product.price);
    }
    if let Some(meta) = page.meta {
        let _ = writeln!(
            out,
            "Page {} of {} ({} products)",
            meta.current_page, meta.last_page, meta.total
        );
    }
    out
}

fn render_product(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", product.name, product.id);
    let _ = writeln!(out, "Price:  {}", product.price);
    if let Some(brand) = &product.brand {
        let _ = writeln!(out, "Brand:  {}", brand.name());
    }
    if !product.colors.is_empty() {
        let _ = writeln!(out, "Colors: {}", product.colors.join(", "));
    }
    if !product.sizes.is_empty() {
        let _ = writeln!(out, "Sizes:  {}", product.sizes.join(", "));
    }
    if let Some(description) = product.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "\n{}", description.trim());
    }
    out
}
