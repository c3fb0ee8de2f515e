//! `cart` subcommands.
//!
//! Every invocation starts from a fresh `GET /cart`, since the server owns
//! the cart and nothing is kept between runs apart from the token and the
//! image side-table.

use std::fmt::Write as _;

use redseam_core::{CustomerDetails, LineItem, ProductId};
use redseam_storefront::cart::{CartEvent, CartSession, CartTotals, Receipt};
use tokio::sync::broadcast;

use super::{CliError, Context};

#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context) -> Result<(), CliError> {
    let session = ctx.cart_session();
    let items = session.load_all().await?;
    print!("{}", render_cart(&items, &session.totals().await));
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn add(
    ctx: &Context,
    id: i32,
    quantity: i64,
    color: &str,
    size: &str,
    image: Option<&str>,
) -> Result<(), CliError> {
    let product_id = ProductId::new(id);
    let image = match image {
        Some(url) => Some(url.to_string()),
        None => product_image(ctx, product_id, color).await,
    };

    let session = ctx.cart_session();
    let item = session
        .add_item(product_id, quantity, color, size, image.as_deref())
        .await?;

    println!("Added {} x {} ({}, {})", quantity, item.name, item.color, item.size);
    print_current(&session).await;
    Ok(())
}

pub async fn set(
    ctx: &Context,
    id: i32,
    quantity: i64,
    color: &str,
    size: &str,
) -> Result<(), CliError> {
    let session = ctx.cart_session();
    session.load_all().await?;
    session
        .set_quantity(ProductId::new(id), quantity, color, size)
        .await?;
    print_current(&session).await;
    Ok(())
}

/// Step a quantity up or down and wait for the debounced update to land.
pub async fn step(
    ctx: &Context,
    id: i32,
    color: &str,
    size: &str,
    delta: i8,
) -> Result<(), CliError> {
    let session = ctx.cart_session();
    session.load_all().await?;

    let mut events = session.subscribe();
    let product_id = ProductId::new(id);
    if delta > 0 {
        session.increase_quantity(product_id, color, size).await?;
    } else {
        session.decrease_quantity(product_id, color, size).await?;
    }
    session.flush().await;
    background_failure(&mut events)?;

    print_current(&session).await;
    Ok(())
}

pub async fn remove(ctx: &Context, id: i32, color: &str, size: &str) -> Result<(), CliError> {
    let session = ctx.cart_session();
    session.load_all().await?;
    session.remove_item(ProductId::new(id), color, size).await?;
    print_current(&session).await;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn checkout(ctx: &Context, details: &CustomerDetails) -> Result<(), CliError> {
    let session = ctx.cart_session();
    session.load_all().await?;
    let receipt = session.checkout(details).await?;
    print!("{}", render_receipt(&receipt));
    Ok(())
}

/// Image for the chosen color, looked up on the product page.
async fn product_image(ctx: &Context, product_id: ProductId, color: &str) -> Option<String> {
    match ctx.client.get_product(product_id).await {
        Ok(product) => product.image_for_color(color).map(String::from),
        Err(e) => {
            tracing::warn!(product_id = %product_id, error = %e, "Could not look up product image");
            None
        }
    }
}

/// First failure reported by a debounced update, if any.
fn background_failure(events: &mut broadcast::Receiver<CartEvent>) -> Result<(), CliError> {
    while let Ok(event) = events.try_recv() {
        match event {
            CartEvent::Error(message) => return Err(CliError::Background(message)),
            CartEvent::RedirectToLogin => {
                return Err(redseam_storefront::error::CartError::Unauthenticated.into());
            }
            CartEvent::Updated(_) | CartEvent::OpenCartPanel => {}
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn print_current(session: &CartSession) {
    let snapshot = session.snapshot().await;
    print!("{}", render_cart(&snapshot.items, &snapshot.totals));
}

fn render_cart(items: &[LineItem], totals: &CartTotals) -> String {
    let mut out = String::new();
    if items.is_empty() {
        out.push_str("Your cart is empty\n");
        return out;
    }

    let _ = writeln!(out, "Shopping cart ({})", totals.item_count);
    for item in items {
        let _ = writeln!(
            out,
            "  #{:<5} {:<32} {:<8} {:<4} {:>2} x {:>10} = {:>10}",
            item.product_id.to_string(),
            item.name,
            item.color,
            item.size,
            item.quantity.get(),
            item.unit_price.to_string(),
            item.line_total().to_string(),
        );
    }
    let _ = writeln!(out, "Items subtotal {:>12}", totals.subtotal.to_string());
    let _ = writeln!(out, "Delivery       {:>12}", totals.delivery_fee.to_string());
    let _ = writeln!(out, "Total          {:>12}", totals.total.to_string());
    out
}

fn render_receipt(receipt: &Receipt) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Congrats! Your order is placed successfully.");
    let _ = writeln!(out, "Order {}", receipt.id);
    let _ = writeln!(
        out,
        "{} {} <{}>",
        receipt.customer.name, receipt.customer.surname, receipt.customer.email
    );
    let _ = writeln!(out, "{} {}", receipt.customer.address, receipt.customer.zipcode);
    out.push_str(&render_cart(&receipt.items, &receipt.totals));
    for failed in &receipt.failed_removals {
        let _ = writeln!(out, "warning: {} is still in the server cart: {}", failed.key, failed.error);
    }
    out
}
