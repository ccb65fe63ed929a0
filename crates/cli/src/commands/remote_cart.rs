//! Remote cart inspection.
//!
//! # Usage
//!
//! ```bash
//! bookcart remote-cart
//! ```

use bookcart_checkout::auth::AuthGate;
use bookcart_checkout::state::ShopState;

use super::CommandError;

/// Log the server-side cart of the configured session.
pub async fn run(state: &ShopState) -> Result<(), CommandError> {
    if !state.session().is_authenticated() {
        return Err(CommandError::NotSignedIn);
    }

    let view = state.client().fetch_remote_cart().await?;

    for line in &view.items {
        tracing::info!(
            product_id = %line.product.id,
            name = %line.product.name,
            quantity = line.quantity,
            subtotal = %line.subtotal.map_or_else(|| "-".to_string(), |p| p.to_string()),
            "Remote cart line"
        );
    }

    tracing::info!(
        lines = view.items.len(),
        total_items = view.total_items.unwrap_or(0),
        total_price = %view.total_price.unwrap_or_default(),
        "Remote cart"
    );
    Ok(())
}
