//! Checkout command.
//!
//! # Usage
//!
//! ```bash
//! bookcart checkout --cart cart.json --form form.json
//! ```
//!
//! `cart.json` lists the lines to put in the cart:
//!
//! ```json
//! [{"id": 7, "name": "Dune", "price": "12.50", "quantity": 2}]
//! ```
//!
//! `form.json` holds the checkout form. Missing fields are blank:
//!
//! ```json
//! {
//!   "payment_method": "delivery",
//!   "delivery": {"full_name": "Ada Lovelace", "address": "12 Analytical Row",
//!                "city": "London", "postal_code": "N1 9GU", "country": "UK",
//!                "phone": "+44 20 7946 0000", "email": "ada@example.org"}
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use bookcart_checkout::auth::Navigator;
use bookcart_checkout::cart::{AddOutcome, CartActions};
use bookcart_checkout::state::ShopState;
use bookcart_core::{CheckoutForm, Price, Product, ProductId};
use serde::Deserialize;

use super::{CommandError, LogNavigator, read_json};

/// One line of the cart file.
#[derive(Debug, Deserialize)]
struct CartLine {
    id: ProductId,
    name: String,
    price: Price,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Load the cart, run one checkout attempt and wait for the redirect.
pub async fn run(state: &ShopState, cart_path: &Path, form_path: &Path) -> Result<(), CommandError> {
    let navigator: Arc<dyn Navigator> = Arc::new(LogNavigator);

    let lines: Vec<CartLine> = read_json(cart_path)?;
    let mut form: CheckoutForm = read_json(form_path)?;

    let actions = state.cart_actions(Arc::clone(&navigator));
    load_cart(&actions, &lines)?;

    let cart = state.cart();
    tracing::info!(
        lines = cart.len(),
        items = cart.item_count(),
        total = %cart.total_price(),
        "Cart loaded"
    );

    let reconciler = state.reconciler(navigator);
    let mut states = reconciler.state();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let current = states.borrow_and_update().clone();
            tracing::info!(state = %current, "Checkout progress");
        }
    });

    let result = reconciler.submit(&mut form).await;
    drop(reconciler);
    progress.await?;

    let success = result?;
    tracing::info!(
        attempt = %success.attempt,
        order_number = success.ack.order_number().unwrap_or("-"),
        "{}",
        success.message
    );
    success.navigation.await?;
    Ok(())
}

fn load_cart(actions: &CartActions, lines: &[CartLine]) -> Result<(), CommandError> {
    for line in lines {
        let product = Product::new(line.id, line.name.clone(), line.price);
        if actions.add_to_cart(&product)? == AddOutcome::LoginRequired {
            return Err(CommandError::NotSignedIn);
        }
        if line.quantity != 1 {
            actions.update_quantity(line.id, i64::from(line.quantity))?;
        }
    }
    Ok(())
}
