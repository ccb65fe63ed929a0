//! Integration tests for Bookcart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookcart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_reconciler` - checkout scenarios against an in-memory shop
//! - `shop_api_client` - the HTTP client and a full checkout against a mock server
//!
//! This library holds the shared fixtures: [`FakeShop`] records every remote
//! call and can be scripted to fail or pause, [`RecordingNavigator`] records
//! navigation, and [`TestContext`] wires them to a [`Reconciler`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bookcart_checkout::auth::{Navigator, Route, SessionAuth};
use bookcart_checkout::cart::{CartActions, CartStore};
use bookcart_checkout::remote::{ClearOutcome, OrderSubmitter, RemoteCart, RemoteError};
use bookcart_checkout::Reconciler;
use bookcart_core::{
    CardDetails, CheckoutForm, DeliveryInfo, OrderAck, OrderPayload, PaymentMethod, Price,
    Product, ProductId,
};
use secrecy::SecretString;
use tokio::sync::Notify;

// =============================================================================
// Fake shop backend
// =============================================================================

/// A remote call as the fake shop saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopCall {
    Clear,
    Add { product_id: ProductId, quantity: u32 },
    CreateOrder(OrderPayload),
}

/// In-memory shop backend implementing both remote roles.
///
/// Clones share the call log and the script.
#[derive(Clone, Default)]
pub struct FakeShop {
    inner: Arc<FakeShopInner>,
}

#[derive(Default)]
struct FakeShopInner {
    calls: Mutex<Vec<ShopCall>>,
    script: Mutex<Script>,
}

#[derive(Default)]
struct Script {
    nothing_to_clear: bool,
    fail_clear: Option<RemoteError>,
    /// Fail the add call with this 1-based number, once.
    fail_add: Option<(usize, RemoteError)>,
    fail_create: Option<RemoteError>,
    pause_add: Option<(usize, Arc<Notify>, Arc<Notify>)>,
    ack: OrderAck,
    adds_seen: usize,
}

/// Handles for a paused add call.
pub struct AddPause {
    /// Notified when the paused call is reached.
    pub reached: Arc<Notify>,
    /// Notify to let the paused call continue.
    pub release: Arc<Notify>,
}

impl FakeShop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the clear call with "nothing to clear".
    #[must_use]
    pub fn with_nothing_to_clear(self) -> Self {
        self.script().nothing_to_clear = true;
        self
    }

    /// Fail the next clear call.
    #[must_use]
    pub fn failing_clear(self, error: RemoteError) -> Self {
        self.script().fail_clear = Some(error);
        self
    }

    /// Fail the `nth` add call (1-based, counted across attempts), once.
    #[must_use]
    pub fn failing_add(self, nth: usize, error: RemoteError) -> Self {
        self.script().fail_add = Some((nth, error));
        self
    }

    /// Fail the next create-order call.
    #[must_use]
    pub fn failing_create(self, error: RemoteError) -> Self {
        self.script().fail_create = Some(error);
        self
    }

    /// Acknowledge orders with `ack`.
    #[must_use]
    pub fn acknowledging(self, ack: OrderAck) -> Self {
        self.script().ack = ack;
        self
    }

    /// Hold the `nth` add call until released.
    #[must_use]
    pub fn pause_add(&self, nth: usize) -> AddPause {
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        self.script().pause_add = Some((nth, Arc::clone(&reached), Arc::clone(&release)));
        AddPause { reached, release }
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ShopCall> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many add calls were issued for `product_id`.
    #[must_use]
    pub fn adds_for(&self, product_id: ProductId) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ShopCall::Add { product_id: id, .. } if *id == product_id))
            .count()
    }

    /// Payloads of every create-order call.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderPayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ShopCall::CreateOrder(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ShopCall) {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteCart for FakeShop {
    async fn clear_remote_cart(&self) -> Result<ClearOutcome, RemoteError> {
        self.record(ShopCall::Clear);
        let mut script = self.script();
        if let Some(error) = script.fail_clear.take() {
            return Err(error);
        }
        Ok(if script.nothing_to_clear {
            ClearOutcome::NothingToClear
        } else {
            ClearOutcome::Cleared
        })
    }

    async fn add_remote_item(&self, product_id: ProductId, quantity: u32) -> Result<(), RemoteError> {
        self.record(ShopCall::Add {
            product_id,
            quantity,
        });

        let (failure, pause) = {
            let mut script = self.script();
            script.adds_seen += 1;
            let seen = script.adds_seen;
            let failure = match script.fail_add.take() {
                Some((nth, error)) if nth == seen => Some(error),
                other => {
                    script.fail_add = other;
                    None
                }
            };
            let pause = match &script.pause_add {
                Some((nth, reached, release)) if *nth == seen => {
                    Some((Arc::clone(reached), Arc::clone(release)))
                }
                _ => None,
            };
            (failure, pause)
        };

        if let Some((reached, release)) = pause {
            reached.notify_one();
            release.notified().await;
        }

        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl OrderSubmitter for FakeShop {
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderAck, RemoteError> {
        self.record(ShopCall::CreateOrder(payload.clone()));
        let mut script = self.script();
        if let Some(error) = script.fail_create.take() {
            return Err(error);
        }
        Ok(script.ack.clone())
    }
}

// =============================================================================
// Navigation
// =============================================================================

/// Navigator that records every route.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}

// =============================================================================
// Test context
// =============================================================================

/// A signed-in session, an empty cart and a reconciler over a [`FakeShop`].
pub struct TestContext {
    pub shop: FakeShop,
    pub session: SessionAuth,
    pub cart: CartStore,
    pub navigator: RecordingNavigator,
    pub reconciler: Reconciler<FakeShop, FakeShop>,
}

impl TestContext {
    #[must_use]
    pub fn new(shop: FakeShop) -> Self {
        let session = SessionAuth::with_token(SecretString::from("9944b09199c62bcf9418ad846dd0e4bb"));
        let cart = CartStore::new();
        let navigator = RecordingNavigator::default();
        let reconciler = Reconciler::new(
            cart.clone(),
            Arc::new(session.clone()),
            shop.clone(),
            shop.clone(),
            Arc::new(navigator.clone()),
        );

        Self {
            shop,
            session,
            cart,
            navigator,
            reconciler,
        }
    }

    /// Context whose cart holds one unit of each of `books`.
    #[must_use]
    pub fn with_books(shop: FakeShop, books: &[Product]) -> Self {
        let ctx = Self::new(shop);
        for book in books {
            let _ = ctx.cart.add_item(book);
        }
        ctx
    }

    /// Gated cart actions over this context's cart and session.
    #[must_use]
    pub fn actions(&self) -> CartActions {
        CartActions::new(
            self.cart.clone(),
            Arc::new(self.session.clone()),
            Arc::new(self.navigator.clone()),
        )
    }
}

// =============================================================================
// Sample data
// =============================================================================

/// A book priced in cents.
#[must_use]
pub fn book(id: i32, name: &str, cents: i64) -> Product {
    let price = Price::from_cents(cents).unwrap_or(Price::ZERO);
    Product::new(ProductId::new(id), name, price)
}

/// Three distinct books.
#[must_use]
pub fn three_books() -> Vec<Product> {
    vec![
        book(1, "Emma", 899),
        book(2, "Dune", 1250),
        book(3, "Middlemarch", 1099),
    ]
}

/// Complete delivery details.
#[must_use]
pub fn delivery() -> DeliveryInfo {
    DeliveryInfo {
        full_name: "Ada Lovelace".to_string(),
        address: "12 Analytical Row".to_string(),
        city: "London".to_string(),
        postal_code: "N1 9GU".to_string(),
        country: "UK".to_string(),
        phone: "+44 20 7946 0000".to_string(),
        email: "ada@example.org".to_string(),
    }
}

/// A valid form paying on delivery.
#[must_use]
pub fn delivery_form() -> CheckoutForm {
    CheckoutForm {
        payment_method: PaymentMethod::CashOnDelivery,
        delivery: delivery(),
        card: CardDetails::default(),
    }
}

/// A valid form paying by card.
#[must_use]
pub fn card_form() -> CheckoutForm {
    CheckoutForm {
        payment_method: PaymentMethod::Card,
        delivery: delivery(),
        card: CardDetails {
            card_number: "4242424242424242".to_string(),
            card_name: "Ada Lovelace".to_string(),
            expiry_date: "12/30".to_string(),
            cvv: "123".to_string(),
        },
    }
}
