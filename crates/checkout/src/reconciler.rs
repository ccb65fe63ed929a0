//! Checkout reconciler.
//!
//! Drives one checkout attempt through
//! `Validating → SyncingCart → CreatingOrder → Succeeded | Failed`:
//!
//! 1. freeze the local cart and refuse an empty one
//! 2. validate the form locally
//! 3. clear the server-side cart, then push every frozen line one at a time,
//!    in cart order
//! 4. create the order from the server-side cart
//! 5. on success clear the local cart, reset the form and schedule the
//!    navigation to the order-complete page
//!
//! A remote failure aborts the attempt. Lines already pushed stay on the
//! server (there is no rollback) and the local cart keeps every line, so the
//! next attempt starts over from the clear step. Dropping the `submit` future
//! mid-attempt releases the freeze and puts the state back to `Idle`.

use std::sync::Arc;
use std::time::Duration;

use bookcart_core::{
    CartItem, CheckoutAttemptId, CheckoutForm, CheckoutState, OrderAck, OrderPayload,
    ValidatedCheckout,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span, warn};

use crate::auth::{AuthGate, Navigator, Route};
use crate::cart::CartStore;
use crate::error::{CheckoutError, SyncStage, add_breadcrumb};
use crate::remote::{ClearOutcome, OrderSubmitter, RemoteCart};

/// Default delay before navigating to the order-complete page.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Result of a successful attempt.
#[derive(Debug)]
pub struct CheckoutSuccess {
    /// Message shown to the user.
    pub message: String,
    /// What the backend returned for the order.
    pub ack: OrderAck,
    /// Identifier of the attempt, as logged.
    pub attempt: CheckoutAttemptId,
    /// Deferred navigation to the order-complete page.
    pub navigation: JoinHandle<()>,
}

/// Runs checkout attempts against a remote cart and order endpoint.
pub struct Reconciler<R, O> {
    cart: CartStore,
    auth: Arc<dyn AuthGate>,
    remote: R,
    orders: O,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<CheckoutState>,
    redirect_delay: Duration,
}

impl<R, O> Reconciler<R, O>
where
    R: RemoteCart,
    O: OrderSubmitter,
{
    /// Create an idle reconciler.
    #[must_use]
    pub fn new(
        cart: CartStore,
        auth: Arc<dyn AuthGate>,
        remote: R,
        orders: O,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            cart,
            auth,
            remote,
            orders,
            navigator,
            state,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }

    /// Set the delay before navigating away after a successful order.
    #[must_use]
    pub const fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Observe state changes.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn current_state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    /// The cart this reconciler checks out.
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Run one checkout attempt with the values in `form`.
    ///
    /// On success the form is reset to its initial values; on failure it is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] if a precondition fails, the form is invalid,
    /// or a remote call fails.
    pub async fn submit(&self, form: &mut CheckoutForm) -> Result<CheckoutSuccess, CheckoutError> {
        let attempt = CheckoutAttemptId::generate();
        self.run(attempt, form)
            .instrument(info_span!("checkout", attempt = %attempt))
            .await
    }

    async fn run(
        &self,
        attempt: CheckoutAttemptId,
        form: &mut CheckoutForm,
    ) -> Result<CheckoutSuccess, CheckoutError> {
        let attempt_id = attempt.to_string();
        let attempt_data = [("attempt", attempt_id.as_str())];
        add_breadcrumb("checkout", "Checkout submitted", Some(attempt_data.as_slice()));

        if let Err(err) = self.check_preconditions() {
            err.report(attempt);
            return Err(err);
        }

        // The emptiness check reads the frozen lines.
        let Ok(freeze) = self.cart.freeze() else {
            let err = CheckoutError::AlreadyInProgress;
            err.report(attempt);
            return Err(err);
        };
        let items = freeze.items();
        if items.is_empty() {
            let err = CheckoutError::EmptyCart;
            err.report(attempt);
            return Err(err);
        }

        if !self.begin() {
            let err = CheckoutError::AlreadyInProgress;
            err.report(attempt);
            return Err(err);
        }
        let _guard = AttemptGuard {
            state: &self.state,
        };

        let validated = match form.validate() {
            Ok(validated) => validated,
            Err(e) => {
                self.state.send_replace(CheckoutState::Idle);
                let err = CheckoutError::from(e);
                err.report(attempt);
                return Err(err);
            }
        };

        match self.place_order(&items, &validated).await {
            Ok(ack) => {
                freeze.clear_and_release();
                form.reset();

                let message = validated.payment_method.success_message().to_string();
                self.state.send_replace(CheckoutState::Succeeded {
                    message: message.clone(),
                });
                info!(
                    payment_method = validated.payment_method.as_str(),
                    order_number = ack.order_number().unwrap_or("-"),
                    "Order created"
                );
                add_breadcrumb("checkout", "Order created", Some(attempt_data.as_slice()));

                Ok(CheckoutSuccess {
                    message,
                    ack,
                    attempt,
                    navigation: self.schedule_navigation(),
                })
            }
            Err(err) => {
                drop(freeze);
                self.state.send_replace(CheckoutState::Failed {
                    message: err.user_message(),
                });
                err.report(attempt);
                Err(err)
            }
        }
    }

    fn check_preconditions(&self) -> Result<(), CheckoutError> {
        if self.state.borrow().is_working() {
            return Err(CheckoutError::AlreadyInProgress);
        }
        if !self.auth.is_authenticated() {
            self.navigator.navigate(Route::Login);
            return Err(CheckoutError::NotAuthenticated);
        }
        Ok(())
    }

    /// Move to `Validating` unless another attempt got there first.
    fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_working() {
                return false;
            }
            *state = CheckoutState::Validating;
            true
        })
    }

    /// Push the cart to the backend and create the order.
    async fn place_order(
        &self,
        items: &[CartItem],
        validated: &ValidatedCheckout,
    ) -> Result<OrderAck, CheckoutError> {
        let total = items.len();
        self.state
            .send_replace(CheckoutState::SyncingCart { synced: 0, total });
        add_breadcrumb("checkout", "Clearing remote cart", None);

        let cleared = self
            .remote
            .clear_remote_cart()
            .await
            .map_err(|e| CheckoutError::from_remote(SyncStage::ClearCart, e))?;
        if cleared == ClearOutcome::NothingToClear {
            info!("No remote cart to clear");
        }

        for (index, item) in items.iter().enumerate() {
            let product_id = item.id.to_string();
            let quantity = item.quantity.to_string();
            let item_data = [
                ("product_id", product_id.as_str()),
                ("quantity", quantity.as_str()),
            ];
            add_breadcrumb("checkout", "Syncing cart item", Some(item_data.as_slice()));

            self.remote
                .add_remote_item(item.id, item.quantity)
                .await
                .map_err(|e| {
                    CheckoutError::from_remote(
                        SyncStage::SyncItem {
                            product_id: item.id,
                            name: item.name.clone(),
                        },
                        e,
                    )
                })?;

            self.state.send_replace(CheckoutState::SyncingCart {
                synced: index + 1,
                total,
            });
        }

        self.state.send_replace(CheckoutState::CreatingOrder);
        let order_data = [("payment_method", validated.payment_method.as_str())];
        add_breadcrumb("checkout", "Creating order", Some(order_data.as_slice()));

        let payload = OrderPayload::from(validated);
        self.orders
            .create_order(&payload)
            .await
            .map_err(|e| CheckoutError::from_remote(SyncStage::CreateOrder, e))
    }

    fn schedule_navigation(&self) -> JoinHandle<()> {
        let navigator = Arc::clone(&self.navigator);
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(Route::OrderComplete);
        })
    }
}

/// Puts a running attempt back to `Idle` if its future is dropped before it
/// reaches a terminal state.
struct AttemptGuard<'a> {
    state: &'a watch::Sender<CheckoutState>,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let abandoned = self.state.send_if_modified(|state| {
            if !state.is_working() {
                return false;
            }
            *state = CheckoutState::Idle;
            true
        });
        if abandoned {
            warn!("Checkout attempt dropped before finishing");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bookcart_core::{
        DeliveryInfo, FieldErrors, PaymentMethod, Price, Product, ProductId, ValidationError,
    };
    use secrecy::SecretString;

    use super::*;
    use crate::auth::SessionAuth;
    use crate::remote::RemoteError;

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        reject_create: bool,
    }

    #[async_trait]
    impl RemoteCart for Arc<FakeBackend> {
        async fn clear_remote_cart(&self) -> Result<ClearOutcome, RemoteError> {
            self.calls.lock().unwrap().push("clear".to_string());
            Ok(ClearOutcome::Cleared)
        }

        async fn add_remote_item(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> Result<(), RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add {product_id}x{quantity}"));
            Ok(())
        }
    }

    #[async_trait]
    impl OrderSubmitter for Arc<FakeBackend> {
        async fn create_order(&self, _payload: &OrderPayload) -> Result<OrderAck, RemoteError> {
            self.calls.lock().unwrap().push("create".to_string());
            if self.reject_create {
                return Err(RemoteError::Server {
                    status: 400,
                    errors: FieldErrors::single("error", "Cart is empty"),
                });
            }
            Ok(OrderAck::default())
        }
    }

    #[derive(Default)]
    struct Routes(Mutex<Vec<Route>>);

    impl Navigator for Routes {
        fn navigate(&self, route: Route) {
            self.0.lock().unwrap().push(route);
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            payment_method: PaymentMethod::CashOnDelivery,
            delivery: DeliveryInfo {
                full_name: "Ada Lovelace".to_string(),
                address: "12 Analytical Row".to_string(),
                city: "London".to_string(),
                postal_code: "N1 9GU".to_string(),
                country: "UK".to_string(),
                phone: "+44 20 7946 0000".to_string(),
                email: "ada@example.org".to_string(),
            },
            ..CheckoutForm::default()
        }
    }

    fn setup(
        backend: &Arc<FakeBackend>,
    ) -> (Reconciler<Arc<FakeBackend>, Arc<FakeBackend>>, Arc<Routes>) {
        let routes = Arc::new(Routes::default());
        let cart = CartStore::new();
        cart.add_item(&Product::new(
            ProductId::new(1),
            "Emma",
            Price::from_cents(899).unwrap(),
        ))
        .unwrap();
        let reconciler = Reconciler::new(
            cart,
            Arc::new(SessionAuth::with_token(SecretString::from("token"))),
            Arc::clone(backend),
            Arc::clone(backend),
            routes.clone(),
        );
        (reconciler, routes)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_cart_and_navigates_after_delay() {
        let backend = Arc::new(FakeBackend::default());
        let (reconciler, routes) = setup(&backend);
        let mut form = form();

        let success = reconciler.submit(&mut form).await.unwrap();

        assert_eq!(
            success.message,
            "Order created successfully! You will pay on delivery."
        );
        assert!(reconciler.cart().is_empty());
        assert!(!reconciler.cart().is_frozen());
        assert_eq!(form, CheckoutForm::default());
        assert_eq!(
            *backend.calls.lock().unwrap(),
            ["clear", "add 1x1", "create"]
        );
        assert!(matches!(
            reconciler.current_state(),
            CheckoutState::Succeeded { .. }
        ));

        assert!(routes.0.lock().unwrap().is_empty());
        success.navigation.await.unwrap();
        assert_eq!(*routes.0.lock().unwrap(), [Route::OrderComplete]);
    }

    #[tokio::test]
    async fn test_failed_order_keeps_cart_and_form() {
        let backend = Arc::new(FakeBackend {
            reject_create: true,
            ..FakeBackend::default()
        });
        let (reconciler, _) = setup(&backend);
        let mut form = form();

        let err = reconciler.submit(&mut form).await.unwrap_err();

        assert_eq!(err.user_message(), "Cart is empty");
        assert_eq!(err.stage(), Some(&SyncStage::CreateOrder));
        assert_eq!(reconciler.cart().len(), 1);
        assert!(!reconciler.cart().is_frozen());
        assert_eq!(form, self::form());
        assert_eq!(
            reconciler.current_state(),
            CheckoutState::Failed {
                message: "Cart is empty".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_form_returns_to_idle() {
        let backend = Arc::new(FakeBackend::default());
        let (reconciler, _) = setup(&backend);
        let mut form = form();
        form.payment_method = PaymentMethod::Card;
        form.card.card_number = "4242424242".to_string();

        let err = reconciler.submit(&mut form).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::InvalidCardNumber)
        ));
        assert_eq!(reconciler.current_state(), CheckoutState::Idle);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_channel_reports_progress() {
        let backend = Arc::new(FakeBackend::default());
        let (reconciler, _) = setup(&backend);
        let mut rx = reconciler.state();

        reconciler.submit(&mut form()).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().name(), "succeeded");
    }

    /// Signed in, but empties the cart while being asked.
    struct ClearsCartOnCheck(CartStore);

    impl AuthGate for ClearsCartOnCheck {
        fn is_authenticated(&self) -> bool {
            self.0.clear().unwrap();
            true
        }
    }

    #[tokio::test]
    async fn test_cart_emptied_before_freeze_is_refused() {
        let backend = Arc::new(FakeBackend::default());
        let (reconciler, routes) = setup(&backend);
        let reconciler = Reconciler {
            auth: Arc::new(ClearsCartOnCheck(reconciler.cart().clone())),
            ..reconciler
        };
        let states = reconciler.state();

        let err = reconciler.submit(&mut form()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(!states.has_changed().unwrap());
        assert!(backend.calls.lock().unwrap().is_empty());
        assert!(!reconciler.cart().is_frozen());
        assert!(routes.0.lock().unwrap().is_empty());
    }
}
