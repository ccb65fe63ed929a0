//! Checkout scenarios against an in-memory shop.
//!
//! These tests drive the cart store and the reconciler together and check
//! what reaches the backend, what stays in the local cart and which state
//! the attempt ends in.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use bookcart_checkout::auth::Route;
use bookcart_checkout::cart::{AddOutcome, CartError};
use bookcart_checkout::error::NETWORK_ERROR_MESSAGE;
use bookcart_checkout::remote::RemoteError;
use bookcart_checkout::{CheckoutError, SyncStage};
use bookcart_core::{
    CheckoutForm, CheckoutState, FieldErrors, OrderAck, Price, ProductId, ValidationError,
};
use bookcart_integration_tests::{
    FakeShop, ShopCall, TestContext, book, card_form, delivery_form, three_books,
};

fn insufficient_stock() -> RemoteError {
    RemoteError::Server {
        status: 400,
        errors: FieldErrors::single("error", "Insufficient stock"),
    }
}

// =============================================================================
// Cart Store
// =============================================================================

#[test]
fn test_adding_same_book_twice_increments_quantity() {
    let ctx = TestContext::new(FakeShop::new());
    let actions = ctx.actions();
    let emma = book(1, "Emma", 899);

    assert_eq!(actions.add_to_cart(&emma).unwrap(), AddOutcome::Added);
    assert_eq!(actions.add_to_cart(&emma).unwrap(), AddOutcome::Added);

    assert_eq!(ctx.cart.len(), 1);
    assert_eq!(ctx.cart.quantity_of(ProductId::new(1)), 2);
}

#[test]
fn test_total_price_sums_lines() {
    let ctx = TestContext::new(FakeShop::new());
    assert_eq!(ctx.cart.total_price(), Price::ZERO);

    for product in three_books() {
        ctx.cart.add_item(&product).unwrap();
    }
    ctx.cart.set_quantity(ProductId::new(2), 3).unwrap();

    // 8.99 + 3 × 12.50 + 10.99
    assert_eq!(ctx.cart.total_price(), Price::from_cents(5748).unwrap());
    assert_eq!(ctx.cart.item_count(), 5);
}

#[test]
fn test_removing_unknown_book_is_noop() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());

    ctx.actions().remove_from_cart(ProductId::new(99)).unwrap();

    assert_eq!(ctx.cart.len(), 3);
}

#[test]
fn test_set_quantity_zero_removes_line() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());

    ctx.actions().update_quantity(ProductId::new(1), 0).unwrap();
    ctx.actions().update_quantity(ProductId::new(2), -4).unwrap();

    let ids: Vec<_> = ctx.cart.items().iter().map(|item| item.id).collect();
    assert_eq!(ids, [ProductId::new(3)]);
}

#[test]
fn test_unauthenticated_add_performs_no_mutation() {
    let ctx = TestContext::new(FakeShop::new());
    ctx.session.sign_out();
    let changes = ctx.cart.subscribe();

    let outcome = ctx.actions().add_to_cart(&book(1, "Emma", 899)).unwrap();

    assert_eq!(outcome, AddOutcome::LoginRequired);
    assert!(ctx.cart.is_empty());
    assert!(!changes.has_changed().unwrap());
    assert_eq!(ctx.navigator.routes(), [Route::Login]);
}

// =============================================================================
// Preconditions and validation
// =============================================================================

#[tokio::test]
async fn test_empty_cart_never_enters_validating() {
    let ctx = TestContext::new(FakeShop::new());
    let mut states = ctx.reconciler.state();

    let err = ctx.reconciler.submit(&mut delivery_form()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(err.user_message(), "Your cart is empty");
    assert!(!states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), CheckoutState::Idle);
    assert!(ctx.shop.calls().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_checkout_redirects_to_login() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    ctx.session.sign_out();
    let states = ctx.reconciler.state();

    let err = ctx.reconciler.submit(&mut delivery_form()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::NotAuthenticated));
    assert_eq!(ctx.navigator.routes(), [Route::Login]);
    assert!(!states.has_changed().unwrap());
    assert!(ctx.shop.calls().is_empty());
    assert_eq!(ctx.cart.len(), 3);
}

#[tokio::test]
async fn test_short_card_number_fails_without_network() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let mut form = card_form();
    form.card.card_number = "4242424242".to_string();

    let err = ctx.reconciler.submit(&mut form).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Validation(ValidationError::InvalidCardNumber)
    ));
    assert_eq!(err.user_message(), "Invalid card number");
    assert!(ctx.shop.calls().is_empty());
    assert_eq!(ctx.reconciler.current_state(), CheckoutState::Idle);
    assert_eq!(form.card.card_number, "4242424242");
}

#[tokio::test]
async fn test_missing_delivery_field_reported_first() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let mut form = card_form();
    form.delivery.city = "   ".to_string();
    form.card.cvv = String::new();

    let err = ctx.reconciler.submit(&mut form).await.unwrap_err();

    assert_eq!(err.user_message(), "Please fill in all delivery information");
    assert!(ctx.shop.calls().is_empty());
}

// =============================================================================
// Remote failures
// =============================================================================

#[tokio::test]
async fn test_second_add_failure_stops_sync_and_keeps_cart() {
    let shop = FakeShop::new().failing_add(2, insufficient_stock());
    let ctx = TestContext::with_books(shop, &three_books());
    let mut form = delivery_form();

    let err = ctx.reconciler.submit(&mut form).await.unwrap_err();

    assert_eq!(err.user_message(), "Insufficient stock");
    assert_eq!(err.failed_product(), Some(ProductId::new(2)));
    assert!(matches!(
        err.stage(),
        Some(SyncStage::SyncItem { name, .. }) if name == "Dune"
    ));
    assert_eq!(
        ctx.reconciler.current_state(),
        CheckoutState::Failed {
            message: "Insufficient stock".to_string()
        }
    );

    assert_eq!(ctx.shop.adds_for(ProductId::new(1)), 1);
    assert_eq!(ctx.shop.adds_for(ProductId::new(3)), 0);
    assert!(ctx.shop.orders().is_empty());

    assert_eq!(ctx.cart.len(), 3);
    assert!(!ctx.cart.is_frozen());
    assert_eq!(form, delivery_form());
}

#[tokio::test]
async fn test_retry_after_failure_clears_remote_cart_first() {
    let shop = FakeShop::new().failing_add(2, insufficient_stock());
    let ctx = TestContext::with_books(shop, &three_books()[..2]);

    ctx.reconciler.submit(&mut delivery_form()).await.unwrap_err();
    ctx.reconciler.submit(&mut delivery_form()).await.unwrap();

    let calls = ctx.shop.calls();
    let add = |id| ShopCall::Add {
        product_id: ProductId::new(id),
        quantity: 1,
    };
    assert_eq!(
        calls.get(..6).unwrap(),
        [
            ShopCall::Clear,
            add(1),
            add(2),
            ShopCall::Clear,
            add(1),
            add(2)
        ]
    );
    assert!(matches!(calls.get(6), Some(ShopCall::CreateOrder(_))));
    assert!(ctx.cart.is_empty());
}

#[tokio::test]
async fn test_network_failure_on_clear() {
    let shop = FakeShop::new().failing_clear(RemoteError::Network {
        url: "http://127.0.0.1:8000/api/shop/cart/clear/".to_string(),
        message: "connection refused".to_string(),
    });
    let ctx = TestContext::with_books(shop, &three_books());

    let err = ctx.reconciler.submit(&mut delivery_form()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Network { .. }));
    assert_eq!(err.user_message(), NETWORK_ERROR_MESSAGE);
    assert_eq!(err.stage(), Some(&SyncStage::ClearCart));
    assert_eq!(ctx.shop.calls(), [ShopCall::Clear]);
    assert_eq!(ctx.cart.len(), 3);
}

#[tokio::test]
async fn test_order_rejection_renders_field_lines() {
    let mut errors = FieldErrors::new();
    errors.push("postal_code", "Enter a valid postal code.");
    errors.push("non_field_errors", "Cart is empty");
    let shop = FakeShop::new().failing_create(RemoteError::Server {
        status: 400,
        errors,
    });
    let ctx = TestContext::with_books(shop, &three_books());

    let err = ctx.reconciler.submit(&mut delivery_form()).await.unwrap_err();

    assert_eq!(
        err.user_message(),
        "Cart is empty\npostal_code: Enter a valid postal code."
    );
    assert_eq!(err.stage(), Some(&SyncStage::CreateOrder));
    assert_eq!(ctx.cart.len(), 3);
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_delivery_checkout_succeeds_without_card_data() {
    let books = three_books();
    let ctx = TestContext::with_books(FakeShop::new().with_nothing_to_clear(), &books[..2]);
    let mut form = delivery_form();

    let success = ctx.reconciler.submit(&mut form).await.unwrap();

    assert_eq!(
        success.message,
        "Order created successfully! You will pay on delivery."
    );
    assert_eq!(
        ctx.reconciler.current_state(),
        CheckoutState::Succeeded {
            message: success.message.clone()
        }
    );
    assert!(ctx.cart.is_empty());
    assert_eq!(form, CheckoutForm::default());

    let orders = ctx.shop.orders();
    assert_eq!(orders.len(), 1);
    assert!(!orders[0].carries_card_data());
    let body = serde_json::to_value(&orders[0]).unwrap();
    assert_eq!(body["payment_method"], "delivery");
    assert!(body.get("card_number").is_none());
    assert!(body.get("card_cvv").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_card_checkout_transmits_card_fields() {
    let ack: OrderAck = serde_json::from_value(serde_json::json!({
        "message": "Order created successfully",
        "order": {"id": 12, "order_number": "ORD-20250101-0012", "total_price": "31.48"}
    }))
    .unwrap();
    let ctx = TestContext::with_books(FakeShop::new().acknowledging(ack), &three_books());

    let success = ctx.reconciler.submit(&mut card_form()).await.unwrap();

    assert_eq!(
        success.message,
        "Order created successfully! Payment processed."
    );
    assert_eq!(success.ack.order_number(), Some("ORD-20250101-0012"));
    let order = &ctx.shop.orders()[0];
    assert_eq!(order.card_number.as_deref(), Some("4242424242424242"));
    assert_eq!(order.card_expiry.as_deref(), Some("12/30"));
    assert_eq!(order.card_cvv.as_deref(), Some("123"));
}

#[tokio::test(start_paused = true)]
async fn test_navigation_waits_for_redirect_delay() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let started = tokio::time::Instant::now();

    let success = ctx.reconciler.submit(&mut delivery_form()).await.unwrap();
    assert!(ctx.navigator.routes().is_empty());

    success.navigation.await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(ctx.navigator.routes(), [Route::OrderComplete]);
}

#[tokio::test]
async fn test_state_progresses_through_sync() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let pause = ctx.shop.pause_add(2);
    let states = ctx.reconciler.state();
    let mut form = delivery_form();

    let (result, ()) = tokio::join!(ctx.reconciler.submit(&mut form), async {
        pause.reached.notified().await;
        assert_eq!(
            *states.borrow(),
            CheckoutState::SyncingCart {
                synced: 1,
                total: 3
            }
        );
        pause.release.notify_one();
    });

    result.unwrap();
    assert_eq!(states.borrow().name(), "succeeded");
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_cart_frozen_during_checkout() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let pause = ctx.shop.pause_add(1);
    let actions = ctx.actions();
    let mut form = delivery_form();

    let (result, ()) = tokio::join!(ctx.reconciler.submit(&mut form), async {
        pause.reached.notified().await;

        assert_eq!(
            actions.add_to_cart(&book(4, "Persuasion", 799)),
            Err(CartError::CheckoutInProgress)
        );
        assert_eq!(
            actions.remove_from_cart(ProductId::new(1)),
            Err(CartError::CheckoutInProgress)
        );
        assert_eq!(
            actions.update_quantity(ProductId::new(2), 9),
            Err(CartError::CheckoutInProgress)
        );
        assert_eq!(ctx.cart.len(), 3);
        assert_eq!(ctx.cart.quantity_of(ProductId::new(2)), 1);

        let second = ctx.reconciler.submit(&mut delivery_form()).await;
        assert!(matches!(second, Err(CheckoutError::AlreadyInProgress)));

        pause.release.notify_one();
    });

    result.unwrap();
    assert!(ctx.cart.is_empty());
    assert_eq!(ctx.shop.orders().len(), 1);
    assert!(actions.add_to_cart(&book(4, "Persuasion", 799)).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_attempt_releases_cart_and_state() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let _pause = ctx.shop.pause_add(1);
    let mut form = delivery_form();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), ctx.reconciler.submit(&mut form)).await;

    assert!(abandoned.is_err());
    assert_eq!(ctx.reconciler.current_state(), CheckoutState::Idle);
    assert!(!ctx.cart.is_frozen());
    assert_eq!(ctx.cart.len(), 3);

    ctx.reconciler.submit(&mut form).await.unwrap();

    let calls = ctx.shop.calls();
    let add = |id| ShopCall::Add {
        product_id: ProductId::new(id),
        quantity: 1,
    };
    assert_eq!(
        calls.get(..6).unwrap(),
        [
            ShopCall::Clear,
            add(1),
            ShopCall::Clear,
            add(1),
            add(2),
            add(3)
        ]
    );
    assert_eq!(ctx.shop.orders().len(), 1);
    assert!(ctx.cart.is_empty());
}

#[tokio::test]
async fn test_cart_held_elsewhere_is_not_checked_out() {
    let ctx = TestContext::with_books(FakeShop::new(), &three_books());
    let states = ctx.reconciler.state();
    let hold = ctx.cart.freeze().unwrap();

    let err = ctx.reconciler.submit(&mut delivery_form()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::AlreadyInProgress));
    assert!(!states.has_changed().unwrap());
    assert!(ctx.shop.calls().is_empty());
    assert!(ctx.cart.is_frozen());

    drop(hold);
    assert!(!ctx.cart.is_frozen());
}
