//! `PostgreSQL` repository behaviour against a real database.
//!
//! These tests require a scratch database; they apply the migrations
//! themselves:
//!
//! ```bash
//! CARTLINE_TEST_DATABASE_URL=postgres://localhost/cartline_test \
//!     cargo test -p cartline-integration-tests --test postgres_repositories -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cartline_core::{
    Email, Money, MoneyError, OrderNumberGenerator, OrderStatus, PaymentMethod, SessionToken,
    UserRole,
};
use cartline_server::db::{self, Repositories, RepositoryError};
use cartline_server::models::{
    Address, CartMutation, CartOwner, CartRuleError, LineItem, NewOrder, NewProduct, NewUser,
    Product, ProductUpdate,
};
use chrono::{Duration, Utc};
use secrecy::SecretString;

async fn repositories() -> Repositories {
    let url = std::env::var("CARTLINE_TEST_DATABASE_URL")
        .expect("CARTLINE_TEST_DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Repositories::postgres(pool)
}

/// Suffix that keeps rows from separate runs apart.
fn unique() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

async fn product(repos: &Repositories, stock: u32) -> Product {
    repos
        .products
        .create(&NewProduct {
            name: format!("Widget {}", unique()),
            description: "Test widget".to_owned(),
            price: Money::from_cents(1999),
            category: "test".to_owned(),
            image_url: "https://img.example.com/widget.png".to_owned(),
            stock,
        })
        .await
        .unwrap()
}

fn address() -> Address {
    Address {
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        address: "12 Analytical Row".to_owned(),
        city: "London".to_owned(),
        state: "LDN".to_owned(),
        zip_code: "N1 9GU".to_owned(),
        country: "GB".to_owned(),
    }
}

#[tokio::test]
#[ignore = "Requires CARTLINE_TEST_DATABASE_URL"]
async fn test_stock_never_goes_negative() {
    let repos = repositories().await;
    let widget = product(&repos, 2).await;

    assert!(matches!(
        repos.products.adjust_stock(widget.id, -3).await,
        Err(RepositoryError::InsufficientStock { available: 2 })
    ));
    assert_eq!(repos.products.adjust_stock(widget.id, -2).await.unwrap(), 0);
    assert_eq!(repos.products.adjust_stock(widget.id, 5).await.unwrap(), 5);

    repos.products.deactivate(widget.id).await.unwrap();
    assert!(repos.products.find_by_id(widget.id).await.unwrap().is_none());
    // Restores still reach inactive products.
    assert_eq!(repos.products.adjust_stock(widget.id, 1).await.unwrap(), 6);
}

#[tokio::test]
#[ignore = "Requires CARTLINE_TEST_DATABASE_URL"]
async fn test_one_cart_per_owner_and_reaping() {
    let repos = repositories().await;
    let widget = product(&repos, 10).await;
    let owner = CartOwner::Session(SessionToken::generate());
    let now = Utc::now();
    let ttl = Duration::hours(24);

    let cart = repos.carts.get_or_create(&owner, now, ttl).await.unwrap();
    let again = repos.carts.get_or_create(&owner, now, ttl).await.unwrap();
    assert_eq!(cart.id, again.id);

    let cart = repos
        .carts
        .apply(
            cart.id,
            CartMutation::Add {
                item: LineItem::snapshot(&widget, 3),
                available_stock: widget.stock,
            },
            now,
            ttl,
        )
        .await
        .unwrap();
    assert_eq!(cart.total_amount, Money::from_cents(5997));

    let later = now + Duration::hours(25);
    assert!(repos.carts.find_active(&owner, later).await.unwrap().is_none());
    assert!(repos.carts.reap_expired(later).await.unwrap() >= 1);
    assert!(repos.carts.find_active(&owner, now).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires CARTLINE_TEST_DATABASE_URL"]
async fn test_cart_total_over_column_precision_is_rejected() {
    let repos = repositories().await;
    let mut priciest = product(&repos, 10).await;
    priciest = repos
        .products
        .update(
            priciest.id,
            &ProductUpdate {
                price: Some(Money::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(priciest.price, Money::MAX);

    let owner = CartOwner::Session(SessionToken::generate());
    let now = Utc::now();
    let ttl = Duration::hours(24);
    let cart = repos.carts.get_or_create(&owner, now, ttl).await.unwrap();
    let add = |quantity| CartMutation::Add {
        item: LineItem::snapshot(&priciest, quantity),
        available_stock: priciest.stock,
    };

    assert!(matches!(
        repos.carts.apply(cart.id, add(2), now, ttl).await,
        Err(RepositoryError::Rejected(CartRuleError::TotalTooLarge(MoneyError::TooLarge)))
    ));
    let cart = repos.carts.apply(cart.id, add(1), now, ttl).await.unwrap();
    assert_eq!(cart.total_amount, Money::MAX);
}

#[tokio::test]
#[ignore = "Requires CARTLINE_TEST_DATABASE_URL"]
async fn test_status_transition_is_compare_and_set() {
    let repos = repositories().await;
    let widget = product(&repos, 10).await;
    let user = repos
        .users
        .create(NewUser {
            email: Email::parse(&format!("pg-{}@example.com", unique())).unwrap(),
            password_hash: "not-a-real-hash".to_owned(),
            first_name: "Pg".to_owned(),
            last_name: "Tester".to_owned(),
            role: UserRole::Customer,
        })
        .await
        .unwrap();

    let item = LineItem::snapshot(&widget, 1);
    let order = repos
        .orders
        .create(NewOrder {
            user_id: user.id,
            order_number: OrderNumberGenerator::new().next(),
            total_amount: item.price,
            items: vec![item],
            shipping_address: address(),
            billing_address: address(),
            payment_method: PaymentMethod::Paypal,
        })
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let confirmed = repos
        .orders
        .transition_status(order.id, &[OrderStatus::Pending], OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.unwrap().status, OrderStatus::Confirmed);

    // The second writer loses.
    let lost = repos
        .orders
        .transition_status(order.id, &[OrderStatus::Pending], OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(lost.is_none());

    let stored = repos.orders.find_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.order_number, order.order_number);
}
