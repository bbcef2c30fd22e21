//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{OrderId, UserId};
use domain::{
    CustomerDetails, LineItem, Money, OrderDraft, OrderPatch, OrderStatus, PaymentStatus, Totals,
};
use order_store::{OrderStore, PostgresOrderStore};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and an emptied orders table
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Restart identity so every test sees ids from 1
    sqlx::query("TRUNCATE TABLE orders RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn create_test_draft(user_id: Option<i64>) -> OrderDraft {
    // Postgres keeps microseconds; truncate so round-trips compare equal
    let now = chrono::DateTime::from_timestamp_micros(Utc::now().timestamp_micros()).unwrap();

    let items = vec![
        LineItem::new("Shawarma", Money::new(350), 2),
        LineItem::new("Ayran", Money::new(120), 1),
    ];
    OrderDraft {
        user_id: user_id.map(UserId::new),
        totals: Totals::compute(&items, Money::new(150)).unwrap(),
        items,
        customer: CustomerDetails {
            customer_name: "Timur".to_string(),
            phone: "+79001234567".to_string(),
            address: "Baumana 12".to_string(),
            delivery_zone: Some("north".to_string()),
            comment: Some("call on arrival".to_string()),
        },
        created_at: now,
        expires_at: now + Duration::minutes(30),
    }
}

#[tokio::test]
#[serial]
async fn create_and_get_order() {
    let store = get_test_store().await;
    let draft = create_test_draft(Some(42));

    let created = store.create(draft.clone()).await.unwrap();
    assert_eq!(created.id, OrderId::new(1));
    assert_eq!(created.status, OrderStatus::New);
    assert_eq!(created.payment_status, PaymentStatus::Pending);
    assert_eq!(created.totals.total, Money::new(970));
    assert_eq!(created.items, draft.items);
    assert_eq!(created.created_at, draft.created_at);
    assert_eq!(created.updated_at, draft.created_at);

    let loaded = store.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[tokio::test]
#[serial]
async fn ids_are_monotonic() {
    let store = get_test_store().await;

    let a = store.create(create_test_draft(None)).await.unwrap();
    let b = store.create(create_test_draft(None)).await.unwrap();

    assert!(a.id < b.id);
}

#[tokio::test]
#[serial]
async fn get_missing_order_returns_none() {
    let store = get_test_store().await;
    assert!(store.get_by_id(OrderId::new(404)).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn update_status_and_payment_fields() {
    let store = get_test_store().await;
    let order = store.create(create_test_draft(None)).await.unwrap();
    let later = order.created_at + Duration::minutes(3);

    let accepted = store
        .update_status(order.id, OrderStatus::Accepted, later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted.status, OrderStatus::Accepted);
    assert_eq!(accepted.updated_at, later);

    let paid = store
        .update(
            order.id,
            OrderPatch::at(later)
                .payment_status(PaymentStatus::Paid)
                .payment_id("2c7d9f0e-000f-5000-9000-1b68e7b15f3f"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Accepted);
    assert!(paid.is_paid());
    assert_eq!(
        paid.payment_id.as_deref(),
        Some("2c7d9f0e-000f-5000-9000-1b68e7b15f3f")
    );
}

#[tokio::test]
#[serial]
async fn update_missing_order_returns_none() {
    let store = get_test_store().await;
    let result = store
        .update_status(OrderId::new(77), OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
#[serial]
async fn list_and_filter_by_user_newest_first() {
    let store = get_test_store().await;
    store.create(create_test_draft(Some(1))).await.unwrap();
    store.create(create_test_draft(Some(2))).await.unwrap();
    store.create(create_test_draft(Some(1))).await.unwrap();

    let all: Vec<u64> = store
        .list()
        .await
        .unwrap()
        .iter()
        .map(|o| o.id.value())
        .collect();
    assert_eq!(all, vec![3, 2, 1]);

    let mine: Vec<u64> = store
        .get_by_user_id(UserId::new(1))
        .await
        .unwrap()
        .iter()
        .map(|o| o.id.value())
        .collect();
    assert_eq!(mine, vec![3, 1]);
}
