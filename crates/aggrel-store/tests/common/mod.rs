//! Order aggregate fixture and database setup shared by the integration tests
#![allow(dead_code)]

use aggrel_core::{
    Aggregate, AggregateDescriptor, CodecError, ElementDescriptor, FieldDescriptor, FromValue,
    IntoValue, PrimitiveType, Record, ShapeDescriptor, Value,
};
use aggrel_store::{Connection, SqliteConnection, StoreConfig, TransactionalRepository};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: String,
    pub quantity: i64,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub total_amount: Money,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub items: Vec<OrderItem>,
    pub tags: BTreeSet<String>,
    pub scores_by_game: BTreeMap<String, i64>,
    pub placed_at: DateTime<Utc>,
    pub express: bool,
}

pub fn money_shape() -> ShapeDescriptor {
    ShapeDescriptor::new("Money")
        .field(FieldDescriptor::primitive("amount", PrimitiveType::Float))
        .field(FieldDescriptor::primitive("currency", PrimitiveType::Text))
}

pub fn address_shape() -> ShapeDescriptor {
    ShapeDescriptor::new("Address")
        .field(FieldDescriptor::primitive("street", PrimitiveType::Text))
        .field(FieldDescriptor::primitive("city", PrimitiveType::Text))
        .field(FieldDescriptor::primitive("country", PrimitiveType::Text))
}

pub fn order_item_shape() -> ShapeDescriptor {
    ShapeDescriptor::new("OrderItem")
        .field(FieldDescriptor::primitive("id", PrimitiveType::Uuid))
        .field(FieldDescriptor::primitive("productId", PrimitiveType::Text))
        .field(FieldDescriptor::primitive("quantity", PrimitiveType::Int))
        .field(FieldDescriptor::value("price", money_shape()))
}

impl IntoValue for Money {
    fn into_value(self) -> Value {
        Record::new()
            .with("amount", self.amount)
            .with("currency", self.currency)
            .into_value()
    }
}

impl FromValue for Money {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut r = Record::from_value(value)?;
        Ok(Money {
            amount: r.take("amount")?,
            currency: r.take("currency")?,
        })
    }
}

impl IntoValue for Address {
    fn into_value(self) -> Value {
        Record::new()
            .with("street", self.street)
            .with("city", self.city)
            .with("country", self.country)
            .into_value()
    }
}

impl FromValue for Address {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut r = Record::from_value(value)?;
        Ok(Address {
            street: r.take("street")?,
            city: r.take("city")?,
            country: r.take("country")?,
        })
    }
}

impl IntoValue for OrderItem {
    fn into_value(self) -> Value {
        Record::new()
            .with("id", self.id)
            .with("productId", self.product_id)
            .with("quantity", self.quantity)
            .with("price", self.price)
            .into_value()
    }
}

impl FromValue for OrderItem {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut r = Record::from_value(value)?;
        Ok(OrderItem {
            id: r.take("id")?,
            product_id: r.take("productId")?,
            quantity: r.take("quantity")?,
            price: r.take("price")?,
        })
    }
}

impl Aggregate for Order {
    fn descriptor() -> AggregateDescriptor {
        AggregateDescriptor::new("Order")
            .field(FieldDescriptor::primitive("id", PrimitiveType::Uuid))
            .field(FieldDescriptor::primitive("customerName", PrimitiveType::Text))
            .field(FieldDescriptor::value("totalAmount", money_shape()))
            .field(FieldDescriptor::value("shippingAddress", address_shape()))
            .field(FieldDescriptor::value("billingAddress", address_shape()).nullable())
            .field(FieldDescriptor::list(
                "items",
                ElementDescriptor::entity(order_item_shape()),
            ))
            .field(FieldDescriptor::set(
                "tags",
                ElementDescriptor::primitive(PrimitiveType::Text),
            ))
            .field(FieldDescriptor::map(
                "scoresByGame",
                ElementDescriptor::primitive(PrimitiveType::Int),
            ))
            .field(FieldDescriptor::primitive("placedAt", PrimitiveType::DateTime))
            .field(FieldDescriptor::primitive("express", PrimitiveType::Bool))
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn to_record(&self) -> Record {
        let this = self.clone();
        Record::new()
            .with("id", this.id)
            .with("customerName", this.customer_name)
            .with("totalAmount", this.total_amount)
            .with("shippingAddress", this.shipping_address)
            .with("billingAddress", this.billing_address)
            .with("items", this.items)
            .with("tags", this.tags)
            .with("scoresByGame", this.scores_by_game)
            .with("placedAt", this.placed_at)
            .with("express", this.express)
    }

    fn from_record(mut r: Record) -> Result<Self, CodecError> {
        Ok(Order {
            id: r.take("id")?,
            customer_name: r.take("customerName")?,
            total_amount: r.take("totalAmount")?,
            shipping_address: r.take("shippingAddress")?,
            billing_address: r.take("billingAddress")?,
            items: r.take("items")?,
            tags: r.take("tags")?,
            scores_by_game: r.take("scoresByGame")?,
            placed_at: r.take("placedAt")?,
            express: r.take("express")?,
        })
    }
}

pub fn money(amount: f64, currency: &str) -> Money {
    Money {
        amount,
        currency: currency.to_string(),
    }
}

pub fn item(product_id: &str, quantity: i64, price: f64) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        product_id: product_id.to_string(),
        quantity,
        price: money(price, "USD"),
    }
}

/// Order with totalAmount 150 USD, a Springfield address and two items
pub fn sample_order() -> Order {
    Order {
        id: Uuid::new_v4(),
        customer_name: "Ada Lovelace".to_string(),
        total_amount: money(150.0, "USD"),
        shipping_address: Address {
            street: "123 Main St".to_string(),
            city: "Springfield".to_string(),
            country: "USA".to_string(),
        },
        billing_address: None,
        items: vec![item("SKU-1", 2, 50.0), item("SKU-2", 1, 50.0)],
        tags: ["dart", "flutter"].iter().map(|s| s.to_string()).collect(),
        scores_by_game: [("chess".to_string(), 1200), ("go".to_string(), 800)]
            .into_iter()
            .collect(),
        placed_at: Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
        express: true,
    }
}

pub type OrderRepo = TransactionalRepository<Order, SqliteConnection>;

/// In-memory database with the Order tables created
pub fn setup_test_db() -> OrderRepo {
    setup_with_config(StoreConfig::in_memory())
}

pub fn setup_with_config(config: StoreConfig) -> OrderRepo {
    let schema = aggrel_core::SchemaCompiler::compile(&Order::descriptor()).unwrap();
    let conn = SqliteConnection::from_config(config).unwrap();
    let repo = TransactionalRepository::new(std::sync::Arc::new(schema), conn);
    repo.create_tables().unwrap();
    repo
}

/// Number of rows in `table` referencing `id` through `column`
pub fn count_rows(repo: &OrderRepo, table: &str, column: &str, id: Uuid) -> i64 {
    let mut conn = repo.connection().unwrap();
    let rows = conn
        .query(
            &format!("SELECT COUNT(*) AS n FROM \"{}\" WHERE \"{}\" = ?1", table, column),
            &[aggrel_core::SqlValue::Text(id.to_string())],
        )
        .unwrap();
    rows[0].get("n").and_then(|v| v.as_i64()).unwrap()
}
