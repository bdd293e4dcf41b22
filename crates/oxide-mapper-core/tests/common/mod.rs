//! Record types shared by the integration tests.

#![allow(dead_code)]

use oxide_mapper_core::hydrate::VecCursor;
use oxide_mapper_core::value::SqlValue;
use oxide_mapper_derive::{Record, SqlEnum};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, SqlEnum)]
pub enum Status {
    #[default]
    Open,
    Shipped,
    Closed = 9,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Geo {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Address {
    pub street: Option<String>,
    #[column(nested)]
    pub geo: Option<Geo>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Order {
    pub id: i64,
    pub status: Status,
    #[column(nested)]
    pub ship_to: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Customer {
    pub id: i64,
    #[column(name = "email_address")]
    pub email: String,
    #[column(alias = "nick")]
    pub nickname: Option<String>,
    #[column(ignore)]
    pub cached_total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "order_lines", primary_key = "order_id, line", autoincrement)]
pub struct OrderLine {
    pub order_id: i64,
    pub line: i32,
    pub sku: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Book {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

pub fn cursor(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> VecCursor {
    VecCursor::new(columns.iter().copied(), rows)
}
