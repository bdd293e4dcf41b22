//! Mapping record types through schemas, statements and hydration.

mod common;

use std::sync::Arc;

use common::{cursor, text, Address, Author, Customer, Geo, Order, OrderLine, Status};
use oxide_mapper_core::dialect::{SqlServer2012Dialect, SqliteDialect};
use oxide_mapper_core::error::{CompileError, SchemaError};
use oxide_mapper_core::expr::{list, member};
use oxide_mapper_core::hydrate::Hydrator;
use oxide_mapper_core::schema::SchemaFactory;
use oxide_mapper_core::snapshot::Snapshot;
use oxide_mapper_core::statement::{Query, StatementBuilder};
use oxide_mapper_core::value::SqlValue;
use oxide_mapper_core::Record;

const ORDER_COLUMNS: &[&str] = &[
    "id",
    "status",
    "ship_to__street",
    "ship_to__geo__lat",
    "ship_to__geo__lng",
];

fn column_names(factory: &SchemaFactory) -> Vec<String> {
    factory
        .schema::<Order>()
        .unwrap()
        .leaf_columns()
        .into_iter()
        .map(|c| c.column_name().to_string())
        .collect()
}

#[test]
fn test_resolution_is_deterministic_and_cached() {
    let factory = SchemaFactory::new();
    let first = factory.schema::<Order>().unwrap();
    let second = factory.schema::<Order>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.table_name(), "orders");

    assert_eq!(column_names(&factory), ORDER_COLUMNS);
    assert_eq!(column_names(&SchemaFactory::new()), column_names(&factory));
}

#[test]
fn test_composite_autoincrement_key_is_rejected() {
    let err = SchemaFactory::new().schema::<OrderLine>().unwrap_err();
    assert!(matches!(err, SchemaError::CompositeAutoIncrement { .. }));
}

#[test]
fn test_nested_columns_round_trip() {
    let factory = SchemaFactory::new();
    let mut rows = cursor(
        ORDER_COLUMNS,
        vec![
            vec![
                SqlValue::Int(1),
                text("Shipped"),
                text("Main St"),
                SqlValue::Float(51.5),
                SqlValue::Float(-0.1),
            ],
            vec![
                SqlValue::Int(2),
                text("Open"),
                SqlValue::Null,
                SqlValue::Null,
                SqlValue::Null,
            ],
            vec![
                SqlValue::Int(3),
                text("Closed"),
                SqlValue::Null,
                SqlValue::Float(10.0),
                SqlValue::Null,
            ],
        ],
    );

    let orders: Vec<Order> = Hydrator::new(&factory).read(&mut rows).unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(
        orders[0],
        Order {
            id: 1,
            status: Status::Shipped,
            ship_to: Some(Address {
                street: Some(String::from("Main St")),
                geo: Some(Geo {
                    lat: Some(51.5),
                    lng: Some(-0.1),
                }),
            }),
        }
    );
    assert_eq!(orders[1].ship_to, None);
    assert_eq!(
        orders[2].ship_to,
        Some(Address {
            street: None,
            geo: Some(Geo {
                lat: Some(10.0),
                lng: None,
            }),
        })
    );
}

#[test]
fn test_unknown_enum_member_fails_hydration() {
    let factory = SchemaFactory::new();
    let mut rows = cursor(
        &["id", "status"],
        vec![vec![SqlValue::Int(1), text("Lost")]],
    );
    let err = Hydrator::new(&factory).read::<Order>(&mut rows).unwrap_err();
    assert!(err.to_string().contains("Lost"));
}

#[test]
fn test_alias_and_renamed_columns_hydrate() {
    let factory = SchemaFactory::new();
    let mut rows = cursor(
        &["id", "email_address", "nick"],
        vec![vec![SqlValue::Int(4), text("ann@example.com"), text("annie")]],
    );
    let customers: Vec<Customer> = Hydrator::new(&factory).read(&mut rows).unwrap();
    assert_eq!(customers[0].email, "ann@example.com");
    assert_eq!(customers[0].nickname.as_deref(), Some("annie"));
    assert_eq!(customers[0].cached_total, 0);
}

#[test]
fn test_one_to_many_groups_by_parent_key() {
    let factory = SchemaFactory::new();
    let mut rows = cursor(
        &["id", "name", "id", "author_id", "title"],
        vec![
            vec![SqlValue::Int(1), text("Ann"), SqlValue::Int(1), SqlValue::Int(1), text("First")],
            vec![SqlValue::Int(1), text("Ann"), SqlValue::Int(2), SqlValue::Int(1), text("Second")],
            vec![SqlValue::Int(2), text("Bo"), SqlValue::Int(1), SqlValue::Int(2), text("Only")],
            vec![SqlValue::Int(3), text("Cy"), SqlValue::Null, SqlValue::Null, SqlValue::Null],
        ],
    );

    let authors: Vec<Author> = Hydrator::new(&factory)
        .read_one_to_many::<Author, common::Book>(&mut rows)
        .unwrap();

    assert_eq!(authors.len(), 3);
    assert_eq!(authors[0].books.len(), 2);
    assert_eq!(authors[0].books[1].title, "Second");
    assert_eq!(authors[1].books.len(), 1);
    assert_eq!(authors[1].books[0].author_id, 2);
    assert!(authors[2].books.is_empty());
}

#[test]
fn test_empty_list_contains_compiles_to_false() {
    let factory = SchemaFactory::new();
    let schema = factory.schema::<Order>().unwrap();
    let dialect = SqliteDialect::new();
    let plan = StatementBuilder::new(&schema, &dialect)
        .select(&Query::new().filter(list(Vec::<i64>::new()).contains(member("id"))))
        .unwrap();
    assert!(plan.sql.ends_with("WHERE 1 = 0"));
    assert!(plan.params.is_empty());
}

#[test]
fn test_nested_member_filter_uses_flattened_column() {
    let factory = SchemaFactory::new();
    let schema = factory.schema::<Order>().unwrap();
    let dialect = SqliteDialect::new();
    let plan = StatementBuilder::new(&schema, &dialect)
        .select(&Query::new().filter(member("ship_to.geo.lat").gt(1.5)))
        .unwrap();
    assert!(plan.sql.ends_with(r#"WHERE "ship_to__geo__lat" > ?"#));
    assert_eq!(plan.params, vec![SqlValue::Float(1.5)]);

    let err = StatementBuilder::new(&schema, &dialect)
        .select(&Query::new().filter(member("ship_to.zip").eq("x")))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownMember { .. }));
}

#[test]
fn test_paging_differs_per_dialect() {
    let factory = SchemaFactory::new();
    let schema = factory.schema::<Order>().unwrap();
    let query = Query::new().order_by("id");
    let sqlite = SqliteDialect::new();
    let mssql = SqlServer2012Dialect::new();

    let limited = StatementBuilder::new(&schema, &sqlite).page(&query, 5, 5).unwrap();
    let fetched = StatementBuilder::new(&schema, &mssql).page(&query, 5, 5).unwrap();

    assert_ne!(limited.sql, fetched.sql);
    assert!(limited.sql.contains("LIMIT"));
    assert!(fetched.sql.contains("FETCH NEXT"));
    assert_eq!(limited.params.len(), 2);
    assert_eq!(fetched.params.len(), 2);
}

#[test]
fn test_snapshot_diff_reports_physical_column() {
    let factory = SchemaFactory::new();
    let customer = Customer {
        id: 4,
        email: String::from("ann@example.com"),
        nickname: Some(String::from("annie")),
        cached_total: 10,
    };
    let mut snapshot = Snapshot::capture(&factory, customer).unwrap();
    snapshot.tracked_mut().cached_total = 99;
    assert!(snapshot.diff().is_empty());

    snapshot.tracked_mut().email = String::from("ann@example.org");
    let diff = snapshot.diff();
    assert_eq!(diff.columns().collect::<Vec<_>>(), ["email_address"]);
    assert_eq!(diff.entries()[0].field, "email");

    let schema = factory.schema::<Customer>().unwrap();
    let dialect = SqliteDialect::new();
    let plan = StatementBuilder::new(&schema, &dialect)
        .update_changes(&snapshot.tracked().to_record(), &diff)
        .unwrap()
        .unwrap();
    assert!(plan.statement.sql.contains(r#""email_address" = ?"#));
    assert!(!plan.statement.sql.contains("nickname"));
    assert_eq!(
        plan.statement.params,
        vec![text("ann@example.org"), SqlValue::Int(4)]
    );
}
