//! End-to-end tests against in-memory SQLite.

use chrono::NaiveDateTime;
use oxide_mapper_core::expr::member;
use oxide_mapper_core::snapshot::Snapshot;
use oxide_mapper_core::statement::Query;
use oxide_mapper_core::value::SqlValue;
use oxide_mapper_derive::{Record, SqlEnum};
use oxide_mapper_sqlite::{Database, DatabaseError};
use sqlx::sqlite::SqlitePoolOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq, SqlEnum)]
enum Level {
    #[default]
    Low,
    High = 10,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct Address {
    street: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "people")]
struct Person {
    id: i64,
    name: String,
    #[column(name = "years")]
    age: i32,
    level: Level,
    active: bool,
    #[column(nested)]
    address: Option<Address>,
    joined_at: Option<NaiveDateTime>,
    #[column(version)]
    version: i64,
    #[column(ignore)]
    scratch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct Post {
    id: i64,
    blog_id: i64,
    title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct Blog {
    id: i64,
    name: String,
    posts: Vec<Post>,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        years INTEGER NOT NULL,
        level TEXT NOT NULL,
        active INTEGER NOT NULL,
        address__street TEXT,
        address__city TEXT,
        joined_at TEXT,
        version INTEGER NOT NULL
    )",
    "CREATE TABLE blogs (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        blog_id INTEGER NOT NULL,
        title TEXT NOT NULL
    )",
];

async fn create_test_db() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    let db = Database::new(pool);
    for statement in SCHEMA {
        db.execute(statement, Vec::new()).await.unwrap();
    }
    db
}

fn joined() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-05-01 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

fn ada() -> Person {
    Person {
        name: String::from("Ada"),
        age: 36,
        level: Level::High,
        active: true,
        address: Some(Address {
            street: None,
            city: Some(String::from("London")),
        }),
        joined_at: Some(joined()),
        scratch: String::from("kept"),
        ..Person::default()
    }
}

fn alan() -> Person {
    Person {
        name: String::from("Alan"),
        age: 41,
        ..Person::default()
    }
}

async fn seeded() -> (Database, Person, Person) {
    let db = create_test_db().await;
    let mut first = ada();
    let mut second = alan();
    db.insert(&mut first).await.unwrap();
    db.insert(&mut second).await.unwrap();
    (db, first, second)
}

#[tokio::test]
async fn test_insert_writes_back_key_and_version() {
    let (_db, first, second) = seeded().await;
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert_eq!(first.version, 1);
    assert_eq!(first.scratch, "kept");
}

#[tokio::test]
async fn test_fetch_round_trips_every_column_kind() {
    let (db, first, _) = seeded().await;
    let people: Vec<Person> = db
        .fetch(&Query::new().filter(member("name").eq("Ada")))
        .await
        .unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(
        people[0],
        Person {
            scratch: String::new(),
            ..first
        }
    );
}

#[tokio::test]
async fn test_nested_record_absent_when_all_columns_null() {
    let (db, _, _) = seeded().await;
    let alan = db
        .single_by_key::<Person>(&[SqlValue::Int(2)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alan.address, None);
    assert_eq!(alan.joined_at, None);
    assert_eq!(alan.level, Level::Low);
}

#[tokio::test]
async fn test_filter_on_nested_member() {
    let (db, _, _) = seeded().await;
    let londoners: Vec<Person> = db
        .fetch(&Query::new().filter(member("address.city").eq("London")))
        .await
        .unwrap();
    assert_eq!(londoners.len(), 1);
    assert_eq!(londoners[0].name, "Ada");
}

#[tokio::test]
async fn test_single_by_key_missing_row() {
    let (db, _, _) = seeded().await;
    let missing = db.single_by_key::<Person>(&[SqlValue::Int(99)]).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_page_and_count() {
    let (db, _, _) = seeded().await;
    let mut third = Person {
        name: String::from("Grace"),
        age: 50,
        ..Person::default()
    };
    db.insert(&mut third).await.unwrap();

    let ordered = Query::new().order_by("-age");
    let page: Vec<Person> = db.page(&ordered, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "Alan");

    let count = db
        .count::<Person>(&Query::new().filter(member("age").gt(40)))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_fetch_sql_completes_where_clause() {
    let (db, _, _) = seeded().await;
    let older: Vec<Person> = db
        .fetch_sql("WHERE years > @0 ORDER BY id", vec![SqlValue::Int(40)])
        .await
        .unwrap();
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].name, "Alan");
}

#[tokio::test]
async fn test_enum_stored_by_member_name() {
    let (db, first, _) = seeded().await;
    let stored = db
        .scalar("SELECT level FROM people WHERE id = @0", vec![SqlValue::Int(first.id)])
        .await
        .unwrap();
    assert_eq!(stored, SqlValue::Text(String::from("High")));
}

#[tokio::test]
async fn test_update_increments_version_and_detects_conflicts() {
    let (db, mut first, _) = seeded().await;
    let mut stale = first.clone();

    first.age = 37;
    assert_eq!(db.update(&mut first).await.unwrap(), 1);
    assert_eq!(first.version, 2);

    stale.name = String::from("Lovelace");
    assert_eq!(db.update(&mut stale).await.unwrap(), 0);
    assert_eq!(stale.version, 1);

    let stored = db
        .single_by_key::<Person>(&[SqlValue::Int(first.id)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.age, 37);
    assert_eq!(stored.name, "Ada");
}

#[tokio::test]
async fn test_update_changes_writes_only_changed_columns() {
    let (db, first, _) = seeded().await;
    db.execute(
        "UPDATE people SET years = 99 WHERE id = @0",
        vec![SqlValue::Int(first.id)],
    )
    .await
    .unwrap();

    let mut snapshot = Snapshot::capture(db.factory(), first).unwrap();
    assert_eq!(db.update_changes(&mut snapshot).await.unwrap(), 0);

    snapshot.tracked_mut().name = String::from("Countess");
    assert_eq!(db.update_changes(&mut snapshot).await.unwrap(), 1);
    assert!(snapshot.diff().is_empty());

    let stored = db
        .single_by_key::<Person>(&[SqlValue::Int(1)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Countess");
    assert_eq!(stored.age, 99);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_delete() {
    let (db, first, _) = seeded().await;
    assert_eq!(db.delete(&first).await.unwrap(), 1);
    assert_eq!(db.count::<Person>(&Query::new()).await.unwrap(), 1);
    assert_eq!(db.delete(&first).await.unwrap(), 0);
}

#[tokio::test]
async fn test_one_to_many_groups_children() {
    let db = create_test_db().await;
    let mut rust = Blog {
        name: String::from("rust"),
        ..Blog::default()
    };
    let mut empty = Blog {
        name: String::from("empty"),
        ..Blog::default()
    };
    db.insert(&mut rust).await.unwrap();
    db.insert(&mut empty).await.unwrap();
    for title in ["ownership", "lifetimes"] {
        let mut post = Post {
            blog_id: rust.id,
            title: title.to_string(),
            ..Post::default()
        };
        db.insert(&mut post).await.unwrap();
    }

    let blogs = db
        .fetch_one_to_many::<Blog, Post>(
            "SELECT b.id, b.name, p.id, p.blog_id, p.title \
             FROM blogs b LEFT JOIN posts p ON p.blog_id = b.id \
             ORDER BY b.id, p.id",
            Vec::new(),
        )
        .await
        .unwrap();

    assert_eq!(blogs.len(), 2);
    let titles: Vec<&str> = blogs[0].posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["ownership", "lifetimes"]);
    assert!(blogs[1].posts.is_empty());
}

#[tokio::test]
async fn test_conversion_failure_surfaces_as_mapper_error() {
    let (db, _, _) = seeded().await;
    db.execute("UPDATE people SET level = 'Medium' WHERE id = 2", Vec::new())
        .await
        .unwrap();
    let err = db
        .single_by_key::<Person>(&[SqlValue::Int(2)])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Mapper(_)));
    assert!(err.to_string().contains("Medium"));
}
