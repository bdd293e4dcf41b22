//! SELECT, INSERT, UPDATE and DELETE generation.

use std::sync::LazyLock;

use regex::Regex;

use super::plan::{InsertPlan, KeyRetrieval, QueryPlan, UpdatePlan, VersionUpdate};
use super::query::Query;
use crate::dialect::{Dialect, InsertIdStrategy, SelectParts};
use crate::error::CompileError;
use crate::expr::{CompileOptions, ExpressionCompiler, Fragment, OutputColumn};
use crate::record::{RecordValue, Value};
use crate::schema::{ColumnDescriptor, TypeSchema, VersionKind};
use crate::snapshot::Diff;
use crate::value::SqlValue;

static SELECT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*(SELECT|WITH|EXEC|EXECUTE|CALL)\b").expect("Invalid SELECT regex")
});

static FROM_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*FROM\b").expect("Invalid FROM regex"));

/// A column value about to be written.
struct Slot<'s> {
    name: String,
    path: Vec<String>,
    value: SqlValue,
    descriptor: Option<&'s ColumnDescriptor>,
    primary_key: bool,
}

impl Slot<'_> {
    fn insertable(&self) -> bool {
        self.descriptor.map_or(true, ColumnDescriptor::is_insertable)
    }

    fn updatable(&self) -> bool {
        self.descriptor
            .map_or(!self.primary_key, ColumnDescriptor::is_updatable)
    }

    fn version(&self) -> Option<VersionKind> {
        self.descriptor.and_then(|d| d.flags().version)
    }
}

/// Builds statements for one schema and dialect.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'a> {
    schema: &'a TypeSchema,
    dialect: &'a dyn Dialect,
}

impl<'a> StatementBuilder<'a> {
    #[must_use]
    pub const fn new(schema: &'a TypeSchema, dialect: &'a dyn Dialect) -> Self {
        Self { schema, dialect }
    }

    #[must_use]
    pub const fn schema(&self) -> &TypeSchema {
        self.schema
    }

    #[must_use]
    pub const fn dialect(&self) -> &dyn Dialect {
        self.dialect
    }

    /// SELECT for `query`, paged if the query carries paging.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if the filter, projection or ordering
    /// does not compile.
    pub fn select(&self, query: &Query) -> Result<QueryPlan, CompileError> {
        let (fragment, outputs) = self.select_fragment(query)?;
        match query.paging() {
            Some((skip, take)) => self.paged(&fragment, outputs, skip, take),
            None => QueryPlan::assemble(&fragment, outputs, self.dialect),
        }
    }

    /// SELECT for one page of `query`.
    ///
    /// When the dialect's paging needs an ORDER BY and the query has none,
    /// a neutral one is injected.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select), or
    /// [`CompileError::InvalidPage`] for a negative `skip` or `take`.
    pub fn page(&self, query: &Query, skip: i64, take: i64) -> Result<QueryPlan, CompileError> {
        self.select(&query.clone().page(skip, take))
    }

    /// `SELECT COUNT(*)` over the rows `query` matches, ignoring paging and
    /// ordering.
    ///
    /// # Errors
    ///
    /// Same as [`select`](Self::select).
    pub fn count(&self, query: &Query) -> Result<QueryPlan, CompileError> {
        let (inner, _) = self.select_fragment(&query.unpaged().unordered())?;
        let fragment = Fragment::raw("SELECT COUNT(*) FROM (")
            .then(inner)
            .then_sql(") oxide_count");
        QueryPlan::assemble(&fragment, Vec::new(), self.dialect)
    }

    /// Scalar query returning 1 if `query` matches any row, else 0.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if the filter does not compile.
    pub fn exists(&self, query: &Query) -> Result<QueryPlan, CompileError> {
        let compiler = self.compiler(query);
        let mut inner = Fragment::raw(format!("SELECT 1 FROM {}", self.from_clause(query)));
        if let Some(filter) = query.filter_expr() {
            inner.push_sql(" WHERE ");
            inner.push(compiler.predicate(filter)?);
        }
        let (sql, params) = inner.merged()?;
        let fragment = Fragment::new(self.dialect.exists_query(&sql), params);
        QueryPlan::assemble(&fragment, Vec::new(), self.dialect)
    }

    /// SELECT of the row with the given primary key values.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingPrimaryKey`] or
    /// [`CompileError::KeyArity`].
    pub fn single_by_key(&self, key: &[SqlValue]) -> Result<QueryPlan, CompileError> {
        let query = Query::new();
        let (mut fragment, outputs) = self.select_fragment(&query)?;
        fragment.push_sql(" WHERE ");
        fragment.push(self.key_predicate(key.to_vec())?);
        QueryPlan::assemble(&fragment, outputs, self.dialect)
    }

    /// INSERT of `record`.
    ///
    /// An autoincrement key is left to the database (or taken from the
    /// configured sequence) and a numeric version column starts at 1.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::NoWritableColumns`] if nothing would be
    /// inserted.
    pub fn insert(&self, record: &RecordValue) -> Result<InsertPlan, CompileError> {
        let generated = self.schema.is_autoincrement() && !self.schema.is_composite_key();
        let mut names = Vec::new();
        let mut values = Vec::new();
        let mut params = Vec::new();
        let mut key_path = None;
        let mut version = None;

        for slot in self.slots(record) {
            if !slot.insertable() {
                continue;
            }
            let quoted = self.dialect.quote_identifier(&slot.name);
            if generated && slot.primary_key {
                if let Some(sequence) = self.schema.sequence() {
                    names.push(quoted);
                    values.push(self.dialect.sequence_next_value(sequence));
                }
                key_path = Some(slot.path);
                continue;
            }
            let value = if slot.version() == Some(VersionKind::Number) {
                let initial = SqlValue::Int(1);
                version = Some(VersionUpdate {
                    kind: VersionKind::Number,
                    path: slot.path,
                    next: Some(initial.clone()),
                });
                initial
            } else {
                slot.value
            };
            names.push(quoted);
            values.push(format!("@{}", params.len()));
            params.push(value);
        }

        if generated && key_path.is_none() {
            // Dynamic records may omit the key entirely.
            key_path = self.schema.primary_keys().first().map(|k| vec![k.clone()]);
        }
        if names.is_empty() && !generated {
            return Err(CompileError::NoWritableColumns(
                self.schema.type_name().to_string(),
            ));
        }

        let strategy = if generated {
            self.dialect.insert_id_strategy()
        } else {
            InsertIdStrategy::None
        };
        let key_column = self
            .schema
            .primary_keys()
            .first()
            .map(|k| self.dialect.quote_identifier(k))
            .unwrap_or_default();

        let mut sql = format!("INSERT INTO {}", self.table());
        if !names.is_empty() {
            sql.push_str(&format!(" ({})", names.join(", ")));
        }
        if strategy == InsertIdStrategy::Output {
            sql.push_str(&format!(" OUTPUT INSERTED.{key_column}"));
        }
        if names.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            sql.push_str(&format!(" VALUES ({})", values.join(", ")));
        }
        if strategy == InsertIdStrategy::Returning {
            sql.push_str(&format!(" RETURNING {key_column}"));
        }

        let key = match strategy {
            InsertIdStrategy::Returning | InsertIdStrategy::Output => KeyRetrieval::Returned,
            InsertIdStrategy::LastIdQuery => {
                match self.dialect.last_id_query(self.schema.sequence()) {
                    Some(query) => KeyRetrieval::Query(QueryPlan::raw(query, Vec::new(), self.dialect)?),
                    None => KeyRetrieval::None,
                }
            }
            InsertIdStrategy::None => KeyRetrieval::None,
        };

        Ok(InsertPlan {
            statement: QueryPlan::raw(sql, params, self.dialect)?,
            key,
            key_path: if generated { key_path } else { None },
            version,
        })
    }

    /// UPDATE of every writable column of `record`, or only of the columns
    /// named in `only` (column names or dotted field paths).
    ///
    /// A numeric version column is incremented by the statement and
    /// checked against its current value; a row-version column is checked
    /// and read back afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingPrimaryKey`] or
    /// [`CompileError::NoWritableColumns`].
    pub fn update(&self, record: &RecordValue, only: Option<&[&str]>) -> Result<UpdatePlan, CompileError> {
        self.update_where(record, |slot| {
            only.map_or(true, |names| {
                names.iter().any(|n| {
                    n.eq_ignore_ascii_case(&slot.name) || *n == slot.path.join(".")
                })
            })
        })
    }

    /// UPDATE of the columns a snapshot [`Diff`] reports as changed.
    ///
    /// Returns `None` when no writable column changed.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingPrimaryKey`].
    pub fn update_changes(&self, record: &RecordValue, diff: &Diff) -> Result<Option<UpdatePlan>, CompileError> {
        let changed = |slot: &Slot<'_>| diff.columns().any(|c| c.eq_ignore_ascii_case(&slot.name));
        if !self.slots(record).iter().any(|s| s.updatable() && changed(s)) {
            return Ok(None);
        }
        self.update_where(record, changed).map(Some)
    }

    /// DELETE of the row `record` was read from.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingPrimaryKey`].
    pub fn delete(&self, record: &RecordValue) -> Result<QueryPlan, CompileError> {
        let key = self.key_values(record)?;
        self.delete_by_key(&key)
    }

    /// DELETE of the row with the given primary key values.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingPrimaryKey`] or
    /// [`CompileError::KeyArity`].
    pub fn delete_by_key(&self, key: &[SqlValue]) -> Result<QueryPlan, CompileError> {
        let fragment = Fragment::raw(format!("DELETE FROM {} WHERE ", self.table()))
            .then(self.key_predicate(key.to_vec())?);
        QueryPlan::assemble(&fragment, Vec::new(), self.dialect)
    }

    /// Completes hand-written SQL that starts at `FROM` or `WHERE`.
    ///
    /// ```rust
    /// # use oxide_mapper_core::dialect::SqliteDialect;
    /// # use oxide_mapper_core::schema::SchemaFactory;
    /// # use oxide_mapper_core::statement::StatementBuilder;
    /// let factory = SchemaFactory::new();
    /// let schema = factory.dynamic_schema("Note").unwrap();
    /// let dialect = SqliteDialect::new();
    /// let builder = StatementBuilder::new(&schema, &dialect);
    ///
    /// assert_eq!(builder.complete_select("WHERE id = @0"), r#"SELECT * FROM "notes" WHERE id = @0"#);
    /// assert_eq!(builder.complete_select("FROM x"), "SELECT * FROM x");
    /// assert_eq!(builder.complete_select("SELECT 1"), "SELECT 1");
    /// ```
    #[must_use]
    pub fn complete_select(&self, sql: &str) -> String {
        if SELECT_PREFIX.is_match(sql) {
            return sql.to_string();
        }
        let columns = self.column_list(&self.compiler(&Query::new())).0;
        let sql = sql.trim();
        if FROM_PREFIX.is_match(sql) {
            format!("SELECT {columns} {sql}")
        } else if sql.is_empty() {
            format!("SELECT {columns} FROM {}", self.table())
        } else {
            format!("SELECT {columns} FROM {} {sql}", self.table())
        }
    }

    /// Hand-written SQL with `@N` placeholders, completed by
    /// [`complete_select`](Self::complete_select) and assembled.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ParameterOutOfRange`] if a placeholder has no
    /// parameter.
    pub fn raw(&self, sql: &str, params: Vec<SqlValue>) -> Result<QueryPlan, CompileError> {
        QueryPlan::raw(self.complete_select(sql), params, self.dialect)
    }

    fn compiler(&self, query: &Query) -> ExpressionCompiler<'a> {
        let mut options = CompileOptions::default();
        if let Some(alias) = query.table_alias() {
            options = options.table_alias(alias);
        }
        ExpressionCompiler::new(self.schema, self.dialect).with_options(options)
    }

    fn table(&self) -> String {
        self.dialect.quote_identifier(self.schema.table_name())
    }

    fn from_clause(&self, query: &Query) -> String {
        match query.table_alias() {
            Some(alias) => format!("{} {alias}", self.table()),
            None => self.table(),
        }
    }

    fn column_list(&self, compiler: &ExpressionCompiler<'_>) -> (String, Vec<OutputColumn>) {
        if self.schema.is_dynamic() {
            let star = match &compiler.options().table_alias {
                Some(alias) => format!("{alias}.*"),
                None => String::from("*"),
            };
            return (star, Vec::new());
        }
        let leaves = self.schema.leaf_columns();
        let items: Vec<String> = leaves.iter().map(|c| compiler.select_item(c)).collect();
        let outputs = leaves
            .iter()
            .map(|c| OutputColumn {
                name: c.output_name().to_string(),
                root: 0,
                path: Some(c.path().to_vec()),
            })
            .collect();
        (items.join(", "), outputs)
    }

    fn select_fragment(&self, query: &Query) -> Result<(Fragment, Vec<OutputColumn>), CompileError> {
        let compiler = self.compiler(query);
        let (list, outputs) = match query.projection().filter(|p| !p.is_empty()) {
            Some(projection) => {
                let compiled = compiler.projection(projection)?;
                (compiled.fragment, compiled.outputs)
            }
            None => {
                let (columns, outputs) = self.column_list(&compiler);
                (Fragment::raw(columns), outputs)
            }
        };

        let mut fragment = Fragment::raw(if query.is_distinct() {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });
        fragment.push(list);
        fragment.push_sql(format!(" FROM {}", self.from_clause(query)));
        if let Some(filter) = query.filter_expr() {
            fragment.push_sql(" WHERE ");
            fragment.push(compiler.predicate(filter)?);
        }
        if !query.ordering().is_empty() {
            fragment.push_sql(" ORDER BY ");
            fragment.push(compiler.ordering(query.ordering())?);
        }
        Ok((fragment, outputs))
    }

    fn paged(
        &self,
        fragment: &Fragment,
        outputs: Vec<OutputColumn>,
        skip: i64,
        take: i64,
    ) -> Result<QueryPlan, CompileError> {
        if skip < 0 || take < 0 {
            return Err(CompileError::InvalidPage { skip, take });
        }
        let (sql, mut params) = fragment.merged()?;
        let paged = self
            .dialect
            .page(&SelectParts::parse(&sql), params.len(), skip, take);
        params.extend(paged.params);
        QueryPlan::assemble(&Fragment::new(paged.sql, params), outputs, self.dialect)
    }

    fn slots(&self, record: &RecordValue) -> Vec<Slot<'a>> {
        let is_key = |name: &str| {
            self.schema
                .primary_keys()
                .iter()
                .any(|k| k.eq_ignore_ascii_case(name))
        };

        if self.schema.is_dynamic() {
            return record
                .iter()
                .filter_map(|(name, value)| {
                    value.as_scalar().map(|v| Slot {
                        name: name.to_string(),
                        path: vec![name.to_string()],
                        value: v.clone(),
                        descriptor: None,
                        primary_key: is_key(name),
                    })
                })
                .collect();
        }

        self.schema
            .leaf_columns()
            .into_iter()
            .map(|column| Slot {
                name: column.column_name().to_string(),
                path: column.path().to_vec(),
                value: column.value_in(record),
                descriptor: Some(column),
                primary_key: column.flags().primary_key,
            })
            .collect()
    }

    fn key_values(&self, record: &RecordValue) -> Result<Vec<SqlValue>, CompileError> {
        let keys = self.schema.primary_keys();
        if keys.is_empty() {
            return Err(CompileError::MissingPrimaryKey(
                self.schema.type_name().to_string(),
            ));
        }
        Ok(keys
            .iter()
            .map(|name| match self.schema.find_column(name) {
                Some(column) => column.value_in(record),
                None => record
                    .get(name)
                    .and_then(Value::as_scalar)
                    .cloned()
                    .unwrap_or(SqlValue::Null),
            })
            .collect())
    }

    fn key_predicate(&self, key: Vec<SqlValue>) -> Result<Fragment, CompileError> {
        let keys = self.schema.primary_keys();
        if keys.is_empty() {
            return Err(CompileError::MissingPrimaryKey(
                self.schema.type_name().to_string(),
            ));
        }
        if keys.len() != key.len() {
            return Err(CompileError::KeyArity {
                type_name: self.schema.type_name().to_string(),
                expected: keys.len(),
                found: key.len(),
            });
        }
        let sql = keys
            .iter()
            .enumerate()
            .map(|(i, k)| format!("{} = @{i}", self.dialect.quote_identifier(k)))
            .collect::<Vec<_>>()
            .join(" AND ");
        Ok(Fragment::new(sql, key))
    }

    fn update_where(
        &self,
        record: &RecordValue,
        include: impl Fn(&Slot<'_>) -> bool,
    ) -> Result<UpdatePlan, CompileError> {
        let key = self.key_values(record)?;
        let assignments: Vec<Fragment> = self
            .slots(record)
            .into_iter()
            .filter(|slot| slot.updatable() && include(slot))
            .map(|slot| {
                Fragment::new(
                    format!("{} = @0", self.dialect.quote_identifier(&slot.name)),
                    vec![slot.value],
                )
            })
            .collect();
        if assignments.is_empty() {
            return Err(CompileError::NoWritableColumns(
                self.schema.type_name().to_string(),
            ));
        }

        let mut set = Fragment::join(assignments, ", ");
        let mut check = Fragment::default();
        let mut version = None;
        let mut read_back = None;

        if let Some(column) = self.schema.version_column() {
            let quoted = self.dialect.quote_identifier(column.column_name());
            let current = column.value_in(record);
            check = if current.is_null() {
                Fragment::raw(format!(" AND {quoted} IS NULL"))
            } else {
                Fragment::new(format!(" AND {quoted} = @0"), vec![current.clone()])
            };

            let kind = column.flags().version.unwrap_or(VersionKind::Number);
            if kind == VersionKind::Number {
                set.push_sql(format!(", {quoted} = {quoted} + 1"));
            } else {
                let select = Fragment::raw(format!("SELECT {quoted} FROM {} WHERE ", self.table()))
                    .then(self.key_predicate(key.clone())?);
                let output = OutputColumn {
                    name: column.output_name().to_string(),
                    root: 0,
                    path: Some(column.path().to_vec()),
                };
                read_back = Some(QueryPlan::assemble(&select, vec![output], self.dialect)?);
            }
            version = Some(VersionUpdate {
                kind,
                path: column.path().to_vec(),
                next: match (kind, current) {
                    (VersionKind::Number, SqlValue::Int(n)) => Some(SqlValue::Int(n + 1)),
                    _ => None,
                },
            });
        }

        let fragment = Fragment::raw(format!("UPDATE {} SET ", self.table()))
            .then(set)
            .then_sql(" WHERE ")
            .then(self.key_predicate(key)?)
            .then(check);
        Ok(UpdatePlan {
            statement: QueryPlan::assemble(&fragment, Vec::new(), self.dialect)?,
            version,
            read_back,
        })
    }
}
