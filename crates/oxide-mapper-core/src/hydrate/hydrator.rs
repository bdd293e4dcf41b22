//! Row-to-record materialization.

use std::collections::HashSet;
use std::ops::Range;

use tracing::{trace, warn};

use super::convert::convert_cell;
use super::cursor::RowCursor;
use crate::error::{Error, HydrationError};
use crate::record::{Record, RecordValue, Value};
use crate::schema::{ColumnDescriptor, SchemaFactory, TypeSchema, ValueType, NESTING_DELIMITER};
use crate::value::SqlValue;

/// Prefix of columns the mapper adds to generated SQL (paging row numbers,
/// split markers). They are never mapped to fields.
pub const RESERVED_PREFIX: &str = "oxide_";

/// Prefix of marker columns separating the roots of a multi-type row.
pub const SPLIT_MARKER: &str = "oxide_split";

#[derive(Debug)]
enum Target<'s> {
    Column(&'s ColumnDescriptor),
    Dynamic(Vec<String>),
}

#[derive(Debug)]
struct Binding<'s> {
    ordinal: usize,
    target: Target<'s>,
}

/// Materializes cursor rows into records.
///
/// Columns are matched to fields by result-set name first and physical
/// column name second, both case-insensitively. Nested records only come
/// into existence when at least one of their columns is non-null in the
/// row, independently at every depth.
#[derive(Debug, Clone, Copy)]
pub struct Hydrator<'f> {
    factory: &'f SchemaFactory,
}

impl<'f> Hydrator<'f> {
    #[must_use]
    pub const fn new(factory: &'f SchemaFactory) -> Self {
        Self { factory }
    }

    /// Reads every remaining row as a `T`.
    ///
    /// # Errors
    ///
    /// Returns a schema error if `T` does not resolve, or a hydration error
    /// for the first row that does not convert.
    pub fn read<T: Record>(&self, cursor: &mut dyn RowCursor) -> Result<Vec<T>, Error> {
        let schema = self.factory.schema::<T>()?;
        let records = self.read_records(&schema, cursor)?;
        Ok(records
            .into_iter()
            .map(|record| materialize(&schema, record))
            .collect::<Result<_, _>>()?)
    }

    /// Reads every remaining row into the dynamic record shape `name`.
    ///
    /// Column names containing the nesting delimiter become nested records.
    ///
    /// # Errors
    ///
    /// Returns a hydration error if the cursor fails.
    pub fn read_values(&self, name: &str, cursor: &mut dyn RowCursor) -> Result<Vec<RecordValue>, Error> {
        let schema = self.factory.dynamic_schema(name)?;
        Ok(self.read_records(&schema, cursor)?)
    }

    /// Reads every remaining row against a resolved schema.
    ///
    /// # Errors
    ///
    /// Returns a [`HydrationError`] for the first value that does not
    /// convert.
    pub fn read_records(
        &self,
        schema: &TypeSchema,
        cursor: &mut dyn RowCursor,
    ) -> Result<Vec<RecordValue>, HydrationError> {
        let count = cursor.column_count();
        let bindings = bind(schema, cursor, 0..count);
        let mut records = Vec::new();
        while cursor.advance()? {
            records.push(build_record(schema, &bindings, cursor)?);
        }
        trace!(type_name = schema.type_name(), rows = records.len(), "hydrated rows");
        Ok(records)
    }

    /// Reads rows holding several root records side by side.
    ///
    /// Columns are assigned to roots at marker columns named
    /// `oxide_split*` when present. Otherwise they are assigned greedily:
    /// a column moves on to the next root when the current root does not
    /// own it or has already been given a column of that name.
    ///
    /// A root whose columns are all null in a row reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`HydrationError`] for the first value that does not
    /// convert.
    pub fn read_multi(
        &self,
        schemas: &[&TypeSchema],
        cursor: &mut dyn RowCursor,
    ) -> Result<Vec<Vec<Option<RecordValue>>>, HydrationError> {
        let groups = split(schemas, cursor);
        let mut rows = Vec::new();
        while cursor.advance()? {
            let mut row = Vec::with_capacity(schemas.len());
            for (schema, bindings) in schemas.iter().zip(&groups) {
                let empty = bindings.iter().all(|b| cursor.is_null(b.ordinal));
                row.push(if empty {
                    None
                } else {
                    Some(build_record(schema, bindings, cursor)?)
                });
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Reads rows joining two record types.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub fn read_pair<A: Record, B: Record>(
        &self,
        cursor: &mut dyn RowCursor,
    ) -> Result<Vec<(A, Option<B>)>, Error> {
        let first = self.factory.schema::<A>()?;
        let second = self.factory.schema::<B>()?;
        let rows = self.read_multi(&[&*first, &*second], cursor)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut roots = row.into_iter();
            let a = roots.next().flatten().unwrap_or_default();
            let b = roots.next().flatten();
            out.push((
                materialize(&first, a)?,
                b.map(|b| materialize(&second, b)).transpose()?,
            ));
        }
        Ok(out)
    }

    /// Reads parent rows joined with their children.
    ///
    /// Consecutive rows with the same parent key collapse into one parent
    /// whose collection field of `C` receives every non-empty child. Rows
    /// must arrive ordered by parent key. Parents without a primary key are
    /// compared by all of their columns.
    ///
    /// # Errors
    ///
    /// Returns [`HydrationError::MissingRelation`] if `P` has no collection
    /// of `C`, otherwise the same as [`read`](Self::read).
    pub fn read_one_to_many<P: Record, C: Record>(&self, cursor: &mut dyn RowCursor) -> Result<Vec<P>, Error> {
        let parent = self.factory.schema::<P>()?;
        let child = self.factory.schema::<C>()?;
        let relation = parent
            .relations()
            .into_iter()
            .find(|r| is_collection_of(r.value_type(), &child))
            .ok_or_else(|| HydrationError::MissingRelation {
                type_name: parent.type_name().to_string(),
                child: child.type_name().to_string(),
            })?
            .field_name()
            .to_string();

        let key_columns = parent.primary_key_columns();
        let mut groups: Vec<(Option<Vec<SqlValue>>, RecordValue, Vec<Value>)> = Vec::new();

        for row in self.read_multi(&[&*parent, &*child], cursor)? {
            let mut roots = row.into_iter();
            let record = roots.next().flatten().unwrap_or_default();
            let element = roots.next().flatten();

            let key = (!key_columns.is_empty())
                .then(|| key_columns.iter().map(|c| c.value_in(&record)).collect::<Vec<_>>());
            let same = groups.last().is_some_and(|(last_key, last, _)| match (&key, last_key) {
                (Some(a), Some(b)) => a == b,
                _ => *last == record,
            });
            if !same {
                groups.push((key, record, Vec::new()));
            }
            if let (Some(element), Some((_, _, children))) = (element, groups.last_mut()) {
                children.push(Value::Record(element));
            }
        }

        trace!(
            parent = parent.type_name(),
            child = child.type_name(),
            parents = groups.len(),
            "grouped one-to-many rows"
        );
        groups
            .into_iter()
            .map(|(_, mut record, children)| {
                record.insert(relation.as_str(), Value::List(children));
                materialize(&parent, record).map_err(Error::from)
            })
            .collect()
    }
}

fn is_collection_of(value_type: &ValueType, child: &TypeSchema) -> bool {
    match value_type {
        ValueType::List(inner) => {
            matches!(inner.as_ref(), ValueType::Record(info) if info().key() == child.key())
        }
        _ => false,
    }
}

fn materialize<T: Record>(schema: &TypeSchema, record: RecordValue) -> Result<T, HydrationError> {
    T::from_record(record).map_err(|source| HydrationError::Record {
        type_name: schema.type_name().to_string(),
        source,
    })
}

fn owns(schema: &TypeSchema, name: &str) -> bool {
    schema.is_dynamic() || lookup(schema, name).is_some()
}

fn lookup<'s>(schema: &'s TypeSchema, name: &str) -> Option<&'s ColumnDescriptor> {
    schema
        .find_output(name)
        .or_else(|| schema.find_column(name))
}

fn bind<'s>(
    schema: &'s TypeSchema,
    cursor: &dyn RowCursor,
    ordinals: Range<usize>,
) -> Vec<Binding<'s>> {
    let mut bindings = Vec::new();
    for ordinal in ordinals {
        let name = cursor.column_name(ordinal);
        if name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        if let Some(target) = bind_column(schema, name) {
            bindings.push(Binding { ordinal, target });
        } else {
            warn!(
                type_name = schema.type_name(),
                column = name,
                "skipping unmapped result column"
            );
        }
    }
    bindings
}

fn bind_column<'s>(schema: &'s TypeSchema, name: &str) -> Option<Target<'s>> {
    if schema.is_dynamic() {
        return Some(Target::Dynamic(
            name.split(NESTING_DELIMITER).map(String::from).collect(),
        ));
    }
    lookup(schema, name).map(Target::Column)
}

fn split<'s>(schemas: &[&'s TypeSchema], cursor: &dyn RowCursor) -> Vec<Vec<Binding<'s>>> {
    let count = cursor.column_count();
    let markers: Vec<usize> = (0..count)
        .filter(|&i| cursor.column_name(i).starts_with(SPLIT_MARKER))
        .collect();

    if !markers.is_empty() {
        let mut ranges = Vec::with_capacity(markers.len() + 1);
        let mut start = 0;
        for marker in markers {
            ranges.push(start..marker);
            start = marker + 1;
        }
        ranges.push(start..count);
        if ranges.len() != schemas.len() {
            warn!(
                sections = ranges.len(),
                roots = schemas.len(),
                "split markers do not match the number of root types"
            );
        }
        return schemas
            .iter()
            .enumerate()
            .map(|(i, schema)| match ranges.get(i) {
                Some(range) => bind(schema, cursor, range.clone()),
                None => Vec::new(),
            })
            .collect();
    }

    let mut groups: Vec<Vec<Binding<'s>>> = schemas.iter().map(|_| Vec::new()).collect();
    let mut root = 0;
    let mut seen = HashSet::new();
    for ordinal in 0..count {
        let name = cursor.column_name(ordinal);
        if name.starts_with(RESERVED_PREFIX) || schemas.is_empty() {
            continue;
        }
        let key = name.to_ascii_lowercase();
        let fits = |schema: &TypeSchema, seen: &HashSet<String>| owns(schema, name) && !seen.contains(&key);

        if !fits(schemas[root], &seen) && root + 1 < schemas.len() && owns(schemas[root + 1], name) {
            root += 1;
            seen.clear();
        }
        match bind_column(schemas[root], name) {
            Some(target) if !seen.contains(&key) => {
                seen.insert(key);
                groups[root].push(Binding { ordinal, target });
            }
            _ => warn!(
                type_name = schemas[root].type_name(),
                column = name,
                "skipping unmapped result column"
            ),
        }
    }
    groups
}

fn build_record(
    schema: &TypeSchema,
    bindings: &[Binding<'_>],
    cursor: &dyn RowCursor,
) -> Result<RecordValue, HydrationError> {
    let mut record = RecordValue::new();
    let mut nulls = Vec::new();

    for binding in bindings {
        let raw = cursor.value(binding.ordinal);
        if raw.is_null() {
            nulls.push(binding);
            continue;
        }
        match &binding.target {
            Target::Dynamic(path) => record.set_path(path.as_slice(), raw),
            Target::Column(column) => {
                let value = convert_cell(raw, schema.type_name(), column)?;
                match column.reference_member() {
                    Some(member) => {
                        let mut path = column.path().to_vec();
                        path.push(member.to_string());
                        record.set_path(path.as_slice(), value);
                    }
                    None => record.set_path(column.path(), value),
                }
            }
        }
    }

    // Null leaves are only written into records that exist by now, so an
    // all-null nested group never materializes.
    for binding in nulls {
        let path = match &binding.target {
            Target::Dynamic(path) => path.as_slice(),
            Target::Column(column) if column.is_nullable() && column.reference_member().is_none() => {
                column.path()
            }
            Target::Column(_) => continue,
        };
        if let Some((_, parent)) = path.split_last() {
            if record.has_record_at(parent) {
                record.set_path(path, Value::NULL);
            }
        }
    }
    Ok(record)
}
