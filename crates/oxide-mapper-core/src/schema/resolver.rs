//! Builds a [`TypeSchema`] from a [`TypeInfo`], conventions and mappings.
//!
//! Precedence, lowest first: conventions, annotations carried by the type,
//! explicit [`Mappings`]. Merging is per property, never per record.

use std::collections::HashMap;

use tracing::debug;

use super::config::{ColumnOverrides, Mappings, TableOverrides, TypeMapping};
use super::convention::{nested_prefix, Conventions};
use super::type_info::{FieldInfo, TypeInfo, TypeKey, ValueType};
use super::{ColumnDescriptor, ColumnFlags, NestedColumns, TypeSchema};
use crate::error::SchemaError;

/// Resolves the schema of `info`.
///
/// # Errors
///
/// Returns a [`SchemaError`] on column collisions, a composite key marked
/// autoincrement, recursive nesting, unknown configured fields or unknown
/// reference members.
pub fn resolve(
    info: &TypeInfo,
    conventions: &Conventions,
    mappings: &Mappings,
) -> Result<TypeSchema, SchemaError> {
    let mapping = mappings.get(info.name());
    let table = info
        .table()
        .clone()
        .overlay(mapping.map_or(&TableOverrides::default(), |m| &m.table));

    let table_name = table
        .table_name
        .clone()
        .unwrap_or_else(|| conventions.table_name(info.name()));

    let resolver = FieldResolver {
        conventions,
        mappings,
    };
    let mut stack = vec![info.key().clone()];
    let columns = resolver.resolve_fields(info, mapping, None, &[], &mut stack)?;

    let mut schema = TypeSchema {
        key: info.key().clone(),
        type_name: info.name().to_string(),
        sequence: table
            .sequence
            .clone()
            .or_else(|| conventions.sequence_name(&table_name)),
        table_name,
        primary_keys: Vec::new(),
        autoincrement: false,
        columns,
    };

    schema.primary_keys = primary_keys(&schema, &table, info, conventions)?;
    mark_primary_keys(&mut schema.columns, &schema.primary_keys);

    let composite = schema.primary_keys.len() > 1;
    schema.autoincrement = match table.autoincrement {
        Some(true) if composite => {
            return Err(SchemaError::CompositeAutoIncrement {
                type_name: schema.type_name,
                columns: schema.primary_keys.join(", "),
            });
        }
        Some(explicit) => explicit && !schema.primary_keys.is_empty(),
        None => {
            !composite && !schema.primary_keys.is_empty() && conventions.default_autoincrement()
        }
    };

    check_collisions(&schema)?;

    debug!(
        type_name = %schema.type_name,
        table = %schema.table_name,
        columns = schema.leaf_columns().len(),
        "resolved type schema"
    );
    Ok(schema)
}

struct FieldResolver<'a> {
    conventions: &'a Conventions,
    mappings: &'a Mappings,
}

impl FieldResolver<'_> {
    fn resolve_fields(
        &self,
        info: &TypeInfo,
        mapping: Option<&TypeMapping>,
        prefix: Option<&str>,
        parent_path: &[String],
        stack: &mut Vec<TypeKey>,
    ) -> Result<Vec<ColumnDescriptor>, SchemaError> {
        if let Some(mapping) = mapping {
            if let Some(unknown) = mapping
                .columns
                .keys()
                .find(|field| info.find_field(field).is_none())
            {
                return Err(SchemaError::UnknownField {
                    type_name: info.name().to_string(),
                    field: unknown.clone(),
                });
            }
        }

        info.fields()
            .iter()
            .map(|field| {
                let overrides = field.overrides().clone().overlay(
                    mapping
                        .and_then(|m| m.columns.get(field.name()))
                        .unwrap_or(&ColumnOverrides::default()),
                );
                self.resolve_field(info, field, &overrides, prefix, parent_path, stack)
            })
            .collect()
    }

    fn resolve_field(
        &self,
        owner: &TypeInfo,
        field: &FieldInfo,
        overrides: &ColumnOverrides,
        prefix: Option<&str>,
        parent_path: &[String],
        stack: &mut Vec<TypeKey>,
    ) -> Result<ColumnDescriptor, SchemaError> {
        let mut path = parent_path.to_vec();
        path.push(field.name().to_string());

        let mut flags = ColumnFlags {
            primary_key: false,
            result_only: overrides.result_only.unwrap_or(false),
            ignored: overrides.ignore.unwrap_or(false),
            version: overrides.version,
            computed: overrides.computed,
            nested: false,
            reference: false,
            serialized: overrides.serialized.unwrap_or(false)
                || matches!(field.value_type(), ValueType::Json),
            force_utc: overrides.force_utc.unwrap_or(false),
            relation: false,
        };

        let prefixed = |name: String| match prefix {
            Some(p) => format!("{p}{name}"),
            None => name,
        };

        let mut value_type = field.value_type().clone();
        let mut reference_member = None;
        let mut nested = None;
        let base_name;

        match field.value_type() {
            _ if flags.ignored => {
                base_name = overrides
                    .column_name
                    .clone()
                    .unwrap_or_else(|| self.conventions.column_name(field.name()));
            }
            ValueType::Record(target) if overrides.reference.is_some() => {
                let member = overrides.reference.clone().unwrap_or_default();
                let target = target();
                let member_field = target.find_field(&member).ok_or_else(|| {
                    SchemaError::UnknownReferenceMember {
                        type_name: owner.name().to_string(),
                        field: field.name().to_string(),
                        target: target.name().to_string(),
                        member: member.clone(),
                    }
                })?;
                value_type = member_field.value_type().clone();
                base_name = overrides
                    .column_name
                    .clone()
                    .unwrap_or_else(|| self.conventions.reference_column(field.name(), &member));
                flags.reference = true;
                reference_member = Some(member);
            }
            ValueType::Record(target)
                if overrides
                    .nested
                    .unwrap_or_else(|| self.conventions.nests_records()) =>
            {
                let target = target();
                if stack.contains(target.key()) {
                    return Err(SchemaError::RecursiveNesting {
                        type_name: owner.name().to_string(),
                        field: field.name().to_string(),
                        nested: target.name().to_string(),
                    });
                }
                base_name = overrides
                    .column_name
                    .clone()
                    .unwrap_or_else(|| self.conventions.column_name(field.name()));
                let child_prefix = nested_prefix(&prefixed(base_name.clone()));
                stack.push(target.key().clone());
                let columns = self.resolve_fields(
                    &target,
                    self.mappings.get(target.name()),
                    Some(&child_prefix),
                    &path,
                    stack,
                )?;
                stack.pop();
                flags.nested = true;
                nested = Some(NestedColumns {
                    type_name: target.name().to_string(),
                    prefix: child_prefix,
                    columns,
                });
            }
            ValueType::Record(_) | ValueType::List(_) => {
                base_name = self.conventions.column_name(field.name());
                flags.relation = true;
            }
            _ if overrides.nested == Some(true) => {
                return Err(SchemaError::NotNestable {
                    type_name: owner.name().to_string(),
                    field: field.name().to_string(),
                });
            }
            _ => {
                base_name = overrides
                    .column_name
                    .clone()
                    .unwrap_or_else(|| self.conventions.column_name(field.name()));
                // A scalar foreign key already holds the referenced value.
                flags.reference = overrides.reference.is_some();
            }
        }

        let column_name = prefixed(base_name);
        let output_name = overrides
            .alias
            .clone()
            .map_or_else(|| column_name.clone(), prefixed);

        Ok(ColumnDescriptor {
            path,
            column_name,
            output_name,
            alias: overrides.alias.clone(),
            value_type,
            nullable: field.is_nullable(),
            flags: ColumnFlags {
                primary_key: overrides.primary_key.unwrap_or(false) && prefix.is_none(),
                ..flags
            },
            reference_member,
            nested,
        })
    }
}

fn primary_keys(
    schema: &TypeSchema,
    table: &TableOverrides,
    info: &TypeInfo,
    conventions: &Conventions,
) -> Result<Vec<String>, SchemaError> {
    if let Some(explicit) = &table.primary_key {
        return explicit
            .iter()
            .map(|pk| match schema.find_column(pk) {
                Some(column) => Ok(column.column_name.clone()),
                None if info.is_dynamic() => Ok(pk.clone()),
                None => Err(SchemaError::UnknownPrimaryKey {
                    type_name: info.name().to_string(),
                    column: pk.clone(),
                }),
            })
            .collect();
    }

    let marked: Vec<String> = schema
        .columns
        .iter()
        .filter(|c| c.flags.primary_key && c.is_column())
        .map(|c| c.column_name.clone())
        .collect();
    if !marked.is_empty() {
        return Ok(marked);
    }

    let conventional = conventions.primary_key(info.name());
    Ok(schema
        .columns
        .iter()
        .find(|c| c.is_column() && c.column_name.eq_ignore_ascii_case(&conventional))
        .map(|c| vec![c.column_name.clone()])
        .unwrap_or_default())
}

fn mark_primary_keys(columns: &mut [ColumnDescriptor], keys: &[String]) {
    for column in columns.iter_mut().filter(|c| c.is_column()) {
        column.flags.primary_key = keys
            .iter()
            .any(|k| k.eq_ignore_ascii_case(&column.column_name));
    }
}

fn check_collisions(schema: &TypeSchema) -> Result<(), SchemaError> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for column in schema.leaf_columns() {
        let key = column.column_name.to_lowercase();
        if let Some(first) = seen.get(&key) {
            return Err(SchemaError::ColumnCollision {
                type_name: schema.type_name.clone(),
                column: column.column_name.clone(),
                first: first.clone(),
                second: column.field_path(),
            });
        }
        seen.insert(key, column.field_path());
    }

    // Result columns bind by output name first, so aliases must not shadow
    // another column's output.
    let mut outputs: HashMap<String, String> = HashMap::new();
    for column in schema.leaf_columns() {
        let key = column.output_name.to_lowercase();
        if let Some(first) = outputs.get(&key) {
            return Err(SchemaError::ColumnCollision {
                type_name: schema.type_name.clone(),
                column: column.output_name.clone(),
                first: first.clone(),
                second: column.field_path(),
            });
        }
        outputs.insert(key, column.field_path());
    }
    Ok(())
}
