//! Expression-to-SQL compilation.

use tracing::trace;

use super::ast::{BinaryOp, Expr};
use super::fragment::Fragment;
use super::projection::{OrderKey, Projection};
use crate::dialect::{Dialect, SqlFunction};
use crate::error::CompileError;
use crate::schema::{ColumnDescriptor, TypeSchema, ValueType, NESTING_DELIMITER};
use crate::value::SqlValue;

/// Knobs for a single compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Binds equal literals once and refers to them by the same placeholder.
    pub reuse_parameters: bool,
    /// Qualifies every column with this table alias.
    pub table_alias: Option<String>,
}

impl CompileOptions {
    #[must_use]
    pub const fn reuse_parameters(mut self, reuse: bool) -> Self {
        self.reuse_parameters = reuse;
        self
    }

    #[must_use]
    pub fn table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = Some(alias.into());
        self
    }
}

/// One column of a result set and the field it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Column name as it appears in the result set.
    pub name: String,
    /// Index of the root type the column belongs to.
    pub root: usize,
    /// Field path within that root, if the column maps to a field.
    pub path: Option<Vec<String>>,
}

/// A compiled SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProjection {
    pub fragment: Fragment,
    pub outputs: Vec<OutputColumn>,
}

/// Translates [`Expr`] trees into [`Fragment`]s for one schema and dialect.
#[derive(Debug)]
pub struct ExpressionCompiler<'a> {
    schema: &'a TypeSchema,
    dialect: &'a dyn Dialect,
    options: CompileOptions,
}

struct ColumnRef {
    sql: String,
    is_bool: bool,
}

impl<'a> ExpressionCompiler<'a> {
    #[must_use]
    pub fn new(schema: &'a TypeSchema, dialect: &'a dyn Dialect) -> Self {
        Self {
            schema,
            dialect,
            options: CompileOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn schema(&self) -> &TypeSchema {
        self.schema
    }

    #[must_use]
    pub const fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles a boolean predicate.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for unsupported nodes or unknown members.
    pub fn predicate(&self, expr: &Expr) -> Result<Fragment, CompileError> {
        let mut emitter = Emitter::new(self);
        let sql = emitter.predicate(expr)?;
        trace!(expr = %expr, sql = %sql, "compiled predicate");
        Ok(Fragment::new(sql, emitter.params))
    }

    /// Compiles a SELECT list and its output-column map.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for unsupported nodes, unknown members or
    /// members without columns.
    pub fn projection(&self, projection: &Projection) -> Result<CompiledProjection, CompileError> {
        let mut emitter = Emitter::new(self);
        let mut items = Vec::new();
        let mut outputs = Vec::new();

        for item in projection.items() {
            match (&item.expr, &item.alias) {
                (Expr::Member(path), None) => {
                    for (sql, output) in self.member_columns(path)? {
                        items.push(sql);
                        outputs.push(output);
                    }
                }
                (expr, alias) => {
                    let sql = emitter.value(expr)?;
                    let name = alias.clone().unwrap_or_else(|| expr.to_string());
                    items.push(match alias {
                        Some(alias) => format!("{sql} AS {}", self.dialect.quote_identifier(alias)),
                        None => sql,
                    });
                    outputs.push(OutputColumn {
                        name,
                        root: 0,
                        path: match expr {
                            Expr::Member(path) => Some(path.clone()),
                            _ => None,
                        },
                    });
                }
            }
        }

        Ok(CompiledProjection {
            fragment: Fragment::new(items.join(", "), emitter.params),
            outputs,
        })
    }

    /// Compiles ORDER BY keys, without the `ORDER BY` keyword.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for unsupported nodes or unknown members.
    pub fn ordering(&self, keys: &[OrderKey]) -> Result<Fragment, CompileError> {
        let mut emitter = Emitter::new(self);
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let sql = emitter.value(&key.expr)?;
            items.push(if key.descending {
                format!("{sql} DESC")
            } else {
                sql
            });
        }
        Ok(Fragment::new(items.join(", "), emitter.params))
    }

    /// Qualified, quoted reference to a physical column.
    #[must_use]
    pub fn column_sql(&self, column_name: &str) -> String {
        let quoted = self.dialect.quote_identifier(column_name);
        match &self.options.table_alias {
            Some(alias) => format!("{alias}.{quoted}"),
            None => quoted,
        }
    }

    /// SELECT-list entry for a descriptor: the column, aliased to its
    /// output name when the two differ.
    #[must_use]
    pub fn select_item(&self, column: &ColumnDescriptor) -> String {
        let sql = self.column_sql(column.column_name());
        if column.output_name() == column.column_name() && self.options.table_alias.is_none() {
            sql
        } else {
            format!(
                "{sql} AS {}",
                self.dialect.quote_identifier(column.output_name())
            )
        }
    }

    fn member_columns(&self, path: &[String]) -> Result<Vec<(String, OutputColumn)>, CompileError> {
        if self.schema.is_dynamic() {
            let name = path.join(NESTING_DELIMITER);
            return Ok(vec![(
                self.column_sql(&name),
                OutputColumn {
                    name,
                    root: 0,
                    path: Some(path.to_vec()),
                },
            )]);
        }

        let descriptor = self.lookup(path)?;
        let leaves: Vec<&ColumnDescriptor> = match descriptor.nested() {
            Some(_) => self
                .schema
                .leaf_columns()
                .into_iter()
                .filter(|c| c.path().starts_with(descriptor.path()))
                .collect(),
            None if descriptor.is_column() => vec![descriptor],
            None => return Err(self.not_a_column(path)),
        };
        Ok(leaves
            .into_iter()
            .map(|leaf| {
                (
                    self.select_item(leaf),
                    OutputColumn {
                        name: leaf.output_name().to_string(),
                        root: 0,
                        path: Some(leaf.path().to_vec()),
                    },
                )
            })
            .collect())
    }

    fn lookup(&self, path: &[String]) -> Result<&'a ColumnDescriptor, CompileError> {
        if let Some(found) = self.schema.find_path(path) {
            return Ok(found);
        }
        // `author.id` names the column of a reference field `author`.
        if let Some((last, parent)) = path.split_last() {
            if let Some(reference) = self.schema.find_path(parent) {
                if reference.reference_member() == Some(last.as_str()) {
                    return Ok(reference);
                }
            }
        }
        Err(CompileError::UnknownMember {
            type_name: self.schema.type_name().to_string(),
            member: path.join("."),
        })
    }

    fn column(&self, path: &[String]) -> Result<ColumnRef, CompileError> {
        if self.schema.is_dynamic() {
            return Ok(ColumnRef {
                sql: self.column_sql(&path.join(NESTING_DELIMITER)),
                is_bool: false,
            });
        }
        let descriptor = self.lookup(path)?;
        if !descriptor.is_column() {
            return Err(self.not_a_column(path));
        }
        Ok(ColumnRef {
            sql: self.column_sql(descriptor.column_name()),
            is_bool: matches!(descriptor.value_type(), ValueType::Bool),
        })
    }

    fn not_a_column(&self, path: &[String]) -> CompileError {
        CompileError::NotAColumn {
            type_name: self.schema.type_name().to_string(),
            member: path.join("."),
        }
    }
}

struct Emitter<'c, 'a> {
    compiler: &'c ExpressionCompiler<'a>,
    params: Vec<SqlValue>,
}

impl<'c, 'a> Emitter<'c, 'a> {
    const fn new(compiler: &'c ExpressionCompiler<'a>) -> Self {
        Self {
            compiler,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: SqlValue) -> String {
        if self.compiler.options.reuse_parameters {
            if let Some(index) = self.params.iter().position(|p| *p == value) {
                return format!("@{index}");
            }
        }
        self.params.push(value);
        format!("@{}", self.params.len() - 1)
    }

    fn predicate(&mut self, expr: &Expr) -> Result<String, CompileError> {
        match expr {
            Expr::Binary { op, left, right } if op.is_logical() => {
                let left = self.predicate(left)?;
                let right = self.predicate(right)?;
                Ok(format!("({left} {} {right})", op.as_str()))
            }
            Expr::Not(inner) => Ok(format!("NOT ({})", self.predicate(inner)?)),
            Expr::Member(path) => {
                let column = self.compiler.column(path)?;
                if column.is_bool {
                    let param = self.bind(self.compiler.dialect.bool_value(true));
                    Ok(format!("{} = {param}", column.sql))
                } else {
                    Ok(column.sql)
                }
            }
            Expr::Literal(SqlValue::Bool(true)) => Ok(String::from("1 = 1")),
            Expr::Literal(SqlValue::Bool(false)) => Ok(String::from("1 = 0")),
            _ => self.value(expr),
        }
    }

    fn value(&mut self, expr: &Expr) -> Result<String, CompileError> {
        match expr {
            Expr::Member(path) => Ok(self.compiler.column(path)?.sql),
            Expr::Literal(value) => Ok(self.bind(value.clone())),
            Expr::List(_) => Err(CompileError::UnsupportedExpression(format!(
                "{} node `{expr}` outside of contains",
                expr.kind()
            ))),
            Expr::Binary { op, .. } if op.is_logical() => self.predicate(expr),
            Expr::Not(_) => self.predicate(expr),
            Expr::Binary { op, left, right } if op.is_comparison() => {
                self.comparison(*op, left, right)
            }
            Expr::Binary { op, left, right } => {
                let left = self.value(left)?;
                let right = self.value(right)?;
                Ok(format!("({left} {} {right})", op.as_str()))
            }
            Expr::Call {
                method,
                target,
                args,
            } => self.call(expr, method, target, args),
        }
    }

    fn comparison(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<String, CompileError> {
        let null_test = match op {
            BinaryOp::Eq => Some("IS NULL"),
            BinaryOp::Ne => Some("IS NOT NULL"),
            _ => None,
        };
        if let Some(test) = null_test {
            match (left, right) {
                (operand, Expr::Literal(SqlValue::Null)) | (Expr::Literal(SqlValue::Null), operand) => {
                    return Ok(format!("{} {test}", self.operand(operand)?));
                }
                _ => {}
            }
        }
        let left = self.operand(left)?;
        let right = self.operand(right)?;
        Ok(format!("{left} {} {right}", op.as_str()))
    }

    /// A comparison operand; nested predicates are parenthesized.
    fn operand(&mut self, expr: &Expr) -> Result<String, CompileError> {
        let sql = self.value(expr)?;
        let predicate = match expr {
            Expr::Binary { op, .. } => op.is_comparison(),
            Expr::Not(_) => true,
            Expr::Call { method, .. } => matches!(
                method.as_str(),
                "contains" | "in_list" | "starts_with" | "ends_with" | "has_value"
            ),
            _ => false,
        };
        Ok(if predicate { format!("({sql})") } else { sql })
    }

    fn call(
        &mut self,
        expr: &Expr,
        method: &str,
        target: &Expr,
        args: &[Expr],
    ) -> Result<String, CompileError> {
        match (method, args) {
            ("contains", [item]) => match target {
                Expr::List(values) => self.membership(item, values),
                _ => self.like(target, item, "%", "%", expr),
            },
            ("in_list", [Expr::List(values)]) => self.membership(target, values),
            ("starts_with", [prefix]) => self.like(target, prefix, "", "%", expr),
            ("ends_with", [suffix]) => self.like(target, suffix, "%", "", expr),
            ("upper", []) => self.function(SqlFunction::Upper, target),
            ("lower", []) => self.function(SqlFunction::Lower, target),
            ("length", []) => self.function(SqlFunction::Length, target),
            ("has_value", []) => Ok(format!("{} IS NOT NULL", self.value(target)?)),
            _ => Err(CompileError::UnsupportedExpression(format!(
                "{} node `{expr}`: unknown method `{method}`",
                expr.kind()
            ))),
        }
    }

    fn function(&mut self, function: SqlFunction, target: &Expr) -> Result<String, CompileError> {
        let name = self.compiler.dialect.function_name(function);
        Ok(format!("{name}({})", self.value(target)?))
    }

    fn membership(&mut self, item: &Expr, values: &[SqlValue]) -> Result<String, CompileError> {
        let item = self.value(item)?;
        if values.is_empty() {
            return Ok(String::from("1 = 0"));
        }
        let alternatives: Vec<String> = values
            .iter()
            .map(|v| format!("{item} = {}", self.bind(v.clone())))
            .collect();
        Ok(format!("({})", alternatives.join(" OR ")))
    }

    fn like(
        &mut self,
        target: &Expr,
        pattern: &Expr,
        before: &str,
        after: &str,
        expr: &Expr,
    ) -> Result<String, CompileError> {
        let Expr::Literal(SqlValue::Text(text)) = pattern else {
            return Err(CompileError::UnsupportedExpression(format!(
                "`{expr}`: pattern must be a text literal"
            )));
        };
        let dialect = self.compiler.dialect;
        let target = self.value(target)?;
        let param = self.bind(SqlValue::Text(format!(
            "{before}{}{after}",
            dialect.escape_like(text)
        )));
        Ok(format!("{target} LIKE {param}{}", dialect.like_escape_clause()))
    }
}
