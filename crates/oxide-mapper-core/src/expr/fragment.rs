//! SQL fragments with local parameter numbering.
//!
//! Every piece of generated SQL refers to its own parameters as `@0`,
//! `@1`, ... Pieces are concatenated as they are, and placeholders are only
//! renumbered (and rendered in the dialect's style) once, when the final
//! statement is assembled.

use crate::dialect::{Dialect, ParamStyle};
use crate::error::CompileError;
use crate::value::SqlValue;

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    sql: String,
    params: Vec<SqlValue>,
}

/// SQL text plus its ordered bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    segments: Vec<Segment>,
}

impl Fragment {
    /// Creates a fragment whose text refers to `params` as `@0..`.
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            segments: vec![Segment {
                sql: sql.into(),
                params,
            }],
        }
    }

    /// Creates a fragment without parameters.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Appends `other` as is; its placeholders keep their local numbering.
    pub fn push(&mut self, other: Self) {
        self.segments.extend(other.segments);
    }

    /// Appends parameter-free SQL text.
    pub fn push_sql(&mut self, sql: impl Into<String>) {
        self.segments.push(Segment {
            sql: sql.into(),
            params: Vec::new(),
        });
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn then(mut self, other: Self) -> Self {
        self.push(other);
        self
    }

    /// Builder form of [`push_sql`](Self::push_sql).
    #[must_use]
    pub fn then_sql(mut self, sql: impl Into<String>) -> Self {
        self.push_sql(sql);
        self
    }

    /// Concatenates `parts` with `separator` between them.
    #[must_use]
    pub fn join(parts: impl IntoIterator<Item = Self>, separator: &str) -> Self {
        let mut out = Self::default();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push_sql(separator);
            }
            out.push(part);
        }
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.sql.is_empty())
    }

    /// Total number of parameters carried.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.segments.iter().map(|s| s.params.len()).sum()
    }

    /// All parameters in order.
    pub fn params(&self) -> impl Iterator<Item = &SqlValue> {
        self.segments.iter().flat_map(|s| s.params.iter())
    }

    /// Raw text with local placeholders, for diagnostics.
    #[must_use]
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.sql.as_str()).collect()
    }

    /// Renumbers placeholders globally (`@0..`) without dialect rendering.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ParameterOutOfRange`] if a placeholder refers
    /// past its segment's parameters.
    pub fn merged(&self) -> Result<(String, Vec<SqlValue>), CompileError> {
        self.render(|index| format!("@{index}"), false)
    }

    /// Renders placeholders in `dialect`'s style and orders parameters the
    /// way the driver binds them.
    ///
    /// Positional dialects receive one parameter per placeholder
    /// occurrence, so a reused placeholder duplicates its value.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ParameterOutOfRange`] if a placeholder refers
    /// past its segment's parameters.
    pub fn assemble(&self, dialect: &dyn Dialect) -> Result<(String, Vec<SqlValue>), CompileError> {
        let positional = dialect.param_style() == ParamStyle::Positional;
        self.render(|index| dialect.placeholder(index), positional)
    }

    fn render(
        &self,
        placeholder: impl Fn(usize) -> String,
        positional: bool,
    ) -> Result<(String, Vec<SqlValue>), CompileError> {
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut offset = 0;

        for segment in &self.segments {
            let mut occurrences = Vec::new();
            let text = renumber(&segment.sql, segment.params.len(), |local| {
                occurrences.push(local);
                placeholder(if positional { 0 } else { offset + local })
            })?;
            sql.push_str(&text);
            if positional {
                params.extend(occurrences.into_iter().map(|i| segment.params[i].clone()));
            } else {
                params.extend(segment.params.iter().cloned());
            }
            offset += segment.params.len();
        }
        Ok((sql, params))
    }
}

/// Rewrites every `@N` in `sql` through `replace`.
///
/// String literals, `@@name` variables and `@name` identifiers are left
/// untouched.
fn renumber(
    sql: &str,
    available: usize,
    mut replace: impl FnMut(usize) -> String,
) -> Result<String, CompileError> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    let mut in_string = false;

    while let Some((_, c)) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                out.push(c);
            }
            '@' => match chars.peek() {
                Some((_, '@')) => {
                    out.push_str("@@");
                    chars.next();
                }
                Some((_, d)) if d.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some((_, d)) = chars.peek().filter(|(_, d)| d.is_ascii_digit()) {
                        digits.push(*d);
                        chars.next();
                    }
                    let index: usize = digits.parse().map_err(|_| {
                        CompileError::ParameterOutOfRange {
                            index: usize::MAX,
                            available,
                        }
                    })?;
                    if index >= available {
                        return Err(CompileError::ParameterOutOfRange { index, available });
                    }
                    out.push_str(&replace(index));
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, PostgresDialect, SqlServerDialect};

    fn int(n: i64) -> SqlValue {
        SqlValue::Int(n)
    }

    #[test]
    fn test_concatenation_renumbers_per_segment() {
        let fragment = Fragment::new("a = @0", vec![int(1)])
            .then_sql(" AND ")
            .then(Fragment::new("b = @0 OR c = @1", vec![int(2), int(3)]));
        let (sql, params) = fragment.merged().unwrap();
        assert_eq!(sql, "a = @0 AND b = @1 OR c = @2");
        assert_eq!(params, vec![int(1), int(2), int(3)]);
    }

    #[test]
    fn test_numbered_and_named_styles() {
        let fragment = Fragment::new("x = @0", vec![int(1)])
            .then(Fragment::new(" AND y = @0", vec![int(2)]));
        let (sql, _) = fragment.assemble(&PostgresDialect::new()).unwrap();
        assert_eq!(sql, "x = $1 AND y = $2");
        let (sql, _) = fragment.assemble(&SqlServerDialect::new()).unwrap();
        assert_eq!(sql, "x = @p0 AND y = @p1");
    }

    #[test]
    fn test_positional_duplicates_reused_parameters() {
        let fragment = Fragment::new("a = @0 OR b = @0 OR c = @1", vec![int(1), int(2)]);
        let (sql, params) = fragment.assemble(&GenericDialect::new()).unwrap();
        assert_eq!(sql, "a = ? OR b = ? OR c = ?");
        assert_eq!(params, vec![int(1), int(1), int(2)]);

        let (sql, params) = fragment.assemble(&PostgresDialect::new()).unwrap();
        assert_eq!(sql, "a = $1 OR b = $1 OR c = $2");
        assert_eq!(params, vec![int(1), int(2)]);
    }

    #[test]
    fn test_literals_and_variables_untouched() {
        let fragment = Fragment::new(
            "SELECT @@IDENTITY, 'mail@0x.io', @name WHERE a = @0",
            vec![int(1)],
        );
        let (sql, params) = fragment.merged().unwrap();
        assert_eq!(sql, "SELECT @@IDENTITY, 'mail@0x.io', @name WHERE a = @0");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_out_of_range_placeholder() {
        let err = Fragment::new("a = @1", vec![int(1)]).merged().unwrap_err();
        assert_eq!(
            err,
            CompileError::ParameterOutOfRange {
                index: 1,
                available: 1
            }
        );
    }

    #[test]
    fn test_join() {
        let joined = Fragment::join(
            [Fragment::raw("a"), Fragment::new("@0", vec![int(1)]), Fragment::raw("c")],
            ", ",
        );
        assert_eq!(joined.text(), "a, @0, c");
        assert_eq!(joined.param_count(), 1);
        assert!(!joined.is_empty());
        assert!(Fragment::default().is_empty());
    }
}
