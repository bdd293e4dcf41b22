//! Derive macros for oxide-mapper record and enum declarations.
//!
//! `#[derive(Record)]` implements `oxide_mapper_core::record::Record` for a
//! struct with named fields, carrying the struct's annotations into its
//! `TypeInfo`. `#[derive(SqlEnum)]` implements `SqlEnum` for a fieldless
//! enum so it can be stored by member name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields, Lit, LitBool,
    LitStr, Meta, UnOp,
};

/// Derives `Record` for a struct with named fields.
///
/// The struct must implement `Default`: hydration starts from the default
/// value and assigns only the fields present in a row.
///
/// # Attributes
///
/// - `#[record(table = "name")]` - Table name (defaults to the convention)
/// - `#[record(primary_key = "a, b")]` - Primary key column(s)
/// - `#[record(autoincrement)]` / `#[record(autoincrement = false)]`
/// - `#[record(sequence = "seq_name")]` - Key sequence
///
/// # Field Attributes
///
/// - `#[column(name = "col")]` - Column name
/// - `#[column(alias = "out")]` - Result-set alias
/// - `#[column(primary_key)]` - Part of the primary key
/// - `#[column(ignore)]` - Not mapped at all
/// - `#[column(result)]` - Read but never written
/// - `#[column(version)]` / `#[column(version = "rowversion")]`
/// - `#[column(computed)]` / `#[column(computed = "insert" | "update")]`
/// - `#[column(nested)]` - Flatten a record field into prefixed columns
/// - `#[column(reference = "member")]` - Store a member of the referenced record
/// - `#[column(serialized)]` - JSON column
/// - `#[column(utc)]` - Normalize date/time values to UTC on read
#[proc_macro_derive(Record, attributes(record, column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `SqlEnum` for a fieldless enum.
///
/// Members are stored by name. Explicit integer discriminants are kept so
/// numeric columns read back too.
#[proc_macro_derive(SqlEnum)]
pub fn derive_sql_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_sql_enum_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let type_name = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    let table = parse_record_attrs(&input.attrs)?.to_tokens();

    let mut field_infos = Vec::new();
    let mut to_record = Vec::new();
    let mut from_record = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let name = ident.to_string().trim_start_matches("r#").to_string();
        let attrs = parse_column_attrs(&field.attrs)?;
        let overrides = attrs.to_tokens();

        if attrs.ignore {
            field_infos.push(quote! {
                .field(
                    ::oxide_mapper_core::schema::FieldInfo::new(
                        #name,
                        ::oxide_mapper_core::schema::ValueType::Any,
                    )
                    .with_overrides(#overrides)
                )
            });
            continue;
        }

        field_infos.push(quote! {
            .field(
                ::oxide_mapper_core::schema::FieldInfo::new(
                    #name,
                    <#ty as ::oxide_mapper_core::record::HasValueType>::value_type(),
                )
                .nullable(<#ty as ::oxide_mapper_core::record::HasValueType>::nullable())
                .with_overrides(#overrides)
            )
        });
        to_record.push(quote! {
            record.insert(
                #name,
                ::oxide_mapper_core::record::ToValue::to_value(&self.#ident),
            );
        });
        from_record.push(quote! {
            ::oxide_mapper_core::record::read_field(&mut record, #name, &mut self.#ident)?;
        });
    }

    Ok(quote! {
        impl #impl_generics ::oxide_mapper_core::record::Record for #struct_name #ty_generics #where_clause {
            fn type_info() -> ::oxide_mapper_core::schema::TypeInfo {
                ::oxide_mapper_core::schema::TypeInfo::of::<Self>(#type_name)
                    .with_table(#table)
                    #(#field_infos)*
            }

            #[allow(unused_mut)]
            fn to_record(&self) -> ::oxide_mapper_core::record::RecordValue {
                let mut record = ::oxide_mapper_core::record::RecordValue::new();
                #(#to_record)*
                record
            }

            fn from_record(
                record: ::oxide_mapper_core::record::RecordValue,
            ) -> ::core::result::Result<Self, ::oxide_mapper_core::record::ValueError> {
                let mut value = <Self as ::core::default::Default>::default();
                ::oxide_mapper_core::record::Record::apply_record(&mut value, record)?;
                ::core::result::Result::Ok(value)
            }

            #[allow(unused_mut, unused_variables)]
            fn apply_record(
                &mut self,
                mut record: ::oxide_mapper_core::record::RecordValue,
            ) -> ::core::result::Result<(), ::oxide_mapper_core::record::ValueError> {
                #(#from_record)*
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::oxide_mapper_core::record::HasValueType for #struct_name #ty_generics #where_clause {
            fn value_type() -> ::oxide_mapper_core::schema::ValueType {
                ::oxide_mapper_core::schema::ValueType::Record(
                    <Self as ::oxide_mapper_core::record::Record>::type_info,
                )
            }
        }

        impl #impl_generics ::oxide_mapper_core::record::ToValue for #struct_name #ty_generics #where_clause {
            fn to_value(&self) -> ::oxide_mapper_core::record::Value {
                ::oxide_mapper_core::record::Value::Record(
                    ::oxide_mapper_core::record::Record::to_record(self),
                )
            }
        }

        impl #impl_generics ::oxide_mapper_core::record::FromValue for #struct_name #ty_generics #where_clause {
            fn from_value(
                value: ::oxide_mapper_core::record::Value,
            ) -> ::core::result::Result<Self, ::oxide_mapper_core::record::ValueError> {
                match value {
                    ::oxide_mapper_core::record::Value::Record(record) => {
                        <Self as ::oxide_mapper_core::record::Record>::from_record(record)
                    }
                    other => ::core::result::Result::Err(
                        ::oxide_mapper_core::record::ValueError::mismatch("record", &other),
                    ),
                }
            }
        }
    })
}

fn derive_sql_enum_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "SqlEnum derive only supports enums",
        ));
    };

    let mut members = Vec::new();
    let mut to_name = Vec::new();
    let mut from_name = Vec::new();
    let mut next_value: i64 = 0;
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "SqlEnum derive only supports fieldless variants",
            ));
        }
        let ident = &variant.ident;
        let name = ident.to_string();
        let value = match &variant.discriminant {
            Some((_, expr)) => discriminant(expr)?,
            None => next_value,
        };
        next_value = value.wrapping_add(1);

        members.push(quote! {
            ::oxide_mapper_core::schema::EnumMember { name: #name, value: #value }
        });
        to_name.push(quote! { Self::#ident => #name, });
        from_name.push(quote! { #name => ::core::option::Option::Some(Self::#ident), });
    }

    Ok(quote! {
        impl #impl_generics ::oxide_mapper_core::record::SqlEnum for #enum_name #ty_generics #where_clause {
            const MEMBERS: &'static [::oxide_mapper_core::schema::EnumMember] = &[#(#members),*];

            fn member_name(&self) -> &'static str {
                match self {
                    #(#to_name)*
                }
            }

            fn from_member_name(name: &str) -> ::core::option::Option<Self> {
                match name {
                    #(#from_name)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::oxide_mapper_core::record::HasValueType for #enum_name #ty_generics #where_clause {
            fn value_type() -> ::oxide_mapper_core::schema::ValueType {
                ::oxide_mapper_core::schema::ValueType::Enum(
                    <Self as ::oxide_mapper_core::record::SqlEnum>::MEMBERS,
                )
            }
        }

        impl #impl_generics ::oxide_mapper_core::record::ToValue for #enum_name #ty_generics #where_clause {
            fn to_value(&self) -> ::oxide_mapper_core::record::Value {
                ::oxide_mapper_core::record::enum_to_value(self)
            }
        }

        impl #impl_generics ::oxide_mapper_core::record::FromValue for #enum_name #ty_generics #where_clause {
            fn from_value(
                value: ::oxide_mapper_core::record::Value,
            ) -> ::core::result::Result<Self, ::oxide_mapper_core::record::ValueError> {
                ::oxide_mapper_core::record::enum_from_value(value)
            }
        }
    })
}

fn discriminant(expr: &Expr) -> syn::Result<i64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => discriminant(expr).map(|v| -v),
        _ => Err(syn::Error::new_spanned(
            expr,
            "SqlEnum discriminants must be integer literals",
        )),
    }
}

#[derive(Default)]
struct RecordAttrs {
    table: Option<String>,
    primary_key: Option<Vec<String>>,
    autoincrement: Option<bool>,
    sequence: Option<String>,
}

impl RecordAttrs {
    fn to_tokens(&self) -> TokenStream2 {
        let mut tokens = quote! { ::oxide_mapper_core::schema::TableOverrides::default() };
        if let Some(table) = &self.table {
            tokens = quote! { #tokens.table(#table) };
        }
        if let Some(columns) = &self.primary_key {
            tokens = quote! { #tokens.primary_key([#(#columns),*]) };
        }
        if let Some(autoincrement) = self.autoincrement {
            tokens = quote! { #tokens.autoincrement(#autoincrement) };
        }
        if let Some(sequence) = &self.sequence {
            tokens = quote! { #tokens.sequence(#sequence) };
        }
        tokens
    }
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    alias: Option<String>,
    primary_key: bool,
    ignore: bool,
    result_only: bool,
    version: Option<TokenStream2>,
    computed: Option<TokenStream2>,
    nested: bool,
    reference: Option<String>,
    serialized: bool,
    utc: bool,
}

impl ColumnAttrs {
    fn to_tokens(&self) -> TokenStream2 {
        let mut tokens = quote! { ::oxide_mapper_core::schema::ColumnOverrides::default() };
        if let Some(name) = &self.name {
            tokens = quote! { #tokens.name(#name) };
        }
        if let Some(alias) = &self.alias {
            tokens = quote! { #tokens.alias(#alias) };
        }
        if self.primary_key {
            tokens = quote! { #tokens.primary_key() };
        }
        if self.ignore {
            tokens = quote! { #tokens.ignore() };
        }
        if self.result_only {
            tokens = quote! { #tokens.result_only() };
        }
        if let Some(kind) = &self.version {
            tokens = quote! { #tokens.version(#kind) };
        }
        if let Some(kind) = &self.computed {
            tokens = quote! { #tokens.computed(#kind) };
        }
        if self.nested {
            tokens = quote! { #tokens.nested() };
        }
        if let Some(member) = &self.reference {
            tokens = quote! { #tokens.reference(#member) };
        }
        if self.serialized {
            tokens = quote! { #tokens.serialized() };
        }
        if self.utc {
            tokens = quote! { #tokens.force_utc() };
        }
        tokens
    }
}

fn parse_record_attrs(attrs: &[Attribute]) -> syn::Result<RecordAttrs> {
    let mut result = RecordAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("record") || matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") || meta.path.is_ident("name") {
                result.table = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("primary_key") {
                let columns = meta.value()?.parse::<LitStr>()?.value();
                result.primary_key = Some(
                    columns
                        .split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(String::from)
                        .collect(),
                );
            } else if meta.path.is_ident("autoincrement") {
                result.autoincrement = Some(if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse::<LitBool>()?.value
                } else {
                    true
                });
            } else if meta.path.is_ident("sequence") {
                result.sequence = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("unknown record attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("column") || matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("alias") {
                result.alias = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("primary_key") {
                result.primary_key = true;
            } else if meta.path.is_ident("ignore") {
                result.ignore = true;
            } else if meta.path.is_ident("result") || meta.path.is_ident("result_only") {
                result.result_only = true;
            } else if meta.path.is_ident("version") {
                let kind = optional_str(&meta)?;
                result.version = Some(match kind.as_deref() {
                    None | Some("number") => {
                        quote! { ::oxide_mapper_core::schema::VersionKind::Number }
                    }
                    Some("rowversion") => {
                        quote! { ::oxide_mapper_core::schema::VersionKind::RowVersion }
                    }
                    Some(_) => {
                        return Err(meta.error("expected version = \"number\" or \"rowversion\""));
                    }
                });
            } else if meta.path.is_ident("computed") {
                let kind = optional_str(&meta)?;
                result.computed = Some(match kind.as_deref() {
                    None | Some("always") => {
                        quote! { ::oxide_mapper_core::schema::ComputedKind::Always }
                    }
                    Some("insert") => quote! { ::oxide_mapper_core::schema::ComputedKind::Insert },
                    Some("update") => quote! { ::oxide_mapper_core::schema::ComputedKind::Update },
                    Some(_) => {
                        return Err(meta.error("expected computed = \"insert\" or \"update\""));
                    }
                });
            } else if meta.path.is_ident("nested") {
                result.nested = true;
            } else if meta.path.is_ident("reference") {
                result.reference = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("serialized") {
                result.serialized = true;
            } else if meta.path.is_ident("utc") {
                result.utc = true;
            } else {
                return Err(meta.error("unknown column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn optional_str(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        Ok(Some(meta.value()?.parse::<LitStr>()?.value()))
    } else {
        Ok(None)
    }
}
