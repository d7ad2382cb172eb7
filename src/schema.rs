//! Schema Flattener.
//!
//! The nested Parquet schema is first classified into [`SchemaField`], a tagged
//! variant with one case per supported shape (primitive data, map, struct, list).
//! A single depth-first pass over that tree then produces the [`FlatSchema`]: one
//! [`Column`] per physical leaf, in leaf order.
//!
//! Leaves visited under a list or map get [`RawType::Unspecified`]; their values are
//! read generically and rendered as text.

use crate::error::{LoaderError, Result};
use crate::io::levels::LevelInfo;
use crate::types::{ConversionContext, RawType, SemanticType, derive_raw_type, semantic_type};
use parquet::basic::{ConvertedType, LogicalType, Repetition};
use parquet::schema::types::{ColumnDescPtr, SchemaDescriptor, Type, TypePtr};
use std::collections::HashSet;

/// One node of the nested on-disk schema.
#[derive(Clone, Debug)]
pub enum SchemaField {
    /// A primitive leaf.
    Data { name: String, leaf: TypePtr },
    /// A map; key and value are both primitive.
    Map {
        name: String,
        key: Box<SchemaField>,
        value: Box<SchemaField>,
    },
    Struct {
        name: String,
        fields: Vec<SchemaField>,
    },
    List {
        name: String,
        item: Box<SchemaField>,
    },
}

impl SchemaField {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Data { name, .. }
            | Self::Map { name, .. }
            | Self::Struct { name, .. }
            | Self::List { name, .. } => name,
        }
    }

    /// Classify a Parquet schema node.
    ///
    /// # Errors
    /// [`LoaderError::UnsupportedSchema`] for malformed LIST/MAP groups and maps
    /// whose key or value is not primitive.
    pub fn from_parquet(ty: &TypePtr) -> Result<Self> {
        classify(ty, false, "")
    }
}

fn logical_of(ty: &Type) -> Option<LogicalType> {
    ty.get_basic_info().logical_type_ref().cloned()
}

fn is_repeated(ty: &Type) -> bool {
    let info = ty.get_basic_info();
    info.has_repetition() && info.repetition() == Repetition::REPEATED
}

fn unsupported(path: &str, reason: impl Into<String>) -> LoaderError {
    LoaderError::UnsupportedSchema {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// `as_element` ignores the node's own REPEATED flag; the caller already turned
/// that repetition into a list.
fn classify(ty: &TypePtr, as_element: bool, parent: &str) -> Result<SchemaField> {
    let name = ty.name().to_string();
    let path = join_path(parent, &name);
    let repeated = !as_element && is_repeated(ty);

    let Type::GroupType { fields, .. } = ty.as_ref() else {
        let data = SchemaField::Data {
            name: name.clone(),
            leaf: ty.clone(),
        };
        return Ok(if repeated {
            SchemaField::List {
                name,
                item: Box::new(data),
            }
        } else {
            data
        });
    };

    let logical = logical_of(ty);
    let converted = ty.get_basic_info().converted_type();

    if matches!(logical, Some(LogicalType::List)) || converted == ConvertedType::LIST {
        let item = list_item(ty, fields, &path)?;
        return Ok(SchemaField::List {
            name,
            item: Box::new(item),
        });
    }

    if matches!(logical, Some(LogicalType::Map)) || converted == ConvertedType::MAP {
        let [kv] = fields.as_slice() else {
            return Err(unsupported(&path, "map group must have exactly one child"));
        };
        if !is_repeated(kv) {
            return Err(unsupported(&path, "map key/value group must be repeated"));
        }
        return map_field(name, kv, &path);
    }

    if converted == ConvertedType::MAP_KEY_VALUE {
        return map_field(name, ty, &path);
    }

    let children = fields
        .iter()
        .map(|f| classify(f, false, &path))
        .collect::<Result<Vec<_>>>()?;
    let group = SchemaField::Struct {
        name: name.clone(),
        fields: children,
    };
    Ok(if repeated {
        SchemaField::List {
            name,
            item: Box::new(group),
        }
    } else {
        group
    })
}

/// Resolve the element of a LIST-annotated group, accepting both the three-level
/// layout and the legacy two-level layouts.
fn list_item(list: &TypePtr, fields: &[TypePtr], path: &str) -> Result<SchemaField> {
    let [repeated] = fields else {
        return Err(unsupported(path, "list group must have exactly one child"));
    };
    if !is_repeated(repeated) {
        return Err(unsupported(path, "list child must be repeated"));
    }
    let repeated_path = join_path(path, repeated.name());
    if let Type::GroupType { fields: inner, .. } = repeated.as_ref() {
        let legacy_name =
            repeated.name() == "array" || repeated.name() == format!("{}_tuple", list.name());
        if let [element] = inner.as_slice()
            && !legacy_name
        {
            return classify(element, false, &repeated_path);
        }
    }
    classify(repeated, true, path)
}

fn map_field(name: String, kv: &TypePtr, path: &str) -> Result<SchemaField> {
    let Type::GroupType { fields, .. } = kv.as_ref() else {
        return Err(unsupported(path, "map key/value entry must be a group"));
    };
    let [key, value] = fields.as_slice() else {
        return Err(unsupported(path, "map entry must have a key and a value"));
    };
    if !key.is_primitive() || !value.is_primitive() {
        return Err(unsupported(path, "map key and value must be primitive"));
    }
    Ok(SchemaField::Map {
        name,
        key: Box::new(SchemaField::Data {
            name: key.name().to_string(),
            leaf: key.clone(),
        }),
        value: Box::new(SchemaField::Data {
            name: value.name().to_string(),
            leaf: value.clone(),
        }),
    })
}

/// One flattened leaf of the on-disk schema.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    semantic_type: SemanticType,
    raw_type: RawType,
    context: ConversionContext,
    descriptor: ColumnDescPtr,
    leaf_index: usize,
    levels: LevelInfo,
}

impl Column {
    /// Dotted physical path, unique within the schema.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    #[must_use]
    pub const fn raw_type(&self) -> RawType {
        self.raw_type
    }

    #[must_use]
    pub const fn context(&self) -> &ConversionContext {
        &self.context
    }

    /// Handle back to the Parquet leaf; used to address data during block reads.
    #[must_use]
    pub const fn descriptor(&self) -> &ColumnDescPtr {
        &self.descriptor
    }

    /// Position of the leaf among the file's physical columns.
    #[must_use]
    pub const fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    pub(crate) const fn levels(&self) -> &LevelInfo {
        &self.levels
    }
}

/// Ordered, immutable set of flattened columns.
#[derive(Clone, Debug)]
pub struct FlatSchema {
    columns: Vec<Column>,
}

impl FlatSchema {
    /// Flatten a Parquet schema.
    ///
    /// # Errors
    /// [`LoaderError::UnsupportedSchema`] for shapes that cannot be flattened and
    /// [`LoaderError::DuplicateColumn`] when two leaves share a path.
    pub fn from_descriptor(
        descr: &SchemaDescriptor,
        large_integers_as_timestamps: bool,
    ) -> Result<Self> {
        let fields = descr
            .root_schema()
            .get_fields()
            .iter()
            .map(SchemaField::from_parquet)
            .collect::<Result<Vec<_>>>()?;

        let mut flattener = Flattener {
            descr,
            large_integers_as_timestamps,
            next_leaf: 0,
            seen: HashSet::new(),
            columns: Vec::with_capacity(descr.num_columns()),
        };
        for field in &fields {
            flattener.visit(field, false)?;
        }
        Ok(Self {
            columns: flattener.columns,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The externally visible schema: `(name, semantic type)` in column order.
    #[must_use]
    pub fn fields(&self) -> Vec<(String, SemanticType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.semantic_type))
            .collect()
    }
}

struct Flattener<'a> {
    descr: &'a SchemaDescriptor,
    large_integers_as_timestamps: bool,
    next_leaf: usize,
    seen: HashSet<String>,
    columns: Vec<Column>,
}

impl Flattener<'_> {
    fn visit(&mut self, field: &SchemaField, in_repeated: bool) -> Result<()> {
        match field {
            SchemaField::Data { leaf, .. } => self.push_leaf(leaf, in_repeated),
            SchemaField::Map { key, value, .. } => {
                self.visit(key, true)?;
                self.visit(value, true)
            }
            SchemaField::Struct { fields, .. } => fields
                .iter()
                .try_for_each(|child| self.visit(child, in_repeated)),
            SchemaField::List { item, .. } => self.visit(item, true),
        }
    }

    fn push_leaf(&mut self, leaf: &TypePtr, in_repeated: bool) -> Result<()> {
        let index = self.next_leaf;
        if index >= self.descr.num_columns() {
            return Err(unsupported(leaf.name(), "more leaves than physical columns"));
        }
        let descriptor = self.descr.column(index);
        if descriptor.name() != leaf.name() {
            return Err(unsupported(
                leaf.name(),
                format!("leaf order disagrees with physical column '{}'", descriptor.path()),
            ));
        }
        self.next_leaf += 1;

        let (element_type, mut context) = derive_raw_type(leaf, self.large_integers_as_timestamps);
        let raw_type = if in_repeated {
            context.element_type = element_type;
            RawType::Unspecified
        } else {
            element_type
        };

        let name = descriptor.path().string();
        if !self.seen.insert(name.clone()) {
            return Err(LoaderError::DuplicateColumn(name));
        }
        let levels = LevelInfo::new(self.descr.root_schema(), &descriptor);
        self.columns.push(Column {
            name,
            semantic_type: semantic_type(raw_type),
            raw_type,
            context,
            descriptor,
            leaf_index: index,
            levels,
        });
        Ok(())
    }
}
