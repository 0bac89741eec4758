/// Method contracts and parameter folding
///
/// [`MethodSignature`] is derived once per mapper method from its declaration. It fixes
/// the result cardinality, the result adapter used to reshape rows, the positions of the
/// pagination and callback parameters, and how the remaining arguments are folded into
/// the single [`ParameterObject`] a statement runs with.
use crate::binding::interface::{ElementType, MethodDecl, ParamDecl, ParamKind, ReturnType};
use crate::constants::{GENERIC_PARAM_PREFIX, POSITIONAL_PARAM_PREFIX};
use crate::error::{MapperError, Result};
use crate::mapping::ParameterObject;
use crate::models::{ResultHandler, Row, RowBounds};
use crate::reflection::ObjectFactory;
use libsql::Value;
use std::collections::HashMap;

/// A call argument.
pub enum Argument<'a> {
    Value(Value),
    Record(Row),
    Bounds(RowBounds),
    Handler(&'a mut dyn ResultHandler),
}

impl std::fmt::Debug for Argument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Argument::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Argument::Bounds(b) => f.debug_tuple("Bounds").field(b).finish(),
            Argument::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl From<Value> for Argument<'_> {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<i64> for Argument<'_> {
    fn from(value: i64) -> Self {
        Argument::Value(Value::Integer(value))
    }
}

impl From<&str> for Argument<'_> {
    fn from(value: &str) -> Self {
        Argument::Value(Value::Text(value.to_string()))
    }
}

impl From<Row> for Argument<'_> {
    fn from(row: Row) -> Self {
        Argument::Record(row)
    }
}

impl From<RowBounds> for Argument<'_> {
    fn from(bounds: RowBounds) -> Self {
        Argument::Bounds(bounds)
    }
}

/// A value that can be bound to statement placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Value(Value),
    Record(Row),
}

impl ParamValue {
    /// Read `property` from this value.
    ///
    /// A plain value is its own property, whatever the name. A record needs a column
    /// name, and an empty name is rejected.
    pub fn property(&self, property: &str) -> Result<Value> {
        match self {
            ParamValue::Value(value) => Ok(value.clone()),
            ParamValue::Record(_) if property.is_empty() => Err(MapperError::configuration(
                "a record parameter can only be bound through one of its columns",
            )),
            ParamValue::Record(row) => {
                row.get(property)
                    .cloned()
                    .ok_or_else(|| MapperError::ParameterNotFound {
                        name: property.to_string(),
                        available: row.columns().to_vec(),
                    })
            }
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        ParamValue::Value(value)
    }
}

impl From<Row> for ParamValue {
    fn from(row: Row) -> Self {
        ParamValue::Record(row)
    }
}

/// Name-keyed parameter container. Looking up a missing name is an error that lists
/// the names it does hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamMap {
    entries: HashMap<String, ParamValue>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&ParamValue> {
        self.entries
            .get(name)
            .ok_or_else(|| MapperError::ParameterNotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Held names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names value arguments and folds them into a [`ParameterObject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamNameResolver {
    /// Declared position and published name of every value parameter.
    names: Vec<(usize, String)>,
    has_declared_names: bool,
}

impl ParamNameResolver {
    pub fn new(params: &[ParamDecl]) -> Self {
        let mut names = Vec::new();
        let mut has_declared_names = false;
        for (idx, param) in params.iter().enumerate() {
            if param.is_special() {
                continue;
            }
            let name = match param.name() {
                Some(name) => {
                    has_declared_names = true;
                    name.to_string()
                }
                None => format!("{POSITIONAL_PARAM_PREFIX}{idx}"),
            };
            names.push((idx, name));
        }
        ParamNameResolver {
            names,
            has_declared_names,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.names.iter().map(|(_, name)| name.as_str()).collect()
    }

    /// Fold the value arguments, given in declaration order.
    ///
    /// No values gives no parameter object; a single unnamed value is passed through;
    /// anything else becomes a [`ParamMap`] holding each value under its name and under
    /// `param1`, `param2`, ... unless a declared name already uses that generic name.
    pub fn named_params(&self, values: Vec<ParamValue>) -> ParameterObject {
        if self.names.is_empty() || values.is_empty() {
            return ParameterObject::None;
        }
        if !self.has_declared_names && self.names.len() == 1 {
            if let Some(value) = values.into_iter().next() {
                return ParameterObject::Single(value);
            }
            return ParameterObject::None;
        }
        let mut map = ParamMap::new();
        for (i, ((_, name), value)) in self.names.iter().zip(values).enumerate() {
            let generic = format!("{GENERIC_PARAM_PREFIX}{}", i + 1);
            if !self.names.iter().any(|(_, n)| *n == generic) {
                map.insert(generic, value.clone());
            }
            map.insert(name.clone(), value);
        }
        ParameterObject::Map(map)
    }
}

/// Caller-expected result shape of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    Void,
    Scalar,
    Many,
    Map(String),
    Cursor,
}

/// How rows are reshaped into the declared return type. Chosen once per method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultAdapter {
    /// Run the select and drop the result.
    Discard,
    /// Zero or one row, converted to the declared scalar or record type.
    Scalar(ReturnType),
    List,
    Array(ElementType),
    /// Filled through the object factory.
    Collection(String),
    Map(String),
    Cursor,
}

#[derive(Debug, Clone)]
pub struct MethodSignature {
    return_type: ReturnType,
    cardinality: Cardinality,
    adapter: ResultAdapter,
    row_bounds_index: Option<usize>,
    result_handler_index: Option<usize>,
    param_names: ParamNameResolver,
}

impl MethodSignature {
    /// Analyse `method`. Duplicate pagination or callback parameters fail here.
    pub fn new(method: &MethodDecl, object_factory: &dyn ObjectFactory) -> Result<Self> {
        let return_type = method.return_type().clone();
        let row_bounds_index = unique_param_index(method, ParamKind::RowBounds, "RowBounds")?;
        let result_handler_index =
            unique_param_index(method, ParamKind::ResultHandler, "ResultHandler")?;

        let returns_many = match &return_type {
            ReturnType::List | ReturnType::Array(_) => true,
            ReturnType::Named(name) => object_factory.is_collection(name),
            _ => false,
        };
        let map_key = match return_type {
            ReturnType::Map => method.map_key_column().map(str::to_string),
            _ => None,
        };

        let (cardinality, adapter) = if return_type == ReturnType::Void {
            (Cardinality::Void, ResultAdapter::Discard)
        } else if returns_many {
            let adapter = match &return_type {
                ReturnType::Array(element) => ResultAdapter::Array(element.clone()),
                ReturnType::Named(name) => ResultAdapter::Collection(name.clone()),
                _ => ResultAdapter::List,
            };
            (Cardinality::Many, adapter)
        } else if let Some(key) = map_key {
            (Cardinality::Map(key.clone()), ResultAdapter::Map(key))
        } else if return_type == ReturnType::Cursor {
            (Cardinality::Cursor, ResultAdapter::Cursor)
        } else {
            (Cardinality::Scalar, ResultAdapter::Scalar(return_type.clone()))
        };

        Ok(MethodSignature {
            return_type,
            cardinality,
            adapter,
            row_bounds_index,
            result_handler_index,
            param_names: ParamNameResolver::new(method.params()),
        })
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    pub fn cardinality(&self) -> &Cardinality {
        &self.cardinality
    }

    pub fn adapter(&self) -> &ResultAdapter {
        &self.adapter
    }

    pub fn returns_void(&self) -> bool {
        self.cardinality == Cardinality::Void
    }

    pub fn row_bounds_index(&self) -> Option<usize> {
        self.row_bounds_index
    }

    pub fn result_handler_index(&self) -> Option<usize> {
        self.result_handler_index
    }

    pub fn has_result_handler(&self) -> bool {
        self.result_handler_index.is_some()
    }

    pub fn param_names(&self) -> &ParamNameResolver {
        &self.param_names
    }
}

fn unique_param_index(method: &MethodDecl, kind: ParamKind, label: &str) -> Result<Option<usize>> {
    let mut found = None;
    for (idx, param) in method.params().iter().enumerate() {
        if param.kind() != kind {
            continue;
        }
        if found.is_some() {
            return Err(MapperError::configuration(format!(
                "{} cannot have multiple {label} parameters",
                method.name()
            )));
        }
        found = Some(idx);
    }
    Ok(found)
}

/// Arguments of one call, split by role.
pub struct CallArgs<'a> {
    pub parameter: ParameterObject,
    pub bounds: RowBounds,
    pub handler: Option<&'a mut dyn ResultHandler>,
}

impl std::fmt::Debug for CallArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallArgs")
            .field("parameter", &self.parameter)
            .field("bounds", &self.bounds)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl MethodSignature {
    /// Split `args` into the parameter object, the row bounds and the result handler.
    ///
    /// Arguments must match the declared parameters one to one.
    pub fn convert_args<'a>(&self, method: &str, args: Vec<Argument<'a>>) -> Result<CallArgs<'a>> {
        let declared = self.param_names.names.len()
            + usize::from(self.row_bounds_index.is_some())
            + usize::from(self.result_handler_index.is_some());
        if args.len() != declared {
            return Err(MapperError::configuration(format!(
                "{method} expects {declared} arguments but was called with {}",
                args.len()
            )));
        }

        let mut values = Vec::with_capacity(self.param_names.names.len());
        let mut bounds = RowBounds::DEFAULT;
        let mut handler = None;
        for (idx, arg) in args.into_iter().enumerate() {
            let special = if Some(idx) == self.row_bounds_index {
                Some(ParamKind::RowBounds)
            } else if Some(idx) == self.result_handler_index {
                Some(ParamKind::ResultHandler)
            } else {
                None
            };
            match (special, arg) {
                (None, Argument::Value(value)) => values.push(ParamValue::Value(value)),
                (None, Argument::Record(row)) => values.push(ParamValue::Record(row)),
                (Some(ParamKind::RowBounds), Argument::Bounds(b)) => bounds = b,
                (Some(ParamKind::ResultHandler), Argument::Handler(h)) => handler = Some(h),
                (_, arg) => {
                    return Err(MapperError::configuration(format!(
                        "argument {idx} of {method} does not match its declaration: {arg:?}"
                    )))
                }
            }
        }

        Ok(CallArgs {
            parameter: self.param_names.named_params(values),
            bounds,
            handler,
        })
    }
}
