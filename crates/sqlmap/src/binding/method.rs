/// Execution of mapper method calls
///
/// A [`MapperMethod`] pairs the resolved [`SqlCommand`] with the analysed
/// [`MethodSignature`] of one method. Executing it folds the call arguments into a
/// parameter object, runs the bound statement through the session, and reshapes the
/// outcome into the declared return type:
///
/// | Command | Cardinality | Result |
/// |---|---|---|
/// | insert, update, delete | any | affected count as `int`/`long`/`bool`, or nothing |
/// | select | void + handler | rows go to the handler, nothing returned |
/// | select | many | list, array or factory-made collection in row order |
/// | select | map | rows keyed by a column, the last row wins a duplicate key |
/// | select | cursor | lazy [`RowCursor`] |
/// | select | scalar | zero or one row; more is an error |
/// | flush | any | queued batch outcomes |
///
/// An absent result for a primitive return type is reported as
/// [`MapperError::NullForPrimitive`], never replaced by zero.
use crate::binding::command::SqlCommand;
use crate::binding::interface::{ElementType, MapperInterface, PrimitiveKind, ReturnType, VisibleMethod};
use crate::binding::signature::{Argument, CallArgs, MethodSignature, ResultAdapter};
use crate::configuration::Configuration;
use crate::cursor::RowCursor;
use crate::error::{MapperError, Result};
use crate::executor::BatchResult;
use crate::mapping::{SqlCommandType, StatementType};
use crate::models::{Row, RowMap};
use crate::reflection::RowCollection;
use crate::session::SqlSession;
use crate::utils::{value_to_bool, value_to_f64, value_to_i64, value_type_name};
use libsql::Value;

/// Array-shaped select result.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Int(Vec<i32>),
    Long(Vec<i64>),
    Double(Vec<f64>),
    Bool(Vec<bool>),
    BoxedInt(Vec<Option<i32>>),
    BoxedLong(Vec<Option<i64>>),
    BoxedDouble(Vec<Option<f64>>),
    BoxedBool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Record(Vec<Row>),
}

impl ArrayValue {
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Int(v) => v.len(),
            ArrayValue::Long(v) => v.len(),
            ArrayValue::Double(v) => v.len(),
            ArrayValue::Bool(v) => v.len(),
            ArrayValue::BoxedInt(v) => v.len(),
            ArrayValue::BoxedLong(v) => v.len(),
            ArrayValue::BoxedDouble(v) => v.len(),
            ArrayValue::BoxedBool(v) => v.len(),
            ArrayValue::Text(v) => v.len(),
            ArrayValue::Record(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a mapper method call, shaped by its declared return type.
#[derive(Debug)]
pub enum MapperResult {
    /// The method returns nothing.
    Void,
    /// No value for a nullable return type.
    Null,
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Text(String),
    Row(Row),
    List(Vec<Row>),
    Array(ArrayValue),
    Collection(Box<dyn RowCollection>),
    Map(RowMap),
    Cursor(RowCursor),
    BatchResults(Vec<BatchResult>),
}

impl MapperResult {
    pub fn is_null(&self) -> bool {
        matches!(self, MapperResult::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            MapperResult::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            MapperResult::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MapperResult::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn into_row(self) -> Option<Row> {
        match self {
            MapperResult::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Row>> {
        match self {
            MapperResult::List(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayValue> {
        match self {
            MapperResult::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<Box<dyn RowCollection>> {
        match self {
            MapperResult::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<RowMap> {
        match self {
            MapperResult::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_cursor(self) -> Option<RowCursor> {
        match self {
            MapperResult::Cursor(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn into_batch_results(self) -> Option<Vec<BatchResult>> {
        match self {
            MapperResult::BatchResults(results) => Some(results),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct MapperMethod {
    /// `<interface>.<method>` as called, for messages.
    qualified_name: String,
    command: SqlCommand,
    signature: MethodSignature,
}

impl MapperMethod {
    pub fn new(
        mapper: &MapperInterface,
        method: &VisibleMethod,
        configuration: &Configuration,
    ) -> Result<Self> {
        let command = SqlCommand::resolve(configuration, mapper, &method.decl, &method.declaring)?;
        let signature = MethodSignature::new(&method.decl, configuration.object_factory())?;
        Ok(MapperMethod {
            qualified_name: format!("{}.{}", mapper.name(), method.decl.name()),
            command,
            signature,
        })
    }

    pub fn command(&self) -> &SqlCommand {
        &self.command
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn execute(&self, session: &mut SqlSession, args: Vec<Argument<'_>>) -> Result<MapperResult> {
        let call = self.signature.convert_args(&self.qualified_name, args)?;
        let result = match self.command.command_type() {
            SqlCommandType::Insert => {
                let count = session.insert(self.statement()?, call.parameter)?;
                self.row_count_result(count)?
            }
            SqlCommandType::Update => {
                let count = session.update(self.statement()?, call.parameter)?;
                self.row_count_result(count)?
            }
            SqlCommandType::Delete => {
                let count = session.delete(self.statement()?, call.parameter)?;
                self.row_count_result(count)?
            }
            SqlCommandType::Select => self.execute_select(session, call)?,
            SqlCommandType::Flush => MapperResult::BatchResults(session.flush_statements()?),
            SqlCommandType::Unknown => {
                return Err(MapperError::configuration(format!(
                    "unknown execution method for: {}",
                    self.statement_label()
                )))
            }
        };

        if result.is_null() && self.signature.return_type().is_primitive() {
            return Err(MapperError::NullForPrimitive {
                statement: self.statement_label().to_string(),
                return_type: self.signature.return_type().display_name(),
            });
        }
        Ok(result)
    }

    fn statement(&self) -> Result<&str> {
        self.command.name().ok_or_else(|| {
            MapperError::configuration(format!(
                "{} is not bound to a statement",
                self.qualified_name
            ))
        })
    }

    fn statement_label(&self) -> &str {
        self.command.name().unwrap_or(&self.qualified_name)
    }

    fn row_count_result(&self, count: i64) -> Result<MapperResult> {
        match self.signature.return_type() {
            ReturnType::Void => Ok(MapperResult::Void),
            ReturnType::Primitive(PrimitiveKind::Int) | ReturnType::Boxed(PrimitiveKind::Int) => {
                i32::try_from(count).map(MapperResult::Int).map_err(|_| {
                    MapperError::result_shape(format!(
                        "affected row count {count} of '{}' does not fit an int",
                        self.statement_label()
                    ))
                })
            }
            ReturnType::Primitive(PrimitiveKind::Long)
            | ReturnType::Boxed(PrimitiveKind::Long) => Ok(MapperResult::Long(count)),
            ReturnType::Primitive(PrimitiveKind::Bool)
            | ReturnType::Boxed(PrimitiveKind::Bool) => Ok(MapperResult::Bool(count > 0)),
            other => Err(MapperError::configuration(format!(
                "mapper method '{}' has an unsupported return type: {}",
                self.statement_label(),
                other.display_name()
            ))),
        }
    }

    fn execute_select(&self, session: &mut SqlSession, call: CallArgs<'_>) -> Result<MapperResult> {
        let statement = self.statement()?;
        let CallArgs {
            parameter,
            bounds,
            handler,
        } = call;

        if self.signature.returns_void() && self.signature.has_result_handler() {
            let ms = session.configuration().statement(statement)?;
            if ms.statement_type() != StatementType::Callable && ms.result_type().is_none() {
                return Err(MapperError::configuration(format!(
                    "method {statement} needs a result type so a ResultHandler can be used as a parameter"
                )));
            }
            let handler = handler.ok_or_else(|| {
                MapperError::configuration(format!("{statement} was called without its result handler"))
            })?;
            session.select_with_handler(statement, parameter, bounds, handler)?;
            return Ok(MapperResult::Void);
        }

        match self.signature.adapter() {
            ResultAdapter::Discard => {
                session.select_one(statement, parameter)?;
                Ok(MapperResult::Void)
            }
            ResultAdapter::List => Ok(MapperResult::List(
                session.select_list_bounded(statement, parameter, bounds)?,
            )),
            ResultAdapter::Array(element) => {
                let rows = session.select_list_bounded(statement, parameter, bounds)?;
                Ok(MapperResult::Array(self.convert_to_array(element, rows)?))
            }
            ResultAdapter::Collection(type_name) => {
                let rows = session.select_list_bounded(statement, parameter, bounds)?;
                let mut collection = session.configuration().object_factory().create(type_name)?;
                collection.add_all(rows);
                Ok(MapperResult::Collection(collection))
            }
            ResultAdapter::Map(key) => Ok(MapperResult::Map(
                session.select_map(statement, parameter, key, bounds)?,
            )),
            ResultAdapter::Cursor => Ok(MapperResult::Cursor(
                session.select_cursor(statement, parameter, bounds)?,
            )),
            ResultAdapter::Scalar(return_type) => {
                let row = session.select_one(statement, parameter)?;
                convert_scalar(return_type, row)
            }
        }
    }

    fn convert_to_array(&self, element: &ElementType, rows: Vec<Row>) -> Result<ArrayValue> {
        let array = match element {
            ElementType::Record => ArrayValue::Record(rows),
            ElementType::Text => ArrayValue::Text(
                rows.iter()
                    .map(|row| first_column(row).and_then(value_to_text))
                    .collect::<Result<_>>()?,
            ),
            ElementType::Boxed(kind) => match kind {
                PrimitiveKind::Int => ArrayValue::BoxedInt(collect_column(&rows, value_to_i32)?),
                PrimitiveKind::Long => ArrayValue::BoxedLong(collect_column(&rows, value_to_i64)?),
                PrimitiveKind::Double => {
                    ArrayValue::BoxedDouble(collect_column(&rows, value_to_f64)?)
                }
                PrimitiveKind::Bool => ArrayValue::BoxedBool(collect_column(&rows, value_to_bool)?),
            },
            ElementType::Primitive(kind) => {
                let null_element = || MapperError::NullForPrimitive {
                    statement: self.statement_label().to_string(),
                    return_type: format!("{}[]", kind.name()),
                };
                match kind {
                    PrimitiveKind::Int => ArrayValue::Int(unbox(
                        collect_column(&rows, value_to_i32)?,
                        null_element,
                    )?),
                    PrimitiveKind::Long => ArrayValue::Long(unbox(
                        collect_column(&rows, value_to_i64)?,
                        null_element,
                    )?),
                    PrimitiveKind::Double => ArrayValue::Double(unbox(
                        collect_column(&rows, value_to_f64)?,
                        null_element,
                    )?),
                    PrimitiveKind::Bool => ArrayValue::Bool(unbox(
                        collect_column(&rows, value_to_bool)?,
                        null_element,
                    )?),
                }
            }
        };
        Ok(array)
    }
}

fn first_column(row: &Row) -> Result<&Value> {
    row.get_index(0)
        .ok_or_else(|| MapperError::result_shape("scalar result row has no columns"))
}

fn collect_column<T>(rows: &[Row], convert: fn(&Value) -> Result<Option<T>>) -> Result<Vec<Option<T>>> {
    rows.iter()
        .map(|row| first_column(row).and_then(convert))
        .collect()
}

fn unbox<T>(values: Vec<Option<T>>, null_element: impl Fn() -> MapperError) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|value| value.ok_or_else(&null_element))
        .collect()
}

fn value_to_i32(value: &Value) -> Result<Option<i32>> {
    value_to_i64(value)?
        .map(|i| {
            i32::try_from(i)
                .map_err(|_| MapperError::result_shape(format!("value {i} does not fit an int")))
        })
        .transpose()
}

fn value_to_text(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s.clone())),
        Value::Integer(i) => Ok(Some(i.to_string())),
        Value::Real(r) => Ok(Some(r.to_string())),
        other => Err(MapperError::result_shape(format!(
            "cannot convert {} to text",
            value_type_name(other)
        ))),
    }
}

fn convert_scalar(return_type: &ReturnType, row: Option<Row>) -> Result<MapperResult> {
    let Some(row) = row else {
        return Ok(MapperResult::Null);
    };
    let kind = match return_type {
        ReturnType::Primitive(kind) | ReturnType::Boxed(kind) => *kind,
        ReturnType::Text => {
            return Ok(value_to_text(first_column(&row)?)?
                .map_or(MapperResult::Null, MapperResult::Text));
        }
        _ => return Ok(MapperResult::Row(row)),
    };
    let value = first_column(&row)?;
    let result = match kind {
        PrimitiveKind::Int => value_to_i32(value)?.map(MapperResult::Int),
        PrimitiveKind::Long => value_to_i64(value)?.map(MapperResult::Long),
        PrimitiveKind::Double => value_to_f64(value)?.map(MapperResult::Double),
        PrimitiveKind::Bool => value_to_bool(value)?.map(MapperResult::Bool),
    };
    Ok(result.unwrap_or(MapperResult::Null))
}
