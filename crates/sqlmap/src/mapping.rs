/// Mapped statements and their parameter bindings
///
/// A [`MappedStatement`] is a named, pre-rendered SQL statement together with the
/// metadata the execution core needs: its command kind, how named parameters map onto
/// positional placeholders, the declared result shape, timeout and cache participation.
/// SQL text generation happens before a statement is registered; here the text is final.
use crate::binding::signature::{ParamMap, ParamValue};
use crate::cache::SharedResultCache;
use crate::error::{MapperError, Result};
use crate::models::Row;
use crate::utils::starts_with_keyword;
use libsql::Value;
use std::time::Duration;

/// Classification of a statement by what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlCommandType {
    Unknown,
    Insert,
    Update,
    Delete,
    Select,
    Flush,
}

impl SqlCommandType {
    /// Classify rendered SQL by its leading keyword.
    ///
    /// `WITH` and `VALUES` read rows and count as selects; anything that is not a
    /// recognised DML statement is `Unknown`.
    pub fn from_sql(sql: &str) -> SqlCommandType {
        let trimmed = sql.trim_start();
        if starts_with_keyword(trimmed, "SELECT")
            || starts_with_keyword(trimmed, "WITH")
            || starts_with_keyword(trimmed, "VALUES")
        {
            SqlCommandType::Select
        } else if starts_with_keyword(trimmed, "INSERT") || starts_with_keyword(trimmed, "REPLACE")
        {
            SqlCommandType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            SqlCommandType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            SqlCommandType::Delete
        } else {
            SqlCommandType::Unknown
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            SqlCommandType::Insert | SqlCommandType::Update | SqlCommandType::Delete
        )
    }
}

/// How the store should treat the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    #[default]
    Prepared,
    /// Stored-procedure style call; exempt from the result-shape requirement of
    /// callback selects.
    Callable,
}

/// Direction of a statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

/// One positional placeholder of a statement and the property that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    property: String,
    mode: ParameterMode,
    sql_type: Option<String>,
    numeric_scale: Option<u32>,
}

impl ParameterMapping {
    pub fn builder(property: impl Into<String>) -> ParameterMappingBuilder {
        ParameterMappingBuilder {
            mapping: ParameterMapping {
                property: property.into(),
                mode: ParameterMode::In,
                sql_type: None,
                numeric_scale: None,
            },
        }
    }

    /// Shorthand for an IN parameter with no type hints.
    pub fn input(property: impl Into<String>) -> Result<ParameterMapping> {
        ParameterMapping::builder(property).build()
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    pub fn sql_type(&self) -> Option<&str> {
        self.sql_type.as_deref()
    }

    pub fn numeric_scale(&self) -> Option<u32> {
        self.numeric_scale
    }
}

pub struct ParameterMappingBuilder {
    mapping: ParameterMapping,
}

impl ParameterMappingBuilder {
    pub fn mode(mut self, mode: ParameterMode) -> Self {
        self.mapping.mode = mode;
        self
    }

    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.mapping.sql_type = Some(sql_type.into());
        self
    }

    pub fn numeric_scale(mut self, scale: u32) -> Self {
        self.mapping.numeric_scale = Some(scale);
        self
    }

    pub fn build(self) -> Result<ParameterMapping> {
        if self.mapping.property.trim().is_empty() {
            return Err(MapperError::configuration(
                "parameter mapping requires a property name",
            ));
        }
        Ok(self.mapping)
    }
}

/// The single parameter object a statement is executed with.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterObject {
    /// The method took no parameters.
    #[default]
    None,
    /// One unnamed argument, passed through unwrapped.
    Single(ParamValue),
    /// Name-keyed container built from several (or named) arguments.
    Map(ParamMap),
}

impl ParameterObject {
    /// Resolve the value bound to `property`.
    ///
    /// A dotted property (`user.name`) reads one column of a record stored under the
    /// head name. Deeper paths are not supported.
    pub fn resolve(&self, property: &str) -> Result<Value> {
        match self {
            ParameterObject::None => Ok(Value::Null),
            ParameterObject::Single(value) => value.property(property),
            ParameterObject::Map(map) => match property.split_once('.') {
                Some((head, tail)) => map.get(head)?.property(tail),
                None => map.get(property)?.property(""),
            },
        }
    }
}

impl From<Value> for ParameterObject {
    fn from(value: Value) -> Self {
        ParameterObject::Single(ParamValue::Value(value))
    }
}

impl From<i64> for ParameterObject {
    fn from(value: i64) -> Self {
        ParameterObject::Single(ParamValue::Value(Value::Integer(value)))
    }
}

impl From<&str> for ParameterObject {
    fn from(value: &str) -> Self {
        ParameterObject::Single(ParamValue::Value(Value::Text(value.to_string())))
    }
}

impl From<Row> for ParameterObject {
    fn from(row: Row) -> Self {
        ParameterObject::Single(ParamValue::Record(row))
    }
}

impl From<ParamMap> for ParameterObject {
    fn from(map: ParamMap) -> Self {
        ParameterObject::Map(map)
    }
}

impl From<()> for ParameterObject {
    fn from(_: ()) -> Self {
        ParameterObject::None
    }
}

/// Final SQL text plus positional values, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    sql: String,
    values: Vec<Value>,
}

impl BoundSql {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        BoundSql {
            sql: sql.into(),
            values,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A registered statement.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    id: String,
    sql: String,
    command_type: SqlCommandType,
    statement_type: StatementType,
    parameter_mappings: Vec<ParameterMapping>,
    result_type: Option<String>,
    timeout: Option<Duration>,
    use_cache: bool,
    flush_cache: bool,
    cache: Option<SharedResultCache>,
}

impl MappedStatement {
    pub fn builder(id: impl Into<String>, sql: impl Into<String>) -> MappedStatementBuilder {
        MappedStatementBuilder {
            id: id.into(),
            sql: sql.into(),
            command_type: None,
            statement_type: StatementType::Prepared,
            parameter_mappings: Vec::new(),
            result_type: None,
            timeout: None,
            use_cache: None,
            flush_cache: None,
            cache: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Everything before the last `.` of the id.
    pub fn namespace(&self) -> &str {
        self.id.rsplit_once('.').map_or("", |(ns, _)| ns)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn command_type(&self) -> SqlCommandType {
        self.command_type
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    /// Declared result shape; `None` means the statement never said what it returns.
    pub fn result_type(&self) -> Option<&str> {
        self.result_type.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn flush_cache(&self) -> bool {
        self.flush_cache
    }

    pub fn cache(&self) -> Option<&SharedResultCache> {
        self.cache.as_ref()
    }

    /// Bind `parameter` onto this statement's placeholders in declaration order.
    pub fn bound_sql(&self, parameter: &ParameterObject) -> Result<BoundSql> {
        let values = self
            .parameter_mappings
            .iter()
            .map(|mapping| match mapping.mode() {
                ParameterMode::Out => Ok(Value::Null),
                ParameterMode::In | ParameterMode::InOut => parameter.resolve(mapping.property()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundSql::new(self.sql.clone(), values))
    }
}

pub struct MappedStatementBuilder {
    id: String,
    sql: String,
    command_type: Option<SqlCommandType>,
    statement_type: StatementType,
    parameter_mappings: Vec<ParameterMapping>,
    result_type: Option<String>,
    timeout: Option<Duration>,
    use_cache: Option<bool>,
    flush_cache: Option<bool>,
    cache: Option<SharedResultCache>,
}

impl MappedStatementBuilder {
    /// Override the command kind inferred from the SQL text.
    pub fn command_type(mut self, command_type: SqlCommandType) -> Self {
        self.command_type = Some(command_type);
        self
    }

    pub fn statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = statement_type;
        self
    }

    pub fn parameter(mut self, mapping: ParameterMapping) -> Self {
        self.parameter_mappings.push(mapping);
        self
    }

    /// Add one IN mapping per property name, in order.
    pub fn parameters<I, S>(mut self, properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for property in properties {
            self.parameter_mappings
                .push(ParameterMapping::input(property)?);
        }
        Ok(self)
    }

    pub fn result_type(mut self, result_type: impl Into<String>) -> Self {
        self.result_type = Some(result_type.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    pub fn flush_cache(mut self, flush_cache: bool) -> Self {
        self.flush_cache = Some(flush_cache);
        self
    }

    pub fn cache(mut self, cache: SharedResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<MappedStatement> {
        if self.id.trim().is_empty() {
            return Err(MapperError::configuration("mapped statement requires an id"));
        }
        let command_type = self
            .command_type
            .unwrap_or_else(|| SqlCommandType::from_sql(&self.sql));
        let is_select = command_type == SqlCommandType::Select;
        Ok(MappedStatement {
            id: self.id,
            sql: self.sql,
            command_type,
            statement_type: self.statement_type,
            parameter_mappings: self.parameter_mappings,
            result_type: self.result_type,
            timeout: self.timeout,
            use_cache: self.use_cache.unwrap_or(is_select),
            flush_cache: self.flush_cache.unwrap_or(!is_select),
            cache: self.cache,
        })
    }
}
