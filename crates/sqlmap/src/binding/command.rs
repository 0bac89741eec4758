/// Statement resolution for mapper methods
///
/// A method call is bound to the statement registered under
/// `<interface name>.<method name>`. Methods inherited from a super-interface fall back
/// to the statement registered for that ancestor. Resolution happens once per method,
/// when its interface is registered.
use crate::binding::interface::{MapperInterface, MethodDecl};
use crate::configuration::StatementRegistry;
use crate::error::{MapperError, Result};
use crate::mapping::{MappedStatement, SqlCommandType};
use std::sync::Arc;

/// Statement identity and kind a method is bound to. Flush methods have no statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCommand {
    name: Option<String>,
    command_type: SqlCommandType,
}

impl SqlCommand {
    /// Resolve `method`, called through `mapper` and declared on `declaring`.
    pub fn resolve(
        registry: &dyn StatementRegistry,
        mapper: &MapperInterface,
        method: &MethodDecl,
        declaring: &MapperInterface,
    ) -> Result<SqlCommand> {
        match resolve_mapped_statement(registry, mapper, method.name(), declaring) {
            Some(ms) => {
                if ms.command_type() == SqlCommandType::Unknown {
                    return Err(MapperError::configuration(format!(
                        "unknown execution method for: {}",
                        ms.id()
                    )));
                }
                Ok(SqlCommand {
                    name: Some(ms.id().to_string()),
                    command_type: ms.command_type(),
                })
            }
            None if method.is_flush() => Ok(SqlCommand {
                name: None,
                command_type: SqlCommandType::Flush,
            }),
            None => Err(MapperError::configuration(format!(
                "invalid bound statement (not found): {}.{}",
                mapper.name(),
                method.name()
            ))),
        }
    }

    /// The bound statement id; `None` for flush methods.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn command_type(&self) -> SqlCommandType {
        self.command_type
    }
}

fn resolve_mapped_statement(
    registry: &dyn StatementRegistry,
    mapper: &MapperInterface,
    method_name: &str,
    declaring: &MapperInterface,
) -> Option<Arc<MappedStatement>> {
    let statement_id = format!("{}.{}", mapper.name(), method_name);
    if registry.has_statement(&statement_id) {
        return registry.get_statement(&statement_id);
    }
    // A method declared right here cannot be inherited from anywhere
    if mapper.name() == declaring.name() {
        return None;
    }
    mapper
        .extends()
        .iter()
        .filter(|parent| declaring.is_assignable_from(parent))
        .find_map(|parent| resolve_mapped_statement(registry, parent, method_name, declaring))
}
