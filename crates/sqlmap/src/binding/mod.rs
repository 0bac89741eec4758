/// Mapper interface binding
///
/// Turns calls on declared mapper interfaces into statement executions:
///
/// - [`interface`]: the static declaration of interfaces and their methods
/// - [`command`]: which statement a method runs
/// - [`signature`]: what shape the caller expects back and how arguments are named
/// - [`method`]: running a call and reshaping its rows
/// - [`registry`]: per-interface tables, resolved once at registration
pub mod command;
pub mod interface;
pub mod method;
pub mod registry;
pub mod signature;

pub use command::SqlCommand;
pub use interface::{
    ElementType, MapperInterface, MethodDecl, ParamDecl, ParamKind, PrimitiveKind, ReturnType,
};
pub use method::{ArrayValue, MapperMethod, MapperResult};
pub use registry::{MapperProxy, MapperRegistry, MapperTable};
pub use signature::{Argument, Cardinality, MethodSignature, ParamMap, ParamNameResolver, ParamValue};
