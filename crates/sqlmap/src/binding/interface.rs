/// Mapper interface declarations
///
/// A mapper interface is a named set of method declarations that may extend other
/// interfaces. Each method declares its return shape and its parameters; that static
/// description is all the binding layer needs to resolve a call into a statement.
///
/// ```ignore
/// let base = MapperInterface::builder("app.BaseMapper")
///     .method(MethodDecl::new("count", ReturnType::Primitive(PrimitiveKind::Long)))
///     .build()?;
/// let users = MapperInterface::builder("app.UserMapper")
///     .extends(Arc::clone(&base))
///     .method(
///         MethodDecl::new("findById", ReturnType::Record).param(ParamDecl::named("id")),
///     )
///     .build()?;
/// ```
use crate::error::{MapperError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Non-nullable scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int,
    Long,
    Double,
    Bool,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bool => "boolean",
        }
    }
}

/// Element type of an array-shaped return.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Unboxed scalars; a NULL element is an error.
    Primitive(PrimitiveKind),
    /// Nullable scalars.
    Boxed(PrimitiveKind),
    Text,
    Record,
}

/// Declared return shape of a mapper method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    /// Non-nullable scalar, read from the first column.
    Primitive(PrimitiveKind),
    /// Nullable scalar, read from the first column.
    Boxed(PrimitiveKind),
    Text,
    /// One row.
    Record,
    /// A row-to-map shape. With a map key on the method it becomes a keyed map of rows.
    Map,
    /// The native row list.
    List,
    Array(ElementType),
    /// Any other named type. Collection types known to the object factory are filled
    /// through it; everything else is treated as a single record.
    Named(String),
    Cursor,
}

impl ReturnType {
    pub fn is_primitive(&self) -> bool {
        matches!(self, ReturnType::Primitive(_))
    }

    pub fn display_name(&self) -> String {
        match self {
            ReturnType::Void => "void".to_string(),
            ReturnType::Primitive(kind) => kind.name().to_string(),
            ReturnType::Boxed(kind) => format!("Option<{}>", kind.name()),
            ReturnType::Text => "String".to_string(),
            ReturnType::Record => "Row".to_string(),
            ReturnType::Map => "Map".to_string(),
            ReturnType::List => "List".to_string(),
            ReturnType::Array(element) => format!("{element:?}[]"),
            ReturnType::Named(name) => name.clone(),
            ReturnType::Cursor => "Cursor".to_string(),
        }
    }
}

/// What a declared parameter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Value,
    RowBounds,
    ResultHandler,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDecl {
    name: Option<String>,
    kind: ParamKind,
}

impl ParamDecl {
    /// A value parameter without a declared name.
    pub fn value() -> Self {
        ParamDecl {
            name: None,
            kind: ParamKind::Value,
        }
    }

    /// A value parameter published under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        ParamDecl {
            name: Some(name.into()),
            kind: ParamKind::Value,
        }
    }

    pub fn row_bounds() -> Self {
        ParamDecl {
            name: None,
            kind: ParamKind::RowBounds,
        }
    }

    pub fn result_handler() -> Self {
        ParamDecl {
            name: None,
            kind: ParamKind::ResultHandler,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn is_special(&self) -> bool {
        self.kind != ParamKind::Value
    }
}

/// One method as declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    name: String,
    return_type: ReturnType,
    params: Vec<ParamDecl>,
    map_key: Option<String>,
    flush: bool,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, return_type: ReturnType) -> Self {
        MethodDecl {
            name: name.into(),
            return_type,
            params: Vec::new(),
            map_key: None,
            flush: false,
        }
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Key column of a map-shaped select.
    pub fn map_key(mut self, column: impl Into<String>) -> Self {
        self.map_key = Some(column.into());
        self
    }

    /// Mark the method as a flush of queued batches.
    pub fn flush(mut self) -> Self {
        self.flush = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    pub fn map_key_column(&self) -> Option<&str> {
        self.map_key.as_deref()
    }

    pub fn is_flush(&self) -> bool {
        self.flush
    }
}

/// A method as seen through some interface, with the interface that declares it.
#[derive(Debug, Clone)]
pub struct VisibleMethod {
    pub declaring: Arc<MapperInterface>,
    pub decl: MethodDecl,
}

#[derive(Debug)]
pub struct MapperInterface {
    name: String,
    extends: Vec<Arc<MapperInterface>>,
    methods: Vec<MethodDecl>,
}

impl MapperInterface {
    pub fn builder(name: impl Into<String>) -> MapperInterfaceBuilder {
        MapperInterfaceBuilder {
            name: name.into(),
            extends: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct super-interfaces, in declaration order.
    pub fn extends(&self) -> &[Arc<MapperInterface>] {
        &self.extends
    }

    /// Methods declared directly on this interface.
    pub fn declared_methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    pub fn declared_method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether `other` is this interface or extends it, directly or not.
    pub fn is_assignable_from(&self, other: &MapperInterface) -> bool {
        other.name == self.name
            || other
                .extends
                .iter()
                .any(|parent| self.is_assignable_from(parent))
    }

    /// Every method callable through this interface.
    ///
    /// Own declarations come first, then inherited ones found depth-first through the
    /// super-interfaces in declaration order. A name declared closer to this interface
    /// hides the same name further up.
    pub fn visible_methods(self: &Arc<Self>) -> Vec<VisibleMethod> {
        let mut seen = HashSet::new();
        let mut visible = Vec::new();
        Self::collect_methods(self, &mut seen, &mut visible);
        visible
    }

    fn collect_methods(
        iface: &Arc<MapperInterface>,
        seen: &mut HashSet<String>,
        visible: &mut Vec<VisibleMethod>,
    ) {
        for decl in &iface.methods {
            if seen.insert(decl.name.clone()) {
                visible.push(VisibleMethod {
                    declaring: Arc::clone(iface),
                    decl: decl.clone(),
                });
            }
        }
        for parent in &iface.extends {
            Self::collect_methods(parent, seen, visible);
        }
    }
}

pub struct MapperInterfaceBuilder {
    name: String,
    extends: Vec<Arc<MapperInterface>>,
    methods: Vec<MethodDecl>,
}

impl MapperInterfaceBuilder {
    pub fn extends(mut self, parent: Arc<MapperInterface>) -> Self {
        self.extends.push(parent);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn build(self) -> Result<Arc<MapperInterface>> {
        if self.name.trim().is_empty() {
            return Err(MapperError::configuration("mapper interface requires a name"));
        }
        let mut names = HashSet::new();
        for method in &self.methods {
            if !names.insert(method.name.as_str()) {
                return Err(MapperError::configuration(format!(
                    "method '{}' is declared twice on {}",
                    method.name, self.name
                )));
            }
        }
        if let Some(parent) = self.extends.iter().find(|p| p.name == self.name) {
            return Err(MapperError::configuration(format!(
                "{} cannot extend itself",
                parent.name
            )));
        }
        Ok(Arc::new(MapperInterface {
            name: self.name,
            extends: self.extends,
            methods: self.methods,
        }))
    }
}
