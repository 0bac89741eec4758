//! Tests for method binding: statement resolution, signature analysis and parameter
//! naming. None of these touch a database.

#![allow(clippy::unwrap_used)]

use crate::binding::command::SqlCommand;
use crate::binding::interface::{
    ElementType, MapperInterface, MethodDecl, ParamDecl, PrimitiveKind, ReturnType,
};
use crate::binding::signature::{
    Argument, Cardinality, MethodSignature, ParamMap, ParamNameResolver, ParamValue, ResultAdapter,
};
use crate::configuration::Configuration;
use crate::error::MapperError;
use crate::mapping::{MappedStatement, ParameterObject, SqlCommandType};
use crate::models::{Row, RowBounds};
use crate::reflection::DefaultObjectFactory;
use libsql::Value;
use std::sync::Arc;

fn statement(id: &str, sql: &str) -> MappedStatement {
    MappedStatement::builder(id, sql).build().unwrap()
}

fn base_mapper() -> Arc<MapperInterface> {
    MapperInterface::builder("app.BaseMapper")
        .method(MethodDecl::new("count", ReturnType::Primitive(PrimitiveKind::Long)))
        .method(MethodDecl::new("findAll", ReturnType::List))
        .build()
        .unwrap()
}

fn user_mapper(base: &Arc<MapperInterface>) -> Arc<MapperInterface> {
    MapperInterface::builder("app.UserMapper")
        .extends(Arc::clone(base))
        .method(MethodDecl::new("findById", ReturnType::Record).param(ParamDecl::named("id")))
        .method(MethodDecl::new("flush", ReturnType::List).flush())
        .build()
        .unwrap()
}

fn visible(mapper: &Arc<MapperInterface>, name: &str) -> crate::binding::interface::VisibleMethod {
    mapper
        .visible_methods()
        .into_iter()
        .find(|m| m.decl.name() == name)
        .unwrap()
}

fn resolve(configuration: &Configuration, mapper: &Arc<MapperInterface>, name: &str) -> crate::error::Result<SqlCommand> {
    let method = visible(mapper, name);
    SqlCommand::resolve(configuration, mapper, &method.decl, &method.declaring)
}

#[test]
fn test_resolution_is_idempotent() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement(statement("app.UserMapper.findById", "SELECT * FROM users WHERE id = ?"))
        .unwrap();
    let base = base_mapper();
    let users = user_mapper(&base);

    let first = resolve(&configuration, &users, "findById").unwrap();
    let second = resolve(&configuration, &users, "findById").unwrap();

    assert_eq!(first, second);
    assert_eq!(first.name(), Some("app.UserMapper.findById"));
    assert_eq!(first.command_type(), SqlCommandType::Select);
}

#[test]
fn test_inherited_method_resolves_to_ancestor_statement() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement(statement("app.BaseMapper.count", "SELECT COUNT(*) FROM users"))
        .unwrap();
    let base = base_mapper();
    let users = user_mapper(&base);

    let command = resolve(&configuration, &users, "count").unwrap();

    assert_eq!(command.name(), Some("app.BaseMapper.count"));
}

#[test]
fn test_descendant_statement_wins_over_ancestor() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement(statement("app.BaseMapper.count", "SELECT COUNT(*) FROM users"))
        .unwrap();
    configuration
        .add_statement(statement("app.UserMapper.count", "SELECT COUNT(*) FROM users WHERE age > 0"))
        .unwrap();
    let base = base_mapper();
    let users = user_mapper(&base);

    let command = resolve(&configuration, &users, "count").unwrap();

    assert_eq!(command.name(), Some("app.UserMapper.count"));
}

#[test]
fn test_ancestor_search_is_depth_first_in_declaration_order() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement(statement("app.Root.find", "SELECT 1"))
        .unwrap();
    configuration
        .add_statement(statement("app.Right.find", "SELECT 2"))
        .unwrap();

    let root = MapperInterface::builder("app.Root")
        .method(MethodDecl::new("find", ReturnType::Record))
        .build()
        .unwrap();
    let left = MapperInterface::builder("app.Left")
        .extends(Arc::clone(&root))
        .build()
        .unwrap();
    let right = MapperInterface::builder("app.Right")
        .extends(Arc::clone(&root))
        .build()
        .unwrap();
    let leaf = MapperInterface::builder("app.Leaf")
        .extends(left)
        .extends(right)
        .build()
        .unwrap();

    // Left is searched first and leads to Root before Right is looked at
    let command = resolve(&configuration, &leaf, "find").unwrap();
    assert_eq!(command.name(), Some("app.Root.find"));
}

#[test]
fn test_own_method_without_statement_is_not_found() {
    let configuration = Configuration::default();
    let base = base_mapper();
    let users = user_mapper(&base);

    let err = resolve(&configuration, &users, "findById").unwrap_err();

    assert_eq!(
        err,
        MapperError::configuration("invalid bound statement (not found): app.UserMapper.findById")
    );
}

#[test]
fn test_flush_marker_binds_without_statement() {
    let configuration = Configuration::default();
    let base = base_mapper();
    let users = user_mapper(&base);

    let command = resolve(&configuration, &users, "flush").unwrap();

    assert_eq!(command.name(), None);
    assert_eq!(command.command_type(), SqlCommandType::Flush);
}

#[test]
fn test_unknown_command_kind_is_configuration_error() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement(statement("app.BaseMapper.count", "PRAGMA user_version"))
        .unwrap();
    let base = base_mapper();

    let err = resolve(&configuration, &base, "count").unwrap_err();

    assert!(matches!(err, MapperError::Configuration { .. }));
    assert!(err.to_string().contains("unknown execution method for: app.BaseMapper.count"));
}

#[test]
fn test_visible_methods_hide_ancestor_declarations() {
    let base = base_mapper();
    let child = MapperInterface::builder("app.Child")
        .extends(Arc::clone(&base))
        .method(MethodDecl::new("count", ReturnType::Primitive(PrimitiveKind::Int)))
        .build()
        .unwrap();

    let methods = child.visible_methods();
    let names: Vec<&str> = methods.iter().map(|m| m.decl.name()).collect();
    assert_eq!(names, vec!["count", "findAll"]);

    let count = &methods[0];
    assert_eq!(count.declaring.name(), "app.Child");
    assert_eq!(
        count.decl.return_type(),
        &ReturnType::Primitive(PrimitiveKind::Int)
    );
    assert_eq!(methods[1].declaring.name(), "app.BaseMapper");
}

#[test]
fn test_interface_builder_rejects_duplicates() {
    let err = MapperInterface::builder("app.Dup")
        .method(MethodDecl::new("find", ReturnType::Record))
        .method(MethodDecl::new("find", ReturnType::List))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("declared twice"));

    assert!(MapperInterface::builder("  ").build().is_err());
}

#[test]
fn test_assignability_follows_ancestors() {
    let base = base_mapper();
    let users = user_mapper(&base);

    assert!(base.is_assignable_from(&users));
    assert!(users.is_assignable_from(&users));
    assert!(!users.is_assignable_from(&base));
}

#[test]
fn test_duplicate_row_bounds_rejected_at_analysis() {
    let method = MethodDecl::new("page", ReturnType::List)
        .param(ParamDecl::row_bounds())
        .param(ParamDecl::named("team"))
        .param(ParamDecl::row_bounds());

    let err = MethodSignature::new(&method, &DefaultObjectFactory).unwrap_err();

    assert_eq!(
        err,
        MapperError::configuration("page cannot have multiple RowBounds parameters")
    );
}

#[test]
fn test_duplicate_result_handler_rejected_at_analysis() {
    let method = MethodDecl::new("stream", ReturnType::Void)
        .param(ParamDecl::result_handler())
        .param(ParamDecl::result_handler());

    let err = MethodSignature::new(&method, &DefaultObjectFactory).unwrap_err();

    assert!(err.to_string().contains("multiple ResultHandler parameters"));
}

#[test]
fn test_cardinality_follows_declared_return_shape() {
    let cases = vec![
        (MethodDecl::new("a", ReturnType::Void), Cardinality::Void),
        (MethodDecl::new("b", ReturnType::List), Cardinality::Many),
        (
            MethodDecl::new("c", ReturnType::Array(ElementType::Primitive(PrimitiveKind::Long))),
            Cardinality::Many,
        ),
        (
            MethodDecl::new("d", ReturnType::Named("LinkedList".to_string())),
            Cardinality::Many,
        ),
        (
            MethodDecl::new("e", ReturnType::Map).map_key("id"),
            Cardinality::Map("id".to_string()),
        ),
        (MethodDecl::new("f", ReturnType::Map), Cardinality::Scalar),
        (MethodDecl::new("g", ReturnType::Cursor), Cardinality::Cursor),
        (
            MethodDecl::new("h", ReturnType::Named("UserDto".to_string())),
            Cardinality::Scalar,
        ),
        (
            MethodDecl::new("i", ReturnType::Boxed(PrimitiveKind::Int)),
            Cardinality::Scalar,
        ),
    ];

    for (method, expected) in cases {
        let signature = MethodSignature::new(&method, &DefaultObjectFactory).unwrap();
        assert_eq!(signature.cardinality(), &expected, "method {}", method.name());
    }
}

#[test]
fn test_adapter_is_chosen_once_per_method() {
    let method = MethodDecl::new("queue", ReturnType::Named("VecDeque".to_string()));
    let signature = MethodSignature::new(&method, &DefaultObjectFactory).unwrap();
    assert_eq!(
        signature.adapter(),
        &ResultAdapter::Collection("VecDeque".to_string())
    );

    let method = MethodDecl::new("ids", ReturnType::Array(ElementType::Boxed(PrimitiveKind::Int)));
    let signature = MethodSignature::new(&method, &DefaultObjectFactory).unwrap();
    assert_eq!(
        signature.adapter(),
        &ResultAdapter::Array(ElementType::Boxed(PrimitiveKind::Int))
    );
}

#[test]
fn test_special_parameter_positions_are_recorded() {
    let method = MethodDecl::new("stream", ReturnType::Void)
        .param(ParamDecl::named("team"))
        .param(ParamDecl::row_bounds())
        .param(ParamDecl::result_handler());

    let signature = MethodSignature::new(&method, &DefaultObjectFactory).unwrap();

    assert_eq!(signature.row_bounds_index(), Some(1));
    assert_eq!(signature.result_handler_index(), Some(2));
    assert!(signature.has_result_handler());
    assert!(signature.returns_void());
}

#[test]
fn test_positional_names_use_declared_position() {
    let resolver = ParamNameResolver::new(&[
        ParamDecl::value(),
        ParamDecl::row_bounds(),
        ParamDecl::named("team"),
        ParamDecl::value(),
    ]);

    assert_eq!(resolver.names(), vec!["arg0", "team", "arg3"]);
}

#[test]
fn test_single_unnamed_argument_passes_through() {
    let resolver = ParamNameResolver::new(&[ParamDecl::value()]);

    let folded = resolver.named_params(vec![ParamValue::Value(Value::Integer(7))]);

    assert_eq!(folded, ParameterObject::Single(ParamValue::Value(Value::Integer(7))));
    assert_eq!(resolver.named_params(Vec::new()), ParameterObject::None);
}

#[test]
fn test_single_named_argument_is_wrapped() {
    let resolver = ParamNameResolver::new(&[ParamDecl::named("id")]);

    let ParameterObject::Map(map) = resolver.named_params(vec![Value::Integer(7).into()]) else {
        panic!("expected a parameter map");
    };

    assert_eq!(map.names(), vec!["id", "param1"]);
}

#[test]
fn test_generic_names_are_published_alongside_declared_names() {
    let resolver = ParamNameResolver::new(&[ParamDecl::named("name"), ParamDecl::value()]);

    let ParameterObject::Map(map) = resolver.named_params(vec![
        Value::Text("alice".to_string()).into(),
        Value::Integer(30).into(),
    ]) else {
        panic!("expected a parameter map");
    };

    assert_eq!(map.names(), vec!["arg1", "name", "param1", "param2"]);
    assert_eq!(
        map.get("param2").unwrap(),
        &ParamValue::Value(Value::Integer(30))
    );
}

#[test]
fn test_generic_name_is_not_published_over_declared_one() {
    let resolver = ParamNameResolver::new(&[ParamDecl::named("param2"), ParamDecl::value()]);

    let ParameterObject::Map(map) = resolver.named_params(vec![
        Value::Integer(1).into(),
        Value::Integer(2).into(),
    ]) else {
        panic!("expected a parameter map");
    };

    assert_eq!(map.get("param2").unwrap(), &ParamValue::Value(Value::Integer(1)));
    assert_eq!(map.get("param1").unwrap(), &ParamValue::Value(Value::Integer(1)));
    assert_eq!(map.get("arg1").unwrap(), &ParamValue::Value(Value::Integer(2)));
}

#[test]
fn test_param_map_miss_lists_available_names() {
    let map = ParamMap::new()
        .with("name", Value::Text("alice".to_string()))
        .with("age", Value::Integer(30));

    let err = map.get("team").unwrap_err();

    assert_eq!(
        err,
        MapperError::ParameterNotFound {
            name: "team".to_string(),
            available: vec!["age".to_string(), "name".to_string()],
        }
    );
    assert!(err.to_string().contains("Available parameters are"));
}

#[test]
fn test_dotted_property_reads_record_column() {
    let user = Row::from_pairs([
        ("id", Value::Integer(1)),
        ("name", Value::Text("alice".to_string())),
    ]);
    let parameter = ParameterObject::Map(ParamMap::new().with("user", user.clone()));

    assert_eq!(
        parameter.resolve("user.name").unwrap(),
        Value::Text("alice".to_string())
    );
    assert!(matches!(
        parameter.resolve("user.email"),
        Err(MapperError::ParameterNotFound { .. })
    ));

    let single = ParameterObject::Single(ParamValue::Record(user));
    assert_eq!(single.resolve("id").unwrap(), Value::Integer(1));
}

#[test]
fn test_convert_args_splits_roles() {
    let method = MethodDecl::new("page", ReturnType::List)
        .param(ParamDecl::named("team"))
        .param(ParamDecl::row_bounds());
    let signature = MethodSignature::new(&method, &DefaultObjectFactory).unwrap();

    let call = signature
        .convert_args("app.UserMapper.page", vec!["red".into(), RowBounds::new(1, 2).into()])
        .unwrap();

    assert_eq!(call.bounds, RowBounds::new(1, 2));
    assert!(call.handler.is_none());
    assert_eq!(
        call.parameter.resolve("team").unwrap(),
        Value::Text("red".to_string())
    );
}

#[test]
fn test_convert_args_rejects_wrong_arity_and_kinds() {
    let method = MethodDecl::new("page", ReturnType::List)
        .param(ParamDecl::named("team"))
        .param(ParamDecl::row_bounds());
    let signature = MethodSignature::new(&method, &DefaultObjectFactory).unwrap();

    let err = signature
        .convert_args("app.UserMapper.page", vec!["red".into()])
        .unwrap_err();
    assert!(err.to_string().contains("expects 2 arguments"));

    let err = signature
        .convert_args("app.UserMapper.page", vec!["red".into(), Argument::from(5i64)])
        .unwrap_err();
    assert!(err.to_string().contains("argument 1"));
}

#[test]
fn test_registered_mapper_replays_resolution_failures() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement(statement("app.BaseMapper.findAll", "SELECT * FROM users"))
        .unwrap();
    configuration.add_mapper(base_mapper()).unwrap();

    let table = configuration.mapper("app.BaseMapper").unwrap();
    let first = table.method("count").unwrap_err();
    let second = table.method("count").unwrap_err();

    assert_eq!(first, second);
    assert!(table.method("findAll").is_ok());
    assert_eq!(table.method_names(), vec!["count", "findAll"]);
    assert!(table.method("missing").is_err());
}

#[test]
fn test_mapper_registers_once() {
    let mut configuration = Configuration::default();
    configuration.add_mapper(base_mapper()).unwrap();

    let err = configuration.add_mapper(base_mapper()).unwrap_err();

    assert!(err.to_string().contains("already known"));
    assert!(configuration.has_mapper("app.BaseMapper"));
    assert!(configuration.mapper("app.Other").is_err());
}
