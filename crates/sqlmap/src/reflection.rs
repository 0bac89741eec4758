/// Object factory and row collections
///
/// Select results come back as a `Vec<Row>`. When a mapper method declares some other
/// collection type, the [`ObjectFactory`] creates an empty instance by type name and the
/// rows are bulk-appended to it through [`RowCollection`].
use crate::error::{MapperError, Result};
use crate::models::Row;
use std::any::Any;
use std::collections::{LinkedList, VecDeque};

/// A collection rows can be appended to in bulk.
pub trait RowCollection: std::fmt::Debug + Send {
    /// Append `rows`, keeping their order.
    fn add_all(&mut self, rows: Vec<Row>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in collection order.
    fn to_rows(&self) -> Vec<Row>;

    fn as_any(&self) -> &dyn Any;
}

impl RowCollection for Vec<Row> {
    fn add_all(&mut self, rows: Vec<Row>) {
        self.extend(rows);
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn to_rows(&self) -> Vec<Row> {
        self.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RowCollection for LinkedList<Row> {
    fn add_all(&mut self, rows: Vec<Row>) {
        self.extend(rows);
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn to_rows(&self) -> Vec<Row> {
        self.iter().cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RowCollection for VecDeque<Row> {
    fn add_all(&mut self, rows: Vec<Row>) {
        self.extend(rows);
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn to_rows(&self) -> Vec<Row> {
        self.iter().cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Creates empty collections by declared type name.
pub trait ObjectFactory: Send + Sync {
    fn create(&self, type_name: &str) -> Result<Box<dyn RowCollection>>;

    /// Whether `type_name` names a collection this factory can create.
    fn is_collection(&self, type_name: &str) -> bool;
}

/// Knows the standard sequence types:
///
/// | Declared name | Created as |
/// |---|---|
/// | `List`, `ArrayList`, `Collection`, `Vec` | `Vec<Row>` |
/// | `LinkedList` | `LinkedList<Row>` |
/// | `Deque`, `Queue`, `ArrayDeque`, `VecDeque` | `VecDeque<Row>` |
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObjectFactory;

impl ObjectFactory for DefaultObjectFactory {
    fn create(&self, type_name: &str) -> Result<Box<dyn RowCollection>> {
        match type_name {
            "List" | "ArrayList" | "Collection" | "Vec" => Ok(Box::new(Vec::<Row>::new())),
            "LinkedList" => Ok(Box::new(LinkedList::<Row>::new())),
            "Deque" | "Queue" | "ArrayDeque" | "VecDeque" => Ok(Box::new(VecDeque::<Row>::new())),
            other => Err(MapperError::configuration(format!(
                "error instantiating {other}: not a known collection type"
            ))),
        }
    }

    fn is_collection(&self, type_name: &str) -> bool {
        matches!(
            type_name,
            "List"
                | "ArrayList"
                | "Collection"
                | "Vec"
                | "LinkedList"
                | "Deque"
                | "Queue"
                | "ArrayDeque"
                | "VecDeque"
        )
    }
}
