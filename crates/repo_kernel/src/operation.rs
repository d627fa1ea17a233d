//! Declared operations
//!
//! An [`OperationSignature`] is the metadata a contract implementation hands
//! to the dispatcher: the operation's name, its parameter names in declaration
//! order, the shape of its return value, and the query template it runs.

use std::fmt;

use crate::entity::Entity;

/// Execution path of a query template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Executed as a query; rows are mapped into entities
    Select,
    /// Executed as a mutation; yields an affected-row count
    Update,
}

/// A named-parameter SQL template and its execution path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryTemplate {
    kind: QueryKind,
    raw_text: String,
}

impl QueryTemplate {
    pub fn new(kind: QueryKind, raw_text: impl Into<String>) -> Self {
        Self {
            kind,
            raw_text: raw_text.into(),
        }
    }

    pub fn select(raw_text: impl Into<String>) -> Self {
        Self::new(QueryKind::Select, raw_text)
    }

    pub fn update(raw_text: impl Into<String>) -> Self {
        Self::new(QueryKind::Update, raw_text)
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

/// Declared return shape of an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// The result is discarded
    Unit,
    /// The number of rows changed by a mutation
    AffectedRows,
    /// At most one entity; zero rows yield an absent value
    Single(String),
    /// Every row, mapped in result order
    List(String),
}

impl ReturnShape {
    /// A single entity of type `E`
    pub fn single<E: Entity>() -> Self {
        ReturnShape::Single(E::NAME.to_string())
    }

    /// A list of entities of type `E`
    pub fn list<E: Entity>() -> Self {
        ReturnShape::List(E::NAME.to_string())
    }

    /// Returns the entity name for `Single` and `List` shapes
    pub fn entity(&self) -> Option<&str> {
        match self {
            ReturnShape::Single(entity) | ReturnShape::List(entity) => Some(entity),
            ReturnShape::Unit | ReturnShape::AffectedRows => None,
        }
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnShape::Unit => f.write_str("()"),
            ReturnShape::AffectedRows => f.write_str("affected row count"),
            ReturnShape::Single(entity) => write!(f, "Option<{}>", entity),
            ReturnShape::List(entity) => write!(f, "Vec<{}>", entity),
        }
    }
}

/// Metadata of one declared operation
///
/// # Example
///
/// ```rust
/// use repo_kernel::{OperationSignature, QueryKind, ReturnShape};
///
/// let insert = OperationSignature::update("insert", "insert into T (c) values (:value)")
///     .with_parameters(["value"])
///     .returning(ReturnShape::AffectedRows);
///
/// assert_eq!(insert.query().map(|q| q.kind()), Some(QueryKind::Update));
/// assert_eq!(insert.parameter_names(), ["value".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSignature {
    name: String,
    parameter_names: Vec<String>,
    return_shape: ReturnShape,
    query: Option<QueryTemplate>,
}

impl OperationSignature {
    /// Creates an operation without a query declaration
    ///
    /// Such an operation fails with `MissingQueryDeclaration` when invoked
    /// unless a query is attached with [`with_query`](Self::with_query).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_names: Vec::new(),
            return_shape: ReturnShape::Unit,
            query: None,
        }
    }

    /// Creates an operation running a select template
    pub fn select(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self::new(name).with_query(QueryTemplate::select(raw_text))
    }

    /// Creates an operation running an update template
    pub fn update(name: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self::new(name).with_query(QueryTemplate::update(raw_text))
    }

    pub fn with_query(mut self, query: QueryTemplate) -> Self {
        self.query = Some(query);
        self
    }

    /// Sets the declared parameter names, in call-argument order
    pub fn with_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn returning(mut self, shape: ReturnShape) -> Self {
        self.return_shape = shape;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn return_shape(&self) -> &ReturnShape {
        &self.return_shape
    }

    pub fn query(&self) -> Option<&QueryTemplate> {
        self.query.as_ref()
    }
}
