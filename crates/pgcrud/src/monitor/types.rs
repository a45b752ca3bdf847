use std::fmt;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., DDL, custom)
    Other,
}

impl QueryType {
    /// Detect query type from the leading keyword of a SQL string.
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("");
        if keyword.eq_ignore_ascii_case("select") {
            QueryType::Select
        } else if keyword.eq_ignore_ascii_case("insert") {
            QueryType::Insert
        } else if keyword.eq_ignore_ascii_case("update") {
            QueryType::Update
        } else if keyword.eq_ignore_ascii_case("delete") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Select => write!(f, "SELECT"),
            QueryType::Insert => write!(f, "INSERT"),
            QueryType::Update => write!(f, "UPDATE"),
            QueryType::Delete => write!(f, "DELETE"),
            QueryType::Other => write!(f, "OTHER"),
        }
    }
}

/// What the logger knows about one statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query_type: QueryType,
    /// Caller-supplied label, e.g. `users.create`.
    pub tag: Option<String>,
    pub sql: String,
    pub param_count: usize,
}

impl QueryContext {
    pub fn new(sql: impl Into<String>, param_count: usize) -> Self {
        let sql = sql.into();
        Self {
            query_type: QueryType::from_sql(&sql),
            tag: None,
            sql,
            param_count,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}
