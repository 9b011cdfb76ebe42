//! Row query builder for the gateway's table API.
//!
//! A `Query` renders to a table path plus PostgREST query parameters:
//!
//! ```text
//! Query::table("groups").select("id,name").eq("id", "7").single()
//!   -> GET /rest/v1/groups?select=id,name&id=eq.7
//!      Accept: application/vnd.pgrst.object+json
//! ```

/// Sort direction for an `order` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<(String, Order)>,
    limit: Option<usize>,
    single: bool,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            single: false,
        }
    }

    /// Columns to return, comma separated. Defaults to `*`.
    pub fn select(mut self, columns: &str) -> Self {
        // Multi-line column lists are common; the API rejects embedded whitespace.
        let compact: String = columns.split_whitespace().collect();
        self.columns = Some(compact);
        self
    }

    /// Exact match filter
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Case-insensitive substring match
    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        let needle: String = needle.chars().filter(|c| *c != '*' && *c != '%').collect();
        self.filters
            .push((column.to_string(), format!("ilike.*{}*", needle)));
        self
    }

    /// Add a sort key. Repeated calls sort by each key in turn.
    pub fn order(mut self, column: &str, direction: Order) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Expect exactly one row; the gateway errors otherwise.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Query-string parameters in the order the gateway documents them.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, dir)| format!("{}.{}", column, dir.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
