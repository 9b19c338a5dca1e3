//! Search request bodies for the DataJud `_search` endpoint.
//!
//! Every page request is a boolean `must` over a filing-date range and one
//! filter clause, sorted by `dataAjuizamento` descending then
//! `numeroProcesso.keyword` ascending. The sort is a total order, which the
//! search-after cursor requires.

use serde_json::{Value, json};

use crate::window::{DateEncoding, SearchWindow};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

const DATE_FIELD: &str = "dataAjuizamento";
const ID_SORT_FIELD: &str = "numeroProcesso.keyword";
const SUBJECT_CODE_FIELD: &str = "assuntos.codigo";

/// Fields searched by the LGPD preset and by free-text queries without
/// explicit fields.
pub const LGPD_FIELDS: &[&str] = &["assuntos.nome", "movimentos.nome"];

/// Which cases to match inside the window.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    /// `query_string` OR-query over the given fields.
    FullText { query: String, fields: Vec<String> },
    /// Exact match on a numeric subject code.
    Subject { code: u32 },
}

impl QuerySpec {
    /// Data-protection cases: LGPD, personal data or privacy in subjects or movements.
    pub fn lgpd() -> Self {
        QuerySpec::FullText {
            query: "(LGPD) OR (*Dados*) OR (*Privacidade*)".into(),
            fields: LGPD_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Short label used in output file names.
    pub fn label(&self) -> String {
        if *self == Self::lgpd() {
            return "lgpd".into();
        }
        match self {
            QuerySpec::FullText { .. } => "busca".into(),
            QuerySpec::Subject { code } => code.to_string(),
        }
    }

    fn clause(&self) -> Value {
        match self {
            QuerySpec::FullText { query, fields } => json!({
                "query_string": { "query": query, "fields": fields }
            }),
            QuerySpec::Subject { code } => json!({
                "match": { SUBJECT_CODE_FIELD: code }
            }),
        }
    }
}

/// Sort values of the last hit on a page, threaded into the next request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor(pub Vec<Value>);

impl PageCursor {
    /// Cursor from a hit's `sort` array. Empty arrays give no cursor.
    pub fn from_sort(sort: &[Value]) -> Option<Self> {
        if sort.is_empty() {
            None
        } else {
            Some(Self(sort.to_vec()))
        }
    }
}

/// Everything needed to build page requests for one run.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub window: SearchWindow,
    pub filter: QuerySpec,
    pub page_size: u32,
    pub encoding: DateEncoding,
    /// Restricts the `_source` projection when set.
    pub source_fields: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn new(window: SearchWindow, filter: QuerySpec) -> Self {
        Self {
            window,
            filter,
            page_size: DEFAULT_PAGE_SIZE,
            encoding: DateEncoding::default(),
            source_fields: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_encoding(mut self, encoding: DateEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_source_fields(mut self, fields: Vec<String>) -> Self {
        self.source_fields = if fields.is_empty() { None } else { Some(fields) };
        self
    }

    /// JSON body for one page. `cursor` is `None` for the first page.
    pub fn page_body(&self, cursor: Option<&PageCursor>) -> Value {
        let range = json!({
            "range": {
                DATE_FIELD: {
                    "gte": self.encoding.render(&self.window.start()),
                    "lte": self.encoding.render(&self.window.end()),
                }
            }
        });

        let mut body = json!({
            "query": { "bool": { "must": [range, self.filter.clause()] } },
            "size": self.page_size,
            "sort": [
                { DATE_FIELD: "desc" },
                { ID_SORT_FIELD: "asc" },
            ],
        });

        if let Some(fields) = &self.source_fields {
            body["_source"] = json!(fields);
        }
        if let Some(PageCursor(values)) = cursor {
            body["search_after"] = Value::Array(values.clone());
        }
        body
    }
}
