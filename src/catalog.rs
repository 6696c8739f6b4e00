//! Schema catalog: known table/column/function/keyword name sets.
//!
//! The catalog is consumed, never owned: a [`SchemaProvider`] collaborator
//! supplies the name sets (typically from the live database schema) and the
//! engine memoizes them once per process. Provider failures degrade to empty
//! sets so unresolved identifiers classify as neutral filler instead of
//! aborting a scan.

use crate::error::Result;
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;

/// Built-in MySQL function names used when no live schema is available.
const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "ascii", "avg", "benchmark", "bin", "cast", "ceil", "ceiling", "char",
    "char_length", "coalesce", "compress", "concat", "concat_ws", "conv", "convert",
    "count", "curdate", "current_date", "current_time", "current_timestamp",
    "current_user", "curtime", "database", "date_add", "date_format", "date_sub",
    "decode", "elt", "encode", "encrypt", "export_set", "extract", "extractvalue",
    "field", "find_in_set", "floor", "format", "found_rows", "from_base64",
    "get_lock", "greatest", "group_concat", "hex", "if", "ifnull", "insert",
    "instr", "isnull", "last_insert_id", "lcase", "least", "left", "length",
    "load_file", "locate", "lower", "lpad", "ltrim", "make_set", "max", "md5",
    "mid", "min", "mod", "now", "nullif", "oct", "ord", "password", "pi",
    "position", "pow", "power", "quote", "rand", "release_lock", "repeat",
    "replace", "reverse", "right", "round", "row_count", "rpad", "rtrim",
    "schema", "session_user", "sha", "sha1", "sha2", "sign", "sleep", "soundex",
    "space", "sqrt", "strcmp", "substr", "substring", "substring_index", "sum",
    "sysdate", "system_user", "to_base64", "trim", "truncate", "ucase", "unhex",
    "upper", "user", "uncompress", "updatexml", "uuid", "version", "weight_string",
];

/// Built-in MySQL reserved keywords used when no live schema is available.
///
/// Statement verbs and clause options are classified separately by the SQL
/// detector; this list carries the remaining reserved vocabulary.
const BUILTIN_KEYWORDS: &[&str] = &[
    "any", "as", "asc", "between", "by", "case", "collate", "column", "cross",
    "cursor", "database", "databases", "declare", "default", "dual", "each",
    "else", "elseif", "end", "escape", "exists", "fetch", "for", "force",
    "foreign", "fulltext", "grant", "group", "having", "in", "index", "inner",
    "interval", "is", "join", "key", "keys", "kill", "leading", "left", "limit",
    "lock", "match", "natural", "null", "offset", "on", "order", "outer",
    "outfile", "primary", "procedure", "references", "regexp", "revoke", "right",
    "schemas", "some", "then", "top", "trailing", "trigger", "unique", "unlock",
    "usage", "use", "using", "values", "when", "where", "while", "with",
];

/// Read-only supplier of schema name sets.
///
/// Implementations are external collaborators (a live connection, a cached
/// snapshot, a fixture). Each accessor may fail independently; the catalog
/// recovers by treating that set as empty.
pub trait SchemaProvider: Send + Sync {
    /// Names of all known tables.
    fn table_names(&self) -> Result<HashSet<String>>;
    /// Names of all known columns across tables.
    fn column_names(&self) -> Result<HashSet<String>>;
    /// Names of the built-in functions of the SQL dialect.
    fn function_names(&self) -> Result<HashSet<String>>;
    /// Reserved keywords of the SQL dialect.
    fn reserved_keywords(&self) -> Result<HashSet<String>>;
}

/// In-memory schema provider.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    tables: HashSet<String>,
    columns: HashSet<String>,
    functions: HashSet<String>,
    keywords: HashSet<String>,
}

impl StaticSchemaProvider {
    /// Provider with explicit name sets for every category.
    pub fn new(
        tables: HashSet<String>,
        columns: HashSet<String>,
        functions: HashSet<String>,
        keywords: HashSet<String>,
    ) -> Self {
        Self { tables, columns, functions, keywords }
    }

    /// Provider carrying the given tables/columns plus the built-in MySQL
    /// function and keyword vocabulary.
    pub fn with_mysql_vocabulary(tables: HashSet<String>, columns: HashSet<String>) -> Self {
        Self {
            tables,
            columns,
            functions: BUILTIN_FUNCTIONS.iter().map(|s| s.to_string()).collect(),
            keywords: BUILTIN_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Provider with no schema data at all.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn table_names(&self) -> Result<HashSet<String>> {
        Ok(self.tables.clone())
    }

    fn column_names(&self) -> Result<HashSet<String>> {
        Ok(self.columns.clone())
    }

    fn function_names(&self) -> Result<HashSet<String>> {
        Ok(self.functions.clone())
    }

    fn reserved_keywords(&self) -> Result<HashSet<String>> {
        Ok(self.keywords.clone())
    }
}

#[derive(Debug, Default)]
struct CatalogSets {
    tables: HashSet<String>,
    columns: HashSet<String>,
    functions: HashSet<String>,
    keywords: HashSet<String>,
}

/// Lazily-memoized, read-only view over a [`SchemaProvider`].
///
/// The provider is queried once, on first lookup; the loaded sets are
/// lowercased and kept for the process lifetime. Construct one catalog at
/// startup and share it by reference with the detectors that need it.
pub struct SchemaCatalog {
    provider: Arc<dyn SchemaProvider>,
    sets: OnceCell<CatalogSets>,
}

impl SchemaCatalog {
    /// Catalog backed by the given provider.
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self { provider, sets: OnceCell::new() }
    }

    /// Catalog with no live schema, carrying only the built-in MySQL
    /// vocabulary.
    pub fn builtin() -> Self {
        Self::new(Arc::new(StaticSchemaProvider::with_mysql_vocabulary(
            HashSet::new(),
            HashSet::new(),
        )))
    }

    fn sets(&self) -> &CatalogSets {
        self.sets.get_or_init(|| {
            let mut loaded = CatalogSets::default();
            let mut failures = Vec::new();

            match self.provider.table_names() {
                Ok(names) => loaded.tables = lowercase(names),
                Err(e) => failures.push(format!("tables: {e}")),
            }
            match self.provider.column_names() {
                Ok(names) => loaded.columns = lowercase(names),
                Err(e) => failures.push(format!("columns: {e}")),
            }
            match self.provider.function_names() {
                Ok(names) => loaded.functions = lowercase(names),
                Err(e) => failures.push(format!("functions: {e}")),
            }
            match self.provider.reserved_keywords() {
                Ok(names) => loaded.keywords = lowercase(names),
                Err(e) => failures.push(format!("keywords: {e}")),
            }

            if !failures.is_empty() {
                tracing::warn!(
                    detail = %failures.join("; "),
                    "schema catalog degraded, unresolved identifiers will rank as filler"
                );
            }

            loaded
        })
    }

    /// True if the token names a known table.
    pub fn is_table_name(&self, token: &str) -> bool {
        self.sets().tables.contains(&token.to_lowercase())
    }

    /// True if the token names a known column.
    pub fn is_column_name(&self, token: &str) -> bool {
        self.sets().columns.contains(&token.to_lowercase())
    }

    /// True if the token names a built-in SQL function.
    pub fn is_function_name(&self, token: &str) -> bool {
        self.sets().functions.contains(&token.to_lowercase())
    }

    /// True if the token is a reserved SQL keyword.
    pub fn is_reserved_keyword(&self, token: &str) -> bool {
        self.sets().keywords.contains(&token.to_lowercase())
    }
}

impl std::fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded = self.sets.get();
        f.debug_struct("SchemaCatalog")
            .field("loaded", &loaded.is_some())
            .finish()
    }
}

fn lowercase(names: HashSet<String>) -> HashSet<String> {
    names.into_iter().map(|n| n.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FailingProvider;

    impl SchemaProvider for FailingProvider {
        fn table_names(&self) -> Result<HashSet<String>> {
            Err(Error::catalog("connection refused"))
        }
        fn column_names(&self) -> Result<HashSet<String>> {
            Err(Error::catalog("connection refused"))
        }
        fn function_names(&self) -> Result<HashSet<String>> {
            Err(Error::catalog("connection refused"))
        }
        fn reserved_keywords(&self) -> Result<HashSet<String>> {
            Err(Error::catalog("connection refused"))
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let provider = StaticSchemaProvider::with_mysql_vocabulary(
            ["Admin_User".to_string()].into(),
            ["Email".to_string()].into(),
        );
        let catalog = SchemaCatalog::new(Arc::new(provider));
        assert!(catalog.is_table_name("ADMIN_USER"));
        assert!(catalog.is_column_name("email"));
        assert!(!catalog.is_table_name("email"));
    }

    #[test]
    fn test_builtin_vocabulary() {
        let catalog = SchemaCatalog::builtin();
        assert!(catalog.is_function_name("concat"));
        assert!(catalog.is_function_name("BENCHMARK"));
        assert!(catalog.is_reserved_keyword("where"));
        assert!(catalog.is_reserved_keyword("order"));
        assert!(!catalog.is_table_name("users"));
    }

    #[test]
    fn test_failing_provider_degrades_to_empty() {
        let catalog = SchemaCatalog::new(Arc::new(FailingProvider));
        assert!(!catalog.is_table_name("admin_user"));
        assert!(!catalog.is_function_name("concat"));
        assert!(!catalog.is_reserved_keyword("where"));
    }
}
