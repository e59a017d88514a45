use crate::mapping::TableMeta;

pub struct QueryBuilder;

impl QueryBuilder {
    /// Build an INSERT binding every column by name
    pub fn build_insert_query(table: &TableMeta) -> String {
        let placeholders = vec!["?"; table.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            table.columns.join(", "),
            placeholders
        )
    }

    /// Build a SELECT * restricted by the first `key_len` key columns
    pub fn build_select_by_key(table: &TableMeta, key_len: usize, limit: Option<usize>) -> String {
        let mut query = format!(
            "SELECT * FROM {} WHERE {}",
            table.name,
            Self::key_clause(table, key_len)
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        query
    }

    /// Build a key-only SELECT used for existence checks
    pub fn build_exists_query(table: &TableMeta) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} LIMIT 1",
            table.partition_keys.join(", "),
            table.name,
            Self::key_clause(table, table.key_len())
        )
    }

    /// Build a DELETE on the full primary key
    pub fn build_delete_query(table: &TableMeta) -> String {
        format!(
            "DELETE FROM {} WHERE {}",
            table.name,
            Self::key_clause(table, table.key_len())
        )
    }

    fn key_clause(table: &TableMeta, key_len: usize) -> String {
        table
            .key_columns()
            .take(key_len)
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Dollar,
}

/// Split a CQL script into statements on `;`.
///
/// A `;` inside `'...'`, `"..."` or `$$...$$` does not end a statement.
/// `--` and `//` comments run to the end of the line, `/* */` comments to
/// their terminator. Blank statements are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote = Quote::None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match quote {
            Quote::Single | Quote::Double => {
                let closing = if quote == Quote::Single { '\'' } else { '"' };
                current.push(c);
                if c == closing {
                    // doubled quote is an escaped quote
                    if next == Some(closing) {
                        current.push(closing);
                        i += 1;
                    } else {
                        quote = Quote::None;
                    }
                }
                i += 1;
            }
            Quote::Dollar => {
                if c == '$' && next == Some('$') {
                    current.push_str("$$");
                    quote = Quote::None;
                    i += 2;
                } else {
                    current.push(c);
                    i += 1;
                }
            }
            Quote::None => match (c, next) {
                ('-', Some('-')) | ('/', Some('/')) => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                ('/', Some('*')) => {
                    i += 2;
                    while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/'))
                    {
                        i += 1;
                    }
                    i += 2;
                    current.push(' ');
                }
                ('$', Some('$')) => {
                    current.push_str("$$");
                    quote = Quote::Dollar;
                    i += 2;
                }
                (';', _) => {
                    push_statement(&mut statements, &current);
                    current.clear();
                    i += 1;
                }
                _ => {
                    if c == '\'' {
                        quote = Quote::Single;
                    } else if c == '"' {
                        quote = Quote::Double;
                    }
                    current.push(c);
                    i += 1;
                }
            },
        }
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}
