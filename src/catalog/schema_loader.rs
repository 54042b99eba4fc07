use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::common::{DbError, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::{DataType, Schema, SchemaBuilder};

use super::Catalog;

/// A table declaration parsed from one schema line
#[derive(Debug, PartialEq)]
struct TableDef {
    name: String,
    columns: Vec<(String, DataType)>,
    primary_key: String,
}

/// Parses `name (field type [pk], field type, ...)`.
fn parse_line(line: &str, line_no: usize) -> Result<TableDef> {
    let invalid = |reason: String| DbError::InvalidSchemaFile {
        line: line_no,
        reason,
    };

    let open = line
        .find('(')
        .ok_or_else(|| invalid("missing '('".to_string()))?;
    let close = line
        .rfind(')')
        .filter(|&c| c > open)
        .ok_or_else(|| invalid("missing ')'".to_string()))?;

    let name = line[..open].trim();
    if name.is_empty() {
        return Err(invalid("missing table name".to_string()));
    }

    let mut columns = Vec::new();
    let mut primary_key = String::new();

    for field in line[open + 1..close].split(',') {
        let parts: Vec<&str> = field.split_whitespace().collect();
        let (col, ty, annotation) = match parts.as_slice() {
            [col, ty] => (*col, *ty, None),
            [col, ty, ann] => (*col, *ty, Some(*ann)),
            _ => return Err(invalid(format!("malformed field '{}'", field.trim()))),
        };

        let data_type =
            DataType::parse(ty).ok_or_else(|| invalid(format!("unknown type '{}'", ty)))?;

        match annotation {
            None => {}
            Some("pk") => primary_key = col.to_string(),
            Some(other) => return Err(invalid(format!("unknown annotation '{}'", other))),
        }

        columns.push((col.to_string(), data_type));
    }

    Ok(TableDef {
        name: name.to_string(),
        columns,
        primary_key,
    })
}

impl Catalog {
    /// Loads table declarations from a schema file, one table per line.
    /// Each table is backed by `<name>.dat` next to the schema file,
    /// created when missing. Blank lines are skipped.
    ///
    /// Returns the ids of the loaded tables in file order. Reloading tables
    /// into a catalog whose buffer pool is in use has the caveat described
    /// on [`Catalog::add_table`].
    pub fn load_schema<P: AsRef<Path>>(&self, path: P, page_size: usize) -> Result<Vec<TableId>> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let base = fs::canonicalize(path)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut loaded = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let def = parse_line(line, i + 1)?;

            let schema: Arc<Schema> = def
                .columns
                .iter()
                .fold(SchemaBuilder::new(), |b, (name, ty)| b.column(name.as_str(), *ty))
                .build_arc();

            let file = HeapFile::open(base.join(format!("{}.dat", def.name)), schema, page_size)?;
            info!("added table {} with schema {}", def.name, file.schema());
            loaded.push(self.add_table(Arc::new(file), def.name, def.primary_key));
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let def = parse_line("users (id int pk, name string)", 1).unwrap();
        assert_eq!(def.name, "users");
        assert_eq!(
            def.columns,
            vec![
                ("id".to_string(), DataType::Integer),
                ("name".to_string(), DataType::Char(128)),
            ]
        );
        assert_eq!(def.primary_key, "id");
    }

    #[test]
    fn test_parse_errors_carry_line_number() {
        let err = parse_line("t (a blob)", 7).unwrap_err();
        assert!(matches!(err, DbError::InvalidSchemaFile { line: 7, .. }));

        assert!(parse_line("t (a int key)", 1).is_err());
        assert!(parse_line("t a int", 1).is_err());
        assert!(parse_line("(a int)", 1).is_err());
        assert!(parse_line("t (a)", 1).is_err());
    }
}
