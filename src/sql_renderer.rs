use crate::sql_ast::*;

const INDENT: &str = "    ";

pub fn render(schema: &Schema, header: bool) -> String {
    let mut out = String::new();
    if header {
        out.push_str("-- Generated by ersql\n");
        out.push_str(&format!("-- {} tables\n\n", schema.tables.len()));
    }
    let statements: Vec<String> = schema.tables.iter().map(render_table).collect();
    out.push_str(&statements.join("\n\n"));
    if !statements.is_empty() {
        out.push('\n');
    }
    out
}

pub fn render_table(table: &TableDef) -> String {
    let mut constraints: Vec<&TableConstraint> = table.constraints.iter().collect();
    constraints.sort_by_key(|c| c.rank());

    let lines: Vec<String> = table
        .columns
        .iter()
        .map(render_column)
        .chain(constraints.into_iter().map(render_constraint))
        .map(|line| format!("{INDENT}{line}"))
        .collect();

    format!("CREATE TABLE {} (\n{}\n);", table.name, lines.join(",\n"))
}

fn render_column(column: &ColumnDef) -> String {
    let mut parts = vec![column.name.clone(), column.data_type.clone()];
    match &column.generated {
        Some(expression) => parts.push(format!("GENERATED ALWAYS AS ({expression}) STORED")),
        None => {
            parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());
            if let Some(value) = &column.default {
                parts.push(format!("DEFAULT {value}"));
            }
        }
    }
    match column.inline {
        InlineKey::None => {}
        InlineKey::PrimaryKey => parts.push("PRIMARY KEY".to_string()),
        InlineKey::Unique => parts.push("UNIQUE".to_string()),
    }
    if let Some(condition) = &column.check {
        parts.push(format!("CHECK ({condition})"));
    }
    parts.join(" ")
}

fn render_constraint(constraint: &TableConstraint) -> String {
    match constraint {
        TableConstraint::PrimaryKey(columns) => format!("PRIMARY KEY ({})", columns.join(", ")),
        TableConstraint::Unique(columns) => format!("UNIQUE ({})", columns.join(", ")),
        TableConstraint::ForeignKey {
            columns,
            table,
            references,
            on_delete_cascade,
        } => {
            let mut clause = format!(
                "FOREIGN KEY ({}) REFERENCES {table} ({})",
                columns.join(", "),
                references.join(", ")
            );
            if *on_delete_cascade {
                clause.push_str(" ON DELETE CASCADE");
            }
            clause
        }
        TableConstraint::Check(condition) => format!("CHECK ({condition})"),
    }
}
