use anyhow::Result;

use crate::{
    cli::FieldsArgs,
    table::render_table,
    vocabulary::{ReferenceSchema, Side},
};

pub fn execute(args: &FieldsArgs) -> Result<()> {
    print!("{}", render_listing(args.side));
    Ok(())
}

/// Canonical vocabularies, plus the reference schemas when the target side is listed.
pub fn render_listing(side: Option<Side>) -> String {
    let sides = match side {
        Some(side) => vec![side],
        None => vec![Side::Incoming, Side::Target],
    };
    let mut out = String::new();
    for side in &sides {
        let rows = side
            .vocabulary()
            .iter()
            .map(|field| vec![field.name.to_string(), field.description.to_string()])
            .collect::<Vec<_>>();
        out.push_str(&format!("{} fields\n", capitalize(&side.to_string())));
        out.push_str(&render_table(&["field", "description"], &rows));
        out.push('\n');
    }

    if sides.contains(&Side::Target) {
        for schema in ReferenceSchema::ALL {
            let rows = schema
                .field_mapping()
                .into_iter()
                .map(|(source, canonical)| vec![source, canonical])
                .collect::<Vec<_>>();
            out.push_str(&format!(
                "{} ({} columns)\n",
                schema.label(),
                schema.columns().len()
            ));
            out.push_str(&render_table(&["column", "field"], &rows));
            out.push('\n');
        }
    }
    out
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
