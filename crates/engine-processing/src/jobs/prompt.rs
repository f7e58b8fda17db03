use model::jobs::ContextEntry;

const CELL_PLACEHOLDER: &str = "{cell}";
const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Renders the per-cell user prompt.
///
/// `{cell}` and `{context}` in the instruction are substituted in a single
/// pass, so values that themselves contain placeholders are left alone.
/// Without `{cell}` the value is appended as `Cell content: ...`; without
/// `{context}` a non-empty context is appended as a bulleted block.
pub fn render_user_prompt(instruction: &str, cell: &str, context: &[ContextEntry]) -> String {
    let has_cell = instruction.contains(CELL_PLACEHOLDER);
    let has_context = instruction.contains(CONTEXT_PLACEHOLDER);
    let context_lines = context_block(context);

    let mut out = substitute(instruction, cell, &context_lines);

    if !has_cell {
        out.push_str("\n\nCell content: ");
        out.push_str(cell);
    }

    if !has_context && !context.is_empty() {
        out.push_str("\n\nContext information:\n");
        out.push_str(&context_lines);
    }

    out
}

fn context_block(context: &[ContextEntry]) -> String {
    context
        .iter()
        .map(|entry| format!("- {}: {}\n", entry.column, entry.value))
        .collect()
}

fn substitute(template: &str, cell: &str, context: &str) -> String {
    let mut out = String::with_capacity(template.len() + cell.len());
    let mut rest = template;

    while let Some(idx) = rest.find('{') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(after) = tail.strip_prefix(CELL_PLACEHOLDER) {
            out.push_str(cell);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            out.push_str(context.trim_end_matches('\n'));
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> Vec<ContextEntry> {
        pairs
            .iter()
            .map(|(c, v)| ContextEntry {
                column: c.to_string(),
                value: v.to_string(),
            })
            .collect()
    }

    #[test]
    fn appends_cell_and_context_when_no_placeholders() {
        let rendered = render_user_prompt(
            "Normalise the phone number.",
            "555.123.4567",
            &ctx(&[("country", "US"), ("name", "Ada")]),
        );
        assert_eq!(
            rendered,
            "Normalise the phone number.\n\nCell content: 555.123.4567\n\nContext information:\n- country: US\n- name: Ada\n"
        );
    }

    #[test]
    fn no_context_block_when_context_is_empty() {
        let rendered = render_user_prompt("Uppercase it.", "abc", &[]);
        assert_eq!(rendered, "Uppercase it.\n\nCell content: abc");
    }

    #[test]
    fn explicit_placeholders_are_substituted_in_place() {
        let rendered = render_user_prompt(
            "Given:\n{context}\nRewrite '{cell}' formally.",
            "hey there",
            &ctx(&[("tone", "formal")]),
        );
        assert_eq!(rendered, "Given:\n- tone: formal\nRewrite 'hey there' formally.");
    }

    #[test]
    fn values_containing_placeholders_are_not_expanded() {
        let rendered = render_user_prompt("Echo {cell}", "{context}", &ctx(&[("a", "b")]));
        assert!(rendered.starts_with("Echo {context}"));
        assert!(rendered.ends_with("Context information:\n- a: b\n"));
    }

    #[test]
    fn unrelated_braces_survive() {
        let rendered = render_user_prompt("Return JSON like {\"v\": {cell}}", "1", &[]);
        assert_eq!(rendered, "Return JSON like {\"v\": 1}");
    }
}
