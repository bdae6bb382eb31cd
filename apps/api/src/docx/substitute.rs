//! Placeholder substitution over a loaded document.
//!
//! Matching is run-scoped: a token must sit entirely inside one run. A token
//! that Word split across runs (spell-check marks, partial formatting) is not
//! recognised; keeping markers in one run is the template author's job.

use tracing::debug;

use super::{Document, DocxError, Paragraph};

/// Replaces every token in `replacements` throughout the document and marks
/// each changed run bold. Returns the number of runs changed.
///
/// Visits top-level paragraphs first, then top-level tables (rows, cells,
/// cell paragraphs). Tables nested inside cells are not visited.
pub fn replace_placeholders(
    document: &mut Document,
    replacements: &[(&str, &str)],
) -> Result<usize, DocxError> {
    let mut changed = 0;

    for mut paragraph in document.paragraphs_mut() {
        changed += replace_in_paragraph(&mut paragraph, replacements)?;
    }

    for mut table in document.tables_mut() {
        for mut row in table.rows_mut() {
            for mut cell in row.cells_mut() {
                for mut paragraph in cell.paragraphs_mut() {
                    changed += replace_in_paragraph(&mut paragraph, replacements)?;
                }
            }
        }
    }

    debug!("placeholder substitution changed {changed} runs");
    Ok(changed)
}

fn replace_in_paragraph(
    paragraph: &mut Paragraph<'_>,
    replacements: &[(&str, &str)],
) -> Result<usize, DocxError> {
    let mut changed = 0;
    for mut run in paragraph.runs_mut() {
        if let Some(text) = substitute_text(&run.text()?, replacements) {
            run.set_text(&text)?;
            run.set_bold(true);
            changed += 1;
        }
    }
    Ok(changed)
}

/// Applies tokens in table order. Each token claims every occurrence that
/// does not overlap a span claimed by an earlier token; the claimed spans are
/// then replaced in one pass, so substituted values are never re-scanned.
/// Returns `None` when no token occurs.
pub fn substitute_text(text: &str, replacements: &[(&str, &str)]) -> Option<String> {
    let mut claimed: Vec<(usize, usize, &str)> = Vec::new();

    for &(token, value) in replacements {
        if token.is_empty() {
            continue;
        }
        let mut from = 0;
        while let Some(found) = text[from..].find(token) {
            let start = from + found;
            let end = start + token.len();
            if claimed.iter().any(|&(s, e, _)| start < e && s < end) {
                // Retry from the next character; a later occurrence may be free.
                from = start + text[start..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
            claimed.push((start, end, value));
            from = end;
        }
    }

    if claimed.is_empty() {
        return None;
    }
    claimed.sort_unstable_by_key(|&(start, _, _)| start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, value) in claimed {
        out.push_str(&text[cursor..start]);
        out.push_str(value);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    Some(out)
}
