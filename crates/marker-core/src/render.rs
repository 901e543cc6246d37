//! Annotated markup rendering

use std::fmt::Write;

use marker_html::{escape_attr, escape_text};

use crate::{TextIndex, TextRange};

/// Markup for `raw` with one `<span>` per range
///
/// Plain text between ranges is emitted as escaped text. Each span records
/// the range label, its position in `ranges` and its offsets, which is what
/// selection capture and geometry lookups read back from the tree.
pub fn render_markup(raw: &str, ranges: &[TextRange]) -> String {
    let index = TextIndex::new(raw);
    let mut html = String::with_capacity(raw.len() + ranges.len() * 96);
    let mut offset = 0;
    for (i, range) in ranges.iter().enumerate() {
        html.push_str(&escape_text(index.slice(offset, range.start)));
        let _ = write!(
            html,
            r#"<span class="default" data-data="{}" data-index="{}" data-start="{}" data-end="{}">"#,
            escape_attr(&range.data),
            i,
            range.start,
            range.end,
        );
        html.push_str(&escape_text(index.slice(range.start, range.end)));
        html.push_str("</span>");
        offset = range.end;
    }
    html.push_str(&escape_text(index.slice(offset, index.char_len())));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RangeId;

    fn range(start: usize, end: usize, text: &str, data: &str) -> TextRange {
        TextRange { id: RangeId::default(), start, end, text: text.into(), data: data.into() }
    }

    #[test]
    fn test_render_without_ranges() {
        assert_eq!(render_markup("a < b", &[]), "a &lt; b");
    }

    #[test]
    fn test_render_spans() {
        let html = render_markup("abcdefgh", &[range(2, 4, "cd", "x")]);
        assert_eq!(
            html,
            r#"ab<span class="default" data-data="x" data-index="0" data-start="2" data-end="4">cd</span>efgh"#
        );
    }

    #[test]
    fn test_render_adjacent_ranges() {
        let html = render_markup("abcd", &[range(0, 2, "ab", ""), range(2, 4, "cd", "\"q\"")]);
        assert!(html.starts_with(r#"<span class="default" data-data="" data-index="0""#));
        assert!(html.contains(r#"data-data="&quot;q&quot;" data-index="1""#));
        assert!(html.ends_with("cd</span>"));
    }
}
