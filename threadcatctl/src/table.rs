//! Fixed-width text table for the activity review.
//!
//! Widths are measured in terminal columns: characters beyond Latin-1
//! (CJK and the like) take two.

use threadcat_core::query::ChatActivity;

const CELL_LIMIT: usize = 8;
const CELL_WIDTH: usize = 10;

fn char_width(c: char) -> usize {
    if u32::from(c) > 0xFF { 2 } else { 1 }
}

pub fn visual_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Pads `s` to `total` columns, truncating with `..` past `limit`.
pub fn fit(s: &str, limit: usize, total: usize) -> String {
    let mut out = String::new();
    if visual_width(s) > limit {
        let mut used = 0;
        for c in s.chars() {
            let w = char_width(c);
            if used + w + 2 > limit {
                break;
            }
            out.push(c);
            used += w;
        }
        out.push_str("..");
    } else {
        out.push_str(s);
    }
    let pad = total.saturating_sub(visual_width(&out));
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

/// One column per chat, topic names stacked underneath.
pub fn render_review(columns: &[ChatActivity]) -> String {
    if columns.is_empty() {
        return String::from("No scan records yet.");
    }

    let headers: Vec<String> = columns
        .iter()
        .map(|chat| fit(chat.title.trim(), CELL_LIMIT, CELL_WIDTH))
        .collect();
    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|chat| {
            chat.topics
                .iter()
                .map(|topic| fit(&topic.name, CELL_LIMIT, CELL_WIDTH))
                .collect()
        })
        .collect();
    let rows = cells.iter().map(Vec::len).max().unwrap_or(0);
    let blank = " ".repeat(CELL_WIDTH);

    let mut lines = Vec::with_capacity(rows + 2);
    lines.push(headers.join("| ").trim_end().to_string());
    lines.push(vec!["-".repeat(CELL_WIDTH); columns.len()].join("+-"));
    for row in 0..rows {
        let line: Vec<&str> = cells
            .iter()
            .map(|column| column.get(row).map_or(blank.as_str(), String::as_str))
            .collect();
        lines.push(line.join("| ").trim_end().to_string());
    }
    lines.join("\n")
}
