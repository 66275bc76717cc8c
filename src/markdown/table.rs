//! Table rendering

/// A table collected from the document, one `Vec` of rendered cells per row
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableRows {
    pub rows: Vec<Vec<String>>,
}

impl TableRows {
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(String::is_empty))
    }

    fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Renders an aligned pipe table, treating the first row as the header
    pub fn to_pipe_table(&self) -> String {
        let columns = self.columns();
        if columns == 0 || self.is_empty() {
            return String::new();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                (0..columns)
                    .map(|i| row.get(i).map(|c| c.replace('|', "\\|")).unwrap_or_default())
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..columns)
            .map(|i| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut lines = Vec::with_capacity(cells.len() + 1);
        for (index, row) in cells.iter().enumerate() {
            lines.push(pipe_row(row, &widths));
            if index == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                lines.push(pipe_row(&rule, &widths));
            }
        }
        lines.join("\n")
    }

    /// Renders one line per row with cells separated by spaces
    pub fn to_plain_rows(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|cell| !cell.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn pipe_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    format!("| {} |", padded.join(" | "))
}
