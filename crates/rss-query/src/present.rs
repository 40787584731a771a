//! Result presentation
//!
//! Everything is written to an explicit sink so callers (and tests) decide
//! where output goes.

use std::io::{self, Write};

use crate::dispatch::QueryOutcome;
use crate::store::{Cell, Row};
use crate::switches::QueryVerb;

fn width(text: &str) -> usize {
    text.chars().count()
}

/// Print rows as an aligned table framed by `-` separators.
///
/// ```text
/// ------------------
/// | name  | status |
/// ------------------
/// | siteA | Active |
/// ------------------
/// ```
pub fn print_table<W: Write>(out: &mut W, rows: &[Row], columns: &[String]) -> io::Result<()> {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(Cell::to_string).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rendered
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| width(cell))
                .fold(width(header), usize::max)
        })
        .collect();

    let header_line = format_line(
        columns.iter().map(|c| (c.as_str(), false)),
        &widths,
    );
    let separator = "-".repeat(width(&header_line));

    writeln!(out, "{}", separator)?;
    writeln!(out, "{}", header_line)?;
    writeln!(out, "{}", separator)?;

    for (row, text) in rows.iter().zip(&rendered) {
        let cells = (0..widths.len()).map(|i| {
            let numeric = row.get(i).is_some_and(Cell::is_numeric);
            (text.get(i).map(String::as_str).unwrap_or(""), numeric)
        });
        writeln!(out, "{}", format_line(cells, &widths))?;
    }

    writeln!(out, "{}", separator)
}

fn format_line<'a>(cells: impl Iterator<Item = (&'a str, bool)>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|((text, numeric), &w)| {
            if numeric {
                format!("{:>w$}", text, w = w)
            } else {
                format!("{:<w$}", text, w = w)
            }
        })
        .collect();
    format!("| {} |", padded.join(" | "))
}

/// Print the confirmation line for a finished query
pub fn confirm<W: Write>(out: &mut W, query: QueryVerb, matches: u64) -> io::Result<()> {
    writeln!(
        out,
        "\nNOTICE: '{}' query was successful ( match number: {} )!\n",
        query, matches
    )
}

/// Table (when there is one) followed by the confirmation line
pub fn render<W: Write>(out: &mut W, outcome: &QueryOutcome) -> io::Result<()> {
    if let Some((rows, columns)) = outcome.table() {
        print_table(out, rows, columns)?;
    }
    confirm(out, outcome.query, outcome.payload.match_count())
}

/// Error banner, then the usage text when there is one
pub fn report_error<W: Write>(
    out: &mut W,
    message: &str,
    usage: Option<&str>,
) -> io::Result<()> {
    writeln!(out, "\nERROR:")?;
    for line in message.lines() {
        writeln!(out, "\t{}", line.trim_start_matches('\t'))?;
    }
    if let Some(usage) = usage {
        writeln!(out, "\tPlease, check documentation below")?;
        writeln!(out, "{}", usage)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Payload;
    use chrono::NaiveDate;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_table_framing() {
        let rows = vec![vec![Cell::from("siteA"), Cell::from("Active")]];
        let columns = vec!["name".to_string(), "status".to_string()];
        let text = output(|out| print_table(out, &rows, &columns));

        let separator = "-".repeat(18);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                separator.as_str(),
                "| name  | status |",
                separator.as_str(),
                "| siteA | Active |",
                separator.as_str(),
            ]
        );
    }

    #[test]
    fn test_timestamps_and_numbers() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        let rows = vec![vec![Cell::Timestamp(ts), Cell::Integer(7), Cell::Null]];
        let columns = vec!["dateEffective".to_string(), "count".to_string(), "x".to_string()];
        let text = output(|out| print_table(out, &rows, &columns));

        assert!(text.contains("| 2024-01-02 03:04:05 |     7 | None |"));
        assert!(text.contains("| dateEffective       | count | x    |"));
    }

    #[test]
    fn test_confirmation_line() {
        let text = output(|out| confirm(out, QueryVerb::Delete, 3));
        assert_eq!(
            text,
            "\nNOTICE: 'delete' query was successful ( match number: 3 )!\n\n"
        );
    }

    #[test]
    fn test_empty_rows_print_no_table() {
        let outcome = QueryOutcome {
            query: QueryVerb::Select,
            payload: Payload::Rows(Vec::new()),
            columns: Some(vec!["name".into()]),
        };
        let text = output(|out| render(out, &outcome));
        assert!(!text.contains('|'));
        assert!(text.contains("match number: 0"));
    }

    #[test]
    fn test_report_error() {
        let message = "element Switch is mandatory but found missing";
        let text = output(|out| report_error(out, message, Some("Usage: rss-query")));
        assert_eq!(
            text,
            "\nERROR:\n\telement Switch is mandatory but found missing\n\tPlease, check documentation below\nUsage: rss-query\n"
        );

        let text = output(|out| report_error(out, "Failed to write output: closed", None));
        assert_eq!(text, "\nERROR:\n\tFailed to write output: closed\n");
    }
}
