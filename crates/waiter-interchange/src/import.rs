use std::io::Read;

use crate::InterchangeError;

/// Parse order rows: no header, one order per row, every field an argument.
///
/// The whole input is parsed before anything is returned, so a bad row aborts the load
/// instead of leaving a partial one behind.
pub fn read_orders<R: Read>(reader: R) -> Result<Vec<Vec<String>>, InterchangeError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);

    let mut rows = vec![];
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| InterchangeError::Malformed {
            line: e.position().map(|p| p.line()).unwrap_or(i as u64 + 1),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 1);
        let arguments: Vec<String> = record.iter().map(str::to_string).collect();
        if arguments.iter().all(|a| a.is_empty()) {
            return Err(InterchangeError::Malformed { line, reason: "row has no arguments".into() });
        }
        rows.push(arguments);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_of_any_width_become_argument_lists() {
        let input = "echo,hello\nsleep,1,--verbose\nsolo\n";
        let rows = read_orders(input.as_bytes()).unwrap();
        assert_eq!(rows, vec![vec!["echo", "hello"], vec!["sleep", "1", "--verbose"], vec!["solo"]]);
    }

    #[test]
    fn quoted_fields_keep_commas_and_spaces() {
        let rows = read_orders("\"a, b\",\" c \"\n".as_bytes()).unwrap();
        assert_eq!(rows, vec![vec!["a, b", " c "]]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = read_orders("a\n\nb\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn all_empty_row_aborts_with_line_number() {
        let err = read_orders("a\n,\nb\n".as_bytes()).unwrap_err();
        match err {
            InterchangeError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let bytes: &[u8] = b"ok\n\xff\xfe,x\n";
        assert!(matches!(read_orders(bytes), Err(InterchangeError::Malformed { .. })));
    }

    #[test]
    fn empty_input_loads_nothing() {
        assert!(read_orders("".as_bytes()).unwrap().is_empty());
    }
}
