use super::*;
use crate::error::Malformed;

fn rows(input: &str) -> Vec<Vec<String>> {
    ValuesParser::new(input.as_bytes())
        .map(|row| {
            row.unwrap()
                .into_iter()
                .map(|raw| String::from_utf8(raw.to_vec()).unwrap())
                .collect()
        })
        .collect()
}

fn first_error(input: &str) -> ParseError {
    ValuesParser::new(input.as_bytes())
        .find_map(Result::err)
        .expect("expected a parse error")
}

#[test]
fn test_single_row() {
    assert_eq!(rows("(1,2,3);"), vec![vec!["1", "2", "3"]]);
}

#[test]
fn test_multiple_rows_keep_input_order() {
    assert_eq!(
        rows("(1,'a'),(2,'b'),(3,'c');"),
        vec![vec!["1", "'a'"], vec!["2", "'b'"], vec!["3", "'c'"]]
    );
}

#[test]
fn test_parens_inside_quotes_are_data() {
    assert_eq!(rows("('x),(y',1);"), vec![vec!["'x),(y'", "1"]]);
    assert_eq!(rows("('(',')'),('a','b');").len(), 2);
}

#[test]
fn test_comma_inside_quotes_is_data() {
    assert_eq!(rows("('a,b','c');"), vec![vec!["'a,b'", "'c'"]]);
}

#[test]
fn test_escaped_quote_does_not_close_string() {
    assert_eq!(
        rows(r"('it\'s (fine)',2);"),
        vec![vec![r"'it\'s (fine)'", "2"]]
    );
}

#[test]
fn test_escaped_backslash_before_quote_closes_string() {
    assert_eq!(rows(r"('a\\',1);"), vec![vec![r"'a\\'", "1"]]);
}

#[test]
fn test_doubled_quote_stays_inside_string() {
    assert_eq!(rows("('it''s),(x',1);"), vec![vec!["'it''s),(x'", "1"]]);
}

#[test]
fn test_whitespace_between_rows_and_fields() {
    assert_eq!(
        rows("( 1 , 'a' ) ,\t( 2 , 'b' ) ;  \r\n"),
        vec![vec!["1", "'a'"], vec!["2", "'b'"]]
    );
}

#[test]
fn test_multibyte_data() {
    assert_eq!(
        rows("(1,'数据库'),(2,'😀');"),
        vec![vec!["1", "'数据库'"], vec!["2", "'😀'"]]
    );
}

#[test]
fn test_empty_values_is_malformed() {
    assert_eq!(
        first_error(""),
        ParseError::MalformedStatement(Malformed::EmptyValues)
    );
    assert_eq!(
        first_error("   "),
        ParseError::MalformedStatement(Malformed::EmptyValues)
    );
}

#[test]
fn test_values_must_open_with_paren() {
    assert_eq!(
        first_error("1,2);"),
        ParseError::MalformedStatement(Malformed::MissingOpenParen { found: b'1' })
    );
}

#[test]
fn test_missing_terminator_is_malformed() {
    let mut parser = ValuesParser::new(b"(1,2),(3,4)");
    assert!(parser.next().unwrap().is_ok());
    assert!(parser.next().unwrap().is_ok());
    assert_eq!(
        parser.next(),
        Some(Err(ParseError::MalformedStatement(Malformed::MissingTerminator)))
    );
    assert_eq!(parser.next(), None);
}

#[test]
fn test_truncated_inside_string() {
    assert_eq!(
        first_error("(1,'abc),(2,'def');".split_at(10).0),
        ParseError::UnterminatedQuotedField { offset: 3 }
    );
}

#[test]
fn test_truncated_after_escape() {
    assert!(matches!(
        first_error(r"(1,'abc\"),
        ParseError::UnterminatedQuotedField { .. }
    ));
}

#[test]
fn test_unclosed_row() {
    assert_eq!(
        first_error("(1,2),(3,4"),
        ParseError::MalformedStatement(Malformed::UnclosedRow { offset: 6 })
    );
}

#[test]
fn test_garbage_between_rows() {
    assert_eq!(
        first_error("(1)x(2);"),
        ParseError::MalformedStatement(Malformed::UnexpectedSeparator {
            found: b'x',
            offset: 3
        })
    );
    assert_eq!(
        first_error("(1),x;"),
        ParseError::MalformedStatement(Malformed::UnexpectedSeparator {
            found: b'x',
            offset: 4
        })
    );
}

#[test]
fn test_repeated_terminators_are_discarded() {
    assert_eq!(rows("(1),(2);;"), vec![vec!["1"], vec!["2"]]);
    assert_eq!(rows("(1,'a'); ;\t;  "), vec![vec!["1", "'a'"]]);
}

#[test]
fn test_trailing_data_after_terminator() {
    assert_eq!(
        first_error("(1); (2);"),
        ParseError::MalformedStatement(Malformed::TrailingData { offset: 5 })
    );
}

#[test]
fn test_parser_is_fused_after_error() {
    let mut parser = ValuesParser::new(b"(1,'x");
    assert!(parser.next().unwrap().is_err());
    assert!(parser.next().is_none());
    assert!(parser.next().is_none());
}

#[test]
fn test_parse_values_normalizes_fields() {
    let parsed = parse_values(br"(1,NULL,'',' a\tb ');").unwrap();
    assert_eq!(parsed.len(), 1);
    let row = &parsed[0];
    assert_eq!(row[0].as_bytes(), Some(&b"1"[..]));
    assert_eq!(row[1], Field::Null);
    assert_eq!(row[2], Field::Empty);
    assert_eq!(row[3].as_bytes(), Some(&b" a\tb "[..]));
}

#[test]
fn test_parse_values_discards_everything_on_error() {
    assert!(parse_values(b"(1),(2),(3").is_err());
}
