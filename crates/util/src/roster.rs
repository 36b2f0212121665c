//! # Student Roster
//!
//! The roster is a CSV document with a header row naming the columns
//! `name`, `email` and (optionally) `slack_id`. It travels through CI as the
//! `STUDENTS_DATA` secret, which is stored on a single line with the
//! two-character sequence `\n` standing in for line breaks.

use bookcheck_types::Student;
use indexmap::IndexMap;
use thiserror::Error;

const NAME_COLUMN: &str = "name";
const EMAIL_COLUMN: &str = "email";
const SLACK_ID_COLUMN: &str = "slack_id";
const ESCAPED_NEWLINE: &str = "\\n";

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("malformed roster CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not encode roster CSV: {0}")]
    Encode(String),
}

/// Students keyed by name, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    students: IndexMap<String, Student>,
}

impl Roster {
    /// Parse roster CSV, accepting either real line breaks or the escaped
    /// single-line secret form.
    ///
    /// A repeated name replaces the earlier row's data but keeps its position.
    pub fn parse(data: &str) -> Result<Self, RosterError> {
        let decoded = decode_secret(data);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(decoded.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| headers.iter().position(|header| header == name);
        let name_index = column(NAME_COLUMN).ok_or(RosterError::MissingColumn(NAME_COLUMN))?;
        let email_index = column(EMAIL_COLUMN).ok_or(RosterError::MissingColumn(EMAIL_COLUMN))?;
        let slack_index = column(SLACK_ID_COLUMN);

        let mut students = IndexMap::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let name = record.get(name_index).unwrap_or_default().trim().to_string();
            let email = record.get(email_index).unwrap_or_default();
            let slack_id = slack_index.and_then(|index| record.get(index));
            let student = Student::new(name.clone(), email, slack_id);
            students.insert(name, student);
        }

        Ok(Self { students })
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn get(&self, name: &str) -> Option<&Student> {
        self.students.get(name)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Render as CSV with a `name,email,slack_id` header.
    pub fn to_csv(&self) -> Result<String, RosterError> {
        students_to_csv(self.students())
    }
}

/// Render students as CSV with a `name,email,slack_id` header, one row per
/// student and in the given order. Repeated or empty names are kept.
pub fn students_to_csv<'a>(students: impl IntoIterator<Item = &'a Student>) -> Result<String, RosterError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([NAME_COLUMN, EMAIL_COLUMN, SLACK_ID_COLUMN])?;
    for student in students {
        writer.write_record([
            student.name.as_str(),
            student.email.as_str(),
            student.slack_id.as_deref().unwrap_or(""),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|error| RosterError::Encode(error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| RosterError::Encode(error.to_string()))
}

/// Collapse CSV text into the single-line form stored in the CI secret.
///
/// Lines are trimmed, blank lines dropped, and the rest joined with a literal
/// `\n`.
pub fn encode_secret(csv_text: &str) -> String {
    csv_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(ESCAPED_NEWLINE)
}

fn decode_secret(data: &str) -> String {
    if !data.contains('\n') && data.contains(ESCAPED_NEWLINE) {
        data.replace(ESCAPED_NEWLINE, "\n")
    } else {
        data.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name,email,slack_id\nAda Lovelace, Ada@Example.com ,U01\nAlan Turing,alan@example.com,\n";

    #[test]
    fn parses_and_normalizes_rows() {
        let roster = Roster::parse(SAMPLE).unwrap();
        assert_eq!(roster.len(), 2);

        let ada = roster.get("Ada Lovelace").unwrap();
        assert_eq!(ada.email, "ada@example.com");
        assert_eq!(ada.slack_id.as_deref(), Some("U01"));

        let alan = roster.get("Alan Turing").unwrap();
        assert_eq!(alan.slack_id, None);
    }

    #[test]
    fn slack_id_column_is_optional() {
        let roster = Roster::parse("name,email\nAda,ada@example.com\n").unwrap();
        assert_eq!(roster.get("Ada").unwrap().slack_id, None);
    }

    #[test]
    fn missing_email_column_is_an_error() {
        let err = Roster::parse("name,slack_id\nAda,U1\n").unwrap_err();
        assert!(matches!(err, RosterError::MissingColumn("email")));
    }

    #[test]
    fn accepts_escaped_secret_form() {
        let encoded = encode_secret(SAMPLE);
        assert!(!encoded.contains('\n'));
        let roster = Roster::parse(&encoded).unwrap();
        assert_eq!(roster, Roster::parse(SAMPLE).unwrap());
    }

    #[test]
    fn encode_secret_drops_blank_lines_and_trims() {
        let encoded = encode_secret("  name,email \n\n Ada,ada@example.com\n   \n");
        assert_eq!(encoded, "name,email\\nAda,ada@example.com");
    }

    #[test]
    fn duplicate_names_keep_first_position_and_last_data() {
        let roster = Roster::parse("name,email\nAda,old@example.com\nAlan,alan@example.com\nAda,new@example.com\n").unwrap();
        let names: Vec<_> = roster.students().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Ada", "Alan"]);
        assert_eq!(roster.get("Ada").unwrap().email, "new@example.com");
    }

    #[test]
    fn header_whitespace_is_ignored() {
        let roster = Roster::parse(" name , email , slack_id \nAda,ada@example.com,U9\n").unwrap();
        assert_eq!(roster.get("Ada").unwrap().slack_id.as_deref(), Some("U9"));
    }

    #[test]
    fn csv_output_round_trips_through_parse() {
        let roster = Roster::parse(SAMPLE).unwrap();
        let csv_text = roster.to_csv().unwrap();
        assert!(csv_text.starts_with("name,email,slack_id\n"));
        assert!(csv_text.contains("Alan Turing,alan@example.com,\n"));
        assert_eq!(Roster::parse(&csv_text).unwrap(), roster);
    }

    #[test]
    fn student_rows_keep_repeated_and_empty_names() {
        let students = [
            Student::new("Alex Kim", "alex.kim1@example.com", Some("U1")),
            Student::new("Alex Kim", "alex.kim2@example.com", Some("U2")),
            Student::new("", "nodisplay@example.com", Some("U3")),
        ];
        let csv_text = students_to_csv(&students).unwrap();
        assert_eq!(
            csv_text,
            "name,email,slack_id\nAlex Kim,alex.kim1@example.com,U1\nAlex Kim,alex.kim2@example.com,U2\n,nodisplay@example.com,U3\n"
        );
    }

    #[test]
    fn empty_input_yields_empty_roster() {
        let roster = Roster::parse("name,email,slack_id\n").unwrap();
        assert!(roster.is_empty());
    }
}
