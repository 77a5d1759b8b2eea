//! Single-page contract printout.
//!
//! Writes a minimal PDF 1.4 file by hand: one page, Helvetica re-encoded to
//! Windows-1251 through a `/Differences` table so Cyrillic labels render.

use std::fmt::Write as _;

use chrono::NaiveDate;
use encoding_rs::WINDOWS_1251;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ContractStatus, EntityId};

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const TITLE_SIZE: u32 = 14;
const BODY_SIZE: u32 = 12;
const LEADING: u32 = 16;
const LEFT_MARGIN: u32 = 50;
const TOP_LINE: u32 = 700;

/// Everything printed on a contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractCard {
    pub contract_id: EntityId,
    pub client_name: Option<String>,
    pub amount: Decimal,
    pub term: NaiveDate,
    pub manager_name: Option<String>,
    pub status: ContractStatus,
}

impl ContractCard {
    pub fn title(&self) -> String {
        format!("ДОГОВОР №{}", self.contract_id)
    }

    /// Label/value lines under the title.
    pub fn body_lines(&self) -> Vec<String> {
        vec![
            format!(
                "Клиент: {}",
                self.client_name.as_deref().unwrap_or("Не указан")
            ),
            format!("Сумма: {}", self.amount),
            format!("Срок до: {}", self.term),
            format!(
                "Менеджер: {}",
                self.manager_name.as_deref().unwrap_or("Не назначен")
            ),
            format!("Статус: {}", self.status),
        ]
    }

    pub fn file_name(&self) -> String {
        format!("contract_{}.pdf", self.contract_id)
    }
}

/// Encodes `text` as a PDF literal string body in Windows-1251.
///
/// Printable ASCII is kept verbatim, everything else becomes an octal escape.
pub fn escape_pdf_text(text: &str) -> String {
    let (bytes, _, _) = WINDOWS_1251.encode(text);
    let mut escaped = String::with_capacity(bytes.len());
    for &byte in bytes.iter() {
        match byte {
            b'(' | b')' | b'\\' => {
                escaped.push('\\');
                escaped.push(byte as char);
            }
            0x20..=0x7e => escaped.push(byte as char),
            _ => {
                let _ = write!(escaped, "\\{byte:03o}");
            }
        }
    }
    escaped
}

fn cyrillic_differences() -> String {
    let mut names = String::from("168 /afii10023 184 /afii10071 185 /afii61352 192");
    let upper = (10017..=10022).chain(10024..=10049);
    let lower = (10065..=10070).chain(10072..=10097);
    for glyph in upper.chain(lower) {
        let _ = write!(names, " /afii{glyph}");
    }
    names
}

fn content_stream(card: &ContractCard) -> String {
    let mut stream = String::new();
    let _ = writeln!(stream, "BT");
    let _ = writeln!(stream, "/F1 {TITLE_SIZE} Tf");
    let _ = writeln!(stream, "{LEADING} TL");
    let _ = writeln!(stream, "{LEFT_MARGIN} {TOP_LINE} Td");
    let _ = writeln!(stream, "({}) Tj", escape_pdf_text(&card.title()));
    let _ = writeln!(stream, "T* T*");
    let _ = writeln!(stream, "/F1 {BODY_SIZE} Tf");
    for line in card.body_lines() {
        let _ = writeln!(stream, "({}) Tj T*", escape_pdf_text(&line));
    }
    let _ = writeln!(stream, "ET");
    stream
}

/// Renders the contract as a one-page PDF document.
pub fn render_contract(card: &ContractCard) -> Vec<u8> {
    let content = content_stream(card);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
        ),
        format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding 6 0 R >>".to_string(),
        format!(
            "<< /Type /Encoding /BaseEncoding /WinAnsiEncoding /Differences [{}] >>",
            cyrillic_differences()
        ),
    ];

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> ContractCard {
        ContractCard {
            contract_id: 42,
            client_name: Some("Анна Смирнова".to_string()),
            amount: Decimal::new(150050, 2),
            term: NaiveDate::from_ymd_opt(2027, 1, 15).unwrap(),
            manager_name: None,
            status: ContractStatus::Active,
        }
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    #[test]
    fn escapes_cyrillic_and_delimiters() {
        assert_eq!(escape_pdf_text("Сумма: 10"), "\\321\\363\\354\\354\\340: 10");
        assert_eq!(escape_pdf_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_text("№1"), "\\2711");
    }

    #[test]
    fn card_lines_fall_back_for_missing_names() {
        let lines = card().body_lines();
        assert_eq!(lines[0], "Клиент: Анна Смирнова");
        assert_eq!(lines[1], "Сумма: 1500.50");
        assert_eq!(lines[2], "Срок до: 2027-01-15");
        assert_eq!(lines[3], "Менеджер: Не назначен");
        assert_eq!(lines[4], "Статус: Активен");
    }

    #[test]
    fn document_carries_all_six_fields() {
        let card = card();
        let pdf = render_contract(&card);

        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(contains(&pdf, &escape_pdf_text(&card.title())));
        for line in card.body_lines() {
            assert!(contains(&pdf, &escape_pdf_text(&line)), "missing {line}");
        }
        assert!(contains(&pdf, "1500.50"));
        assert!(contains(&pdf, "2027-01-15"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = render_contract(&card());
        let marker = b"startxref\n";
        let at = pdf
            .windows(marker.len())
            .rposition(|window| window == marker)
            .unwrap()
            + marker.len();
        let tail = std::str::from_utf8(&pdf[at..]).unwrap();
        let xref_at: usize = tail.lines().next().unwrap().parse().unwrap();
        assert!(pdf[xref_at..].starts_with(b"xref"));

        let xref = std::str::from_utf8(&pdf[xref_at..]).unwrap();
        let first_entry = xref.lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(pdf[offset..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn differences_cover_the_alphabet() {
        let differences = cyrillic_differences();
        assert_eq!(differences.matches("/afii").count(), 3 + 64);
        assert!(differences.ends_with("/afii10097"));
    }
}
