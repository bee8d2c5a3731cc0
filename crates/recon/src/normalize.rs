//! Field normalization: canonical comparison forms for roster values.
//!
//! Every function here is total (malformed input yields an empty or
//! unchanged string, never an error) and idempotent.

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::MemberRecord;

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    SelfMember,
    Spouse,
    Child,
    Parent,
    ParentInLaw,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfMember => "SELF",
            Self::Spouse => "SPOUSE",
            Self::Child => "CHILD",
            Self::Parent => "PARENT",
            Self::ParentInLaw => "PARENT-IN-LAW",
        }
    }

    /// Fold a source-specific relationship code onto the canonical set.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let spaced = token.replace('-', " ");
        match spaced.as_str() {
            "SELF" | "EMPLOYEE" => Some(Self::SelfMember),
            "SPOUSE" | "WIFE" | "HUSBAND" | "REL_10" => Some(Self::Spouse),
            "CHILD" | "CHILDREN" | "SON" | "DAUGHTER" | "REL_03" | "REL_04" => Some(Self::Child),
            "PARENT" | "FATHER" | "MOTHER" | "REL_05" | "REL_06" => Some(Self::Parent),
            "PARENT IN LAW" | "FATHER IN LAW" | "MOTHER IN LAW" | "REL_07" | "REL_08" => {
                Some(Self::ParentInLaw)
            }
            _ => None,
        }
    }

    /// SELF and SPOUSE may exist at most once per employee.
    pub fn is_unique_per_employee(&self) -> bool {
        matches!(self, Self::SelfMember | Self::Spouse)
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical relationship, or empty when the code is not recognized.
pub fn normalize_relationship(raw: &str) -> String {
    Relationship::parse(raw)
        .map(|r| r.as_str().to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

pub fn normalize_gender(raw: &str) -> String {
    match raw.trim().to_uppercase().as_str() {
        "MALE" | "M" => "MALE".into(),
        "FEMALE" | "F" => "FEMALE".into(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Serials at or below this value are not treated as spreadsheet dates (1960-01-01).
const MIN_SPREADSHEET_SERIAL: f64 = 21916.0;

static DMY_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2})$").expect("valid regex"));
static DMY_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/\-\s]([a-z]{3})[/\-\s](\d{4}|\d{2})$").expect("valid regex")
});
static YMD_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid regex"));
static DMY_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})$").expect("valid regex"));

/// Canonicalize a date to `DD/MM/YY`. Unrecognized input passes through trimmed.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match parse_date(&trimmed.to_ascii_lowercase()) {
        Some(date) => date.format("%d/%m/%y").to_string(),
        None => trimmed.to_string(),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Some(c) = DMY_SHORT.captures(s) {
        return calendar_date(expand_year(&c[3])?, &c[2], &c[1]);
    }
    if let Some(c) = DMY_TEXT.captures(s) {
        let month = month_number(&c[2])?;
        let year = if c[3].len() == 2 { expand_year(&c[3])? } else { c[3].parse().ok()? };
        let day: u32 = c[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(c) = YMD_ISO.captures(s) {
        return calendar_date(c[1].parse().ok()?, &c[2], &c[3]);
    }
    if let Some(c) = DMY_LONG.captures(s) {
        return calendar_date(c[3].parse().ok()?, &c[2], &c[1]);
    }
    spreadsheet_serial(s)
}

fn calendar_date(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Two-digit years pivot at 50: 00-49 → 20xx, 50-99 → 19xx.
fn expand_year(yy: &str) -> Option<i32> {
    let yy: i32 = yy.parse().ok()?;
    Some(if yy < 50 { 2000 + yy } else { 1900 + yy })
}

fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    MONTHS.iter().position(|m| *m == abbrev).map(|i| i as u32 + 1)
}

/// Day serials counted from 1899-12-30, which absorbs the 1900 leap-year bug.
fn spreadsheet_serial(s: &str) -> Option<NaiveDate> {
    let serial: f64 = s.parse().ok()?;
    if !serial.is_finite() || serial <= MIN_SPREADSHEET_SERIAL || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

// ---------------------------------------------------------------------------
// Employee ID
// ---------------------------------------------------------------------------

/// Insurer-specific employee id post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeIdRule {
    /// Drop every non-alphanumeric, then replace each letter with `digit`.
    AlphaToDigit { digit: char },
    /// Drop leading zeros (an all-zero id keeps a single `0`).
    StripLeadingZeros,
}

pub fn normalize_employee_id(raw: &str, rule: Option<EmployeeIdRule>) -> String {
    let stripped = raw.trim_matches(|c: char| !c.is_alphanumeric());
    match rule {
        None => stripped.to_string(),
        Some(EmployeeIdRule::AlphaToDigit { digit }) => stripped
            .chars()
            .filter(|c| c.is_alphanumeric())
            .map(|c| if c.is_alphabetic() { digit } else { c })
            .collect(),
        Some(EmployeeIdRule::StripLeadingZeros) => {
            let rest = stripped.trim_start_matches(|c: char| c == '0' || !c.is_alphanumeric());
            if rest.is_empty() && !stripped.is_empty() {
                "0".into()
            } else {
                rest.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Text, amounts, flags
// ---------------------------------------------------------------------------

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and space-insensitive form used inside matching keys.
pub fn comparison_form(raw: &str) -> String {
    collapse_whitespace(raw).to_lowercase()
}

/// Strip thousands separators; integral numbers render without a fraction.
pub fn normalize_amount(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => (v as i64).to_string(),
        Ok(v) if v.is_finite() => v.to_string(),
        _ => cleaned.to_string(),
    }
}

/// `Some(true)` / `Some(false)` for recognized flags, `None` otherwise.
pub fn parse_active_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "active" => Some(true),
        "no" | "n" | "false" | "0" | "inactive" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Whole-record storage normalization
// ---------------------------------------------------------------------------

/// Per-run normalization settings, resolved once from the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext {
    pub employee_id_rule: Option<EmployeeIdRule>,
}

/// Storage-normalize a freshly mapped record. Display casing of names is kept.
pub fn normalize_record(record: &MemberRecord, ctx: &NormalizeContext) -> MemberRecord {
    MemberRecord {
        employee_id: normalize_employee_id(&record.employee_id, ctx.employee_id_rule),
        name: collapse_whitespace(&record.name),
        gender: normalize_gender(&record.gender),
        relationship: normalize_relationship(&record.relationship),
        date_of_birth: normalize_date(&record.date_of_birth),
        coverage_start_date: normalize_date(&record.coverage_start_date),
        enrolment_due_date: normalize_date(&record.enrolment_due_date),
        date_of_leaving: normalize_date(&record.date_of_leaving),
        sum_insured: normalize_amount(&record.sum_insured),
        ctc: normalize_amount(&record.ctc),
        mobile: record.mobile.trim().to_string(),
        email: record.email.trim().to_string(),
        user_id: record.user_id.trim().to_string(),
        is_active: record.is_active.trim().to_string(),
        policy_exception: record.policy_exception.trim().to_string(),
        ..record.clone()
    }
}
