//! Matching profiles: which fields are compared and which keys are tried, per policy type.

use serde::Deserialize;

use crate::model::MemberRecord;
use crate::normalize::{
    comparison_form, normalize_amount, normalize_date, normalize_gender, normalize_relationship,
};

/// A member field that can take part in comparison or key generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    EmployeeId,
    Gender,
    Relationship,
    DateOfBirth,
    SumInsured,
    Ctc,
}

impl Field {
    /// Display label used in mismatch reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::EmployeeId => "Employee ID",
            Self::Gender => "Gender",
            Self::Relationship => "Relationship",
            Self::DateOfBirth => "DOB",
            Self::SumInsured => "Sum Insured",
            Self::Ctc => "CTC",
        }
    }

    /// The value as stored on the record, untouched.
    pub fn raw<'a>(&self, record: &'a MemberRecord) -> &'a str {
        match self {
            Self::Name => &record.name,
            Self::EmployeeId => &record.employee_id,
            Self::Gender => &record.gender,
            Self::Relationship => &record.relationship,
            Self::DateOfBirth => &record.date_of_birth,
            Self::SumInsured => &record.sum_insured,
            Self::Ctc => &record.ctc,
        }
    }

    /// Comparison form: lower-cased, whitespace-collapsed, canonicalized.
    pub fn comparable(&self, record: &MemberRecord) -> String {
        let raw = self.raw(record);
        match self {
            Self::Name | Self::EmployeeId => comparison_form(raw),
            Self::Gender => normalize_gender(raw).to_lowercase(),
            Self::Relationship => normalize_relationship(raw).to_lowercase(),
            Self::DateOfBirth => normalize_date(raw).to_lowercase(),
            Self::SumInsured | Self::Ctc => normalize_amount(raw).to_lowercase(),
        }
    }
}

/// An ordered subset of fields joined into one composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub fields: Vec<Field>,
}

impl KeySpec {
    pub fn new(fields: &[Field]) -> Self {
        Self { fields: fields.to_vec() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Gmc,
    Standard,
}

impl PolicyKind {
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("GMC") {
            Self::Gmc
        } else {
            Self::Standard
        }
    }
}

/// Comparison fields plus the ranked key list for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingProfile {
    pub policy_type: String,
    pub compare_fields: Vec<Field>,
    pub keys: Vec<KeySpec>,
}

impl MatchingProfile {
    pub fn for_policy_type(tag: &str) -> Self {
        let mut profile = match PolicyKind::from_tag(tag) {
            PolicyKind::Gmc => Self::gmc(),
            PolicyKind::Standard => Self::standard(),
        };
        profile.policy_type = tag.trim().to_string();
        profile
    }

    /// Group medical cover: six identity fields, tolerant of one wrong field
    /// and of two wrong fields for the curated (employee id, dob|gender) pairs.
    pub fn gmc() -> Self {
        use Field::*;
        Self {
            policy_type: "GMC".into(),
            compare_fields: vec![Name, EmployeeId, Relationship, Gender, DateOfBirth, SumInsured],
            keys: vec![
                KeySpec::new(&[EmployeeId, Name, Gender, DateOfBirth, Relationship, SumInsured]),
                KeySpec::new(&[EmployeeId, Name, Gender, DateOfBirth, Relationship]),
                KeySpec::new(&[EmployeeId, Name, Gender, DateOfBirth, SumInsured]),
                KeySpec::new(&[EmployeeId, Name, Gender, Relationship, SumInsured]),
                KeySpec::new(&[EmployeeId, Name, DateOfBirth, Relationship, SumInsured]),
                KeySpec::new(&[EmployeeId, Gender, DateOfBirth, Relationship, SumInsured]),
                KeySpec::new(&[Name, Gender, DateOfBirth, Relationship, SumInsured]),
                KeySpec::new(&[Name, Gender, Relationship, SumInsured]),
                KeySpec::new(&[Name, DateOfBirth, Relationship, SumInsured]),
            ],
        }
    }

    /// Non-GMC policies: five fields, tolerant of one wrong field.
    pub fn standard() -> Self {
        use Field::*;
        Self {
            policy_type: "STANDARD".into(),
            compare_fields: vec![Name, EmployeeId, Ctc, Gender, SumInsured],
            keys: vec![
                KeySpec::new(&[Name, EmployeeId, Gender, SumInsured, Ctc]),
                KeySpec::new(&[Name, EmployeeId, Gender, SumInsured]),
                KeySpec::new(&[Name, EmployeeId, Gender, Ctc]),
                KeySpec::new(&[Name, EmployeeId, SumInsured, Ctc]),
                KeySpec::new(&[Name, Gender, SumInsured, Ctc]),
                KeySpec::new(&[EmployeeId, Gender, SumInsured, Ctc]),
            ],
        }
    }

    pub fn with_compare_fields(mut self, fields: Vec<Field>) -> Self {
        self.compare_fields = fields;
        self
    }

    pub fn with_keys(mut self, keys: Vec<KeySpec>) -> Self {
        self.keys = keys;
        self
    }
}
