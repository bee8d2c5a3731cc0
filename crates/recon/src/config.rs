use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::MemberRecord;
use crate::normalize::{EmployeeIdRule, NormalizeContext};
use crate::profile::{Field, KeySpec, MatchingProfile};
use crate::slab::{Slab, SlabTable};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Policy tag; `GMC` selects the group-medical profile.
    pub policy_type: String,
    /// Insurer of the policy, used to pick employee-id rules.
    #[serde(default)]
    pub insurer: Option<String>,
    pub rosters: RosterSet,
    #[serde(default)]
    pub carry_over: CarryOverConfig,
    #[serde(default)]
    pub slabs: Vec<Slab>,
    #[serde(default)]
    pub employee_id_rules: Vec<EmployeeIdRuleConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Rosters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RosterSet {
    /// Absent when the employer supplied no roster (2-way run).
    #[serde(default)]
    pub hr: Option<RosterConfig>,
    pub insurer: RosterConfig,
    pub internal: RosterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    pub file: String,
    pub columns: ColumnMapping,
    /// Dependents take the sum insured of their employee's SELF record.
    #[serde(default)]
    pub inherit_dependent_sum_insured: bool,
}

/// Previously confirmed supplementary records, folded into the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarryOverConfig {
    #[serde(default)]
    pub add: Option<RosterConfig>,
    #[serde(default)]
    pub edit: Option<RosterConfig>,
    #[serde(default)]
    pub offboard: Option<RosterConfig>,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Member field → CSV header. Only `name` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    pub name: String,
    pub employee_id: Option<String>,
    pub gender: Option<String>,
    pub relationship: Option<String>,
    pub date_of_birth: Option<String>,
    pub coverage_start_date: Option<String>,
    pub enrolment_due_date: Option<String>,
    pub date_of_leaving: Option<String>,
    pub sum_insured: Option<String>,
    pub ctc: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub is_active: Option<String>,
    pub policy_exception: Option<String>,
}

pub(crate) type FieldSlot = fn(&mut MemberRecord) -> &mut String;

impl ColumnMapping {
    /// Mapped (header, record slot) pairs, in field declaration order.
    pub(crate) fn slots(&self) -> Vec<(&str, FieldSlot)> {
        let optional: [(&Option<String>, FieldSlot); 14] = [
            (&self.employee_id, |r| &mut r.employee_id),
            (&self.gender, |r| &mut r.gender),
            (&self.relationship, |r| &mut r.relationship),
            (&self.date_of_birth, |r| &mut r.date_of_birth),
            (&self.coverage_start_date, |r| &mut r.coverage_start_date),
            (&self.enrolment_due_date, |r| &mut r.enrolment_due_date),
            (&self.date_of_leaving, |r| &mut r.date_of_leaving),
            (&self.sum_insured, |r| &mut r.sum_insured),
            (&self.ctc, |r| &mut r.ctc),
            (&self.mobile, |r| &mut r.mobile),
            (&self.email, |r| &mut r.email),
            (&self.user_id, |r| &mut r.user_id),
            (&self.is_active, |r| &mut r.is_active),
            (&self.policy_exception, |r| &mut r.policy_exception),
        ];

        let name: FieldSlot = |r| &mut r.name;
        let mut slots = vec![(self.name.as_str(), name)];
        slots.extend(
            optional
                .into_iter()
                .filter_map(|(header, slot)| header.as_deref().map(|h| (h, slot))),
        );
        slots
    }
}

// ---------------------------------------------------------------------------
// Employee-id rules + matching overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeIdRuleConfig {
    /// Matched case-insensitively as a substring of the policy's insurer.
    pub insurer: String,
    pub rule: RuleKind,
    #[serde(default)]
    pub digit: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    AlphaToDigit,
    StripLeadingZeros,
}

impl EmployeeIdRuleConfig {
    fn to_rule(&self) -> Option<EmployeeIdRule> {
        match self.rule {
            RuleKind::AlphaToDigit => self.digit.map(|digit| EmployeeIdRule::AlphaToDigit { digit }),
            RuleKind::StripLeadingZeros => Some(EmployeeIdRule::StripLeadingZeros),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub compare_fields: Option<Vec<Field>>,
    #[serde(default)]
    pub keys: Option<Vec<Vec<Field>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.policy_type.trim().is_empty() {
            return Err(ReconError::ConfigValidation("policy_type must not be empty".into()));
        }

        for (label, roster) in self.rosters() {
            validate_columns(label, &roster.columns)?;
        }

        // Slab ids must be present and unique
        let mut seen = HashSet::new();
        for slab in &self.slabs {
            if slab.slab_id.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "slab for sum insured '{}' has an empty slab_id",
                    slab.sum_insured
                )));
            }
            if !seen.insert(slab.slab_id.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate slab_id '{}'",
                    slab.slab_id
                )));
            }
        }

        for rule in &self.employee_id_rules {
            if rule.insurer.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "employee_id_rules: insurer pattern must not be empty".into(),
                ));
            }
            match (rule.rule, rule.digit) {
                (RuleKind::AlphaToDigit, Some(d)) if d.is_ascii_digit() => {}
                (RuleKind::AlphaToDigit, Some(d)) => {
                    return Err(ReconError::ConfigValidation(format!(
                        "employee_id_rules '{}': digit must be 0-9, got '{d}'",
                        rule.insurer
                    )));
                }
                (RuleKind::AlphaToDigit, None) => {
                    return Err(ReconError::ConfigValidation(format!(
                        "employee_id_rules '{}': alpha_to_digit requires a digit",
                        rule.insurer
                    )));
                }
                (RuleKind::StripLeadingZeros, Some(_)) => {
                    return Err(ReconError::ConfigValidation(format!(
                        "employee_id_rules '{}': digit only applies to alpha_to_digit",
                        rule.insurer
                    )));
                }
                (RuleKind::StripLeadingZeros, None) => {}
            }
        }

        if let Some(fields) = &self.matching.compare_fields {
            if fields.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "matching.compare_fields must not be empty".into(),
                ));
            }
        }
        if let Some(keys) = &self.matching.keys {
            if keys.is_empty() {
                return Err(ReconError::ConfigValidation("matching.keys must not be empty".into()));
            }
            for (i, key) in keys.iter().enumerate() {
                if key.is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "matching.keys[{i}] must name at least one field"
                    )));
                }
                let distinct: HashSet<_> = key.iter().collect();
                if distinct.len() != key.len() {
                    return Err(ReconError::ConfigValidation(format!(
                        "matching.keys[{i}] repeats a field"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Every configured roster with its label, carry-over included.
    pub fn rosters(&self) -> Vec<(&'static str, &RosterConfig)> {
        let mut out = Vec::new();
        if let Some(hr) = &self.rosters.hr {
            out.push(("hr", hr));
        }
        out.push(("insurer", &self.rosters.insurer));
        out.push(("internal", &self.rosters.internal));
        for (label, roster) in [
            ("carry_over.add", &self.carry_over.add),
            ("carry_over.edit", &self.carry_over.edit),
            ("carry_over.offboard", &self.carry_over.offboard),
        ] {
            if let Some(r) = roster {
                out.push((label, r));
            }
        }
        out
    }

    /// Matching profile for the policy type, with any overrides applied.
    pub fn profile(&self) -> MatchingProfile {
        let mut profile = MatchingProfile::for_policy_type(&self.policy_type);
        if let Some(fields) = &self.matching.compare_fields {
            profile = profile.with_compare_fields(fields.clone());
        }
        if let Some(keys) = &self.matching.keys {
            profile = profile.with_keys(keys.iter().map(|k| KeySpec::new(k)).collect());
        }
        profile
    }

    /// Normalization settings: the first employee-id rule whose pattern the insurer contains.
    pub fn normalize_context(&self) -> NormalizeContext {
        let insurer = self.insurer.as_deref().unwrap_or("").to_lowercase();
        let employee_id_rule = if insurer.is_empty() {
            None
        } else {
            self.employee_id_rules
                .iter()
                .find(|r| insurer.contains(&r.insurer.trim().to_lowercase()))
                .and_then(EmployeeIdRuleConfig::to_rule)
        };
        NormalizeContext { employee_id_rule }
    }

    pub fn slab_table(&self) -> SlabTable {
        SlabTable::new(self.slabs.clone())
    }
}

fn validate_columns(label: &str, columns: &ColumnMapping) -> Result<(), ReconError> {
    for (header, _) in columns.slots() {
        if header.trim().is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "rosters '{label}': column headers must not be empty"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
