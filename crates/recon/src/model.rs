use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::parse_active_flag;
use crate::slab::SlabTable;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One member row from any roster. Empty strings mean "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberRecord {
    pub employee_id: String,
    pub name: String,
    pub gender: String,
    pub relationship: String,
    pub date_of_birth: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub coverage_start_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub enrolment_due_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date_of_leaving: String,
    pub sum_insured: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ctc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mobile: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub is_active: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub policy_exception: String,

    // Derived on output only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slab_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<MismatchReport>,
}

impl MemberRecord {
    /// A missing or unrecognized flag counts as active.
    pub fn is_active(&self) -> bool {
        parse_active_flag(&self.is_active).unwrap_or(true)
    }

    /// Labels of the disagreeing fields (empty unless in the correction bucket).
    pub fn mismatch_fields(&self) -> Vec<&str> {
        self.mismatch
            .as_ref()
            .map(|m| m.fields.iter().map(|f| f.label.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Previously confirmed bucket contents to fold into a new run.
#[derive(Debug, Clone, Default)]
pub struct CarryOver {
    pub add: Vec<MemberRecord>,
    pub edit: Vec<MemberRecord>,
    pub offboard: Vec<MemberRecord>,
}

/// Pre-loaded, storage-normalized rosters for one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    /// Empty when the employer supplied no roster.
    pub hr: Vec<MemberRecord>,
    pub insurer: Vec<MemberRecord>,
    pub internal: Vec<MemberRecord>,
    pub slabs: SlabTable,
    pub carry_over: CarryOver,
}

// ---------------------------------------------------------------------------
// Mismatch
// ---------------------------------------------------------------------------

/// One disagreeing field with the raw value from each participating source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hr: Option<String>,
    pub insurer: String,
    pub internal: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MismatchReport {
    pub fields: Vec<FieldMismatch>,
    /// Human-readable explanation, e.g. `Gender: HR=Female, Insurer=Male, Internal=Male`.
    pub summary: String,
}

impl MismatchReport {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    PerfectMatch,
    Addition,
    ManualAddition,
    Reactivate,
    Correction,
    RequestedOffboard,
    ConfirmedOffboard,
    ManualOffboard,
    OffboardOrAdd,
}

impl BucketKind {
    pub const ALL: [BucketKind; 9] = [
        Self::PerfectMatch,
        Self::Addition,
        Self::ManualAddition,
        Self::Reactivate,
        Self::Correction,
        Self::RequestedOffboard,
        Self::ConfirmedOffboard,
        Self::ManualOffboard,
        Self::OffboardOrAdd,
    ];

    pub fn message(&self, way: u8) -> &'static str {
        match self {
            Self::PerfectMatch if way == 3 => {
                "Members perfectly matched across HR, Insurer, and Internal data"
            }
            Self::PerfectMatch => "Members perfectly matched between Insurer and Internal data",
            Self::Addition => "New member additions from HR",
            Self::ManualAddition => "Members missing from one active roster",
            Self::Reactivate => "Members inactive in the internal roster",
            Self::Correction => "New corrections in member details",
            Self::RequestedOffboard => "Member deletion request from HR",
            Self::ConfirmedOffboard => {
                "Members missing in HR's roster but present in Insurer and Internal rosters"
            }
            Self::ManualOffboard => {
                "Members endorsed with the Insurer but not present in the other active rosters"
            }
            Self::OffboardOrAdd => {
                "Active members in the internal roster but missing in HR and Insurer active rosters"
            }
        }
    }

    pub fn description(&self, way: u8) -> &'static str {
        match self {
            Self::PerfectMatch if way == 3 => {
                "These members have identical data in HR, Insurer, and Internal systems."
            }
            Self::PerfectMatch => "These members have identical data in Insurer and Internal systems.",
            Self::Addition => "These are the new members who are required to be endorsed.",
            Self::ManualAddition => {
                "These members are present in only one of the Insurer and Internal active rosters."
            }
            Self::Reactivate => {
                "These members are active with the Insurer but marked inactive internally."
            }
            Self::Correction => {
                "These members have mismatched details across the active rosters."
            }
            Self::RequestedOffboard => "HR has requested offboarding of these members.",
            Self::ConfirmedOffboard => {
                "These members can be offboarded via the regular endorsement flow post confirmation."
            }
            Self::ManualOffboard => {
                "These member deletions have to be added manually in the insurer format for the upcoming endorsement."
            }
            Self::OffboardOrAdd => {
                "If HR wants to keep these members they must be added manually in the insurer format; otherwise remove them via the regular endorsement flow."
            }
        }
    }

    pub fn action(&self) -> Option<&'static str> {
        match self {
            Self::ManualAddition => Some("Please add these members manually in the upcoming endorsement."),
            Self::Reactivate => Some("Please reactivate these members in the internal roster."),
            Self::ConfirmedOffboard | Self::ManualOffboard => {
                Some("Please confirm the offboarding of these members with HR.")
            }
            Self::OffboardOrAdd => {
                Some("Please confirm with HR if these members need to be offboarded or added.")
            }
            _ => None,
        }
    }

    pub fn is_offboard(&self) -> bool {
        matches!(
            self,
            Self::RequestedOffboard | Self::ConfirmedOffboard | Self::ManualOffboard | Self::OffboardOrAdd
        )
    }
}

impl std::fmt::Display for BucketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerfectMatch => write!(f, "perfect_match"),
            Self::Addition => write!(f, "addition"),
            Self::ManualAddition => write!(f, "manual_addition"),
            Self::Reactivate => write!(f, "reactivate"),
            Self::Correction => write!(f, "correction"),
            Self::RequestedOffboard => write!(f, "requested_offboard"),
            Self::ConfirmedOffboard => write!(f, "confirmed_offboard"),
            Self::ManualOffboard => write!(f, "manual_offboard"),
            Self::OffboardOrAdd => write!(f, "offboard_or_add"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub kind: BucketKind,
    pub message: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub members: Vec<MemberRecord>,
}

impl Bucket {
    pub fn new(kind: BucketKind, way: u8, members: Vec<MemberRecord>) -> Self {
        Self {
            kind,
            message: kind.message(way).to_string(),
            description: kind.description(way).to_string(),
            action: kind.action().map(str::to_string),
            members,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// A record whose sum insured has no slab in the policy's table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedSlab {
    pub bucket: BucketKind,
    pub employee_id: String,
    pub name: String,
    pub sum_insured: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub driving_records: usize,
    pub total_members: usize,
    pub perfect_matches: usize,
    pub corrections: usize,
    pub additions: usize,
    pub offboards: usize,
    pub bucket_counts: BTreeMap<String, usize>,
    pub unresolved_slabs: Vec<UnresolvedSlab>,
}

impl ReconSummary {
    /// True when any bucket other than perfect-match needs follow-up.
    pub fn has_actions(&self) -> bool {
        self.total_members > self.perfect_matches
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub policy_type: String,
    pub way: u8,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub buckets: Vec<Bucket>,
}

impl ReconResult {
    pub fn bucket(&self, kind: BucketKind) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.kind == kind)
    }

    /// Members of `kind`; empty when the bucket is absent.
    pub fn members(&self, kind: BucketKind) -> &[MemberRecord] {
        self.bucket(kind).map_or(&[], |b| b.members.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flag_counts_as_active() {
        let mut rec = MemberRecord::default();
        assert!(rec.is_active());
        rec.is_active = "No".into();
        assert!(!rec.is_active());
        rec.is_active = "yes".into();
        assert!(rec.is_active());
    }

    #[test]
    fn bucket_kind_order_matches_discriminants() {
        for (i, kind) in BucketKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, i);
        }
    }

    #[test]
    fn perfect_match_message_depends_on_way() {
        assert!(BucketKind::PerfectMatch.message(3).contains("HR"));
        assert!(!BucketKind::PerfectMatch.message(2).contains("HR"));
        assert!(BucketKind::PerfectMatch.action().is_none());
        assert!(BucketKind::OffboardOrAdd.action().is_some());
    }

    #[test]
    fn partial_result_lookup_does_not_panic() {
        let result = ReconResult {
            meta: ReconMeta {
                config_name: "partial".into(),
                policy_type: "GMC".into(),
                way: 2,
                engine_version: "0".into(),
                run_at: String::new(),
            },
            summary: ReconSummary {
                driving_records: 0,
                total_members: 1,
                perfect_matches: 0,
                corrections: 0,
                additions: 0,
                offboards: 1,
                bucket_counts: BTreeMap::new(),
                unresolved_slabs: Vec::new(),
            },
            buckets: vec![Bucket::new(
                BucketKind::OffboardOrAdd,
                2,
                vec![MemberRecord { employee_id: "E9".into(), ..MemberRecord::default() }],
            )],
        };
        assert!(result.bucket(BucketKind::Correction).is_none());
        assert!(result.members(BucketKind::Correction).is_empty());
        assert_eq!(result.members(BucketKind::OffboardOrAdd)[0].employee_id, "E9");
    }

    #[test]
    fn serialized_record_omits_empty_optionals() {
        let rec = MemberRecord {
            employee_id: "E1".into(),
            name: "Asha Rao".into(),
            ..MemberRecord::default()
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["employee_id"], "E1");
        assert!(json.get("user_id").is_none());
        assert!(json.get("slab_id").is_none());
    }
}
