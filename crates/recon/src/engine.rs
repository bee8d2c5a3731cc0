use std::collections::{HashMap, HashSet};

use crate::config::ReconConfig;
use crate::matcher::{Candidate, RosterIndex};
use crate::mismatch::diff;
use crate::model::{
    Bucket, BucketKind, CarryOver, MemberRecord, MismatchReport, ReconInput, ReconMeta,
    ReconResult, UnresolvedSlab,
};
use crate::normalize::{comparison_form, normalize_relationship, Relationship};
use crate::profile::MatchingProfile;
use crate::slab::SlabTable;
use crate::summary::compute_summary;

pub const REMARK_NEW_ADDITION: &str = "New HR Addition";
pub const REMARK_REACTIVATE: &str = "Reactivate in internal roster";
pub const DUPLICATE_SELF_SPOUSE: &str = "Duplicate SELF/SPOUSE record found";

/// Run reconciliation per config. Returns bucketed members + summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> ReconResult {
    let mut result = reconcile(&config.profile(), input);
    result.meta.config_name = config.name.clone();
    result
}

/// Classify every roster record into buckets. Pure and deterministic apart from `meta.run_at`.
pub fn reconcile(profile: &MatchingProfile, input: &ReconInput) -> ReconResult {
    let way: u8 = if input.hr.is_empty() { 2 } else { 3 };

    // All indices are complete before the first lookup.
    let indices = Indices {
        hr: RosterIndex::build(&input.hr, profile),
        insurer: RosterIndex::build(&input.insurer, profile),
        internal: RosterIndex::build(&input.internal, profile),
    };

    let mut add_keys: HashSet<String> = input.carry_over.add.iter().map(unique_key).collect();
    let mut offboard_keys: HashSet<String> =
        input.carry_over.offboard.iter().map(unique_key).collect();

    let primary = classify_primary(profile, input, &indices, &mut add_keys);
    let offboard = detect_offboards(profile, input, &indices, &primary, &mut offboard_keys);
    let collapsed = collapse_duplicates(&primary.additions, input);

    let CarryOver { add, edit, offboard: requested } = &input.carry_over;
    let backfill = UserIdBackfill::new(&input.internal, &indices.internal, profile);
    let mut additions = with_default_remark(add, "Supplementary HR addition");
    additions.extend(collapsed.kept);
    let mut corrections = backfill.apply(with_default_remark(edit, "Supplementary HR correction"));
    corrections.extend(primary.corrections);
    corrections.extend(collapsed.duplicates);

    let mut unresolved = Vec::new();
    let buckets: Vec<Bucket> = vec![
        (BucketKind::PerfectMatch, primary.perfect),
        (BucketKind::Addition, additions),
        (BucketKind::ManualAddition, primary.manual_additions),
        (BucketKind::Reactivate, primary.reactivate),
        (BucketKind::Correction, corrections),
        (
            BucketKind::RequestedOffboard,
            backfill.apply(with_default_remark(requested, "Supplementary HR deletion")),
        ),
        (BucketKind::ConfirmedOffboard, offboard.confirmed),
        (BucketKind::ManualOffboard, offboard.manual),
        (BucketKind::OffboardOrAdd, offboard.offboard_or_add),
    ]
    .into_iter()
    .map(|(kind, members)| {
        let members = attach_slabs(kind, members, &input.slabs, &mut unresolved);
        Bucket::new(kind, way, members)
    })
    .collect();

    let summary = compute_summary(&buckets, primary.driving_records, unresolved);
    log::info!(
        "{way}-way recon ({}): {} drivers, {} perfect, {} corrections, {} additions, {} offboards",
        profile.policy_type,
        summary.driving_records,
        summary.perfect_matches,
        summary.corrections,
        summary.additions,
        summary.offboards,
    );

    ReconResult {
        meta: ReconMeta {
            config_name: String::new(),
            policy_type: profile.policy_type.clone(),
            way,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        buckets,
    }
}

struct Indices<'a> {
    hr: RosterIndex<'a>,
    insurer: RosterIndex<'a>,
    internal: RosterIndex<'a>,
}

// ---------------------------------------------------------------------------
// Pass 1: primary classification
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PrimaryOutcome {
    driving_records: usize,
    perfect: Vec<MemberRecord>,
    additions: Vec<MemberRecord>,
    manual_additions: Vec<MemberRecord>,
    reactivate: Vec<MemberRecord>,
    corrections: Vec<MemberRecord>,
    claimed_insurer: Vec<bool>,
    claimed_internal: Vec<bool>,
}

fn classify_primary(
    profile: &MatchingProfile,
    input: &ReconInput,
    indices: &Indices<'_>,
    add_keys: &mut HashSet<String>,
) -> PrimaryOutcome {
    let mut out = PrimaryOutcome {
        claimed_insurer: vec![false; input.insurer.len()],
        claimed_internal: vec![false; input.internal.len()],
        ..PrimaryOutcome::default()
    };

    if input.hr.is_empty() {
        classify_insurer_driven(profile, input, indices, &mut out);
    } else {
        classify_hr_driven(profile, input, indices, add_keys, &mut out);
    }
    out
}

fn classify_hr_driven(
    profile: &MatchingProfile,
    input: &ReconInput,
    indices: &Indices<'_>,
    add_keys: &mut HashSet<String>,
    out: &mut PrimaryOutcome,
) {
    for hr in &input.hr {
        out.driving_records += 1;
        let ins = indices.insurer.find_match(hr, profile);
        let int = indices.internal.find_match(hr, profile);
        if let Some(c) = ins {
            out.claimed_insurer[c.position] = true;
        }
        if let Some(c) = int {
            out.claimed_internal[c.position] = true;
        }

        let ins_active = ins.filter(|c| c.record.is_active());
        let int_active = int.filter(|c| c.record.is_active());
        let user = int.map(|c| c.record);

        match (ins_active, int_active) {
            (Some(i), Some(n)) => {
                let report = diff(Some(hr), i.record, n.record, profile);
                if report.is_empty() {
                    out.perfect.push(derive(hr, None, user));
                } else {
                    log::debug!("correction for {}: {}", hr.employee_id, report.summary);
                    out.corrections.push(with_mismatch(derive(hr, None, user), report));
                }
            }
            (Some(_), None) if int.is_some() => {
                out.reactivate.push(derive(hr, Some(REMARK_REACTIVATE.into()), user));
            }
            (None, None) => {
                if add_keys.insert(unique_key(hr)) {
                    out.additions.push(derive(hr, Some(REMARK_NEW_ADDITION.into()), user));
                } else {
                    log::debug!("addition for {} already carried over", hr.employee_id);
                }
            }
            (ins_hit, int_hit) => {
                if add_keys.insert(unique_key(hr)) {
                    let remark = presence(Some(true), int_hit.is_some(), ins_hit.is_some());
                    out.manual_additions.push(derive(hr, Some(remark), user));
                } else {
                    log::debug!("manual addition for {} already carried over", hr.employee_id);
                }
            }
        }
    }
}

/// Without an HR roster the active insurer records with an internal
/// correspondent drive a 2-way comparison. The rest stay unclaimed for Pass 2.
fn classify_insurer_driven(
    profile: &MatchingProfile,
    input: &ReconInput,
    indices: &Indices<'_>,
    out: &mut PrimaryOutcome,
) {
    for (position, ins) in input.insurer.iter().enumerate() {
        if !ins.is_active() {
            continue;
        }
        let Some(n) = indices.internal.find_match(ins, profile) else {
            log::debug!("insurer record {} has no internal counterpart", ins.employee_id);
            continue;
        };
        out.driving_records += 1;
        out.claimed_insurer[position] = true;
        out.claimed_internal[n.position] = true;

        if n.record.is_active() {
            let report = diff(None, ins, n.record, profile);
            if report.is_empty() {
                out.perfect.push(derive(n.record, None, None));
            } else {
                log::debug!("correction for {}: {}", n.record.employee_id, report.summary);
                out.corrections.push(with_mismatch(derive(n.record, None, None), report));
            }
        } else {
            out.reactivate.push(derive(ins, Some(REMARK_REACTIVATE.into()), Some(n.record)));
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 2: offboarding and orphans
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OffboardOutcome {
    confirmed: Vec<MemberRecord>,
    manual: Vec<MemberRecord>,
    offboard_or_add: Vec<MemberRecord>,
}

fn detect_offboards(
    profile: &MatchingProfile,
    input: &ReconInput,
    indices: &Indices<'_>,
    primary: &PrimaryOutcome,
    offboard_keys: &mut HashSet<String>,
) -> OffboardOutcome {
    let has_hr = !indices.hr.is_empty();
    let hr_presence = has_hr.then_some(false);
    let mut claimed_internal = primary.claimed_internal.clone();
    let mut orphan_keys: HashSet<String> = HashSet::new();
    let mut out = OffboardOutcome::default();

    for (position, ins) in input.insurer.iter().enumerate() {
        if primary.claimed_insurer[position] || !ins.is_active() {
            continue;
        }
        if has_hr && indices.hr.find_match(ins, profile).is_some() {
            log::debug!("insurer record {} reached HR only from the insurer side", ins.employee_id);
            continue;
        }
        let key = unique_key(ins);
        match active(indices.internal.find_match(ins, profile)) {
            Some(n) => {
                claimed_internal[n.position] = true;
                if offboard_keys.insert(key) {
                    let remark = presence(hr_presence, true, true);
                    out.confirmed.push(derive(ins, Some(remark), Some(n.record)));
                }
            }
            None => {
                if orphan_keys.insert(key) {
                    out.manual.push(derive(ins, Some(presence(hr_presence, false, true)), None));
                }
            }
        }
    }

    for (position, int) in input.internal.iter().enumerate() {
        if claimed_internal[position] || !int.is_active() {
            continue;
        }
        if has_hr && indices.hr.find_match(int, profile).is_some() {
            continue;
        }
        if active(indices.insurer.find_match(int, profile)).is_some() {
            continue;
        }
        let key = unique_key(int);
        if !offboard_keys.contains(&key) && orphan_keys.insert(key) {
            let remark = presence(hr_presence, true, false);
            out.offboard_or_add.push(derive(int, Some(remark), None));
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Pass 3: SELF/SPOUSE duplicate collapse
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CollapseOutcome {
    kept: Vec<MemberRecord>,
    duplicates: Vec<MemberRecord>,
}

fn collapse_duplicates(additions: &[MemberRecord], input: &ReconInput) -> CollapseOutcome {
    let mut existing: HashSet<(String, Relationship)> = HashSet::new();
    for record in input.insurer.iter().chain(&input.internal) {
        if let Some(key) = self_spouse_key(record) {
            existing.insert(key);
        }
    }
    let mut hr_counts: HashMap<(String, Relationship), usize> = HashMap::new();
    for record in &input.hr {
        if let Some(key) = self_spouse_key(record) {
            *hr_counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut out = CollapseOutcome::default();
    for record in additions {
        let collides = self_spouse_key(record).is_some_and(|key| {
            existing.contains(&key) || hr_counts.get(&key).copied().unwrap_or(0) > 1
        });
        if collides {
            log::debug!("duplicate {} for employee {}", record.relationship, record.employee_id);
            let report = MismatchReport {
                fields: Vec::new(),
                summary: DUPLICATE_SELF_SPOUSE.into(),
            };
            out.duplicates.push(with_mismatch(record.clone(), report));
        } else {
            out.kept.push(record.clone());
        }
    }
    out
}

fn self_spouse_key(record: &MemberRecord) -> Option<(String, Relationship)> {
    let relationship = Relationship::parse(&record.relationship)?;
    let employee_id = comparison_form(&record.employee_id);
    (relationship.is_unique_per_employee() && !employee_id.is_empty())
        .then_some((employee_id, relationship))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// (employee id, name, relationship) identity used to de-duplicate bucket entries.
fn unique_key(record: &MemberRecord) -> String {
    format!(
        "{}_{}_{}",
        comparison_form(&record.employee_id),
        comparison_form(&record.name),
        normalize_relationship(&record.relationship).to_lowercase()
    )
}

fn active(candidate: Option<Candidate<'_>>) -> Option<Candidate<'_>> {
    candidate.filter(|c| c.record.is_active())
}

/// Presence marker per source, e.g. `HR=Y, INTERNAL=N, INSURER=Y`.
fn presence(hr: Option<bool>, internal: bool, insurer: bool) -> String {
    let flag = |present: bool| if present { "Y" } else { "N" };
    let tail = format!("INTERNAL={}, INSURER={}", flag(internal), flag(insurer));
    match hr {
        Some(present) => format!("HR={}, {tail}", flag(present)),
        None => tail,
    }
}

/// Copy of `base` for output, carrying the internal roster's user id when known.
fn derive(base: &MemberRecord, remark: Option<String>, internal: Option<&MemberRecord>) -> MemberRecord {
    let mut out = base.clone();
    if remark.is_some() {
        out.remark = remark;
    }
    if let Some(int) = internal {
        if out.user_id.is_empty() {
            out.user_id = int.user_id.clone();
        }
    }
    out
}

fn with_mismatch(mut record: MemberRecord, report: MismatchReport) -> MemberRecord {
    record.mismatch = Some(report);
    record
}

fn with_default_remark(records: &[MemberRecord], remark: &str) -> Vec<MemberRecord> {
    records
        .iter()
        .map(|r| {
            let mut r = r.clone();
            if r.remark.as_deref().map_or(true, str::is_empty) {
                r.remark = Some(remark.to_string());
            }
            r
        })
        .collect()
}

/// Fills the internal roster's `user_id` into carried-over edits and offboards.
///
/// Lookup is by (employee id, name, relationship) first, then by the ranked match keys.
struct UserIdBackfill<'a, 'p> {
    by_identity: HashMap<String, &'a MemberRecord>,
    index: &'p RosterIndex<'a>,
    profile: &'p MatchingProfile,
}

impl<'a, 'p> UserIdBackfill<'a, 'p> {
    fn new(internal: &'a [MemberRecord], index: &'p RosterIndex<'a>, profile: &'p MatchingProfile) -> Self {
        let mut by_identity = HashMap::new();
        for record in internal.iter().filter(|r| !r.user_id.is_empty()) {
            by_identity.entry(unique_key(record)).or_insert(record);
        }
        Self { by_identity, index, profile }
    }

    fn apply(&self, records: Vec<MemberRecord>) -> Vec<MemberRecord> {
        records
            .into_iter()
            .map(|record| {
                if !record.user_id.is_empty() {
                    return record;
                }
                let found = self
                    .by_identity
                    .get(&unique_key(&record))
                    .copied()
                    .or_else(|| self.index.find_match(&record, self.profile).map(|c| c.record));
                match found {
                    Some(internal) => derive(&record, None, Some(internal)),
                    None => {
                        log::debug!("no internal user id for carried-over {}", record.employee_id);
                        record
                    }
                }
            })
            .collect()
    }
}

fn attach_slabs(
    kind: BucketKind,
    members: Vec<MemberRecord>,
    slabs: &SlabTable,
    unresolved: &mut Vec<UnresolvedSlab>,
) -> Vec<MemberRecord> {
    members
        .into_iter()
        .map(|mut m| {
            m.slab_id = slabs.resolve(&m.sum_insured).map(str::to_string);
            if m.slab_id.is_none() {
                log::warn!(
                    "no slab for sum insured '{}' ({} {}, {kind})",
                    m.sum_insured,
                    m.employee_id,
                    m.name
                );
                unresolved.push(UnresolvedSlab {
                    bucket: kind,
                    employee_id: m.employee_id.clone(),
                    name: m.name.clone(),
                    sum_insured: m.sum_insured.clone(),
                });
            }
            m
        })
        .collect()
}
