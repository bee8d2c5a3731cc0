use crate::model::MemberRecord;
use crate::profile::{KeySpec, MatchingProfile};

/// Generate the record's composite keys in the profile's priority order.
///
/// A key is skipped when any of its fields is empty, so two records never
/// agree through a field neither of them supplied. Each key is prefixed with
/// its position in the profile, keeping keys of different specs apart.
pub fn generate_keys(record: &MemberRecord, profile: &MatchingProfile) -> Vec<String> {
    profile
        .keys
        .iter()
        .enumerate()
        .filter_map(|(rank, spec)| composite_key(record, rank, spec))
        .collect()
}

fn composite_key(record: &MemberRecord, rank: usize, spec: &KeySpec) -> Option<String> {
    let mut parts = Vec::with_capacity(spec.fields.len());
    for field in &spec.fields {
        let value = field.comparable(record);
        if value.is_empty() {
            return None;
        }
        parts.push(value);
    }
    Some(format!("k{rank}:{}", parts.join("|")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asha() -> MemberRecord {
        MemberRecord {
            employee_id: "E100".into(),
            name: "Asha Rao".into(),
            gender: "Female".into(),
            relationship: "SELF".into(),
            date_of_birth: "01/01/90".into(),
            sum_insured: "500000".into(),
            ..MemberRecord::default()
        }
    }

    #[test]
    fn full_record_yields_every_key() {
        let keys = generate_keys(&asha(), &MatchingProfile::gmc());
        assert_eq!(keys.len(), 9);
        assert_eq!(keys[0], "k0:e100|asha rao|female|01/01/90|self|500000");
    }

    #[test]
    fn keys_are_case_and_space_insensitive() {
        let mut shouty = asha();
        shouty.name = "  ASHA   rao ".into();
        shouty.employee_id = "e100".into();
        shouty.gender = "FEMALE".into();
        let profile = MatchingProfile::gmc();
        assert_eq!(generate_keys(&shouty, &profile), generate_keys(&asha(), &profile));
    }

    #[test]
    fn one_wrong_field_still_shares_a_key() {
        let profile = MatchingProfile::gmc();
        let mut other = asha();
        other.gender = "Male".into();
        let a = generate_keys(&asha(), &profile);
        let b = generate_keys(&other, &profile);
        let shared: Vec<_> = a.iter().filter(|k| b.contains(k)).collect();
        // Only the two keys without gender survive the disagreement.
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn curated_pair_tolerates_two_wrong_fields() {
        let profile = MatchingProfile::gmc();
        let mut other = asha();
        other.employee_id = "E999".into();
        other.date_of_birth = "02/02/91".into();
        let a = generate_keys(&asha(), &profile);
        let b = generate_keys(&other, &profile);
        assert!(a.iter().any(|k| b.contains(k)));
    }

    #[test]
    fn empty_fields_drop_their_keys() {
        let mut partial = asha();
        partial.date_of_birth.clear();
        let keys = generate_keys(&partial, &MatchingProfile::gmc());
        // Only the two keys without DOB survive.
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| !k.contains("01/01/90")));
    }

    #[test]
    fn unrecognized_relationship_never_agrees() {
        let mut a = asha();
        a.relationship = "cousin".into();
        let keys = generate_keys(&a, &MatchingProfile::gmc());
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("k2:"));
    }
}
