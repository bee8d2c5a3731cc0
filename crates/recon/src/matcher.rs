use std::collections::HashMap;

use crate::keys::generate_keys;
use crate::model::MemberRecord;
use crate::profile::MatchingProfile;

/// Hash index over one roster: every record occupies one slot per generated key.
///
/// Insertion is first-writer-wins. When two distinct records collide on a
/// weakened key, the later one is reachable only through its other keys.
#[derive(Debug)]
pub struct RosterIndex<'a> {
    roster: &'a [MemberRecord],
    slots: HashMap<String, usize>,
}

/// A correspondent found in another roster.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Position of the record in its roster.
    pub position: usize,
    pub record: &'a MemberRecord,
}

impl<'a> RosterIndex<'a> {
    pub fn build(roster: &'a [MemberRecord], profile: &MatchingProfile) -> Self {
        let mut slots = HashMap::new();
        for (position, record) in roster.iter().enumerate() {
            for key in generate_keys(record, profile) {
                slots.entry(key).or_insert(position);
            }
        }
        log::debug!("indexed {} records under {} keys", roster.len(), slots.len());
        Self { roster, slots }
    }

    /// Best correspondent for `record`, trying its keys in priority order.
    pub fn find_match(&self, record: &MemberRecord, profile: &MatchingProfile) -> Option<Candidate<'a>> {
        let roster = self.roster;
        generate_keys(record, profile)
            .iter()
            .find_map(|key| self.slots.get(key))
            .map(|&position| Candidate {
                position,
                record: &roster[position],
            })
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(eid: &str, name: &str, gender: &str, dob: &str) -> MemberRecord {
        MemberRecord {
            employee_id: eid.into(),
            name: name.into(),
            gender: gender.into(),
            relationship: "SELF".into(),
            date_of_birth: dob.into(),
            sum_insured: "500000".into(),
            ..MemberRecord::default()
        }
    }

    #[test]
    fn exact_match_found() {
        let profile = MatchingProfile::gmc();
        let roster = vec![
            member("E1", "Asha Rao", "Female", "01/01/90"),
            member("E2", "Ravi Kumar", "Male", "02/02/85"),
        ];
        let index = RosterIndex::build(&roster, &profile);
        let hit = index.find_match(&member("E2", "ravi kumar", "male", "02/02/85"), &profile).unwrap();
        assert_eq!(hit.position, 1);
        assert_eq!(hit.record.name, "Ravi Kumar");
    }

    #[test]
    fn weakened_key_tolerates_one_disagreement() {
        let profile = MatchingProfile::gmc();
        let roster = vec![member("E1", "Asha Rao", "Male", "01/01/90")];
        let index = RosterIndex::build(&roster, &profile);
        let hit = index.find_match(&member("E1", "Asha Rao", "Female", "01/01/90"), &profile);
        assert_eq!(hit.map(|c| c.position), Some(0));
    }

    #[test]
    fn no_correspondence_is_none() {
        let profile = MatchingProfile::gmc();
        let roster = vec![member("E1", "Asha Rao", "Female", "01/01/90")];
        let index = RosterIndex::build(&roster, &profile);
        assert!(index.find_match(&member("E7", "Mohan Das", "Male", "05/05/70"), &profile).is_none());

        let empty: Vec<MemberRecord> = Vec::new();
        let index = RosterIndex::build(&empty, &profile);
        assert!(index.is_empty());
        assert!(index.find_match(&roster[0], &profile).is_none());
    }

    #[test]
    fn first_writer_wins_on_shared_weak_key() {
        let profile = MatchingProfile::gmc();
        // Twins: same employee, gender and dob; only the names differ.
        let mut first = member("E1", "Anu Rao", "Female", "01/01/10");
        first.relationship = "CHILD".into();
        let mut second = member("E1", "Anya Rao", "Female", "01/01/10");
        second.relationship = "CHILD".into();
        let roster = vec![first, second];
        let index = RosterIndex::build(&roster, &profile);

        // A misspelled name reaches the twins only through the key that omits
        // the name, which the first twin claimed.
        let mut probe = member("E1", "Anyaa Rao", "Female", "01/01/10");
        probe.relationship = "CHILD".into();
        let hit = index.find_match(&probe, &profile).unwrap();
        assert_eq!(hit.position, 0);
        assert_eq!(hit.record.name, "Anu Rao");

        // An exact probe for the second twin still lands on the second twin.
        let hit = index.find_match(&roster[1], &profile).unwrap();
        assert_eq!(hit.position, 1);
    }
}
