use crate::model::{FieldMismatch, MemberRecord, MismatchReport};
use crate::profile::MatchingProfile;

/// Field-level diff between the versions of one person.
///
/// With an HR record the comparison is 3-way and only fields present in all
/// three sources are compared; otherwise insurer and internal are compared
/// where both are present. Reported values are the raw stored values.
pub fn diff(
    hr: Option<&MemberRecord>,
    insurer: &MemberRecord,
    internal: &MemberRecord,
    profile: &MatchingProfile,
) -> MismatchReport {
    let mut fields = Vec::new();

    for field in &profile.compare_fields {
        let ins = field.comparable(insurer);
        let int = field.comparable(internal);
        let disagrees = match hr {
            Some(hr_record) => {
                let h = field.comparable(hr_record);
                !h.is_empty() && !ins.is_empty() && !int.is_empty() && !(h == ins && ins == int)
            }
            None => !ins.is_empty() && !int.is_empty() && ins != int,
        };
        if disagrees {
            fields.push(FieldMismatch {
                label: field.label().to_string(),
                hr: hr.map(|r| field.raw(r).to_string()),
                insurer: field.raw(insurer).to_string(),
                internal: field.raw(internal).to_string(),
            });
        }
    }

    let summary = fields
        .iter()
        .map(|f| match &f.hr {
            Some(h) => format!("{}: HR={h}, Insurer={}, Internal={}", f.label, f.insurer, f.internal),
            None => format!("{}: Insurer={}, Internal={}", f.label, f.insurer, f.internal),
        })
        .collect::<Vec<_>>()
        .join("; ");

    MismatchReport { fields, summary }
}
