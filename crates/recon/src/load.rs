//! CSV roster ingestion: header mapping plus storage normalization.

use std::collections::HashMap;

use crate::config::{ColumnMapping, RosterConfig};
use crate::error::ReconError;
use crate::model::MemberRecord;
use crate::normalize::{comparison_form, normalize_record, NormalizeContext, Relationship};

/// Load one configured roster, applying its ingestion options.
pub fn load_roster(
    source: &str,
    csv_data: &str,
    roster: &RosterConfig,
    ctx: &NormalizeContext,
) -> Result<Vec<MemberRecord>, ReconError> {
    let mut records = load_roster_csv(source, csv_data, &roster.columns, ctx)?;
    if roster.inherit_dependent_sum_insured {
        inherit_dependent_sum_insured(&mut records);
    }
    Ok(records)
}

/// Load one roster from CSV text.
///
/// Headers are matched after trimming. Fully blank rows are skipped and
/// every record is storage-normalized before it is returned.
pub fn load_roster_csv(
    source: &str,
    csv_data: &str,
    columns: &ColumnMapping,
    ctx: &NormalizeContext,
) -> Result<Vec<MemberRecord>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_err(source, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut mapped = Vec::new();
    for (header, slot) in columns.slots() {
        let position = headers.iter().position(|h| h == header.trim()).ok_or_else(|| {
            ReconError::MissingColumn {
                source: source.into(),
                column: header.into(),
            }
        })?;
        mapped.push((position, slot));
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = row.map_err(|e| csv_err(source, e))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            skipped += 1;
            continue;
        }

        let mut record = MemberRecord::default();
        for &(position, slot) in &mapped {
            *slot(&mut record) = row.get(position).unwrap_or("").to_string();
        }
        records.push(normalize_record(&record, ctx));
    }

    log::debug!("loaded {} {source} records ({skipped} blank rows skipped)", records.len());
    Ok(records)
}

/// Give every dependent the sum insured of the SELF record sharing its employee id.
///
/// The first SELF per employee wins. Dependents without a SELF keep their own value.
pub fn inherit_dependent_sum_insured(records: &mut [MemberRecord]) {
    let mut primary: HashMap<String, String> = HashMap::new();
    for record in records.iter() {
        if Relationship::parse(&record.relationship) == Some(Relationship::SelfMember)
            && !record.sum_insured.is_empty()
        {
            primary
                .entry(comparison_form(&record.employee_id))
                .or_insert_with(|| record.sum_insured.clone());
        }
    }

    let mut updated = 0usize;
    for record in records.iter_mut() {
        if Relationship::parse(&record.relationship) == Some(Relationship::SelfMember) {
            continue;
        }
        let employee_id = comparison_form(&record.employee_id);
        if employee_id.is_empty() {
            continue;
        }
        if let Some(sum_insured) = primary.get(&employee_id) {
            if record.sum_insured != *sum_insured {
                record.sum_insured = sum_insured.clone();
                updated += 1;
            }
        }
    }
    log::debug!("{updated} dependent(s) took their employee's sum insured");
}

fn csv_err(source: &str, e: csv::Error) -> ReconError {
    ReconError::Csv {
        source: source.into(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::EmployeeIdRule;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            name: "Member Name".into(),
            employee_id: Some("Emp Code".into()),
            gender: Some("Gender".into()),
            relationship: Some("Relation".into()),
            date_of_birth: Some("DOB".into()),
            sum_insured: Some("Sum Insured".into()),
            is_active: Some("Active".into()),
            ..ColumnMapping::default()
        }
    }

    #[test]
    fn maps_and_normalizes() {
        let csv = "Emp Code,Member Name,Gender,Relation,DOB,Sum Insured,Active,Extra\n\
                   \" E100 \",Asha   Rao,F,Self,1990-01-01,\"5,00,000\",Yes,ignored\n";
        let rows = load_roster_csv("hr", csv, &mapping(), &NormalizeContext::default()).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.employee_id, "E100");
        assert_eq!(r.name, "Asha Rao");
        assert_eq!(r.gender, "FEMALE");
        assert_eq!(r.relationship, "SELF");
        assert_eq!(r.date_of_birth, "01/01/90");
        assert_eq!(r.sum_insured, "500000");
        assert!(r.is_active());
        assert!(r.user_id.is_empty());
    }

    #[test]
    fn blank_rows_skipped() {
        let csv = "Emp Code,Member Name,Gender,Relation,DOB,Sum Insured,Active\n\
                   E1,Asha Rao,Female,Self,01/01/90,500000,Yes\n\
                   ,,,,,,\n\
                   E2,Ravi Kumar,Male,Self,02/02/85,500000,No\n";
        let rows = load_roster_csv("insurer", csv, &mapping(), &NormalizeContext::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[1].is_active());
    }

    #[test]
    fn missing_column_named_in_error() {
        let csv = "Emp Code,Member Name\nE1,Asha Rao\n";
        let err = load_roster_csv("internal", csv, &mapping(), &NormalizeContext::default()).unwrap_err();
        match err {
            ReconError::MissingColumn { source, column } => {
                assert_eq!(source, "internal");
                assert_eq!(column, "Gender");
            }
            other => panic!("expected MissingColumn, got {other}"),
        }
    }

    #[test]
    fn insurer_rule_applied_at_ingestion() {
        let csv = "Emp Code,Member Name,Gender,Relation,DOB,Sum Insured,Active\n\
                   000123,Asha Rao,Female,Self,01/01/90,500000,Yes\n";
        let ctx = NormalizeContext { employee_id_rule: Some(EmployeeIdRule::StripLeadingZeros) };
        let rows = load_roster_csv("insurer", csv, &mapping(), &ctx).unwrap();
        assert_eq!(rows[0].employee_id, "123");
    }

    #[test]
    fn dependents_inherit_self_sum_insured() {
        let csv = "Emp Code,Member Name,Gender,Relation,DOB,Sum Insured,Active\n\
                   E1,Kid Rao,Male,Son,01/01/15,200000,Yes\n\
                   E1,Asha Rao,Female,Self,01/01/90,500000,Yes\n\
                   E1,Ravi Rao,Male,Husband,02/02/88,,Yes\n\
                   E2,Meera Iyer,Female,Spouse,03/03/88,300000,Yes\n";
        let roster = RosterConfig {
            file: "hr.csv".into(),
            columns: mapping(),
            inherit_dependent_sum_insured: true,
        };
        let rows = load_roster("hr", csv, &roster, &NormalizeContext::default()).unwrap();
        let sums: Vec<&str> = rows.iter().map(|r| r.sum_insured.as_str()).collect();
        assert_eq!(sums, vec!["500000", "500000", "500000", "300000"]);
    }

    #[test]
    fn dependents_keep_own_sum_insured_by_default() {
        let csv = "Emp Code,Member Name,Gender,Relation,DOB,Sum Insured,Active\n\
                   E1,Asha Rao,Female,Self,01/01/90,500000,Yes\n\
                   E1,Kid Rao,Male,Son,01/01/15,200000,Yes\n";
        let roster = RosterConfig {
            file: "hr.csv".into(),
            columns: mapping(),
            inherit_dependent_sum_insured: false,
        };
        let rows = load_roster("hr", csv, &roster, &NormalizeContext::default()).unwrap();
        assert_eq!(rows[1].sum_insured, "200000");
    }

    #[test]
    fn headers_are_trimmed() {
        let csv = "\u{feff}Emp Code , Member Name,Gender,Relation,DOB,Sum Insured,Active\n\
                   E1,Asha Rao,Female,Self,01/01/90,500000,\n";
        let rows = load_roster_csv("hr", csv, &mapping(), &NormalizeContext::default()).unwrap();
        assert_eq!(rows[0].employee_id, "E1");
    }
}
