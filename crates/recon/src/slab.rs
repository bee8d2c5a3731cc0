//! Slab table: sum insured to slab id lookup for a policy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    pub slab_id: String,
    pub sum_insured: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlabTable {
    slabs: Vec<Slab>,
}

impl SlabTable {
    pub fn new(slabs: Vec<Slab>) -> Self {
        Self { slabs }
    }

    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    /// Exact numeric match on sum insured; first slab wins. Unparseable amounts resolve to `None`.
    pub fn resolve(&self, sum_insured: &str) -> Option<&str> {
        let amount = parse_amount(sum_insured)?;
        self.slabs
            .iter()
            .find(|slab| parse_amount(&slab.sum_insured) == Some(amount))
            .map(|slab| slab.slab_id.as_str())
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
