//! Header/item partitioning of flattened multi-result-set procedure output.
//!
//! Some procedures return a header row followed by its item rows as one
//! sequence. Row kind is recognised by the presence of a marker column.

use serde::Serialize;
use tracing::warn;

use super::{rows::int_field, Row};

/// Which side of the split carries the marker column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Rows containing the column are items; the other row is the header.
    ItemHas(&'static str),
    /// The row containing the column is the header; the others are items.
    HeaderHas(&'static str),
}

impl Marker {
    fn is_item(&self, row: &Row) -> bool {
        match self {
            Marker::ItemHas(field) => row.contains_key(*field),
            Marker::HeaderHas(field) => !row.contains_key(*field),
        }
    }
}

/// Meal detail: item rows carry the food name.
pub const MEAL_ITEMS: Marker = Marker::ItemHas("foodname");
/// Medication logs: the header carries the medication name.
pub const MED_LOGS: Marker = Marker::HeaderHas("medname");

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Split {
    pub header: Option<Row>,
    pub items: Vec<Row>,
}

/// Partition `rows` into at most one header and its items, keeping item order.
/// If several rows classify as header, the last one is kept.
pub fn split(rows: Vec<Row>, marker: Marker) -> Split {
    let mut out = Split::default();
    for row in rows {
        if marker.is_item(&row) {
            out.items.push(row);
        } else if out.header.replace(row).is_some() {
            warn!(?marker, "more than one header row; keeping the last");
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub header: Row,
    pub items: Vec<Row>,
}

/// Several headers with their items, joined on the integer column `key`.
/// Headers sharing a key collapse into one group at the first position,
/// carrying the last such header row. Items without a matching header are
/// dropped.
pub fn group_by_header(rows: Vec<Row>, marker: Marker, key: &str) -> Vec<Group> {
    let (items, headers): (Vec<Row>, Vec<Row>) = rows.into_iter().partition(|r| marker.is_item(r));

    let mut groups: Vec<Group> = Vec::with_capacity(headers.len());
    for header in headers {
        let id = int_field(&header, key);
        match groups
            .iter_mut()
            .find(|g| id.is_some() && int_field(&g.header, key) == id)
        {
            Some(group) => group.header = header,
            None => groups.push(Group {
                header,
                items: Vec::new(),
            }),
        }
    }

    for item in items {
        let id = int_field(&item, key);
        if let Some(group) = groups
            .iter_mut()
            .find(|g| id.is_some() && int_field(&g.header, key) == id)
        {
            group.items.push(item);
        }
    }
    groups
}
