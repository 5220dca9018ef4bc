use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{Order, OrderStatus, ServiceKind};

/// Manifest confidence state. `Final` is a one-way lock against downgrade:
/// a preliminary upload can never replace a finalized group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    Preliminary,
    Final,
}

impl ManifestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStatus::Preliminary => "preliminary",
            ManifestStatus::Final => "final",
        }
    }

    /// Historical uploads carried arbitrary casing.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "preliminary" => Some(ManifestStatus::Preliminary),
            "final" => Some(ManifestStatus::Final),
            _ => None,
        }
    }
}

/// One bus/excursion entry of a printed shore-excursion manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRow {
    pub id: Uuid,
    pub printed_at: DateTime<Utc>,
    pub supplier: String,
    pub emergency_contact: String,
    pub service_date: NaiveDate,
    pub ship: String,
    pub sign: String,
    pub excursion: String,
    pub language: String,
    pub pax: i32,
    pub arrival_time: Option<NaiveTime>,
    pub status: ManifestStatus,
    pub terminal: String,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Natural grouping key of a manifest batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub service_date: NaiveDate,
    pub ship: String,
}

/// Shared metadata of a wrapped `{meta, rows}` upload. Non-empty values are
/// copied onto every row before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchMeta {
    pub service_date: Option<NaiveDate>,
    pub ship: Option<String>,
    pub status: Option<String>,
    pub terminal: Option<String>,
    pub supplier: Option<String>,
    pub emergency_contact: Option<String>,
    #[serde(rename = "empresa")]
    pub company_id: Option<Uuid>,
    #[serde(rename = "estado_pedido")]
    pub order_status: Option<String>,
}

/// One raw row as uploaded, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowInput {
    pub service_date: Option<NaiveDate>,
    pub ship: Option<String>,
    pub sign: Option<String>,
    pub excursion: Option<String>,
    pub language: Option<String>,
    pub pax: Option<i32>,
    pub arrival_time: Option<NaiveTime>,
    pub status: Option<String>,
    pub terminal: Option<String>,
    pub supplier: Option<String>,
    pub emergency_contact: Option<String>,
}

/// A validated row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewRow {
    pub service_date: NaiveDate,
    pub ship: String,
    pub sign: String,
    pub excursion: String,
    pub language: String,
    pub pax: i32,
    pub arrival_time: Option<NaiveTime>,
    pub status: ManifestStatus,
    pub terminal: String,
    pub supplier: String,
    pub emergency_contact: String,
}

impl NewRow {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            service_date: self.service_date,
            ship: self.ship.clone(),
        }
    }

    pub fn into_manifest_row(self, printed_at: DateTime<Utc>) -> ManifestRow {
        let now = Utc::now();
        ManifestRow {
            id: Uuid::new_v4(),
            printed_at,
            supplier: self.supplier,
            emergency_contact: self.emergency_contact,
            service_date: self.service_date,
            ship: self.ship,
            sign: self.sign,
            excursion: self.excursion,
            language: self.language,
            pax: self.pax,
            arrival_time: self.arrival_time,
            status: self.status,
            terminal: self.terminal,
            uploaded_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("row {index}: service_date and ship are required")]
    MissingKey { index: usize },

    #[error("row {index}: unknown status '{value}'")]
    BadStatus { index: usize, value: String },
}

/// Copy the batch metadata onto each row. Only non-empty meta values win.
pub fn apply_meta(meta: &BatchMeta, rows: Vec<RowInput>) -> Vec<RowInput> {
    rows.into_iter()
        .map(|mut r| {
            if meta.service_date.is_some() {
                r.service_date = meta.service_date;
            }
            for (src, dst) in [
                (&meta.ship, &mut r.ship),
                (&meta.status, &mut r.status),
                (&meta.terminal, &mut r.terminal),
                (&meta.supplier, &mut r.supplier),
                (&meta.emergency_contact, &mut r.emergency_contact),
            ] {
                if let Some(v) = src {
                    if !v.trim().is_empty() {
                        *dst = Some(v.clone());
                    }
                }
            }
            r
        })
        .collect()
}

/// Validate every row of a batch. Fails on the first offending row so the
/// caller can report its index.
pub fn validate_rows(rows: Vec<RowInput>) -> Result<Vec<NewRow>, ManifestError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, r)| {
            let service_date = r.service_date.ok_or(ManifestError::MissingKey { index })?;
            let ship = r
                .ship
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(ManifestError::MissingKey { index })?
                .to_string();
            let raw_status = r.status.clone().unwrap_or_default();
            let status = ManifestStatus::parse(&raw_status).ok_or(ManifestError::BadStatus {
                index,
                value: raw_status,
            })?;
            Ok(NewRow {
                service_date,
                ship,
                sign: r.sign.unwrap_or_default().trim().to_string(),
                excursion: r.excursion.unwrap_or_default().trim().to_string(),
                language: r.language.unwrap_or_default().trim().to_string(),
                pax: r.pax.unwrap_or(0),
                arrival_time: r.arrival_time,
                status,
                terminal: r.terminal.unwrap_or_default().trim().to_string(),
                supplier: r.supplier.unwrap_or_default().trim().to_string(),
                emergency_contact: r.emergency_contact.unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// Group validated rows by (service_date, ship), preserving first-seen order.
pub fn group_rows(rows: Vec<NewRow>) -> Vec<(GroupKey, Vec<NewRow>)> {
    let mut groups: Vec<(GroupKey, Vec<NewRow>)> = Vec::new();
    for row in rows {
        let key = row.group_key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    groups
}

/// What to do with one incoming group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    /// Delete the stored rows for the group, insert the incoming ones.
    Replace,
    /// A preliminary upload cannot downgrade a finalized group.
    Block,
}

/// The group's status is taken from its first row, as in the original uploader.
/// Final-over-final replacement stays permitted.
pub fn decide_group(incoming: ManifestStatus, existing_has_final: bool) -> GroupAction {
    if incoming == ManifestStatus::Preliminary && existing_has_final {
        GroupAction::Block
    } else {
        GroupAction::Replace
    }
}

/// Per-batch outcome counters reported to the uploader.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub created: usize,
    pub overwritten: usize,
    pub blocked: usize,
    pub blocked_groups: Vec<GroupKey>,
    #[serde(rename = "created_pedidos")]
    pub created_orders: usize,
}

/// Every group decision of a batch, settled before any write happens.
#[derive(Debug)]
pub struct BatchPlan {
    /// Groups to delete-then-insert, in submission order.
    pub replacements: Vec<(GroupKey, Vec<NewRow>)>,
    /// `created`, `blocked` and `blocked_groups` are settled here;
    /// `overwritten` and `created_pedidos` are filled in by the store.
    pub report: BatchReport,
}

/// Apply [`decide_group`] across a whole batch. `existing_has_final` answers
/// whether the store already holds a final row for the key.
pub fn plan_batch(
    groups: Vec<(GroupKey, Vec<NewRow>)>,
    mut existing_has_final: impl FnMut(&GroupKey) -> bool,
) -> BatchPlan {
    let mut plan = BatchPlan {
        replacements: Vec::new(),
        report: BatchReport::default(),
    };
    for (key, rows) in groups {
        // The group's status is taken from its first row
        match decide_group(rows[0].status, existing_has_final(&key)) {
            GroupAction::Block => {
                plan.report.blocked += rows.len();
                plan.report.blocked_groups.push(key);
            }
            GroupAction::Replace => {
                plan.report.created += rows.len();
                plan.replacements.push((key, rows));
            }
        }
    }
    plan
}

/// Notes line for an order derived from a manifest row. Empty components
/// are skipped, matching the historical format.
pub fn cruise_order_notes(
    ship: &str,
    language: &str,
    arrival_time: Option<NaiveTime>,
    supplier: &str,
    terminal: &str,
    printed_at: DateTime<Utc>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !ship.is_empty() {
        parts.push(format!("Barco: {ship}"));
    }
    if !language.is_empty() {
        parts.push(format!("Idioma: {language}"));
    }
    if let Some(t) = arrival_time {
        parts.push(format!("Hora: {}", t.format("%H:%M")));
    }
    if !supplier.is_empty() {
        parts.push(format!("Proveedor: {supplier}"));
    }
    if !terminal.is_empty() {
        parts.push(format!("Terminal: {terminal}"));
    }
    parts.push(format!("Impresión: {}", printed_at.format("%Y-%m-%dT%H:%M%:z")));
    parts.join("; ")
}

/// Build the companion order created for a manifest row when the batch meta
/// names an owning company.
pub fn cruise_order(
    row: &NewRow,
    user_id: Uuid,
    company_id: Uuid,
    status: OrderStatus,
    printed_at: DateTime<Utc>,
) -> Order {
    let mut order = Order::new(user_id, company_id, row.service_date);
    order.excursion = row.excursion.clone();
    order.service_kind = ServiceKind::Cruise;
    order.status = status;
    order.pax = row.pax;
    order.voucher = row.sign.clone();
    order.notes = cruise_order_notes(
        &row.ship,
        &row.language,
        row.arrival_time,
        &row.supplier,
        &row.terminal,
        printed_at,
    );
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(date: &str, ship: &str, sign: &str, status: &str, pax: i32) -> RowInput {
        RowInput {
            service_date: Some(date.parse().unwrap()),
            ship: Some(ship.to_string()),
            sign: Some(sign.to_string()),
            status: Some(status.to_string()),
            pax: Some(pax),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(ManifestStatus::parse("FINAL"), Some(ManifestStatus::Final));
        assert_eq!(ManifestStatus::parse(" Preliminary "), Some(ManifestStatus::Preliminary));
        assert_eq!(ManifestStatus::parse("draft"), None);
    }

    #[test]
    fn test_meta_overrides_only_non_empty_values() {
        let meta = BatchMeta {
            ship: Some("Ship A".into()),
            status: Some("final".into()),
            terminal: Some("".into()),
            ..Default::default()
        };
        let rows = vec![RowInput {
            ship: Some("Ship B".into()),
            terminal: Some("T1".into()),
            ..Default::default()
        }];

        let merged = apply_meta(&meta, rows);
        assert_eq!(merged[0].ship.as_deref(), Some("Ship A"));
        assert_eq!(merged[0].status.as_deref(), Some("final"));
        // Empty meta value leaves the row's own terminal alone
        assert_eq!(merged[0].terminal.as_deref(), Some("T1"));
    }

    #[test]
    fn test_validate_requires_date_and_ship() {
        let missing_ship = vec![RowInput {
            service_date: Some("2024-05-01".parse().unwrap()),
            status: Some("final".into()),
            ..Default::default()
        }];
        assert!(matches!(
            validate_rows(missing_ship),
            Err(ManifestError::MissingKey { index: 0 })
        ));

        let bad_status = vec![input("2024-05-01", "Ship A", "B1", "draft", 10)];
        assert!(matches!(
            validate_rows(bad_status),
            Err(ManifestError::BadStatus { index: 0, .. })
        ));
    }

    #[test]
    fn test_grouping_preserves_order() {
        let rows = validate_rows(vec![
            input("2024-05-01", "Ship A", "B1", "final", 30),
            input("2024-05-02", "Ship B", "B1", "final", 20),
            input("2024-05-01", "Ship A", "B2", "final", 25),
        ])
        .unwrap();

        let groups = group_rows(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.ship, "Ship A");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0.ship, "Ship B");
    }

    #[test]
    fn test_preliminary_over_final_is_blocked() {
        assert_eq!(
            decide_group(ManifestStatus::Preliminary, true),
            GroupAction::Block
        );
        assert_eq!(
            decide_group(ManifestStatus::Preliminary, false),
            GroupAction::Replace
        );
        // Final may overwrite anything, including another final
        assert_eq!(decide_group(ManifestStatus::Final, true), GroupAction::Replace);
        assert_eq!(decide_group(ManifestStatus::Final, false), GroupAction::Replace);
    }

    #[test]
    fn test_plan_blocks_preliminary_over_stored_final() {
        // A final batch for Ship A / B1 is already stored; a preliminary
        // upload of B2 for the same day and ship must leave it untouched.
        let rows = validate_rows(vec![input("2024-05-01", "Ship A", "B2", "preliminary", 20)])
            .unwrap();
        let key = rows[0].group_key();

        let plan = plan_batch(group_rows(rows), |_| true);

        assert!(plan.replacements.is_empty());
        assert_eq!(plan.report.created, 0);
        assert_eq!(plan.report.blocked, 1);
        assert_eq!(plan.report.blocked_groups, vec![key]);
    }

    #[test]
    fn test_plan_settles_each_group_independently() {
        let rows = validate_rows(vec![
            input("2024-05-01", "Ship A", "B1", "preliminary", 30),
            input("2024-05-01", "Ship A", "B2", "preliminary", 25),
            input("2024-05-02", "Ship B", "B1", "preliminary", 20),
            input("2024-05-03", "Ship C", "B1", "final", 15),
        ])
        .unwrap();

        // Only Ship A's group already has a stored final
        let plan = plan_batch(group_rows(rows), |key| key.ship == "Ship A");

        assert_eq!(plan.replacements.len(), 2);
        assert_eq!(plan.replacements[0].0.ship, "Ship B");
        assert_eq!(plan.replacements[1].0.ship, "Ship C");
        assert_eq!(plan.report.created, 2);
        assert_eq!(plan.report.blocked, 2);
        assert_eq!(plan.report.blocked_groups.len(), 1);
        assert_eq!(plan.report.blocked_groups[0].ship, "Ship A");
        // Store-side counters stay untouched at this stage
        assert_eq!(plan.report.overwritten, 0);
        assert_eq!(plan.report.created_orders, 0);
    }

    #[test]
    fn test_notes_skip_empty_components() {
        let printed = "2024-05-01T10:30:00Z".parse().unwrap();
        let notes = cruise_order_notes("Ship A", "", None, "Acme Tours", "", printed);

        assert!(notes.starts_with("Barco: Ship A; Proveedor: Acme Tours; Impresión: "));
        assert!(!notes.contains("Idioma"));
        assert!(!notes.contains("Terminal"));
    }

    #[test]
    fn test_cruise_order_fields() {
        let rows = validate_rows(vec![input("2024-05-01", "Ship A", "B1", "final", 30)]).unwrap();
        let printed = Utc::now();
        let order = cruise_order(
            &rows[0],
            Uuid::new_v4(),
            Uuid::new_v4(),
            OrderStatus::Paid,
            printed,
        );

        assert_eq!(order.service_kind, ServiceKind::Cruise);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.voucher, "B1");
        assert_eq!(order.pax, 30);
        assert_eq!(order.start_date, "2024-05-01".parse().unwrap());
        assert!(order.notes.contains("Barco: Ship A"));
    }
}
