//! Verification and publishing of player-made custom content

use crate::cache::SheetData;
use crate::catalog::CatalogEntry;
use crate::error::Result;
use crate::grid::CellValue;
use crate::mutator::{delete_table_row, replace_table_rows};
use crate::schema::{CatalogKind, ColumnMap, Field, SourceConvention};
use crate::session::{Outcome, Session};
use tracing::info;

pub const PASSED: &str = "✅ Passed";
pub const FAILED: &str = "❌ Failed";

const STATUS_TAG: &str = "verifystatus";
const REASON_TAG: &str = "failedreason";
const CHECKBOX_TAG: &str = "checkbox";

/// Allowed values read from a validation-list sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationLists {
    pub types: Vec<String>,
    pub sub_types: Vec<String>,
    pub usages: Vec<String>,
    pub actions: Vec<String>,
}

impl ValidationLists {
    pub fn read(data: &SheetData) -> Result<Self> {
        data.header()?;
        let column = |tag: &str| -> Result<Vec<String>> {
            let col = data.tags.col(tag);
            let mut values = Vec::new();
            if let Some(col) = col {
                for (_, row) in data.data_rows()? {
                    let value = row.get(col).map(|c| c.to_string_value()).unwrap_or_default();
                    if !value.trim().is_empty() {
                        values.push(value.trim().to_string());
                    }
                }
            }
            Ok(values)
        };

        Ok(Self {
            types: column("type")?,
            sub_types: column("subtype")?,
            usages: column("usage")?,
            actions: column("action")?,
        })
    }
}

fn one_of(value: &str, allowed: &[String]) -> bool {
    !value.is_empty() && allowed.iter().any(|a| a == value)
}

/// Problems with one custom row; empty when it passes
pub fn validate_entry(kind: CatalogKind, entry: &CatalogEntry, lists: &ValidationLists) -> Vec<String> {
    let mut errors = Vec::new();

    match kind {
        CatalogKind::Powers => {
            if entry.table_name.is_empty() {
                errors.push("Table Name cannot be empty.".to_string());
            }
            if entry.ability_name.is_empty() {
                errors.push("Power's Name cannot be empty.".to_string());
            }
            if !one_of(&entry.usage, &lists.usages) {
                errors.push(format!("Usage must be one of: {}.", lists.usages.join(", ")));
            }
            if !one_of(&entry.action, &lists.actions) {
                errors.push(format!("Action must be one of: {}.", lists.actions.join(", ")));
            }
        }
        CatalogKind::MagicItems => {
            if !one_of(&entry.sub_type, &lists.sub_types) {
                errors.push(format!("Category must be one of: {}.", lists.sub_types.join(", ")));
            }
            if entry.ability_name.is_empty() {
                errors.push("Magic Item's Name cannot be empty.".to_string());
            }
            if !one_of(&entry.usage, &lists.usages) {
                errors.push(format!("Usage must be one of: {}.", lists.usages.join(", ")));
            }
        }
    }

    if entry.effect.is_empty() {
        errors.push("Effect cannot be empty.".to_string());
    }
    errors
}

/// Input columns [`validate_entry`] reads for `kind`
fn required_fields(kind: CatalogKind) -> &'static [Field] {
    match kind {
        CatalogKind::Powers => &[Field::TableName, Field::AbilityName, Field::Usage, Field::Action, Field::Effect],
        CatalogKind::MagicItems => &[Field::SubType, Field::AbilityName, Field::Usage, Field::Effect],
    }
}

/// Counts from one verify-and-publish run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub passed: usize,
    pub failed: usize,
}

/// Validate every row of the active custom workbook's input sheet, annotate
/// it and publish the passing rows to the verified sheet
pub fn verify_and_publish(session: &mut Session<'_>, kind: CatalogKind) -> Result<PublishReport> {
    let sheets = kind.sheets();
    let active = session.active_id().to_string();
    session.ui.toast(&format!("⏳ Verifying {}...", sheets.noun), "Verify & Publish");

    let lists = ValidationLists::read(&*session.active_data(sheets.validation_lists, false)?)?;

    let input = session.active_data(sheets.custom_input, true)?;
    let input_columns = ColumnMap::resolve(&input.tags, &input.name, SourceConvention::Custom, required_fields(kind))?;
    let status_col = input.require_col(STATUS_TAG)?;
    let reason_col = input.require_col(REASON_TAG)?;
    let ignored: Vec<usize> = [Some(status_col), Some(reason_col), input.tags.col(CHECKBOX_TAG)]
        .into_iter()
        .flatten()
        .collect();

    let verified = session.active_data(sheets.verified, true)?;
    verified.header()?;
    let dest_columns = ColumnMap::resolve(&verified.tags, &verified.name, SourceConvention::Local, &Field::ALL)?;

    let mut report = PublishReport::default();
    let mut feedback: Vec<(usize, CellValue, CellValue)> = Vec::new();
    let mut published = Vec::new();

    for (row, cells) in input.data_rows()? {
        let blank = cells
            .iter()
            .enumerate()
            .skip(1)
            .all(|(c, v)| ignored.contains(&c) || v.is_blank());
        if blank {
            feedback.push((row, CellValue::Empty, CellValue::Empty));
            continue;
        }

        let mut entry = CatalogEntry::from_row(cells, &input_columns);
        let errors = validate_entry(kind, &entry, &lists);
        if errors.is_empty() {
            report.passed += 1;
            entry.dropdown = entry.label(kind);
            entry.source = session.config.user_email.clone();
            published.push(entry.to_row(&dest_columns));
            feedback.push((row, CellValue::text(PASSED), CellValue::Empty));
        } else {
            report.failed += 1;
            feedback.push((row, CellValue::text(FAILED), CellValue::text(errors.join(" "))));
        }
    }

    session.edit_sheet(&active, sheets.custom_input, |sheet| {
        for (row, status, reason) in feedback {
            sheet.set_value(row, status_col, status);
            sheet.set_value(row, reason_col, reason);
        }
        Ok(())
    })?;
    session.edit_sheet(&active, sheets.verified, |sheet| replace_table_rows(sheet, &published))?;

    info!(kind = %kind, passed = report.passed, failed = report.failed, "custom content verified");
    let mut message = format!(
        "Verification complete.\n\n✅ {} {} passed and were published.",
        report.passed, sheets.noun
    );
    if report.failed > 0 {
        message.push_str(&format!(
            "\n❌ {} {} failed. Please see the 'FailedReason' column for details.",
            report.failed, sheets.noun
        ));
    }
    session.ui.alert("✅ Verification Complete", &message);
    Ok(report)
}

/// Delete the checked rows of the active custom input sheet after the user
/// types the confirmation keyword
pub fn delete_selected(session: &mut Session<'_>, kind: CatalogKind) -> Result<Outcome> {
    let sheets = kind.sheets();
    let active = session.active_id().to_string();

    let input = session.active_data(sheets.custom_input, true)?;
    let checkbox_col = input.require_col(CHECKBOX_TAG)?;
    let name_col = ColumnMap::resolve(&input.tags, &input.name, SourceConvention::Custom, &[])?
        .get(Field::AbilityName);

    let mut selected: Vec<(usize, String)> = Vec::new();
    for (row, cells) in input.data_rows()? {
        if cells.get(checkbox_col).is_some_and(CellValue::is_checked) {
            let name = name_col
                .and_then(|c| cells.get(c))
                .map(|v| v.to_string_value().trim().to_string())
                .unwrap_or_default();
            selected.push((row, name));
        }
    }

    if selected.is_empty() {
        session.ui.alert(
            "ℹ️ No Selection",
            &format!("Please check the box next to the {} you wish to delete.", sheets.noun),
        );
        return Ok(Outcome::NothingToDo);
    }

    let named: Vec<String> = selected
        .iter()
        .filter(|(_, n)| !n.is_empty())
        .map(|(_, n)| format!("- {}", n))
        .collect();
    let unnamed = selected.len() - named.len();

    let mut message = String::from("⚠️ Are you sure you wish to permanently DELETE the following?\n");
    if !named.is_empty() {
        message.push_str(&format!("\n{}\n", named.join("\n")));
    }
    if unnamed > 0 {
        message.push_str(&format!(
            "\n- {} unnamed/blank row{}\n",
            unnamed,
            if unnamed > 1 { "s" } else { "" }
        ));
    }
    message.push_str("\nThis action cannot be undone.");
    let keyword = if selected.len() > 1 { "DELETE ALL" } else { "DELETE" };
    message.push_str(&format!("\n\nTo confirm, please type {} below.", keyword));

    if !session.confirm("Confirm Deletion", &message, keyword) {
        return Ok(session.canceled("Deletion has been canceled."));
    }

    selected.sort_by(|a, b| b.0.cmp(&a.0));
    session.edit_sheet(&active, sheets.custom_input, |sheet| {
        for (row, _) in &selected {
            delete_table_row(sheet, row + 1)?;
        }
        Ok(())
    })?;

    info!(kind = %kind, deleted = selected.len(), "custom rows deleted");
    session.ui.alert(
        "✅ Deletion Complete",
        &format!("Successfully deleted {} row(s).", selected.len()),
    );
    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlexConfig;
    use crate::grid::Grid;
    use crate::host::{MemoryProperties, MemoryStore, RecordingUi};
    use crate::sheet::{Sheet, Workbook};

    fn lists() -> ValidationLists {
        ValidationLists {
            types: vec!["Power".into()],
            sub_types: vec!["Minor".into(), "Lesser".into()],
            usages: vec!["1/day".into(), "At Will".into()],
            actions: vec!["Action".into(), "Reaction".into()],
        }
    }

    fn custom_workbook() -> Workbook {
        Workbook::new("cust1", "My Custom Abilities", "me@example.com")
            .with_sheet(Sheet::with_grid(
                "PowerValidationLists",
                Grid::from_text_rows(&[
                    &["", "Type", "Usage", "Action"],
                    &["Header", "", "", ""],
                    &["", "Power", "1/day", "Action"],
                    &["", "", "At Will", "Reaction"],
                ]),
            ))
            .with_sheet(Sheet::with_grid(
                "Powers",
                Grid::from_text_rows(&[
                    &["", "CheckBox", "TableName", "Name", "Usage", "Action", "Effect", "VerifyStatus", "FailedReason"],
                    &["Header", "", "", "", "", "", "", "", ""],
                    &["", "FALSE", "Homebrew", "Zap", "1/day", "Action", "Shock", "", ""],
                    &["", "FALSE", "", "", "", "", "", "❌ Failed", "old"],
                    &["", "TRUE", "Homebrew", "Oops", "Never", "Action", "", "", ""],
                ]),
            ))
            .with_sheet(Sheet::with_grid(
                "VerifiedPowers",
                Grid::from_text_rows(&[
                    &["", "DropDown", "Type", "SubType", "TableName", "Source", "Usage", "Action", "AbilityName", "Effect"],
                    &["Header", "", "", "", "", "", "", "", "", ""],
                    &["", "stale", "", "", "Old", "", "", "", "", ""],
                ]),
            ))
    }

    #[test]
    fn test_validate_magic_item() {
        let entry = CatalogEntry {
            sub_type: "Greater".into(),
            usage: "1/day".into(),
            ..CatalogEntry::default()
        };
        let errors = validate_entry(CatalogKind::MagicItems, &entry, &lists());
        assert_eq!(
            errors,
            vec![
                "Category must be one of: Minor, Lesser.".to_string(),
                "Magic Item's Name cannot be empty.".to_string(),
                "Effect cannot be empty.".to_string(),
            ]
        );
    }

    #[test]
    fn test_verify_and_publish_annotates_every_row() {
        let mut store = MemoryStore::new();
        store.insert(custom_workbook());
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig {
            user_email: "me@example.com".to_string(),
            ..FlexConfig::default()
        };
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cust1");

        let report = verify_and_publish(&mut session, CatalogKind::Powers).unwrap();
        assert_eq!(report, PublishReport { passed: 1, failed: 1 });
        drop(session);

        let wb = store.workbooks().next().unwrap();
        let input = wb.sheet("Powers").unwrap().grid();
        assert_eq!(input.get(2, 7), &CellValue::text(PASSED));
        assert_eq!(input.get(3, 7), &CellValue::Empty);
        assert_eq!(input.get(4, 7), &CellValue::text(FAILED));
        assert!(input.get(4, 8).to_string_value().contains("Usage must be one of: 1/day, At Will."));

        let verified = wb.sheet("VerifiedPowers").unwrap().grid();
        assert_eq!(verified.row_count(), 3);
        assert_eq!(verified.get(2, 1), &CellValue::text("Homebrew - Zap⚡ (1/day, Action) ➡ Shock"));
        assert_eq!(verified.get(2, 5), &CellValue::text("me@example.com"));
        assert_eq!(verified.get(2, 8), &CellValue::text("Zap"));
    }

    #[test]
    fn test_delete_selected_requires_keyword() {
        let mut store = MemoryStore::new();
        store.insert(custom_workbook());
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::with_answers([Some("yes"), Some("delete")]);
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cust1");

        assert_eq!(delete_selected(&mut session, CatalogKind::Powers).unwrap(), Outcome::Canceled);
        assert_eq!(delete_selected(&mut session, CatalogKind::Powers).unwrap(), Outcome::Completed);
        drop(session);

        let input = store.workbooks().next().unwrap().sheet("Powers").unwrap().grid();
        assert_eq!(input.row_count(), 4);
        assert!(ui.prompts[0].contains("- Oops"));
    }
}
