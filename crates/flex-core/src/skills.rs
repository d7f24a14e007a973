//! Skill strings and skill increments

use crate::error::{Error, Result};
use crate::filter::GAME_SHEET;
use crate::grid::CellValue;
use crate::host::Ui;
use crate::session::{Outcome, Session};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const TITLE: &str = "🎓 Skill Verification";

/// Game sheet row tag of the skill increment cell
pub const SKILL_INCREMENTS_ROW: &str = "skillincrements";
/// Game sheet column tag of the skill increment cell
pub const SKILLS_COL: &str = "skills";

/// The type a skill belongs to, written as a trailing emoji
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillType {
    Might,
    Motion,
    Mind,
    Magic,
}

impl SkillType {
    pub const ALL: [SkillType; 4] = [SkillType::Might, SkillType::Motion, SkillType::Mind, SkillType::Magic];

    pub fn emoji(self) -> &'static str {
        match self {
            SkillType::Might => "💪",
            SkillType::Motion => "🏃",
            SkillType::Mind => "👁️",
            SkillType::Magic => "✨",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SkillType::Might => "Might",
            SkillType::Motion => "Motion",
            SkillType::Mind => "Mind",
            SkillType::Magic => "Magic",
        }
    }

    /// Every type whose emoji appears in `s`
    pub fn found_in(s: &str) -> Vec<SkillType> {
        Self::ALL.into_iter().filter(|t| s.contains(t.emoji())).collect()
    }
}

fn strip_type_emojis(s: &str) -> String {
    SkillType::ALL
        .iter()
        .fold(s.to_string(), |acc, t| acc.replace(t.emoji(), ""))
        .trim()
        .to_string()
}

/// Return `s` with exactly one skill-type emoji at its end
///
/// A single emoji in the wrong place is moved without asking. With none or
/// several, the user picks the type; canceling keeps `s` unchanged.
pub fn verify_skill_string(s: &str, ui: &mut dyn Ui) -> String {
    let found = SkillType::found_in(s);

    if let [only] = found.as_slice() {
        if s.trim().ends_with(only.emoji()) {
            return s.to_string();
        }
        ui.toast(&format!("Fixing format for: \"{}\"", s), TITLE);
        return format!("{}{}", s.replace(only.emoji(), "").trim(), only.emoji());
    }

    let choices: Vec<String> = SkillType::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} {}", i + 1, t.name(), t.emoji()))
        .collect();
    let base = format!(
        "The skill \"{}\" has an invalid type.\n\nPlease choose the correct type to apply:\n\n{}\n\nEnter a number from 1 to {}.",
        s,
        choices.join("\n"),
        SkillType::ALL.len()
    );

    let mut retry = false;
    loop {
        let message = if retry {
            format!("⚠️ Invalid choice. Please try again.\n\n{}", base)
        } else {
            base.clone()
        };
        let Some(answer) = ui.prompt("Correct Skill Type", &message) else {
            ui.toast("Skipping correction...", TITLE);
            return s.to_string();
        };

        match answer.trim().parse::<usize>() {
            Ok(n) if (1..=SkillType::ALL.len()).contains(&n) => {
                let chosen = SkillType::ALL[n - 1];
                return format!("{}{}", strip_type_emojis(s), chosen.emoji());
            }
            _ => retry = true,
        }
    }
}

/// Check every skill string on the active sheet, writing back corrections
///
/// Returns how many cells were corrected.
pub fn verify_skills(session: &mut Session<'_>) -> Result<usize> {
    session.ui.toast("⏳ Verifying all skill types...", TITLE);
    let sheet_name = session.require_active_sheet()?;
    let active = session.active_id().to_string();

    let data = session.active_data(&sheet_name, true)?;
    let skills_col = data.require_col("skills")?;

    let mut corrections = Vec::new();
    for (row, cells) in data.data_rows()? {
        let Some(original) = cells.get(skills_col).and_then(CellValue::as_str) else {
            continue;
        };
        if original.is_empty() {
            continue;
        }
        let corrected = verify_skill_string(original, &mut *session.ui);
        if corrected != original {
            corrections.push((row, corrected));
        }
    }

    let count = corrections.len();
    if count > 0 {
        session.edit_sheet(&active, &sheet_name, |sheet| {
            for (row, value) in corrections {
                sheet.set_value(row, skills_col, CellValue::text(value));
            }
            Ok(())
        })?;
        info!(sheet = %sheet_name, corrected = count, "skill types corrected");
        session
            .ui
            .alert("✅ Verification Complete", &format!("Found and corrected {} skill type(s).", count));
    } else {
        session
            .ui
            .alert("✅ Verification Complete", "All skill types are correctly formatted!");
    }
    Ok(count)
}

/// A skill and how many times it was taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCount {
    pub name: String,
    pub count: u32,
}

impl FromStr for SkillCount {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        let malformed = || Error::MalformedSkill(token.to_string());

        let (count, name) = token.split_once('_').ok_or_else(malformed)?;
        let count: u32 = count.trim().parse().map_err(|_| malformed())?;
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed());
        }
        Ok(SkillCount {
            name: name.to_string(),
            count,
        })
    }
}

impl fmt::Display for SkillCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.count, self.name)
    }
}

/// Skill increments stored in one cell as `count_skillname` tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSet {
    skills: Vec<SkillCount>,
}

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> u32 {
        self.skills
            .iter()
            .find(|s| s.name == name)
            .map_or(0, |s| s.count)
    }

    /// Add `by` to a skill, appending it if it is new; returns the new count
    pub fn increment(&mut self, name: &str, by: u32) -> u32 {
        match self.skills.iter_mut().find(|s| s.name == name) {
            Some(skill) => {
                skill.count += by;
                skill.count
            }
            None => {
                self.skills.push(SkillCount {
                    name: name.to_string(),
                    count: by,
                });
                by
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillCount> {
        self.skills.iter()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl FromStr for SkillSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut set = SkillSet::new();
        for token in s.split(',').filter(|t| !t.trim().is_empty()) {
            let skill: SkillCount = token.parse()?;
            set.increment(&skill.name, skill.count);
        }
        Ok(set)
    }
}

impl fmt::Display for SkillSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self.skills.iter().map(ToString::to_string).collect();
        write!(f, "{}", tokens.join(", "))
    }
}

/// Add one increment to `skill` in the active character's skill set
///
/// Returns the skill's new count. A cell that does not parse as a skill set
/// is left untouched and reported as [`Error::MalformedSkill`].
pub fn increment_skill(session: &mut Session<'_>, skill: &str) -> Result<u32> {
    let skill = skill.trim();
    if skill.is_empty() || skill.contains(',') {
        return Err(Error::MalformedSkill(skill.to_string()));
    }

    let active = session.active_id().to_string();
    let game = session.active_data(GAME_SHEET, true)?;
    let row = game.tags.require_row(GAME_SHEET, SKILL_INCREMENTS_ROW)?;
    let col = game.require_col(SKILLS_COL)?;

    let mut set: SkillSet = game.grid.get(row, col).to_string_value().parse()?;
    let count = set.increment(skill, 1);
    session.edit_sheet(&active, GAME_SHEET, |sheet| {
        sheet.set_value(row, col, CellValue::text(set.to_string()));
        Ok(())
    })?;
    info!(skill, count, "skill incremented");
    Ok(count)
}

/// Ask for a skill name and increment it
pub fn prompt_skill_increment(session: &mut Session<'_>) -> Result<Outcome> {
    let Some(skill) = session
        .ui
        .prompt("Increment Skill", "Enter the name of the skill to increase:")
        .map(|answer| answer.trim().to_string())
        .filter(|answer| !answer.is_empty())
    else {
        return Ok(session.canceled("No skill was entered."));
    };

    let count = increment_skill(session, &skill)?;
    session.ui.alert(
        "✅ Skill Increased",
        &format!("\"{}\" now has {} increment(s).", skill, count),
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

    #[test]
    fn test_single_emoji_moves_to_end() {
        let mut ui = RecordingUi::new();
        assert_eq!(verify_skill_string("💪 Climb", &mut ui), "Climb💪");
        assert_eq!(verify_skill_string("Climb💪", &mut ui), "Climb💪");
        assert!(ui.prompts.is_empty());
    }

    #[test]
    fn test_missing_emoji_reprompts_until_valid() {
        let mut ui = RecordingUi::with_answers([Some("9"), Some("3")]);
        assert_eq!(verify_skill_string("Insight", &mut ui), "Insight👁️");
        assert_eq!(ui.prompts.len(), 2);
        assert!(ui.prompts[1].starts_with("⚠️ Invalid choice."));
    }

    #[test]
    fn test_cancel_keeps_original() {
        let mut ui = RecordingUi::new();
        assert_eq!(verify_skill_string("Sneak🏃✨", &mut ui), "Sneak🏃✨");
    }

    #[test]
    fn test_several_emojis_replaced_by_choice() {
        let mut ui = RecordingUi::with_answers([Some("4")]);
        assert_eq!(verify_skill_string("🏃 Sneak ✨", &mut ui), "Sneak✨");
    }

    #[test]
    fn test_skill_set_parse_and_increment() {
        let mut set: SkillSet = "2_Athletics, 1_Stealth".parse().unwrap();
        assert_eq!(set.count("Athletics"), 2);
        assert_eq!(set.increment("Stealth", 1), 2);
        assert_eq!(set.increment("Lore", 1), 1);
        assert_eq!(set.to_string(), "2_Athletics, 2_Stealth, 1_Lore");
        assert!("".parse::<SkillSet>().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for bad in ["Athletics", "x_Athletics", "2_", "1_Lore, oops"] {
            assert!(
                matches!(bad.parse::<SkillSet>(), Err(Error::MalformedSkill(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_verify_skills_needs_active_sheet() {
        let mut store = MemoryStore::new();
        store.insert(Workbook::new("tbls", "Tables", "admin").with_sheet(Sheet::with_grid(
            "Skills",
            Grid::from_text_rows(&[
                &["", "Skills"],
                &["Header", "Skill"],
                &["", "🏃Dodge"],
                &["", "Lift💪"],
                &["", ""],
            ]),
        )));
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig::default();

        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "tbls");
        assert!(matches!(verify_skills(&mut session), Err(Error::NoActiveSheet)));

        session.set_active_sheet(Some("Skills".to_string()));
        assert_eq!(verify_skills(&mut session).unwrap(), 1);
        drop(session);

        let grid = store.workbooks().next().unwrap().sheet("Skills").unwrap().grid();
        assert_eq!(grid.get(2, 1), &CellValue::text("Dodge🏃"));
        assert_eq!(ui.last_alert().unwrap().1, "Found and corrected 1 skill type(s).");
    }

    fn character(increments: &str) -> Workbook {
        Workbook::new("cs1", "Aria", "me").with_sheet(Sheet::with_grid(
            GAME_SHEET,
            Grid::from_text_rows(&[
                &["", "Skills", "Notes"],
                &["SkillIncrements", increments, ""],
            ]),
        ))
    }

    fn increments(store: &MemoryStore) -> String {
        store.workbooks().next().unwrap().sheet(GAME_SHEET).unwrap().grid().get(1, 1).to_string_value()
    }

    #[test]
    fn test_increment_skill_updates_cell() {
        let mut store = MemoryStore::new();
        store.insert(character("2_Athletics"));
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::with_answers([Some(" Stealth ")]);
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        assert_eq!(increment_skill(&mut session, "Athletics").unwrap(), 3);
        assert_eq!(prompt_skill_increment(&mut session).unwrap(), Outcome::Completed);
        assert_eq!(prompt_skill_increment(&mut session).unwrap(), Outcome::Canceled);
        drop(session);

        assert_eq!(increments(&store), "3_Athletics, 1_Stealth");
        assert_eq!(ui.alerts[0].1, "\"Stealth\" now has 1 increment(s).");
    }

    #[test]
    fn test_malformed_increments_are_left_alone() {
        let mut store = MemoryStore::new();
        store.insert(character("Athletics x2"));
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        assert!(matches!(
            increment_skill(&mut session, "Athletics"),
            Err(Error::MalformedSkill(_))
        ));
        assert!(matches!(
            increment_skill(&mut session, "Lore, Stealth"),
            Err(Error::MalformedSkill(_))
        ));
        drop(session);
        assert_eq!(increments(&store), "Athletics x2");
    }
}
