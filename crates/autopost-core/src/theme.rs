//! Weekday themes and their rotating sub-styles.

use crate::config::CategoryOverrides;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for each publishing-day theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeKey {
    MomChaosMonday,
    WtfsWednesday,
    FuckItFriday,
    FeedTheChaosSunday,
}

impl ThemeKey {
    pub const ALL: [ThemeKey; 4] = [
        ThemeKey::MomChaosMonday,
        ThemeKey::WtfsWednesday,
        ThemeKey::FuckItFriday,
        ThemeKey::FeedTheChaosSunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeKey::MomChaosMonday => "mom_chaos_monday",
            ThemeKey::WtfsWednesday => "wtfs_wednesday",
            ThemeKey::FuckItFriday => "fuck_it_friday",
            ThemeKey::FeedTheChaosSunday => "feed_the_chaos_sunday",
        }
    }

    pub fn weekday(&self) -> Weekday {
        match self {
            ThemeKey::MomChaosMonday => Weekday::Mon,
            ThemeKey::WtfsWednesday => Weekday::Wed,
            ThemeKey::FuckItFriday => Weekday::Fri,
            ThemeKey::FeedTheChaosSunday => Weekday::Sun,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThemeKey::MomChaosMonday => "Mom Chaos Monday",
            ThemeKey::WtfsWednesday => "WTF’s for Dinner Wednesday",
            ThemeKey::FuckItFriday => "Fuck It Friday",
            ThemeKey::FeedTheChaosSunday => "Feed the Chaos Sunday Drop",
        }
    }

    fn angle(&self) -> &'static str {
        match self {
            ThemeKey::MomChaosMonday => {
                "One specific, relatable parenting moment and the one thing that actually helped."
            }
            ThemeKey::WtfsWednesday => {
                "One new family- and budget-friendly recipe that survives a real weeknight."
            }
            ThemeKey::FuckItFriday => {
                "Permission to do less: shortcuts, guilt-dismantling, and calm hot takes."
            }
            ThemeKey::FeedTheChaosSunday => {
                "A skimmable overview of the coming week's meal plan, no full recipes."
            }
        }
    }

    fn tags(&self) -> &'static [&'static str] {
        match self {
            ThemeKey::MomChaosMonday => &["Mom Chaos Monday", "parenting", "mental load"],
            ThemeKey::WtfsWednesday => &["WTFs for Dinner", "recipes", "weeknight dinners"],
            ThemeKey::FuckItFriday => &["Fuck It Friday", "parenting", "low effort wins"],
            ThemeKey::FeedTheChaosSunday => &["Feed the Chaos", "meal plan", "weekly plan"],
        }
    }

    fn category<'a>(&self, categories: &'a CategoryOverrides) -> &'a str {
        match self {
            ThemeKey::MomChaosMonday => &categories.mom_chaos,
            ThemeKey::WtfsWednesday => &categories.wtfs,
            ThemeKey::FuckItFriday => &categories.fuck_it_friday,
            ThemeKey::FeedTheChaosSunday => &categories.sunday,
        }
    }
}

impl fmt::Display for ThemeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub key: ThemeKey,
    pub label: String,
    pub category: String,
    pub tags: Vec<String>,
    pub angle: Option<String>,
}

impl Theme {
    fn build(key: ThemeKey, categories: &CategoryOverrides) -> Self {
        Self {
            key,
            label: key.label().to_string(),
            category: key.category(categories).trim().to_string(),
            tags: key.tags().iter().map(|tag| tag.to_string()).collect(),
            angle: Some(key.angle().to_string()),
        }
    }

    /// The weekly meal-plan overview, the only theme that must carry the storefront link.
    pub fn is_weekly_plan(&self) -> bool {
        self.key == ThemeKey::FeedTheChaosSunday
    }

    /// Weekday index with Monday = 0.
    pub fn weekday_index(&self) -> u32 {
        self.key.weekday().num_days_from_monday()
    }
}

/// Immutable weekday -> theme table, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeTable {
    themes: Vec<Theme>,
}

impl ThemeTable {
    pub fn new(categories: &CategoryOverrides) -> Self {
        Self {
            themes: ThemeKey::ALL
                .iter()
                .map(|key| Theme::build(*key, categories))
                .collect(),
        }
    }

    /// Theme for a weekday index (Monday = 0). `None` means "not a publishing day".
    pub fn for_weekday(&self, weekday: u32) -> Option<&Theme> {
        self.themes
            .iter()
            .find(|theme| theme.weekday_index() == weekday)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter()
    }
}

impl Default for ThemeTable {
    fn default() -> Self {
        Self::new(&CategoryOverrides::default())
    }
}

/// Rotating sub-style for the Friday theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FridayVariant {
    A,
    B,
    C,
}

impl FridayVariant {
    const ROTATION: [FridayVariant; 3] = [FridayVariant::A, FridayVariant::B, FridayVariant::C];

    /// `iso_week` is the ISO-8601 week number (1..=53).
    pub fn from_iso_week(iso_week: u32) -> Self {
        Self::ROTATION[(iso_week.saturating_sub(1) % 3) as usize]
    }

    pub fn letter(&self) -> &'static str {
        match self {
            FridayVariant::A => "A",
            FridayVariant::B => "B",
            FridayVariant::C => "C",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FridayVariant::A => "Low-Effort Dinner Wins",
            FridayVariant::B => "Parenting Permission Slips",
            FridayVariant::C => "Hot Takes",
        }
    }
}

impl fmt::Display for FridayVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Closing call-to-action style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtaStyle {
    Soft,
    Direct,
}

impl CtaStyle {
    const ROTATION: [CtaStyle; 4] = [
        CtaStyle::Soft,
        CtaStyle::Direct,
        CtaStyle::Soft,
        CtaStyle::Direct,
    ];

    /// `weekday` uses Monday = 0.
    pub fn for_weekday(weekday: u32) -> Self {
        Self::ROTATION[(weekday % 4) as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CtaStyle::Soft => "soft",
            CtaStyle::Direct => "direct",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_four_weekdays_have_themes() {
        let table = ThemeTable::default();
        for weekday in [1, 3, 5] {
            assert!(table.for_weekday(weekday).is_none(), "weekday {weekday}");
        }
        let keys: Vec<ThemeKey> = [0, 2, 4, 6]
            .iter()
            .map(|w| table.for_weekday(*w).unwrap().key)
            .collect();
        assert_eq!(keys, ThemeKey::ALL.to_vec());
        assert!(table.for_weekday(7).is_none());
    }

    #[test]
    fn test_category_overrides_flow_into_themes() {
        let categories = CategoryOverrides {
            sunday: " Feed the Chaos ".to_string(),
            ..CategoryOverrides::default()
        };
        let table = ThemeTable::new(&categories);
        let sunday = table.for_weekday(6).unwrap();
        assert_eq!(sunday.category, "Feed the Chaos");
        assert!(sunday.is_weekly_plan());
        assert_eq!(table.for_weekday(0).unwrap().category, "Parenting in the Wild");
    }

    #[test]
    fn test_friday_variant_rotation() {
        assert_eq!(FridayVariant::from_iso_week(1), FridayVariant::A);
        assert_eq!(FridayVariant::from_iso_week(2), FridayVariant::B);
        assert_eq!(FridayVariant::from_iso_week(3), FridayVariant::C);
        assert_eq!(FridayVariant::from_iso_week(10), FridayVariant::A);
        assert_eq!(FridayVariant::from_iso_week(53), FridayVariant::B);
    }

    #[test]
    fn test_cta_rotation_by_weekday() {
        assert_eq!(CtaStyle::for_weekday(0), CtaStyle::Soft);
        assert_eq!(CtaStyle::for_weekday(1), CtaStyle::Direct);
        assert_eq!(CtaStyle::for_weekday(4), CtaStyle::Soft);
        assert_eq!(CtaStyle::for_weekday(6), CtaStyle::Soft);
    }
}
