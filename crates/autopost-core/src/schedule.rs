//! Calendar arithmetic: which day publishes what, and when the next slot is.

use crate::config::AutopostConfig;
use crate::error::{ConfigError, ResolveError};
use crate::theme::{FridayVariant, Theme, ThemeKey, ThemeTable};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Day offsets scanned by [`ScheduleResolver::next_publish_datetime`], inclusive.
pub const SCAN_DAYS: u64 = 7;

/// A publishing slot: the local instant and the theme that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSlot<'a> {
    pub publish_at: DateTime<Tz>,
    pub theme: &'a Theme,
}

impl ResolvedSlot<'_> {
    /// The Friday sub-variant, only for the Friday theme.
    pub fn friday_variant(&self) -> Option<FridayVariant> {
        (self.theme.key == ThemeKey::FuckItFriday)
            .then(|| friday_variant(self.publish_at.date_naive()))
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleResolver {
    timezone: Tz,
    publish_time: NaiveTime,
    themes: ThemeTable,
}

impl ScheduleResolver {
    pub fn new(timezone: Tz, publish_time: NaiveTime, themes: ThemeTable) -> Self {
        Self {
            timezone,
            publish_time,
            themes,
        }
    }

    pub fn from_config(config: &AutopostConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.timezone()?,
            config.publish_time()?,
            ThemeTable::new(&config.categories),
        ))
    }

    pub fn themes(&self) -> &ThemeTable {
        &self.themes
    }

    /// Re-express any instant in the configured zone.
    pub fn localize<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateTime<Tz> {
        instant.with_timezone(&self.timezone)
    }

    /// `weekday` uses Monday = 0.
    pub fn theme_for_day(&self, weekday: u32) -> Option<&Theme> {
        self.themes.for_weekday(weekday)
    }

    pub fn theme_for_date(&self, date: NaiveDate) -> Option<&Theme> {
        self.theme_for_day(date.weekday().num_days_from_monday())
    }

    /// The publish instant on `date`, honouring the zone's DST rules.
    ///
    /// An ambiguous wall time (clocks falling back) resolves to the earlier instant. A wall
    /// time skipped by a spring-forward gap moves one hour later.
    pub fn publish_moment(&self, date: NaiveDate) -> Option<DateTime<Tz>> {
        let naive = date.and_time(self.publish_time);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
    }

    /// First publish instant strictly after `now` whose day has a theme.
    pub fn next_publish_datetime(
        &self,
        now: DateTime<Tz>,
    ) -> Result<ResolvedSlot<'_>, ResolveError> {
        let today = now.date_naive();
        for offset in 0..=SCAN_DAYS {
            let Some(date) = today.checked_add_days(Days::new(offset)) else {
                break;
            };
            let Some(theme) = self.theme_for_date(date) else {
                continue;
            };
            let Some(candidate) = self.publish_moment(date) else {
                continue;
            };
            if candidate > now {
                return Ok(ResolvedSlot {
                    publish_at: candidate,
                    theme,
                });
            }
        }

        Err(ResolveError::NoResolvableDate {
            now: now.to_rfc3339(),
            days: (SCAN_DAYS + 1) as u32,
        })
    }

    /// The next `count` slots after `now`, in order.
    pub fn upcoming(
        &self,
        now: DateTime<Tz>,
        count: usize,
    ) -> Result<Vec<ResolvedSlot<'_>>, ResolveError> {
        let mut slots = Vec::with_capacity(count);
        let mut cursor = now;
        while slots.len() < count {
            let slot = self.next_publish_datetime(cursor)?;
            cursor = slot.publish_at;
            slots.push(slot);
        }
        Ok(slots)
    }
}

/// Three-week rotation keyed on the ISO-8601 week number of `date`.
pub fn friday_variant(date: NaiveDate) -> FridayVariant {
    FridayVariant::from_iso_week(date.iso_week().week())
}

/// True when any of `dates` starts with `target` formatted as `YYYY-MM-DD`.
///
/// Matches on calendar day only; the theme of the existing post is not considered.
pub fn is_slot_taken<'a, I>(dates: I, target: NaiveDate) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = target.format("%Y-%m-%d").to_string();
    dates.into_iter().any(|date| date.starts_with(&prefix))
}
