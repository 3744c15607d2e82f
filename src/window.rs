//! Expansion of one depart/return pair into a window of nearby dates

use chrono::{Duration, NaiveDate};

/// Sorted candidate depart and return dates around a seed pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    departs: Vec<NaiveDate>,
    returns: Vec<NaiveDate>,
}

impl DateWindow {
    /// Expands the seed pair by `day_range` days in both directions
    ///
    /// Receding offsets stop at the first depart date that falls before `today`;
    /// later (even earlier-dated) offsets are not considered. Advancing offsets
    /// are always added.
    pub fn expand(
        seed_depart: NaiveDate,
        seed_return: NaiveDate,
        day_range: u32,
        today: NaiveDate,
    ) -> Self {
        let mut departs = vec![seed_depart];
        let mut returns = vec![seed_return];

        for k in 1..=i64::from(day_range) {
            let offset = Duration::days(k);
            let (Some(depart), Some(ret)) = (
                seed_depart.checked_sub_signed(offset),
                seed_return.checked_sub_signed(offset),
            ) else {
                break;
            };
            if depart < today {
                break;
            }
            departs.push(depart);
            returns.push(ret);
        }

        for k in 1..=i64::from(day_range) {
            let offset = Duration::days(k);
            let (Some(depart), Some(ret)) = (
                seed_depart.checked_add_signed(offset),
                seed_return.checked_add_signed(offset),
            ) else {
                break;
            };
            departs.push(depart);
            returns.push(ret);
        }

        departs.sort_unstable();
        departs.dedup();
        returns.sort_unstable();
        returns.dedup();

        Self { departs, returns }
    }

    pub fn departs(&self) -> &[NaiveDate] {
        &self.departs
    }

    pub fn returns(&self) -> &[NaiveDate] {
        &self.returns
    }

    /// Every (depart, return) combination, depart-major
    pub fn pairs(&self) -> impl Iterator<Item = (NaiveDate, NaiveDate)> + '_ {
        self.departs
            .iter()
            .flat_map(move |d| self.returns.iter().map(move |r| (*d, *r)))
    }

    /// Number of pairs yielded by [`DateWindow::pairs`]
    pub fn pair_count(&self) -> usize {
        self.departs.len() * self.returns.len()
    }
}
