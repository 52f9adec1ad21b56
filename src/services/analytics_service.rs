//! Read-only aggregates computed from the recorded draw history.
//!
//! Nothing here keeps counters: every figure is recomputed from draw results on demand, so
//! the history stays the single source of truth.

use std::time::SystemTime;

use indexmap::IndexMap;

use crate::{
    dao::models::DrawQuery,
    error::ServiceError,
    services::{draw_service, game_state_service},
    state::{
        SharedState,
        draw::DrawResult,
        wheel::{RouletteNumber, WheelColor},
    },
};

/// Most missing draw numbers listed by [`sequence_gaps`]; the total is always reported.
const MAX_LISTED_GAPS: usize = 1_000;

/// How often one pocket came up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFrequency {
    pub number: RouletteNumber,
    pub color: WheelColor,
    pub hits: u64,
    pub last_draw_number: Option<u32>,
}

/// How often one color came up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrequency {
    pub color: WheelColor,
    pub hits: u64,
    pub last_draw_number: Option<u32>,
}

/// Holes in the recorded draw-number sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceGaps {
    pub first_draw_number: Option<u32>,
    pub last_draw_number: Option<u32>,
    pub recorded: u64,
    pub missing_count: u64,
    pub missing: Vec<u32>,
}

/// A draw that is scheduled but has not happened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingDraw {
    pub draw_number: u32,
    pub scheduled_at: Option<SystemTime>,
}

/// Settlement totals over a window of draws, in minor currency units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementSummary {
    pub draws: u64,
    pub total_bets: u64,
    pub total_stake: u64,
    pub total_payout: u64,
    /// Stake minus payout; negative when the house lost over the window.
    pub house_result: i128,
}

/// Hits per pocket over `window`, one entry per pocket from 0 to 36.
pub async fn number_frequency(
    state: &SharedState,
    window: DrawQuery,
) -> Result<Vec<NumberFrequency>, ServiceError> {
    let draws = draw_service::load_draws(state, window).await?;
    Ok(count_numbers(&draws))
}

/// Hits per color over `window`, zero counts included.
pub async fn color_frequency(
    state: &SharedState,
    window: DrawQuery,
) -> Result<Vec<ColorFrequency>, ServiceError> {
    let draws = draw_service::load_draws(state, window).await?;
    Ok(count_colors(&draws))
}

/// Draw numbers missing between the lowest and highest recorded draw of `window`.
pub async fn sequence_gaps(
    state: &SharedState,
    window: DrawQuery,
) -> Result<SequenceGaps, ServiceError> {
    let draws = draw_service::load_draws(state, window).await?;
    Ok(find_gaps(&draws))
}

/// Bet, stake and payout totals over `window`, with the house result.
pub async fn settlement_summary(
    state: &SharedState,
    window: DrawQuery,
) -> Result<SettlementSummary, ServiceError> {
    let draws = draw_service::load_draws(state, window).await?;
    Ok(summarize(&draws))
}

/// Next `count` draws according to the current game state and interval.
pub async fn upcoming_draws(
    state: &SharedState,
    count: Option<usize>,
) -> Result<Vec<UpcomingDraw>, ServiceError> {
    let current = game_state_service::get_state(state).await?;
    let count = count.unwrap_or_else(|| state.config().upcoming_draws());

    Ok((0..count)
        .map_while(|offset| {
            let offset = u32::try_from(offset).ok()?;
            let draw_number = current.next_draw_number.checked_add(offset)?;
            let scheduled_at = current
                .next_draw_time
                .map(|first| first + current.draw_interval() * offset);
            Some(UpcomingDraw {
                draw_number,
                scheduled_at,
            })
        })
        .collect())
}

fn count_numbers(draws: &[DrawResult]) -> Vec<NumberFrequency> {
    let mut table: IndexMap<RouletteNumber, NumberFrequency> = RouletteNumber::all()
        .map(|number| {
            (
                number,
                NumberFrequency {
                    number,
                    color: number.color(),
                    hits: 0,
                    last_draw_number: None,
                },
            )
        })
        .collect();

    for draw in draws {
        if let Some(entry) = table.get_mut(&draw.winning_number) {
            entry.hits += 1;
            entry.last_draw_number = entry.last_draw_number.max(Some(draw.draw_number));
        }
    }

    table.into_values().collect()
}

fn count_colors(draws: &[DrawResult]) -> Vec<ColorFrequency> {
    let mut table: IndexMap<WheelColor, ColorFrequency> = WheelColor::ALL
        .into_iter()
        .map(|color| {
            (
                color,
                ColorFrequency {
                    color,
                    hits: 0,
                    last_draw_number: None,
                },
            )
        })
        .collect();

    for draw in draws {
        // The stored color is authoritative; no re-derivation here.
        if let Some(entry) = table.get_mut(&draw.winning_color) {
            entry.hits += 1;
            entry.last_draw_number = entry.last_draw_number.max(Some(draw.draw_number));
        }
    }

    table.into_values().collect()
}

fn find_gaps(draws: &[DrawResult]) -> SequenceGaps {
    let mut numbers: Vec<u32> = draws.iter().map(|draw| draw.draw_number).collect();
    numbers.sort_unstable();
    numbers.dedup();

    let (Some(&first), Some(&last)) = (numbers.first(), numbers.last()) else {
        return SequenceGaps::default();
    };

    let mut missing = Vec::new();
    let mut missing_count = 0u64;
    for pair in numbers.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        let hole = u64::from(high - low - 1);
        missing_count += hole;
        for number in (low + 1)..high {
            if missing.len() >= MAX_LISTED_GAPS {
                break;
            }
            missing.push(number);
        }
    }

    SequenceGaps {
        first_draw_number: Some(first),
        last_draw_number: Some(last),
        recorded: numbers.len() as u64,
        missing_count,
        missing,
    }
}

fn summarize(draws: &[DrawResult]) -> SettlementSummary {
    let mut summary = draws
        .iter()
        .fold(SettlementSummary::default(), |mut acc, draw| {
            acc.draws += 1;
            acc.total_bets = acc.total_bets.saturating_add(draw.totals.bets);
            acc.total_stake = acc.total_stake.saturating_add(draw.totals.stake);
            acc.total_payout = acc.total_payout.saturating_add(draw.totals.payout);
            acc
        });
    summary.house_result = i128::from(summary.total_stake) - i128::from(summary.total_payout);
    summary
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::draw::{BetTotals, DrawSource};

    fn draw(draw_number: u32, winning_number: i64) -> DrawResult {
        let number = RouletteNumber::try_from(winning_number).unwrap();
        DrawResult {
            draw_number,
            winning_number: number,
            winning_color: number.color(),
            draw_time: SystemTime::UNIX_EPOCH + Duration::from_secs(u64::from(draw_number)),
            totals: BetTotals {
                bets: 2,
                stake: 1_000,
                payout: 300,
            },
            source: DrawSource::Random,
        }
    }

    #[test]
    fn number_table_covers_the_wheel() {
        let draws = vec![draw(1, 17), draw(2, 17), draw(3, 0)];
        let table = count_numbers(&draws);

        assert_eq!(table.len(), 37);
        assert_eq!(table.iter().map(|row| row.hits).sum::<u64>(), 3);
        let seventeen = &table[17];
        assert_eq!(seventeen.hits, 2);
        assert_eq!(seventeen.last_draw_number, Some(2));
        assert_eq!(table[0].color, WheelColor::Green);
        assert_eq!(table[5].last_draw_number, None);
    }

    #[test]
    fn color_table_sums_to_draw_count() {
        let draws = vec![draw(1, 1), draw(2, 2), draw(3, 0), draw(4, 36)];
        let table = count_colors(&draws);

        assert_eq!(
            table.iter().map(|row| row.color).collect::<Vec<_>>(),
            WheelColor::ALL.to_vec()
        );
        assert_eq!(table[0].hits, 2);
        assert_eq!(table[0].last_draw_number, Some(4));
        assert_eq!(table[1].hits, 1);
        assert_eq!(table[2].hits, 1);
    }

    #[test]
    fn gaps_between_min_and_max() {
        let draws = vec![draw(7, 1), draw(3, 1), draw(4, 1), draw(10, 1)];
        let gaps = find_gaps(&draws);
        assert_eq!(gaps.first_draw_number, Some(3));
        assert_eq!(gaps.last_draw_number, Some(10));
        assert_eq!(gaps.missing, vec![5, 6, 8, 9]);
        assert_eq!(gaps.missing_count, 4);
        assert_eq!(gaps.recorded, 4);

        assert_eq!(find_gaps(&[]), SequenceGaps::default());
    }

    #[test]
    fn huge_holes_are_counted_but_truncated() {
        let draws = vec![draw(1, 1), draw(5_000, 1)];
        let gaps = find_gaps(&draws);
        assert_eq!(gaps.missing_count, 4_998);
        assert_eq!(gaps.missing.len(), MAX_LISTED_GAPS);
    }

    #[test]
    fn settlement_totals() {
        let summary = summarize(&[draw(1, 3), draw(2, 4)]);
        assert_eq!(summary.draws, 2);
        assert_eq!(summary.total_bets, 4);
        assert_eq!(summary.total_stake, 2_000);
        assert_eq!(summary.total_payout, 600);
        assert_eq!(summary.house_result, 1_400);
    }
}
