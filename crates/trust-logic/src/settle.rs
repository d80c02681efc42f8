//! Round settlement arithmetic
//!
//! Pure money math for one round: pot accumulation, trust bonus, payout
//! split, betrayal flags. All amounts are integer currency units; the split
//! uses floor division with the remainder assigned to the counterparty, so
//! `payout_a + payout_b == pot_after_bonus` holds exactly.

use crate::personality::Choice;
use serde::{Deserialize, Serialize};

/// One player's committed choice going into settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub choice: Choice,
    /// Amount committed this round. Ignored (treated as zero) on cash-out.
    pub invested: u64,
}

impl Stake {
    pub fn invest(amount: u64) -> Self {
        Stake { choice: Choice::Invest, invested: amount }
    }

    pub fn cash_out() -> Self {
        Stake { choice: Choice::CashOut, invested: 0 }
    }

    fn effective_investment(&self) -> u64 {
        match self.choice {
            Choice::Invest => self.invested,
            Choice::CashOut => 0,
        }
    }
}

/// One player's settled outcome for the round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledPlayer {
    pub invested: u64,
    pub payout: u64,
    /// payout - invested
    pub net: i64,
    pub cooperated: bool,
    pub defected: bool,
    pub was_betrayed: bool,
    /// Share of the round's total investment, in basis points.
    pub contribution_bps: u16,
}

/// Complete settlement of one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub round_number: u8,
    pub pot_before_bonus: u64,
    /// The round's table value; applied to the pot only when both invested.
    pub trust_bonus_percent: u8,
    pub pot_after_bonus: u64,
    pub both_invested: bool,
    pub someone_cashed_out: bool,
    /// Indexed by seat (player number - 1).
    pub players: [SettledPlayer; 2],
}

fn contribution_bps(invested: u64, total: u64) -> (u16, u16) {
    if total == 0 {
        return (5_000, 5_000);
    }
    let a = (invested as u128 * 10_000 / total as u128) as u16;
    (a, 10_000 - a)
}

/// Settle one round.
///
/// `carried_pot` is the previous round's pot-after-bonus (zero in round 1).
/// A defector's nominal investment never enters the pot.
pub fn settle_round(
    round_number: u8,
    trust_bonus_percent: u8,
    carried_pot: u64,
    stakes: [Stake; 2],
) -> Settlement {
    let inv_a = stakes[0].effective_investment();
    let inv_b = stakes[1].effective_investment();
    let total_invested = inv_a + inv_b;
    let pot_before_bonus = carried_pot + total_invested;

    let both_invested =
        stakes[0].choice == Choice::Invest && stakes[1].choice == Choice::Invest;
    let someone_cashed_out =
        stakes[0].choice == Choice::CashOut || stakes[1].choice == Choice::CashOut;

    let pot_after_bonus = if both_invested {
        pot_before_bonus + pot_before_bonus * trust_bonus_percent as u64 / 100
    } else {
        pot_before_bonus
    };

    let (bps_a, bps_b) = contribution_bps(inv_a, total_invested);

    let (payout_a, payout_b) = if both_invested {
        // Each player recovers their own investment; the remainder splits
        // proportionally to contribution. Floor division on A's share, the
        // leftover unit goes to B.
        let remaining = pot_after_bonus - total_invested;
        let share_a = if total_invested == 0 {
            remaining - remaining / 2
        } else {
            (remaining as u128 * inv_a as u128 / total_invested as u128) as u64
        };
        let share_b = remaining - share_a;
        (inv_a + share_a, inv_b + share_b)
    } else {
        match (stakes[0].choice, stakes[1].choice) {
            // Exactly one defector takes the whole pot.
            (Choice::CashOut, Choice::Invest) => (pot_after_bonus, 0),
            (Choice::Invest, Choice::CashOut) => (0, pot_after_bonus),
            // Both defect: even split, odd unit to seat 1.
            _ => {
                let half = pot_after_bonus / 2;
                (pot_after_bonus - half, half)
            }
        }
    };

    let settled = |invested: u64, payout: u64, choice: Choice, opponent: Choice, bps: u16| {
        let cooperated = choice == Choice::Invest;
        SettledPlayer {
            invested,
            payout,
            net: payout as i64 - invested as i64,
            cooperated,
            defected: !cooperated,
            was_betrayed: cooperated && opponent == Choice::CashOut,
            contribution_bps: bps,
        }
    };

    Settlement {
        round_number,
        pot_before_bonus,
        trust_bonus_percent,
        pot_after_bonus,
        both_invested,
        someone_cashed_out,
        players: [
            settled(inv_a, payout_a, stakes[0].choice, stakes[1].choice, bps_a),
            settled(inv_b, payout_b, stakes[1].choice, stakes[0].choice, bps_b),
        ],
    }
}
