//! Pure projections of a [`UsageSnapshot`] for the quota panel.

use crate::api::UsageSnapshot;

/// Share of the daily limit consumed, in percent, capped at 100.
///
/// A zero limit reads as fully used once any token has been spent.
///
/// ```
/// use pdf_audiobook::usage::usage_percent;
///
/// assert_eq!(usage_percent(400, 1000), 40.0);
/// assert_eq!(usage_percent(1200, 1000), 100.0);
/// ```
pub fn usage_percent(total_tokens: u64, daily_limit: u64) -> f64 {
    if daily_limit == 0 {
        return if total_tokens > 0 { 100.0 } else { 0.0 };
    }
    (total_tokens as f64 / daily_limit as f64 * 100.0).min(100.0)
}

/// Tokens left today, never negative.
pub fn remaining_today(total_tokens: u64, daily_limit: u64) -> u64 {
    daily_limit.saturating_sub(total_tokens)
}

/// Threshold band of the usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageBand {
    /// Below 50 %.
    Nominal,
    /// 50 % up to (not including) 80 %.
    Elevated,
    /// 80 % and above.
    Critical,
}

impl UsageBand {
    pub fn from_percent(percent: f64) -> Self {
        if percent < 50.0 {
            UsageBand::Nominal
        } else if percent < 80.0 {
            UsageBand::Elevated
        } else {
            UsageBand::Critical
        }
    }

    /// Bar / badge colour as `(r, g, b)`.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            UsageBand::Nominal => (34, 197, 94),
            UsageBand::Elevated => (234, 179, 8),
            UsageBand::Critical => (239, 68, 68),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UsageBand::Nominal => "Nominal",
            UsageBand::Elevated => "Elevated",
            UsageBand::Critical => "Critical",
        }
    }
}

/// Everything the panel shows that is computed rather than fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageDisplay {
    pub percent: f64,
    pub band: UsageBand,
    pub remaining: u64,
}

impl UsageDisplay {
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Self {
        let total = snapshot.today.total_tokens;
        let percent = usage_percent(total, snapshot.daily_limit);
        Self {
            percent,
            band: UsageBand::from_percent(percent),
            remaining: remaining_today(total, snapshot.daily_limit),
        }
    }
}

/// Thousands separators, as the panel prints token counts.
///
/// ```
/// use pdf_audiobook::usage::display::group_thousands;
///
/// assert_eq!(group_thousands(1_000_000), "1,000,000");
/// assert_eq!(group_thousands(999), "999");
/// ```
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
