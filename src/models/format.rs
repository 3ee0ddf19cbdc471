//! Display formatting for asset detail metrics

use serde::Serialize;

use super::AssetRecord;

pub const MISSING: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Trend::Up
        } else if value < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn group_thousands(mut whole: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if whole < 1000 {
            groups.push(whole.to_string());
            break;
        }
        groups.push(format!("{:03}", whole % 1000));
        whole /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

fn trim_fraction(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

/// `$1,234.50`, two fraction digits
pub fn format_usd(value: Option<f64>) -> String {
    let Some(value) = finite(value) else {
        return MISSING.to_string();
    };
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Compact notation with at most two fraction digits: `1.23K`, `4.5B`
pub fn format_compact(value: Option<f64>) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    let Some(value) = finite(value) else {
        return MISSING.to_string();
    };
    let abs = value.abs();
    for (i, (divisor, suffix)) in UNITS.iter().enumerate() {
        if abs < *divisor {
            continue;
        }
        let scaled = (value / divisor * 100.0).round() / 100.0;
        // 999.999K rounds up into the next unit
        if scaled.abs() >= 1000.0 && i > 0 {
            let (up_divisor, up_suffix) = UNITS[i - 1];
            return format!("{}{}", trim_fraction(value / up_divisor), up_suffix);
        }
        return format!("{}{}", trim_fraction(scaled), suffix);
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.abs() >= 1000.0 {
        return format!("{}K", trim_fraction(value / 1e3));
    }
    trim_fraction(rounded)
}

pub fn format_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{:.2}%", v),
        None => MISSING.to_string(),
    }
}

fn plain(label: &'static str, value: String) -> DetailRow {
    DetailRow {
        label,
        value,
        trend: None,
    }
}

fn trending(label: &'static str, value: Option<f64>) -> DetailRow {
    let value = finite(value);
    DetailRow {
        label,
        value: format_percent(value),
        trend: value.map(Trend::of),
    }
}

/// The "snapshot metrics" table shown for one asset
pub fn detail_rows(asset: &AssetRecord) -> Vec<DetailRow> {
    let usd = asset.usd().cloned().unwrap_or_default();
    vec![
        plain("Price", format_usd(usd.price)),
        plain("Volume (24h)", format_compact(usd.volume_24h)),
        trending("Volume change (24h)", usd.volume_change_24h),
        trending("Change (1h)", usd.percent_change_1h),
        trending("Change (24h)", usd.percent_change_24h),
        trending("Change (7d)", usd.percent_change_7d),
        trending("Change (30d)", usd.percent_change_30d),
        trending("Change (60d)", usd.percent_change_60d),
        trending("Change (90d)", usd.percent_change_90d),
        plain("Market cap", format_usd(usd.market_cap)),
        plain("Dominance", format_percent(usd.market_cap_dominance)),
        plain("Fully diluted mkt cap", format_usd(usd.fully_diluted_market_cap)),
        plain("TVL", format_compact(usd.tvl)),
    ]
}
