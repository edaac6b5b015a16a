//! Decimal currency arithmetic and display formatting for quotation
//! documents. All amounts are USD with two-decimal display rounding.

use rust_decimal::Decimal;

/// Fixed Mexican IVA rate applied to every quotation subtotal.
pub const IVA_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2);

/// Derived monetary fields for a single-item quotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuoteTotals {
    pub extension: Decimal,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
}

impl QuoteTotals {
    /// Compute extension (quantity x unit price), subtotal, IVA, and
    /// total. Documents carry exactly one item, so the subtotal equals
    /// the extension.
    pub fn compute(quantity: u32, unit_price: Decimal) -> Self {
        let extension = unit_price * Decimal::from(quantity);
        let subtotal = extension;
        let iva = (subtotal * IVA_RATE).round_dp(2);
        let total = subtotal + iva;

        Self { extension, subtotal, iva, total }
    }
}

/// Format an amount as fixed-point USD currency with thousands
/// separators, e.g. `$1,234.50`.
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    format!("{sign}${grouped}.{fraction}")
}
