/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::str::FromStr;

use alloy::primitives::{utils, U256};

use crate::Result;

/// Decimals used by the reward token (and by ether itself)
pub const TOKEN_DECIMALS: u8 = 18;

/// Render an integer amount of smallest units as a base-10 decimal string,
/// placing the point `decimal_places` digits from the right. Trailing
/// fractional zeros are trimmed, so `5 * 10^18` with 18 places is `"5"`.
pub fn encode_base10(amount: U256, decimal_places: u8) -> Result<String> {
    let formatted = utils::format_units(amount, decimal_places)?;

    match formatted.split_once('.') {
        Some((int_part, frac_part)) => match frac_part.trim_end_matches('0') {
            "" => Ok(int_part.to_string()),
            frac_part => Ok(format!("{int_part}.{frac_part}")),
        },
        None => Ok(formatted),
    }
}

/// Convert smallest units into a display amount, i.e. `amount / 10^18`
/// for the reward token.
pub fn format_units(amount: U256, decimal_places: u8) -> Result<f64> {
    Ok(f64::from_str(&encode_base10(amount, decimal_places)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_base10() {
        let five = U256::from(5u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(encode_base10(five, 18).unwrap(), "5");
        assert_eq!(encode_base10(U256::ZERO, 18).unwrap(), "0");
        assert_eq!(encode_base10(U256::from(1u64), 18).unwrap(), "0.000000000000000001");
        assert_eq!(encode_base10(U256::from(1_500_000u64), 6).unwrap(), "1.5");
        assert_eq!(encode_base10(U256::from(42u64), 0).unwrap(), "42");
    }

    #[test]
    fn test_format_units() {
        // r / 10^18 within display tolerance, for a spread of magnitudes
        for r in [0u128, 1, 999, 123_456_789, 5_000_000_000_000_000_000, u64::MAX as u128] {
            let got = format_units(U256::from(r), 18).unwrap();
            let want = r as f64 / 1e18;
            assert!((got - want).abs() <= want.abs() * 1e-12 + f64::EPSILON, "{r}: {got} != {want}");
        }

        let big = U256::from(123u64) * U256::from(10u64).pow(U256::from(30u64));
        assert!((format_units(big, 18).unwrap() - 1.23e14).abs() < 1.0);
    }
}
