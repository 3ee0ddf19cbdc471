//! Search/sort, input validation and display formatting

#[cfg(test)]
mod tests {
    use crate::{
        listing::{filter_and_sort, fuzzy_matches, SortKey},
        models::{
            format::{detail_rows, format_compact, format_percent, format_usd, Trend, MISSING},
            BuyRequest,
        },
        tests::support::asset,
        validation::{
            start_for_page, validate_buy, validate_limit, validate_page, validate_start,
            ValidationError,
        },
    };

    fn page() -> Vec<crate::models::AssetRecord> {
        vec![
            asset(1, "Bitcoin", "BTC", Some(60_000.0)),
            asset(1027, "Ethereum", "ETH", Some(3_000.0)),
            asset(825, "Tether", "USDT", Some(1.0)),
            asset(5426, "Solana", "SOL", None),
        ]
    }

    fn symbols(records: &[crate::models::AssetRecord]) -> Vec<&str> {
        records.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_fuzzy_matching() {
        assert!(fuzzy_matches("btc", "BTC"));
        assert!(fuzzy_matches("bcn", "Bitcoin"));
        assert!(fuzzy_matches("  eth ", "Ethereum"));
        assert!(!fuzzy_matches("cb", "Bitcoin"));
        assert!(fuzzy_matches("", "anything"));
        // Regex metacharacters are plain text
        assert!(!fuzzy_matches("b.c", "Bitcoin"));
        assert!(fuzzy_matches("b.c", "B.Coin"));
    }

    #[test]
    fn test_filter_and_sort() {
        let records = page();

        let by_name = filter_and_sort(&records, "", SortKey::Name);
        assert_eq!(symbols(&by_name), vec!["BTC", "ETH", "SOL", "USDT"]);

        let by_symbol = filter_and_sort(&records, "", SortKey::Symbol);
        assert_eq!(symbols(&by_symbol), vec!["BTC", "ETH", "SOL", "USDT"]);

        let by_price = filter_and_sort(&records, "", SortKey::Price);
        assert_eq!(symbols(&by_price), vec!["BTC", "ETH", "USDT", "SOL"]);

        let searched = filter_and_sort(&records, "te", SortKey::Name);
        assert_eq!(symbols(&searched), vec!["ETH", "USDT"]);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("Price".parse::<SortKey>().unwrap(), SortKey::Price);
        assert_eq!("symbol".parse::<SortKey>().unwrap(), SortKey::Symbol);
        assert!(matches!(
            "volume".parse::<SortKey>(),
            Err(ValidationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_pagination_validation() {
        assert_eq!(validate_limit("10"), Ok(10));
        assert!(validate_limit("0").is_err());
        assert!(validate_limit("5001").is_err());
        assert_eq!(
            validate_limit(" "),
            Err(ValidationError::MissingParameter("limit".to_string()))
        );
        assert_eq!(validate_start("1"), Ok(1));
        assert!(validate_start("0").is_err());
        assert!(validate_start("-3").is_err());
        assert!(validate_page("abc").is_err());

        assert_eq!(start_for_page(1, 10), Ok(1));
        assert_eq!(start_for_page(3, 10), Ok(21));
        assert!(start_for_page(u32::MAX, 10).is_err());
    }

    #[test]
    fn test_buy_validation() {
        let accepted = validate_buy(&BuyRequest {
            amount_usd: 12.346,
            symbol: " BTC ".to_string(),
        })
        .unwrap();
        assert_eq!(accepted.amount_usd, 12.35);
        assert_eq!(accepted.symbol, "BTC");

        assert!(validate_buy(&BuyRequest {
            amount_usd: 5000.0,
            symbol: "ETH".to_string(),
        })
        .is_ok());

        for amount in [0.0, -1.0, 5000.01, f64::NAN, f64::INFINITY] {
            assert_eq!(
                validate_buy(&BuyRequest {
                    amount_usd: amount,
                    symbol: "ETH".to_string(),
                }),
                Err(ValidationError::InvalidAmount)
            );
        }

        assert_eq!(
            validate_buy(&BuyRequest {
                amount_usd: 10.0,
                symbol: "".to_string(),
            }),
            Err(ValidationError::MissingParameter("symbol".to_string()))
        );
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_usd(Some(1234.5)), "$1,234.50");
        assert_eq!(format_usd(Some(0.004)), "$0.00");
        assert_eq!(format_usd(Some(-2.5)), "-$2.50");
        assert_eq!(format_usd(Some(1_234_567_890.0)), "$1,234,567,890.00");
        assert_eq!(format_usd(None), MISSING);
        assert_eq!(format_usd(Some(f64::NAN)), MISSING);

        assert_eq!(format_compact(Some(12.346)), "12.35");
        assert_eq!(format_compact(Some(1_234.0)), "1.23K");
        assert_eq!(format_compact(Some(1_500_000.0)), "1.5M");
        assert_eq!(format_compact(Some(2_000_000_000.0)), "2B");
        assert_eq!(format_compact(Some(999_999.0)), "1M");
        assert_eq!(format_compact(None), MISSING);

        assert_eq!(format_percent(Some(1.5)), "1.50%");
        assert_eq!(format_percent(Some(-0.126)), "-0.13%");
        assert_eq!(format_percent(None), MISSING);
    }

    #[test]
    fn test_detail_rows() {
        let bitcoin = asset(1, "Bitcoin", "BTC", Some(60_000.0));
        let rows = detail_rows(&bitcoin);
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[0].label, "Price");
        assert_eq!(rows[0].value, "$60,000.00");
        assert_eq!(rows[3].label, "Change (1h)");
        assert_eq!(rows[3].value, MISSING);
        assert_eq!(rows[3].trend, None);

        let mut moving = bitcoin.clone();
        if let Some(usd) = moving.quote.as_mut().and_then(|q| q.usd.as_mut()) {
            usd.percent_change_24h = Some(-3.2);
            usd.percent_change_7d = Some(4.0);
            usd.tvl = Some(1_250_000.0);
        }
        let rows = detail_rows(&moving);
        assert_eq!(rows[4].trend, Some(Trend::Down));
        assert_eq!(rows[5].trend, Some(Trend::Up));
        assert_eq!(rows[12].value, "1.25M");

        let bare = asset(2, "Nothing", "NIL", None);
        assert!(detail_rows(&bare).iter().all(|row| row.value == MISSING));
    }
}
