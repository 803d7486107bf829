//! upsert 멱등성 속성 테스트.

use ohlcv_core::Candle;
use ohlcv_data::{CandleQuery, CandleStore, MemoryCandleStore};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

fn candle(symbol_idx: u8, ts: i64, close: i64) -> Candle {
    let price = Decimal::from(close);
    Candle::new(
        format!("SYM{}", symbol_idx),
        ts,
        price,
        price,
        price,
        price,
        Decimal::ONE,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// 어떤 순서로 나눠 upsert해도 키당 한 행이 남고 마지막 값이 반영된다.
    #[test]
    fn prop_upsert_last_write_wins(
        rows in prop::collection::vec((0u8..3, 0i64..20, 0i64..1000), 1..60),
        split in 0usize..60,
    ) {
        let candles: Vec<Candle> = rows.iter().map(|(s, t, c)| candle(*s, *t, *c)).collect();
        let split = split.min(candles.len());

        let mut expected: HashMap<(String, i64), Decimal> = HashMap::new();
        for c in &candles {
            expected.insert((c.symbol.clone(), c.timestamp), c.close);
        }

        let store = MemoryCandleStore::new();
        let rt = runtime();
        let (first, second) = rt.block_on(async {
            let first = store.upsert_candles(&candles[..split]).await.unwrap();
            let second = store.upsert_candles(&candles[split..]).await.unwrap();
            (first, second)
        });

        let page = rt
            .block_on(store.query_candles(&CandleQuery::default().with_page(1, 1000)))
            .unwrap();

        prop_assert_eq!(page.total as usize, expected.len());
        prop_assert_eq!((first.inserted + second.inserted) as usize, expected.len());
        for c in &page.items {
            prop_assert_eq!(Some(&c.close), expected.get(&(c.symbol.clone(), c.timestamp)));
        }

        let mut keys: Vec<_> = page.items.iter().map(|c| (c.symbol.clone(), c.timestamp)).collect();
        let sorted = {
            let mut k = keys.clone();
            k.sort();
            k
        };
        keys.dedup();
        prop_assert_eq!(keys, sorted);
    }
}
