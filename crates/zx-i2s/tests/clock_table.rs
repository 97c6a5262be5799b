//! Clock divider table: every documented entry, band isolation and the
//! first-match rule.

#![allow(clippy::unwrap_used)]

use zx_i2s::clock::rates;
use zx_i2s::{resolve, Error, PllSource, WordClockClass};

use PllSource::{Audio44k1 as P44, Audio48k as P48};

/// (class, rate, divider, mdiv, pll) for every table entry.
#[rustfmt::skip]
const DOCUMENTED: &[(WordClockClass, u32, u8, u8, PllSource)] = &[
    (WordClockClass::Bits24, 192_000, 0x02, 0x1, P48),
    (WordClockClass::Bits24,  96_000, 0x22, 0x0, P48),
    (WordClockClass::Bits24,  48_000, 0x12, 0x2, P48),
    (WordClockClass::Bits24,  32_000, 0x52, 0x2, P48),
    (WordClockClass::Bits24,  24_000, 0x22, 0x2, P48),
    (WordClockClass::Bits24,  16_000, 0x22, 0xA, P48),
    (WordClockClass::Bits24,   8_000, 0x22, 0xB, P48),
    (WordClockClass::Bits24,   6_000, 0x22, 0x4, P48),
    (WordClockClass::Bits24, 176_400, 0x02, 0x1, P44),
    (WordClockClass::Bits24,  88_200, 0x22, 0x0, P44),
    (WordClockClass::Bits24,  44_100, 0x12, 0x2, P44),
    (WordClockClass::Bits24,  22_050, 0x22, 0x2, P44),
    (WordClockClass::Bits24,  11_025, 0x22, 0x3, P44),
    (WordClockClass::Bits16, 192_000, 0x41, 0x1, P48),
    (WordClockClass::Bits16, 144_000, 0x21, 0x0, P48),
    (WordClockClass::Bits16,  96_000, 0x51, 0x1, P48),
    (WordClockClass::Bits16,  48_000, 0x15, 0x2, P48),
    (WordClockClass::Bits16,  32_000, 0x51, 0xA, P48),
    (WordClockClass::Bits16,  24_000, 0x21, 0xA, P48),
    (WordClockClass::Bits16,  16_000, 0x51, 0xB, P48),
    (WordClockClass::Bits16,   8_000, 0x61, 0xB, P48),
    (WordClockClass::Bits16,   6_000, 0x21, 0xC, P48),
    (WordClockClass::Bits16, 176_400, 0x41, 0x1, P44),
    (WordClockClass::Bits16,  88_200, 0x51, 0x1, P44),
    (WordClockClass::Bits16,  44_100, 0x51, 0x2, P44),
    (WordClockClass::Bits16,  22_050, 0x21, 0xA, P44),
    (WordClockClass::Bits16,  11_025, 0x21, 0xB, P44),
    (WordClockClass::Bits32, 192_000, 0x40, 0x0, P48),
    (WordClockClass::Bits32, 144_000, 0x00, 0x1, P48),
    (WordClockClass::Bits32,  96_000, 0x40, 0x1, P48),
    (WordClockClass::Bits32,  48_000, 0x50, 0x1, P48),
    (WordClockClass::Bits32,  32_000, 0x50, 0x9, P48),
    (WordClockClass::Bits32,  24_000, 0x50, 0x2, P48),
    (WordClockClass::Bits32,  16_000, 0x50, 0xA, P48),
    (WordClockClass::Bits32,   8_000, 0x50, 0xB, P48),
    (WordClockClass::Bits32,   6_000, 0x20, 0xB, P48),
    (WordClockClass::Bits32, 176_400, 0x40, 0x0, P44),
    (WordClockClass::Bits32,  88_200, 0x40, 0x1, P44),
    (WordClockClass::Bits32,  44_100, 0x50, 0x1, P44),
    (WordClockClass::Bits32,  22_050, 0x50, 0x2, P44),
    (WordClockClass::Bits32,  11_025, 0x20, 0xA, P44),
];

#[test]
fn every_documented_entry_resolves_exactly() {
    for &(class, rate, divider, mdiv, pll) in DOCUMENTED {
        let profile = resolve(class, rate).unwrap();
        assert_eq!(
            (profile.divider, profile.mdiv, profile.pll),
            (divider, mdiv, pll),
            "{class:?} @ {rate} Hz"
        );
        assert_eq!(profile.class, class);
        assert_eq!(profile.rate, rate);
    }
}

#[test]
fn table_has_no_undocumented_entries() {
    for class in WordClockClass::ALL {
        let documented = DOCUMENTED.iter().filter(|e| e.0 == class).count();
        assert_eq!(rates(class).count(), documented, "{class:?}");
    }
}

#[test]
fn scenario_values() {
    let p24 = resolve(WordClockClass::Bits24, 48_000).unwrap();
    assert_eq!((p24.divider, p24.mdiv, p24.pll.bit()), (0x12, 0x2, 1));
    let p16 = resolve(WordClockClass::Bits16, 48_000).unwrap();
    assert_eq!((p16.divider, p16.mdiv, p16.pll.bit()), (0x15, 0x2, 1));
    assert_eq!((p16.lrck_div(), p16.bclk_div()), (1, 1));
    assert_eq!((p24.lrck_div(), p24.bclk_div()), (2, 1));
}

#[test]
fn nibbles_stay_within_their_fields() {
    for &(class, rate, ..) in DOCUMENTED {
        let p = resolve(class, rate).unwrap();
        assert!(p.mdiv <= 0xF);
        assert!(p.lrck_div() <= 0x3);
        assert!(p.bclk_div() <= 0x7);
    }
}

proptest::proptest! {
    /// Rates absent from a band never resolve in that band.
    #[test]
    fn absent_rate_is_unsupported(rate in 0u32..400_000) {
        for class in WordClockClass::ALL {
            let listed = rates(class).any(|r| r == rate);
            match resolve(class, rate) {
                Ok(p) => proptest::prop_assert!(listed && p.rate == rate),
                Err(e) => {
                    proptest::prop_assert!(!listed);
                    proptest::prop_assert_eq!(e, Error::UnsupportedRate { class, rate });
                }
            }
        }
    }
}
