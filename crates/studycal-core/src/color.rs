//! Achievement rate to color band mapping
//!
//! Thresholds live in named lookup tables so switching policy is a
//! one-line change. Each table is a total, non-overlapping partition of
//! `[0, ∞)`: rows are contiguous and the last row is open-ended.

use studycal_api::{Band, Rgb, Theme, VisualToken};
use studycal_config::BandTableKind;

/// One half-open rate interval `[from, to)`; `to == None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandRange {
    pub from: u32,
    pub to: Option<u32>,
    pub band: Band,
}

impl BandRange {
    const fn new(from: u32, to: Option<u32>, band: Band) -> Self {
        Self { from, to, band }
    }

    pub fn contains(&self, rate: u32) -> bool {
        rate >= self.from && self.to.is_none_or(|to| rate < to)
    }
}

/// A named rate-to-band threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandTable {
    pub name: &'static str,
    pub rows: &'static [BandRange],
}

/// Default table. 100% exactly is purple; over-achievement walks back down.
pub const CANONICAL_BANDS: BandTable = BandTable {
    name: "canonical",
    rows: &[
        BandRange::new(0, Some(50), Band::White),
        BandRange::new(50, Some(60), Band::Yellow),
        BandRange::new(60, Some(70), Band::Green),
        BandRange::new(70, Some(80), Band::Brown),
        BandRange::new(80, Some(90), Band::Blue),
        BandRange::new(90, Some(100), Band::Black),
        BandRange::new(100, Some(101), Band::Purple),
        BandRange::new(101, Some(120), Band::Black),
        BandRange::new(120, Some(130), Band::Purple),
        BandRange::new(130, Some(140), Band::Green),
        BandRange::new(140, Some(150), Band::White),
        BandRange::new(150, None, Band::White),
    ],
};

/// Older table: 80-119% is one black band and 120-129% is brown
pub const LEGACY_BANDS: BandTable = BandTable {
    name: "legacy",
    rows: &[
        BandRange::new(0, Some(50), Band::White),
        BandRange::new(50, Some(60), Band::Yellow),
        BandRange::new(60, Some(70), Band::Green),
        BandRange::new(70, Some(80), Band::Brown),
        BandRange::new(80, Some(100), Band::Black),
        BandRange::new(100, Some(101), Band::Purple),
        BandRange::new(101, Some(120), Band::Black),
        BandRange::new(120, Some(130), Band::Brown),
        BandRange::new(130, Some(140), Band::Green),
        BandRange::new(140, None, Band::White),
    ],
};

impl BandTable {
    pub fn for_kind(kind: BandTableKind) -> &'static BandTable {
        match kind {
            BandTableKind::Canonical => &CANONICAL_BANDS,
            BandTableKind::Legacy => &LEGACY_BANDS,
        }
    }

    pub fn band_for(&self, rate: u32) -> Band {
        self.rows
            .iter()
            .find(|row| row.contains(rate))
            .map(|row| row.band)
            .unwrap_or(Band::White)
    }
}

/// Band for `rate` under the canonical table
pub fn band_for(rate: u32) -> Band {
    CANONICAL_BANDS.band_for(rate)
}

const DARK_TEXT: Rgb = Rgb(0x11, 0x18, 0x27);

fn classic_background(band: Band) -> Rgb {
    match band {
        Band::White => Rgb::WHITE,
        Band::Yellow => Rgb(0xfe, 0xf0, 0x8a),
        Band::Green => Rgb(0xbb, 0xf7, 0xd0),
        Band::Brown => Rgb(0xb4, 0x53, 0x09),
        Band::Blue => Rgb(0xbf, 0xdb, 0xfe),
        Band::Black => Rgb(0x11, 0x18, 0x27),
        Band::Purple => Rgb(0xe9, 0xd5, 0xff),
    }
}

// One shade per band, lightest for white
const GREEN_SHADES: [Rgb; 7] = [
    Rgb(0xf0, 0xfd, 0xf4),
    Rgb(0xdc, 0xfc, 0xe7),
    Rgb(0xbb, 0xf7, 0xd0),
    Rgb(0x86, 0xef, 0xac),
    Rgb(0x4a, 0xde, 0x80),
    Rgb(0x16, 0xa3, 0x4a),
    Rgb(0x14, 0x53, 0x2d),
];

const GITHUB_EMPTY: Rgb = Rgb(0xeb, 0xed, 0xf0);
const GITHUB_LOW: Rgb = Rgb(0x9b, 0xe9, 0xa8);
const GITHUB_HIGH: Rgb = Rgb(0x21, 0x6e, 0x39);

fn github_background(rate: u32) -> Rgb {
    if rate == 0 {
        return GITHUB_EMPTY;
    }
    let t = f64::from(rate.min(100)) / 100.0;
    GITHUB_LOW.lerp(GITHUB_HIGH, t)
}

fn readable_foreground(background: Rgb) -> Rgb {
    if background.luminance() < 0.5 {
        Rgb::WHITE
    } else {
        DARK_TEXT
    }
}

/// Render a band under a theme. Pure: same inputs, same token.
pub fn visual_token(band: Band, rate: u32, theme: Theme) -> VisualToken {
    let background = match theme {
        Theme::Classic => classic_background(band),
        Theme::Green => GREEN_SHADES[band.ordinal()],
        Theme::Github => github_background(rate),
    };

    VisualToken {
        band,
        theme,
        background,
        foreground: readable_foreground(background),
    }
}

/// Canonical table, given theme
pub fn color_for(rate: u32, theme: Theme) -> VisualToken {
    visual_token(band_for(rate), rate, theme)
}

/// Maps rates to tokens under a configured table and default theme
#[derive(Debug, Clone, Copy)]
pub struct ColorBandMapper {
    table: &'static BandTable,
    theme: Theme,
}

impl ColorBandMapper {
    pub fn new(kind: BandTableKind, theme: Theme) -> Self {
        Self {
            table: BandTable::for_kind(kind),
            theme,
        }
    }

    pub fn table(&self) -> &'static BandTable {
        self.table
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn band_for(&self, rate: u32) -> Band {
        self.table.band_for(rate)
    }

    pub fn color_for(&self, rate: u32) -> VisualToken {
        self.color_for_theme(rate, self.theme)
    }

    pub fn color_for_theme(&self, rate: u32, theme: Theme) -> VisualToken {
        visual_token(self.band_for(rate), rate, theme)
    }
}

impl Default for ColorBandMapper {
    fn default() -> Self {
        Self::new(BandTableKind::Canonical, Theme::Classic)
    }
}
