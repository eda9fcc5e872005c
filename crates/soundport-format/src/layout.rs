//! Channel roles and channel layouts.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of channels a layout can hold.
pub const MAX_CHANNELS: usize = 24;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Layout has {0} channels, the maximum is {MAX_CHANNELS}")]
    TooManyChannels(usize),
}

/// Role of a single channel within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelId {
    #[default]
    Invalid,

    FrontLeft,
    FrontRight,
    FrontCenter,
    Lfe,
    BackLeft,
    BackRight,
    FrontLeftCenter,
    FrontRightCenter,
    BackCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopBackLeft,
    TopBackCenter,
    TopBackRight,

    BackLeftCenter,
    BackRightCenter,
    FrontLeftWide,
    FrontRightWide,
    FrontLeftHigh,
    FrontCenterHigh,
    FrontRightHigh,
    TopFrontLeftCenter,
    TopFrontRightCenter,
    TopSideLeft,
    TopSideRight,
    LeftLfe,
    RightLfe,
    Lfe2,
    BottomCenter,
    BottomLeftCenter,
    BottomRightCenter,

    /// Mid/side recording
    MsMid,
    MsSide,

    /// First order ambisonics
    AmbisonicW,
    AmbisonicX,
    AmbisonicY,
    AmbisonicZ,

    /// X-Y recording
    XyX,
    XyY,

    HeadphonesLeft,
    HeadphonesRight,
    ClickTrack,
    ForeignLanguage,
    HearingImpaired,
    Narration,
    Haptic,
    DialogCentricMix,

    Aux,
    Aux0,
    Aux1,
    Aux2,
    Aux3,
    Aux4,
    Aux5,
    Aux6,
    Aux7,
    Aux8,
    Aux9,
    Aux10,
    Aux11,
    Aux12,
    Aux13,
    Aux14,
    Aux15,
}

impl ChannelId {
    /// Every valid channel id, in declaration order.
    pub const ALL: [ChannelId; 68] = [
        ChannelId::FrontLeft,
        ChannelId::FrontRight,
        ChannelId::FrontCenter,
        ChannelId::Lfe,
        ChannelId::BackLeft,
        ChannelId::BackRight,
        ChannelId::FrontLeftCenter,
        ChannelId::FrontRightCenter,
        ChannelId::BackCenter,
        ChannelId::SideLeft,
        ChannelId::SideRight,
        ChannelId::TopCenter,
        ChannelId::TopFrontLeft,
        ChannelId::TopFrontCenter,
        ChannelId::TopFrontRight,
        ChannelId::TopBackLeft,
        ChannelId::TopBackCenter,
        ChannelId::TopBackRight,
        ChannelId::BackLeftCenter,
        ChannelId::BackRightCenter,
        ChannelId::FrontLeftWide,
        ChannelId::FrontRightWide,
        ChannelId::FrontLeftHigh,
        ChannelId::FrontCenterHigh,
        ChannelId::FrontRightHigh,
        ChannelId::TopFrontLeftCenter,
        ChannelId::TopFrontRightCenter,
        ChannelId::TopSideLeft,
        ChannelId::TopSideRight,
        ChannelId::LeftLfe,
        ChannelId::RightLfe,
        ChannelId::Lfe2,
        ChannelId::BottomCenter,
        ChannelId::BottomLeftCenter,
        ChannelId::BottomRightCenter,
        ChannelId::MsMid,
        ChannelId::MsSide,
        ChannelId::AmbisonicW,
        ChannelId::AmbisonicX,
        ChannelId::AmbisonicY,
        ChannelId::AmbisonicZ,
        ChannelId::XyX,
        ChannelId::XyY,
        ChannelId::HeadphonesLeft,
        ChannelId::HeadphonesRight,
        ChannelId::ClickTrack,
        ChannelId::ForeignLanguage,
        ChannelId::HearingImpaired,
        ChannelId::Narration,
        ChannelId::Haptic,
        ChannelId::DialogCentricMix,
        ChannelId::Aux,
        ChannelId::Aux0,
        ChannelId::Aux1,
        ChannelId::Aux2,
        ChannelId::Aux3,
        ChannelId::Aux4,
        ChannelId::Aux5,
        ChannelId::Aux6,
        ChannelId::Aux7,
        ChannelId::Aux8,
        ChannelId::Aux9,
        ChannelId::Aux10,
        ChannelId::Aux11,
        ChannelId::Aux12,
        ChannelId::Aux13,
        ChannelId::Aux14,
        ChannelId::Aux15,
    ];

    const AUX_N: [ChannelId; 16] = [
        ChannelId::Aux0,
        ChannelId::Aux1,
        ChannelId::Aux2,
        ChannelId::Aux3,
        ChannelId::Aux4,
        ChannelId::Aux5,
        ChannelId::Aux6,
        ChannelId::Aux7,
        ChannelId::Aux8,
        ChannelId::Aux9,
        ChannelId::Aux10,
        ChannelId::Aux11,
        ChannelId::Aux12,
        ChannelId::Aux13,
        ChannelId::Aux14,
        ChannelId::Aux15,
    ];

    /// The numbered auxiliary channel `n` (0..=15).
    pub fn aux(n: usize) -> Option<ChannelId> {
        Self::AUX_N.get(n).copied()
    }

    /// Human readable channel name.
    pub fn name(self) -> &'static str {
        match self {
            ChannelId::Invalid => "(Invalid Channel)",
            ChannelId::FrontLeft => "Front Left",
            ChannelId::FrontRight => "Front Right",
            ChannelId::FrontCenter => "Front Center",
            ChannelId::Lfe => "LFE",
            ChannelId::BackLeft => "Back Left",
            ChannelId::BackRight => "Back Right",
            ChannelId::FrontLeftCenter => "Front Left Center",
            ChannelId::FrontRightCenter => "Front Right Center",
            ChannelId::BackCenter => "Back Center",
            ChannelId::SideLeft => "Side Left",
            ChannelId::SideRight => "Side Right",
            ChannelId::TopCenter => "Top Center",
            ChannelId::TopFrontLeft => "Top Front Left",
            ChannelId::TopFrontCenter => "Top Front Center",
            ChannelId::TopFrontRight => "Top Front Right",
            ChannelId::TopBackLeft => "Top Back Left",
            ChannelId::TopBackCenter => "Top Back Center",
            ChannelId::TopBackRight => "Top Back Right",
            ChannelId::BackLeftCenter => "Back Left Center",
            ChannelId::BackRightCenter => "Back Right Center",
            ChannelId::FrontLeftWide => "Front Left Wide",
            ChannelId::FrontRightWide => "Front Right Wide",
            ChannelId::FrontLeftHigh => "Front Left High",
            ChannelId::FrontCenterHigh => "Front Center High",
            ChannelId::FrontRightHigh => "Front Right High",
            ChannelId::TopFrontLeftCenter => "Top Front Left Center",
            ChannelId::TopFrontRightCenter => "Top Front Right Center",
            ChannelId::TopSideLeft => "Top Side Left",
            ChannelId::TopSideRight => "Top Side Right",
            ChannelId::LeftLfe => "Left LFE",
            ChannelId::RightLfe => "Right LFE",
            ChannelId::Lfe2 => "LFE 2",
            ChannelId::BottomCenter => "Bottom Center",
            ChannelId::BottomLeftCenter => "Bottom Left Center",
            ChannelId::BottomRightCenter => "Bottom Right Center",
            ChannelId::MsMid => "Mid/Side Mid",
            ChannelId::MsSide => "Mid/Side Side",
            ChannelId::AmbisonicW => "Ambisonic W",
            ChannelId::AmbisonicX => "Ambisonic X",
            ChannelId::AmbisonicY => "Ambisonic Y",
            ChannelId::AmbisonicZ => "Ambisonic Z",
            ChannelId::XyX => "X-Y X",
            ChannelId::XyY => "X-Y Y",
            ChannelId::HeadphonesLeft => "Headphones Left",
            ChannelId::HeadphonesRight => "Headphones Right",
            ChannelId::ClickTrack => "Click Track",
            ChannelId::ForeignLanguage => "Foreign Language",
            ChannelId::HearingImpaired => "Hearing Impaired",
            ChannelId::Narration => "Narration",
            ChannelId::Haptic => "Haptic",
            ChannelId::DialogCentricMix => "Dialog Centric Mix",
            ChannelId::Aux => "Aux",
            ChannelId::Aux0 => "Aux 0",
            ChannelId::Aux1 => "Aux 1",
            ChannelId::Aux2 => "Aux 2",
            ChannelId::Aux3 => "Aux 3",
            ChannelId::Aux4 => "Aux 4",
            ChannelId::Aux5 => "Aux 5",
            ChannelId::Aux6 => "Aux 6",
            ChannelId::Aux7 => "Aux 7",
            ChannelId::Aux8 => "Aux 8",
            ChannelId::Aux9 => "Aux 9",
            ChannelId::Aux10 => "Aux 10",
            ChannelId::Aux11 => "Aux 11",
            ChannelId::Aux12 => "Aux 12",
            ChannelId::Aux13 => "Aux 13",
            ChannelId::Aux14 => "Aux 14",
            ChannelId::Aux15 => "Aux 15",
        }
    }

    /// Parse a channel name as produced by [`ChannelId::name`], ignoring case.
    pub fn parse(name: &str) -> Option<ChannelId> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in layouts known by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayoutId {
    Mono,
    Stereo,
    TwoPointOne,
    ThreePointZero,
    ThreePointZeroBack,
    ThreePointOne,
    FourPointZero,
    Quad,
    QuadSide,
    FourPointOne,
    FivePointZeroBack,
    FivePointZeroSide,
    FivePointOne,
    FivePointOneBack,
    SixPointZeroSide,
    SixPointZeroFront,
    Hexagonal,
    SixPointOne,
    SixPointOneBack,
    SixPointOneFront,
    SevenPointZero,
    SevenPointZeroFront,
    SevenPointOne,
    SevenPointOneWide,
    SevenPointOneWideBack,
    Octagonal,
}

use ChannelId::*;

const BUILTIN_LAYOUTS: [(ChannelLayoutId, &str, &[ChannelId]); 26] = [
    (ChannelLayoutId::Mono, "Mono", &[FrontCenter]),
    (ChannelLayoutId::Stereo, "Stereo", &[FrontLeft, FrontRight]),
    (ChannelLayoutId::TwoPointOne, "2.1", &[FrontLeft, FrontRight, Lfe]),
    (ChannelLayoutId::ThreePointZero, "3.0", &[FrontLeft, FrontRight, FrontCenter]),
    (ChannelLayoutId::ThreePointZeroBack, "3.0 (back)", &[FrontLeft, FrontRight, BackCenter]),
    (ChannelLayoutId::ThreePointOne, "3.1", &[FrontLeft, FrontRight, FrontCenter, Lfe]),
    (ChannelLayoutId::FourPointZero, "4.0", &[FrontLeft, FrontRight, FrontCenter, BackCenter]),
    (ChannelLayoutId::Quad, "Quad", &[FrontLeft, FrontRight, BackLeft, BackRight]),
    (ChannelLayoutId::QuadSide, "Quad (side)", &[FrontLeft, FrontRight, SideLeft, SideRight]),
    (
        ChannelLayoutId::FourPointOne,
        "4.1",
        &[FrontLeft, FrontRight, FrontCenter, BackCenter, Lfe],
    ),
    (
        ChannelLayoutId::FivePointZeroBack,
        "5.0 (back)",
        &[FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight],
    ),
    (
        ChannelLayoutId::FivePointZeroSide,
        "5.0 (side)",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight],
    ),
    (
        ChannelLayoutId::FivePointOne,
        "5.1",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, Lfe],
    ),
    (
        ChannelLayoutId::FivePointOneBack,
        "5.1 (back)",
        &[FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight, Lfe],
    ),
    (
        ChannelLayoutId::SixPointZeroSide,
        "6.0 (side)",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, BackCenter],
    ),
    (
        ChannelLayoutId::SixPointZeroFront,
        "6.0 (front)",
        &[FrontLeft, FrontRight, SideLeft, SideRight, FrontLeftCenter, FrontRightCenter],
    ),
    (
        ChannelLayoutId::Hexagonal,
        "Hexagonal",
        &[FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight, BackCenter],
    ),
    (
        ChannelLayoutId::SixPointOne,
        "6.1",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, BackCenter, Lfe],
    ),
    (
        ChannelLayoutId::SixPointOneBack,
        "6.1 (back)",
        &[FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight, BackCenter, Lfe],
    ),
    (
        ChannelLayoutId::SixPointOneFront,
        "6.1 (front)",
        &[FrontLeft, FrontRight, SideLeft, SideRight, FrontLeftCenter, FrontRightCenter, Lfe],
    ),
    (
        ChannelLayoutId::SevenPointZero,
        "7.0",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, BackLeft, BackRight],
    ),
    (
        ChannelLayoutId::SevenPointZeroFront,
        "7.0 (front)",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, FrontLeftCenter, FrontRightCenter],
    ),
    (
        ChannelLayoutId::SevenPointOne,
        "7.1",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, BackLeft, BackRight, Lfe],
    ),
    (
        ChannelLayoutId::SevenPointOneWide,
        "7.1 (wide)",
        &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            SideLeft,
            SideRight,
            FrontLeftCenter,
            FrontRightCenter,
            Lfe,
        ],
    ),
    (
        ChannelLayoutId::SevenPointOneWideBack,
        "7.1 (wide) (back)",
        &[
            FrontLeft,
            FrontRight,
            FrontCenter,
            BackLeft,
            BackRight,
            FrontLeftCenter,
            FrontRightCenter,
            Lfe,
        ],
    ),
    (
        ChannelLayoutId::Octagonal,
        "Octagonal",
        &[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, BackLeft, BackRight, BackCenter],
    ),
];

impl ChannelLayoutId {
    /// All built-in layouts, in catalog order.
    pub const ALL: [ChannelLayoutId; 26] = {
        let mut ids = [ChannelLayoutId::Mono; 26];
        let mut i = 0;
        while i < 26 {
            ids[i] = BUILTIN_LAYOUTS[i].0;
            i += 1;
        }
        ids
    };

    pub fn layout(self) -> ChannelLayout {
        let (_, name, channels) = BUILTIN_LAYOUTS[self as usize];
        let mut layout = ChannelLayout::from_slice_unchecked(channels);
        layout.name = Some(Cow::Borrowed(name));
        layout
    }
}

/// Ordered channel roles of a frame, stored inline with an explicit count so
/// the realtime path never touches a growable container.
#[derive(Debug, Clone)]
pub struct ChannelLayout {
    name: Option<Cow<'static, str>>,
    channel_count: usize,
    channels: [ChannelId; MAX_CHANNELS],
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self {
            name: None,
            channel_count: 0,
            channels: [ChannelId::Invalid; MAX_CHANNELS],
        }
    }
}

impl ChannelLayout {
    /// Build a layout from explicit channel roles.
    pub fn new(channels: &[ChannelId]) -> Result<Self, LayoutError> {
        if channels.len() > MAX_CHANNELS {
            return Err(LayoutError::TooManyChannels(channels.len()));
        }
        Ok(Self::from_slice_unchecked(channels))
    }

    fn from_slice_unchecked(channels: &[ChannelId]) -> Self {
        let mut layout = Self::default();
        layout.channels[..channels.len()].copy_from_slice(channels);
        layout.channel_count = channels.len();
        layout
    }

    /// Set a display name.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn builtin(id: ChannelLayoutId) -> Self {
        id.layout()
    }

    pub fn mono() -> Self {
        ChannelLayoutId::Mono.layout()
    }

    pub fn stereo() -> Self {
        ChannelLayoutId::Stereo.layout()
    }

    /// Every built-in layout.
    pub fn builtins() -> impl Iterator<Item = ChannelLayout> {
        ChannelLayoutId::ALL.into_iter().map(ChannelLayoutId::layout)
    }

    /// The conventional layout for a channel count, if there is one.
    pub fn default_for_channel_count(channel_count: usize) -> Option<Self> {
        let id = match channel_count {
            1 => ChannelLayoutId::Mono,
            2 => ChannelLayoutId::Stereo,
            3 => ChannelLayoutId::ThreePointZero,
            4 => ChannelLayoutId::FourPointZero,
            5 => ChannelLayoutId::FivePointZeroBack,
            6 => ChannelLayoutId::FivePointOneBack,
            7 => ChannelLayoutId::SixPointOne,
            8 => ChannelLayoutId::SevenPointOne,
            _ => return None,
        };
        Some(id.layout())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn is_empty(&self) -> bool {
        self.channel_count == 0
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels[..self.channel_count]
    }

    /// Index of `channel` within the layout.
    pub fn find_channel(&self, channel: ChannelId) -> Option<usize> {
        self.channels().iter().position(|c| *c == channel)
    }

    /// Name the layout after the built-in it matches. Returns whether one matched.
    pub fn detect_builtin(&mut self) -> bool {
        match Self::builtins().find(|builtin| builtin == self) {
            Some(builtin) => {
                self.name = builtin.name;
                true
            }
            None => {
                self.name = None;
                false
            }
        }
    }

    /// First layout of `preferred` that also appears in `available`.
    pub fn best_matching<'a>(
        preferred: &'a [ChannelLayout],
        available: &[ChannelLayout],
    ) -> Option<&'a ChannelLayout> {
        preferred.iter().find(|p| available.contains(p))
    }

    /// Sort so that layouts with the most channels come first.
    pub fn sort_by_channel_count(layouts: &mut [ChannelLayout]) {
        layouts.sort_by(|a, b| b.channel_count.cmp(&a.channel_count));
    }
}

impl PartialEq for ChannelLayout {
    fn eq(&self, other: &Self) -> bool {
        self.channels() == other.channels()
    }
}

impl Eq for ChannelLayout {}

impl Hash for ChannelLayout {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.channels().hash(state);
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        for (i, channel) in self.channels().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(channel.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_equality_ignores_name() {
        let named = ChannelLayout::stereo();
        let unnamed = ChannelLayout::new(&[FrontLeft, FrontRight]).unwrap();
        assert_eq!(named.name(), Some("Stereo"));
        assert_eq!(unnamed.name(), None);
        assert_eq!(named, unnamed);
    }

    #[test]
    fn test_layout_equality_is_order_sensitive() {
        let a = ChannelLayout::new(&[FrontLeft, FrontRight]).unwrap();
        let b = ChannelLayout::new(&[FrontRight, FrontLeft]).unwrap();
        let c = ChannelLayout::new(&[FrontLeft]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_too_many_channels() {
        let channels = [ChannelId::Aux; MAX_CHANNELS + 1];
        assert_eq!(
            ChannelLayout::new(&channels).unwrap_err(),
            LayoutError::TooManyChannels(MAX_CHANNELS + 1)
        );
        assert!(ChannelLayout::new(&channels[..MAX_CHANNELS]).is_ok());
    }

    #[test]
    fn test_builtin_catalog_is_consistent() {
        for id in ChannelLayoutId::ALL {
            let layout = id.layout();
            assert!(layout.channel_count() > 0);
            assert!(layout.channel_count() <= 8);
            assert!(layout.name().is_some());
        }
        assert_eq!(ChannelLayoutId::Octagonal.layout().channel_count(), 8);
        assert_eq!(ChannelLayoutId::ALL[1], ChannelLayoutId::Stereo);
    }

    #[test]
    fn test_detect_builtin() {
        let mut layout = ChannelLayout::new(&[FrontLeft, FrontRight, FrontCenter, SideLeft, SideRight, Lfe]).unwrap();
        assert!(layout.detect_builtin());
        assert_eq!(layout.name(), Some("5.1"));

        let mut odd = ChannelLayout::new(&[Aux3, Haptic]).unwrap().with_name("custom");
        assert!(!odd.detect_builtin());
        assert_eq!(odd.name(), None);
    }

    #[test]
    fn test_default_for_channel_count() {
        assert_eq!(ChannelLayout::default_for_channel_count(2), Some(ChannelLayout::stereo()));
        assert_eq!(
            ChannelLayout::default_for_channel_count(6).unwrap().name(),
            Some("5.1 (back)")
        );
        assert!(ChannelLayout::default_for_channel_count(0).is_none());
        assert!(ChannelLayout::default_for_channel_count(9).is_none());
    }

    #[test]
    fn test_find_channel_and_best_matching() {
        let surround = ChannelLayoutId::FivePointOne.layout();
        assert_eq!(surround.find_channel(Lfe), Some(5));
        assert_eq!(surround.find_channel(BackCenter), None);

        let preferred = [ChannelLayoutId::SevenPointOne.layout(), ChannelLayout::stereo()];
        let available = [ChannelLayout::mono(), ChannelLayout::stereo()];
        assert_eq!(
            ChannelLayout::best_matching(&preferred, &available),
            Some(&ChannelLayout::stereo())
        );
        assert_eq!(ChannelLayout::best_matching(&preferred, &[ChannelLayout::mono()]), None);
    }

    #[test]
    fn test_sort_by_channel_count() {
        let mut layouts = vec![
            ChannelLayout::mono(),
            ChannelLayoutId::SevenPointOne.layout(),
            ChannelLayout::stereo(),
        ];
        ChannelLayout::sort_by_channel_count(&mut layouts);
        let counts: Vec<usize> = layouts.iter().map(|l| l.channel_count()).collect();
        assert_eq!(counts, vec![8, 2, 1]);
    }

    #[test]
    fn test_channel_names_parse_back() {
        for id in ChannelId::ALL {
            assert_eq!(ChannelId::parse(id.name()), Some(id));
        }
        assert_eq!(ChannelId::parse("front left"), Some(FrontLeft));
        assert_eq!(ChannelId::parse("nonsense"), None);
        assert_eq!(ChannelId::aux(15), Some(Aux15));
        assert_eq!(ChannelId::aux(16), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChannelLayout::stereo().to_string(), "Stereo");
        let raw = ChannelLayout::new(&[FrontLeft, Lfe]).unwrap();
        assert_eq!(raw.to_string(), "Front Left, LFE");
    }
}
