//! Sample encodings and the `f64` sample codec.
//!
//! Integer formats map `[-1.0, 1.0]` onto their full range with a linear
//! scale and clamp anything outside it. Float formats pass samples through
//! untouched. 24-bit formats occupy the low three bytes of a 32-bit word.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte order of a multi-byte sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SampleFormat {
    #[default]
    Invalid,
    S8,
    U8,
    S16Le,
    S16Be,
    U16Le,
    U16Be,
    S24Le,
    S24Be,
    U24Le,
    U24Be,
    S32Le,
    S32Be,
    U32Le,
    U32Be,
    Float32Le,
    Float32Be,
    Float64Le,
    Float64Be,
}

macro_rules! native_endian_aliases {
    ($($alias:ident => $le:ident / $be:ident),* $(,)?) => {
        $(
            #[cfg(target_endian = "little")]
            pub const $alias: SampleFormat = SampleFormat::$le;
            #[cfg(target_endian = "big")]
            pub const $alias: SampleFormat = SampleFormat::$be;
        )*
    };
}

impl SampleFormat {
    native_endian_aliases! {
        S16_NE => S16Le / S16Be,
        U16_NE => U16Le / U16Be,
        S24_NE => S24Le / S24Be,
        U24_NE => U24Le / U24Be,
        S32_NE => S32Le / S32Be,
        U32_NE => U32Le / U32Be,
        FLOAT32_NE => Float32Le / Float32Be,
        FLOAT64_NE => Float64Le / Float64Be,
    }

    /// Every valid format.
    pub const ALL: [SampleFormat; 18] = [
        SampleFormat::S8,
        SampleFormat::U8,
        SampleFormat::S16Le,
        SampleFormat::S16Be,
        SampleFormat::U16Le,
        SampleFormat::U16Be,
        SampleFormat::S24Le,
        SampleFormat::S24Be,
        SampleFormat::U24Le,
        SampleFormat::U24Be,
        SampleFormat::S32Le,
        SampleFormat::S32Be,
        SampleFormat::U32Le,
        SampleFormat::U32Be,
        SampleFormat::Float32Le,
        SampleFormat::Float32Be,
        SampleFormat::Float64Le,
        SampleFormat::Float64Be,
    ];

    /// Bytes one sample occupies in a buffer. 0 for `Invalid`.
    pub const fn bytes_per_sample(self) -> usize {
        use SampleFormat::*;
        match self {
            Invalid => 0,
            S8 | U8 => 1,
            S16Le | S16Be | U16Le | U16Be => 2,
            S24Le | S24Be | U24Le | U24Be => 4,
            S32Le | S32Be | U32Le | U32Be => 4,
            Float32Le | Float32Be => 4,
            Float64Le | Float64Be => 8,
        }
    }

    /// Significant bits of an integer sample, 0 for floats and `Invalid`.
    const fn integer_bits(self) -> u32 {
        use SampleFormat::*;
        match self {
            S8 | U8 => 8,
            S16Le | S16Be | U16Le | U16Be => 16,
            S24Le | S24Be | U24Le | U24Be => 24,
            S32Le | S32Be | U32Le | U32Be => 32,
            Invalid | Float32Le | Float32Be | Float64Le | Float64Be => 0,
        }
    }

    pub fn name(self) -> &'static str {
        use SampleFormat::*;
        match self {
            Invalid => "(invalid sample format)",
            S8 => "signed 8-bit",
            U8 => "unsigned 8-bit",
            S16Le => "signed 16-bit LE",
            S16Be => "signed 16-bit BE",
            U16Le => "unsigned 16-bit LE",
            U16Be => "unsigned 16-bit BE",
            S24Le => "signed 24-bit LE",
            S24Be => "signed 24-bit BE",
            U24Le => "unsigned 24-bit LE",
            U24Be => "unsigned 24-bit BE",
            S32Le => "signed 32-bit LE",
            S32Be => "signed 32-bit BE",
            U32Le => "unsigned 32-bit LE",
            U32Be => "unsigned 32-bit BE",
            Float32Le => "float 32-bit LE",
            Float32Be => "float 32-bit BE",
            Float64Le => "float 64-bit LE",
            Float64Be => "float 64-bit BE",
        }
    }

    /// Compact name used on command lines, e.g. `s16le` or `f32be`.
    pub fn short_name(self) -> &'static str {
        use SampleFormat::*;
        match self {
            Invalid => "invalid",
            S8 => "s8",
            U8 => "u8",
            S16Le => "s16le",
            S16Be => "s16be",
            U16Le => "u16le",
            U16Be => "u16be",
            S24Le => "s24le",
            S24Be => "s24be",
            U24Le => "u24le",
            U24Be => "u24be",
            S32Le => "s32le",
            S32Be => "s32be",
            U32Le => "u32le",
            U32Be => "u32be",
            Float32Le => "f32le",
            Float32Be => "f32be",
            Float64Le => "f64le",
            Float64Be => "f64be",
        }
    }

    /// Parse a short name. A `ne` suffix selects the native byte order.
    pub fn parse(name: &str) -> Option<SampleFormat> {
        let name = name.trim().to_ascii_lowercase();
        if let Some(stem) = name.strip_suffix("ne") {
            let suffix = match Endian::NATIVE {
                Endian::Little => "le",
                Endian::Big => "be",
            };
            return Self::parse(&format!("{stem}{suffix}"));
        }
        Self::ALL.into_iter().find(|f| f.short_name() == name)
    }

    pub fn is_float(self) -> bool {
        use SampleFormat::*;
        matches!(self, Float32Le | Float32Be | Float64Le | Float64Be)
    }

    pub fn is_signed(self) -> bool {
        use SampleFormat::*;
        matches!(self, S8 | S16Le | S16Be | S24Le | S24Be | S32Le | S32Be) || self.is_float()
    }

    /// Byte order, or `None` for single-byte formats and `Invalid`.
    pub fn endianness(self) -> Option<Endian> {
        use SampleFormat::*;
        match self {
            Invalid | S8 | U8 => None,
            S16Le | U16Le | S24Le | U24Le | S32Le | U32Le | Float32Le | Float64Le => {
                Some(Endian::Little)
            }
            S16Be | U16Be | S24Be | U24Be | S32Be | U32Be | Float32Be | Float64Be => {
                Some(Endian::Big)
            }
        }
    }

    /// The same encoding with the opposite byte order.
    pub fn swap_endian(self) -> SampleFormat {
        use SampleFormat::*;
        match self {
            Invalid | S8 | U8 => self,
            S16Le => S16Be,
            S16Be => S16Le,
            U16Le => U16Be,
            U16Be => U16Le,
            S24Le => S24Be,
            S24Be => S24Le,
            U24Le => U24Be,
            U24Be => U24Le,
            S32Le => S32Be,
            S32Be => S32Le,
            U32Le => U32Be,
            U32Be => U32Le,
            Float32Le => Float32Be,
            Float32Be => Float32Le,
            Float64Le => Float64Be,
            Float64Be => Float64Le,
        }
    }

    /// The same encoding in the platform's byte order.
    pub fn to_native_endian(self) -> SampleFormat {
        match self.endianness() {
            Some(endian) if endian != Endian::NATIVE => self.swap_endian(),
            _ => self,
        }
    }

    /// Encode `sample` into the first [`bytes_per_sample`](Self::bytes_per_sample)
    /// bytes of `out`. Panics if `out` is shorter than that.
    #[inline]
    pub fn encode(self, sample: f64, out: &mut [u8]) {
        use SampleFormat::*;
        match self {
            Invalid => {}
            Float32Le => out[..4].copy_from_slice(&(sample as f32).to_le_bytes()),
            Float32Be => out[..4].copy_from_slice(&(sample as f32).to_be_bytes()),
            Float64Le => out[..8].copy_from_slice(&sample.to_le_bytes()),
            Float64Be => out[..8].copy_from_slice(&sample.to_be_bytes()),
            _ => {
                let word = self.quantize(sample);
                let width = self.bytes_per_sample();
                match self.endianness() {
                    Some(Endian::Big) => {
                        out[..width].copy_from_slice(&word.to_be_bytes()[8 - width..])
                    }
                    _ => out[..width].copy_from_slice(&word.to_le_bytes()[..width]),
                }
            }
        }
    }

    /// Decode one sample from the front of `bytes`. Integer samples come back
    /// in `[-1.0, 1.0]`.
    #[inline]
    pub fn decode(self, bytes: &[u8]) -> f64 {
        use SampleFormat::*;
        match self {
            Invalid => 0.0,
            Float32Le => f32::from_le_bytes(read_array(bytes)) as f64,
            Float32Be => f32::from_be_bytes(read_array(bytes)) as f64,
            Float64Le => f64::from_le_bytes(read_array(bytes)),
            Float64Be => f64::from_be_bytes(read_array(bytes)),
            _ => {
                let width = self.bytes_per_sample();
                let mut word = [0u8; 8];
                let raw = match self.endianness() {
                    Some(Endian::Big) => {
                        word[8 - width..].copy_from_slice(&bytes[..width]);
                        u64::from_be_bytes(word)
                    }
                    _ => {
                        word[..width].copy_from_slice(&bytes[..width]);
                        u64::from_le_bytes(word)
                    }
                };
                self.dequantize(raw)
            }
        }
    }

    /// Fill `out` with silence, one sample slot after another.
    pub fn fill_silence(self, out: &mut [u8]) {
        let width = self.bytes_per_sample();
        if width == 0 {
            return;
        }
        let mut silence = [0u8; 8];
        self.encode(0.0, &mut silence);
        for slot in out.chunks_exact_mut(width) {
            slot.copy_from_slice(&silence[..width]);
        }
    }

    /// Map a sample onto the integer range, returned as the two's complement
    /// bit pattern of the storage word.
    fn quantize(self, sample: f64) -> u64 {
        let bits = self.integer_bits();
        let sample = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
        let half_range = ((1u64 << bits) - 1) as f64 / 2.0;
        if self.is_signed() {
            let max = ((1i64 << (bits - 1)) - 1) as f64;
            let min = -(1i64 << (bits - 1)) as f64;
            let value = (sample * half_range).round().clamp(min, max) as i64;
            // 24-bit samples sign-extend into the padding byte of their word.
            value as u64
        } else {
            let max = ((1u64 << bits) - 1) as f64;
            ((sample + 1.0) * half_range).round().clamp(0.0, max) as u64
        }
    }

    fn dequantize(self, raw: u64) -> f64 {
        let bits = self.integer_bits();
        let half_range = ((1u64 << bits) - 1) as f64 / 2.0;
        let mask = (1u64 << bits) - 1;
        let raw = raw & mask;
        let value = if self.is_signed() {
            let shift = 64 - bits;
            (((raw << shift) as i64) >> shift) as f64 / half_range
        } else {
            raw as f64 / half_range - 1.0
        };
        value.clamp(-1.0, 1.0)
    }
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantization_step(format: SampleFormat) -> f64 {
        2.0 / ((1u64 << format.integer_bits()) - 1) as f64
    }

    #[test]
    fn test_byte_sizes() {
        assert_eq!(SampleFormat::Invalid.bytes_per_sample(), 0);
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S16Be.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S24Le.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::U32Be.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::Float32Le.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::Float64Be.bytes_per_sample(), 8);
    }

    #[test]
    fn test_integer_round_trip_within_one_step() {
        let samples = [-1.0, -0.73, -0.5, -1e-6, 0.0, 0.25, 0.5, 0.999, 1.0];
        for format in SampleFormat::ALL.into_iter().filter(|f| !f.is_float()) {
            let step = quantization_step(format);
            for sample in samples {
                let mut buf = [0u8; 8];
                format.encode(sample, &mut buf);
                let back = format.decode(&buf);
                assert!(
                    (back - sample).abs() <= step,
                    "{format}: {sample} decoded as {back}"
                );
            }
        }
    }

    #[test]
    fn test_float_round_trip_is_exact() {
        for sample in [-1.0, -0.5, 0.0, 0.375, 1.0, 1.5] {
            for format in [SampleFormat::Float32Le, SampleFormat::Float32Be, SampleFormat::Float64Le, SampleFormat::Float64Be] {
                let mut buf = [0u8; 8];
                format.encode(sample, &mut buf);
                assert_eq!(format.decode(&buf), sample);
            }
        }
    }

    #[test]
    fn test_integer_encoding_clamps() {
        let mut buf = [0u8; 8];
        SampleFormat::S16Le.encode(3.0, &mut buf);
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), i16::MAX);
        SampleFormat::S16Le.encode(-3.0, &mut buf);
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), i16::MIN);
        SampleFormat::U8.encode(2.0, &mut buf);
        assert_eq!(buf[0], u8::MAX);
        SampleFormat::U8.encode(-2.0, &mut buf);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn test_byte_order_is_honoured() {
        let mut le = [0u8; 2];
        let mut be = [0u8; 2];
        SampleFormat::S16Le.encode(0.5, &mut le);
        SampleFormat::S16Be.encode(0.5, &mut be);
        assert_eq!(le, [be[1], be[0]]);
        assert_eq!(i16::from_le_bytes(le), 16384);
    }

    #[test]
    fn test_24_bit_uses_low_three_bytes() {
        let mut buf = [0u8; 4];
        SampleFormat::S24Le.encode(-1.0, &mut buf);
        assert_eq!(i32::from_le_bytes(buf), -(1 << 23));

        SampleFormat::U24Be.encode(1.0, &mut buf);
        assert_eq!(u32::from_be_bytes(buf), (1 << 24) - 1);
    }

    #[test]
    fn test_silence() {
        let mut buf = [0xAAu8; 6];
        SampleFormat::U16Le.fill_silence(&mut buf);
        assert_eq!(buf, [0x00, 0x80, 0x00, 0x80, 0x00, 0x80]);

        let mut buf = [0xAAu8; 8];
        SampleFormat::Float32Be.fill_silence(&mut buf);
        assert_eq!(buf, [0; 8]);
    }

    #[test]
    fn test_swap_endian_is_involution() {
        for format in SampleFormat::ALL {
            assert_eq!(format.swap_endian().swap_endian(), format);
            if format.endianness().is_none() {
                assert_eq!(format.swap_endian(), format);
            } else {
                assert_ne!(format.swap_endian(), format);
            }
        }
    }

    #[test]
    fn test_native_endian_is_idempotent() {
        for format in SampleFormat::ALL {
            let native = format.to_native_endian();
            assert_eq!(native.to_native_endian(), native);
            match format.endianness() {
                Some(_) => assert_eq!(native.endianness(), Some(Endian::NATIVE)),
                None => assert_eq!(native, format),
            }
        }
        assert_eq!(SampleFormat::Float32Le.to_native_endian(), SampleFormat::FLOAT32_NE);
    }

    #[test]
    fn test_parse_short_names() {
        for format in SampleFormat::ALL {
            assert_eq!(SampleFormat::parse(format.short_name()), Some(format));
        }
        assert_eq!(SampleFormat::parse("F32NE"), Some(SampleFormat::FLOAT32_NE));
        assert_eq!(SampleFormat::parse("s16"), None);
    }

    #[test]
    fn test_signedness() {
        assert!(SampleFormat::S24Be.is_signed());
        assert!(!SampleFormat::U32Le.is_signed());
        assert!(SampleFormat::Float64Le.is_signed());
        assert!(SampleFormat::Float64Le.is_float());
        assert!(!SampleFormat::S8.is_float());
    }
}
