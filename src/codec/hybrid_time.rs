//! Hybrid timestamps
//!
//! A hybrid time is a u64 combining physical microseconds (upper 52 bits)
//! with a 12-bit logical counter. Two values are sentinels:
//! - `0` is the minimum and compares less than or equal to everything
//! - `u64::MAX - 1` is invalid (unset) and never equals a valid time
//!
//! Ordering is the total order of the underlying representation.

use std::fmt;

use chrono::{DateTime, Utc};

use super::errors::DumpResult;
use super::reader::BinaryReader;
use super::writer::BinaryWriter;

/// Bits reserved for the logical counter
pub const LOGICAL_BITS: u32 = 12;

const LOGICAL_MASK: u64 = (1 << LOGICAL_BITS) - 1;

/// Totally ordered hybrid logical timestamp.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HybridTime(u64);

impl HybridTime {
    pub const MIN: HybridTime = HybridTime(0);
    pub const MAX: HybridTime = HybridTime(u64::MAX);
    pub const INVALID: HybridTime = HybridTime(u64::MAX - 1);

    #[inline]
    pub fn from_repr(repr: u64) -> Self {
        Self(repr)
    }

    pub fn from_micros(physical_micros: u64, logical: u64) -> Self {
        Self((physical_micros << LOGICAL_BITS) | (logical & LOGICAL_MASK))
    }

    #[inline]
    pub fn repr(&self) -> u64 {
        self.0
    }

    /// Anything but the invalid sentinel is valid, including the minimum.
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    #[inline]
    pub fn is_min(&self) -> bool {
        *self == Self::MIN
    }

    pub fn physical_micros(&self) -> u64 {
        self.0 >> LOGICAL_BITS
    }

    pub fn logical(&self) -> u64 {
        self.0 & LOGICAL_MASK
    }

    /// Wall-clock time of the physical component, for ordinary values only.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.is_valid() || self.is_min() || *self == Self::MAX {
            return None;
        }
        let micros = i64::try_from(self.physical_micros()).ok()?;
        DateTime::<Utc>::from_timestamp_micros(micros)
    }

    pub fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        Ok(Self(reader.read_u64()?))
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer.put_u64(self.0);
    }
}

impl Default for HybridTime {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for HybridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "<invalid>"),
            Self::MIN => write!(f, "<min>"),
            Self::MAX => write!(f, "<max>"),
            _ => {
                if self.logical() == 0 {
                    write!(f, "{{ physical: {} }}", self.physical_micros())
                } else {
                    write!(
                        f,
                        "{{ physical: {} logical: {} }}",
                        self.physical_micros(),
                        self.logical()
                    )
                }
            }
        }
    }
}

/// Read timestamp together with the snapshot window limits.
///
/// Only `read` takes part in the consistency checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadHybridTime {
    pub read: HybridTime,
    pub global_limit: HybridTime,
    pub local_limit: HybridTime,
}

impl ReadHybridTime {
    /// Read time whose limits equal the read point
    pub fn single_time(read: HybridTime) -> Self {
        Self {
            read,
            global_limit: read,
            local_limit: read,
        }
    }

    pub fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        let read = HybridTime::decode(reader)?;
        let global_limit = HybridTime::decode(reader)?;
        let local_limit = HybridTime::decode(reader)?;
        Ok(Self {
            read,
            global_limit,
            local_limit,
        })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        self.read.encode(writer);
        self.global_limit.encode(writer);
        self.local_limit.encode(writer);
    }
}

impl fmt::Display for ReadHybridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ read: {} global_limit: {} local_limit: {} }}",
            self.read, self.global_limit, self.local_limit
        )
    }
}

/// Hybrid time plus a write id disambiguating writes at the same time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocHybridTime {
    pub hybrid_time: HybridTime,
    pub write_id: u32,
}

impl DocHybridTime {
    pub fn new(hybrid_time: HybridTime, write_id: u32) -> Self {
        Self {
            hybrid_time,
            write_id,
        }
    }

    pub fn decode(reader: &mut BinaryReader<'_>) -> DumpResult<Self> {
        let hybrid_time = HybridTime::decode(reader)?;
        let write_id = reader.read_u32()?;
        Ok(Self {
            hybrid_time,
            write_id,
        })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        self.hybrid_time.encode(writer);
        writer.put_u32(self.write_id);
    }
}

impl fmt::Display for DocHybridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HT{} w: {}", self.hybrid_time, self.write_id)
    }
}
