//! Canonical value model shared by all format codecs.

mod any;
mod map;
mod num;

pub use any::AnyValue;
pub use map::ValueMap;
pub use num::{f16_to_f64, f64_to_f16, Decimal, Timestamp};
