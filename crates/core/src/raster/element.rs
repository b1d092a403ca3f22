//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Bounds the types usable as raster values, ensuring they support the
/// numeric casts needed by I/O and aggregation.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;
}

macro_rules! impl_element_int {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    0
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    match nodata {
                        Some(nd) => *self == nd,
                        None => false,
                    }
                }

                fn is_float() -> bool {
                    false
                }
            }
        )*
    };
}

macro_rules! impl_element_float {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn default_nodata() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if self.is_nan() {
                        return true;
                    }
                    match nodata {
                        Some(nd) => *self == nd,
                        None => false,
                    }
                }

                fn is_float() -> bool {
                    true
                }
            }
        )*
    };
}

impl_element_int!(u8, u16, u32, i16, i32);
impl_element_float!(f32, f64);
